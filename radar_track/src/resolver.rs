/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! resolves aircraft ids into registry metadata
//!
//! Resolution order is: complete record already in the store, resolver cache, primary registry,
//! secondary registry. Remote calls go through a [`CircuitBreaker`] and a semaphore that caps the
//! number of concurrent lookups. Network I/O never happens while holding any lock.

use std::{sync::{Arc,Mutex,MutexGuard}, time::{Duration,Instant}};
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug,info,warn};

use crate::{
    breaker::{Admission, BreakerState, CircuitBreaker, Transition},
    config::ResolverConfig,
    enrichment::{EnrichmentRecord, HexDbLookup, LookupFailure, LookupOutcome, NameNormalizer, OpenSkyLookup, RegistryLookup},
    errors::Result,
    status::{incr, Counters, EngineEvent},
    store::TrackStore,
};

#[derive(Debug,Clone,PartialEq)]
pub enum Resolution {
    Resolved(EnrichmentRecord),
    NotFound,
    Unavailable, // both registries failed, or the breaker is open
}

pub struct EnrichmentResolver {
    primary: Arc<dyn RegistryLookup>,
    secondary: Option<Arc<dyn RegistryLookup>>,
    normalizer: NameNormalizer,
    breaker: Mutex<CircuitBreaker>,

    cache: DashMap<String,(EnrichmentRecord,Instant)>, // records we got, even if their track has expired
    cache_capacity: usize,
    retry_after: DashMap<String,Instant>, // negative cache
    in_flight: DashMap<String,()>,
    permits: Arc<Semaphore>,

    not_found_retry_after: Duration,
    failure_retry_after: Duration,

    counters: Arc<Counters>,
    events: broadcast::Sender<EngineEvent>,
}

impl EnrichmentResolver {
    pub fn new (config: &ResolverConfig, primary: Arc<dyn RegistryLookup>, secondary: Option<Arc<dyn RegistryLookup>>,
                counters: Arc<Counters>, events: broadcast::Sender<EngineEvent>)->Self
    {
        EnrichmentResolver {
            primary,
            secondary,
            normalizer: NameNormalizer::new( config.name_aliases.clone()),
            breaker: Mutex::new( CircuitBreaker::new( config.breaker.clone())),
            cache: DashMap::new(),
            cache_capacity: config.cache_capacity,
            retry_after: DashMap::new(),
            in_flight: DashMap::new(),
            permits: Arc::new( Semaphore::new( config.max_concurrent.max(1))),
            not_found_retry_after: config.not_found_retry_after,
            failure_retry_after: config.failure_retry_after,
            counters,
            events,
        }
    }

    /// create a resolver with the HTTP registries configured in `config`
    pub fn from_config (config: &ResolverConfig, counters: Arc<Counters>, events: broadcast::Sender<EngineEvent>)->Result<Self> {
        let primary: Arc<dyn RegistryLookup> = Arc::new( HexDbLookup::new( &config.primary_url, config.request_timeout)?);
        let secondary: Option<Arc<dyn RegistryLookup>> = match &config.secondary_url {
            Some(url) => Some( Arc::new( OpenSkyLookup::new( url, config.request_timeout)?)),
            None => None
        };
        Ok( Self::new( config, primary, secondary, counters, events) )
    }

    fn breaker (&self)->MutexGuard<'_,CircuitBreaker> {
        self.breaker.lock().unwrap_or_else( |poisoned| poisoned.into_inner())
    }

    pub fn breaker_state (&self)->BreakerState { self.breaker().state() }

    pub fn cached (&self, icao24: &str)->Option<EnrichmentRecord> {
        self.cache.get( icao24).map( |e| e.value().0.clone())
    }

    pub fn cache_len (&self)->usize { self.cache.len() }

    pub fn is_in_flight (&self, icao24: &str)->bool { self.in_flight.contains_key( icao24) }

    /// resolve a single id. This does not consult the negative cache or de-duplicate - that is the job of [`Self::dispatch`]
    pub async fn resolve (&self, icao24: &str, store: &TrackStore)->Resolution {
        if let Some(rec) = store.enrichment_of( icao24) {
            if rec.is_complete() { return Resolution::Resolved(rec) }
        }
        if let Some(rec) = self.cached( icao24) {
            return Resolution::Resolved(rec)
        }

        let admission = self.breaker().try_acquire( Instant::now());
        if admission == Admission::Rejected {
            incr( &self.counters.lookups_fast_failed);
            debug!("lookup of {icao24} rejected by open breaker");
            return Resolution::Unavailable
        }

        incr( &self.counters.lookups_started);
        let mut failure: Option<LookupFailure> = None;
        let mut not_found = false;
        let mut record: Option<EnrichmentRecord> = None;

        match self.primary.lookup( icao24).await {
            LookupOutcome::Found(rec) => record = Some(rec),
            LookupOutcome::NotFound => not_found = true,
            LookupOutcome::Rejected(status) => debug!("{} rejected lookup of {icao24} with status {status}", self.primary.name()),
            LookupOutcome::Failed(f) => {
                debug!("{} lookup of {icao24} failed: {f}", self.primary.name());
                failure = Some(f)
            }
        }

        // a 404 means there is nothing to find, not that the primary is unhealthy
        if record.is_none() && !not_found {
            if let Some(secondary) = &self.secondary {
                match secondary.lookup( icao24).await {
                    LookupOutcome::Found(rec) => record = Some(rec),
                    LookupOutcome::NotFound => not_found = true,
                    LookupOutcome::Rejected(status) => debug!("{} rejected lookup of {icao24} with status {status}", secondary.name()),
                    LookupOutcome::Failed(f) => {
                        debug!("{} lookup of {icao24} failed: {f}", secondary.name());
                        failure = failure.or(Some(f))
                    }
                }
            }
        }

        if let Some(rec) = record {
            let transition = self.breaker().record_success( admission);
            self.publish_transition( transition);

            let rec = self.normalizer.normalize( rec);
            self.cache_insert( icao24, &rec);
            incr( &self.counters.lookups_succeeded);
            return Resolution::Resolved(rec)
        }

        if let Some(f) = failure {
            let transition = self.breaker().record_failure( admission, Instant::now());
            self.publish_transition( transition);
            debug!("lookup of {icao24} counted as failure ({f})");
        } else {
            self.breaker().record_neutral( admission);
        }

        if not_found {
            incr( &self.counters.lookups_not_found);
            Resolution::NotFound
        } else {
            incr( &self.counters.lookups_failed);
            Resolution::Unavailable
        }
    }

    /// start an asynchronous resolution for `icao24` unless it is already complete, pending, or negatively
    /// cached. Never waits - the spawned task acquires the concurrency permit. Returns true if a
    /// resolution was started (or satisfied from the cache)
    pub fn dispatch (self: &Arc<Self>, icao24: &str, store: &Arc<TrackStore>)->bool {
        if let Some(rec) = store.enrichment_of( icao24) {
            if rec.is_complete() { return false }
        }

        let now = Instant::now();
        if let Some(until) = self.retry_after.get( icao24).map( |e| *e.value()) {
            if now < until { return false }
            self.retry_after.remove( icao24);
        }

        if let Some(rec) = self.cached( icao24) {
            store.apply_enrichment( icao24, &rec);
            return true
        }

        match self.in_flight.entry( icao24.to_string()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(e) => { e.insert(()); }
        }

        let resolver = self.clone();
        let store = store.clone();
        let icao24 = icao24.to_string();

        tokio::spawn( async move {
            match resolver.permits.clone().acquire_owned().await {
                Ok(_permit) => {
                    let resolution = resolver.resolve( &icao24, &store).await;
                    resolver.complete( &icao24, resolution, &store);
                }
                Err(_) => warn!("lookup permits closed, dropping lookup of {icao24}")
            }
            resolver.in_flight.remove( &icao24);
        });

        true
    }

    fn complete (&self, icao24: &str, resolution: Resolution, store: &TrackStore) {
        match resolution {
            Resolution::Resolved(rec) => {
                if store.apply_enrichment( icao24, &rec) {
                    self.publish( EngineEvent::Enriched { icao24: icao24.to_string(), label: rec.label() });
                } else {
                    debug!("track {icao24} expired before lookup completed");
                }
            }
            Resolution::NotFound => {
                self.retry_after.insert( icao24.to_string(), Instant::now() + self.not_found_retry_after);
            }
            Resolution::Unavailable => {
                self.retry_after.insert( icao24.to_string(), Instant::now() + self.failure_retry_after);
                self.publish( EngineEvent::LookupUnavailable { icao24: icao24.to_string() });
            }
        }
    }

    fn cache_insert (&self, icao24: &str, rec: &EnrichmentRecord) {
        if self.cache_capacity == 0 { return }

        if self.cache.len() >= self.cache_capacity && !self.cache.contains_key( icao24) {
            let oldest = self.cache.iter()
                .min_by_key( |e| e.value().1)
                .map( |e| e.key().clone());
            if let Some(key) = oldest { self.cache.remove( &key); }
        }
        self.cache.insert( icao24.to_string(), (rec.clone(), Instant::now()));
    }

    /// drop expired negative cache entries
    pub fn purge_retry_after (&self, now: Instant) {
        self.retry_after.retain( |_,until| *until > now);
    }

    fn publish_transition (&self, transition: Transition) {
        match transition {
            Transition::Opened{until} => {
                warn!("registry lookups suspended for {:?}", until.saturating_duration_since( Instant::now()));
                self.publish( EngineEvent::BreakerOpened { until });
            }
            Transition::Closed => {
                info!("registry lookups resumed");
                self.publish( EngineEvent::BreakerClosed);
            }
            Transition::None => {}
        }
    }

    fn publish (&self, event: EngineEvent) {
        let _ = self.events.send( event); // no receivers is not an error
    }
}
