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

use std::{sync::{Arc,Mutex, atomic::{AtomicBool,AtomicI64,Ordering}}, time::{Duration,Instant}};
use tokio::{sync::{broadcast,Notify}, task::JoinHandle, time::{interval,MissedTickBehavior}};
use tokio_util::sync::CancellationToken;
use tracing::{debug,error,info,warn};

use crate::{
    config::LiveTrackConfig,
    enrichment::RegistryLookup,
    errors::{op_failed, RadarTrackError, Result},
    ingest::{run_ingest, IngestContext, RunControl},
    resolver::EnrichmentResolver,
    status::{add, Counters, EngineEvent, EngineStatus, IngestState, StateCell},
    store::{FadeParams, TrackStore},
    track::TrackSnapshot,
};

/// the live track engine: owns the track store, the enrichment resolver and the ingest/sweep tasks.
/// Readers (e.g. a display loop) use [`Self::snapshot`] and [`Self::get`], which only ever return copies.
///
/// ```ignore
/// let engine = LiveTrackEngine::new( load_config("live_track.ron")?)?;
/// engine.start()?;
/// for t in engine.snapshot() { ... }
/// ```
pub struct LiveTrackEngine {
    ctx: Arc<IngestContext>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl LiveTrackEngine {
    /// create an engine that uses the HTTP registries from the config
    pub fn new (config: LiveTrackConfig)->Result<Self> {
        let counters = Arc::new( Counters::default());
        let (events, _) = broadcast::channel( config.status_capacity.max(1));
        let resolver = EnrichmentResolver::from_config( &config.resolver, counters.clone(), events.clone())?;
        Ok( Self::assemble( config, resolver, counters, events) )
    }

    /// create an engine with explicit registry lookups (e.g. mocks or other services)
    pub fn with_lookups (config: LiveTrackConfig, primary: Arc<dyn RegistryLookup>, secondary: Option<Arc<dyn RegistryLookup>>)->Self {
        let counters = Arc::new( Counters::default());
        let (events, _) = broadcast::channel( config.status_capacity.max(1));
        let resolver = EnrichmentResolver::new( &config.resolver, primary, secondary, counters.clone(), events.clone());
        Self::assemble( config, resolver, counters, events)
    }

    /// set the external run control. This has to happen before the engine is started
    pub fn with_run_control (mut self, run_control: Arc<dyn RunControl>)->Result<Self> {
        match Arc::get_mut( &mut self.ctx) {
            Some(ctx) => {
                ctx.run_control = Some(run_control);
                Ok(self)
            }
            None => Err( op_failed!("cannot set run control of a started engine"))
        }
    }

    fn assemble (config: LiveTrackConfig, resolver: EnrichmentResolver, counters: Arc<Counters>, events: broadcast::Sender<EngineEvent>)->Self
    {
        let fade = FadeParams::new( config.display_duration, config.fade_window, config.fade_floor);
        let ctx = IngestContext {
            config: Arc::new( config),
            store: Arc::new( TrackStore::new( fade)),
            resolver: Arc::new( resolver),
            counters,
            events,
            run_control: None,
            cancel: CancellationToken::new(),
            state: StateCell::new( IngestState::Disconnected),
            paused: AtomicBool::new( false),
            external_stop: AtomicBool::new( false),
            last_report: AtomicI64::new( 0),
            wakeup: Notify::new(),
        };

        LiveTrackEngine { ctx: Arc::new(ctx), tasks: Mutex::new( Vec::new()), started: AtomicBool::new( false) }
    }

    /// spawn the ingest and sweep tasks on the current tokio runtime
    pub fn start (&self)->Result<()> {
        if self.started.swap( true, Ordering::Relaxed) {
            return Err( op_failed!("engine already started"))
        }
        if self.ctx.cancel.is_cancelled() {
            return Err( op_failed!("engine was shut down"))
        }

        info!("starting live track engine for feed {}", self.ctx.config.feed_addr);
        let ingest = tokio::spawn( run_ingest( self.ctx.clone()));
        let sweep = tokio::spawn( run_sweep( self.ctx.clone()));

        let mut tasks = self.tasks.lock().unwrap_or_else( |poisoned| poisoned.into_inner());
        tasks.push( ingest);
        tasks.push( sweep);
        Ok(())
    }

    pub fn config (&self)->&LiveTrackConfig { &self.ctx.config }

    pub fn store (&self)->&Arc<TrackStore> { &self.ctx.store }

    pub fn resolver (&self)->&Arc<EnrichmentResolver> { &self.ctx.resolver }

    pub fn snapshot (&self)->Vec<TrackSnapshot> { self.ctx.store.snapshot() }

    pub fn snapshot_at (&self, now: Instant)->Vec<TrackSnapshot> { self.ctx.store.snapshot_at( now) }

    pub fn get (&self, icao24: &str)->Option<TrackSnapshot> { self.ctx.store.get( icao24) }

    pub fn status (&self)->EngineStatus {
        EngineStatus {
            state: self.ctx.state.get(),
            paused: self.ctx.is_paused(),
            n_tracks: self.ctx.store.len(),
            last_report: self.ctx.last_report(),
            counters: self.ctx.counters.snapshot(),
        }
    }

    pub fn subscribe (&self)->broadcast::Receiver<EngineEvent> { self.ctx.events.subscribe() }

    /// stop connecting and reading from the feed. In-flight lookups still complete
    pub fn pause (&self) {
        if !self.ctx.paused.swap( true, Ordering::Relaxed) {
            debug!("pause requested");
        }
    }

    /// resume reading. A parked ingest loop is woken up right away, otherwise this takes effect
    /// with the next poll
    pub fn resume (&self) {
        if self.ctx.paused.swap( false, Ordering::Relaxed) {
            debug!("resume requested");
            self.ctx.wakeup.notify_waiters();
        }
    }

    pub fn is_paused (&self)->bool { self.ctx.is_paused() }

    /// cancel the ingest and sweep tasks and wait for them to terminate
    pub async fn shutdown (&self) {
        self.ctx.cancel.cancel();

        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else( |poisoned| poisoned.into_inner());
            tasks.drain(..).collect()
        };
        for task in tasks {
            if let Err(e) = task.await {
                error!("engine task failed: {e}");
            }
        }
        info!("live track engine shut down");
    }
}

impl Drop for LiveTrackEngine {
    fn drop (&mut self) {
        self.ctx.cancel.cancel();
    }
}

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// periodically remove expired tracks, independent of the ingest rate
async fn run_sweep (ctx: Arc<IngestContext>) {
    let period = ctx.config.sweep_interval.max( MIN_SWEEP_INTERVAL);
    if period != ctx.config.sweep_interval {
        warn!("sweep interval {:?} too small, using {:?}", ctx.config.sweep_interval, period);
    }
    let mut ticker = interval( period);
    ticker.set_missed_tick_behavior( MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                let removed = ctx.store.sweep( now, ctx.config.display_duration);
                if !removed.is_empty() {
                    debug!("expired {} tracks", removed.len());
                    add( &ctx.counters.tracks_expired, removed.len() as u64);
                }
                ctx.resolver.purge_retry_after( now);
            }
        }
    }
}
