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

//! operator facing status of the engine: state, counters and broadcast events

use std::{fmt, sync::atomic::{AtomicU8,AtomicU64,Ordering}, time::{Duration,Instant}};
use radar_common::datetime::EpochMillis;

/// status messages published on the engine's broadcast channel. Slow receivers lose old messages
#[derive(Debug,Clone,PartialEq)]
pub enum EngineEvent {
    Connected(String),
    Disconnected(String),
    Paused,
    Resumed,
    NoNewData(Duration),
    Enriched { icao24: String, label: String },
    LookupUnavailable { icao24: String },
    BreakerOpened { until: Instant },
    BreakerClosed,
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::Connected(addr) => write!( f, "connected to {addr}"),
            EngineEvent::Disconnected(reason) => write!( f, "disconnected: {reason}"),
            EngineEvent::Paused => write!( f, "paused"),
            EngineEvent::Resumed => write!( f, "resumed"),
            EngineEvent::NoNewData(dur) => write!( f, "no new data for {}s", dur.as_secs()),
            EngineEvent::Enriched{icao24,label} => write!( f, "{icao24}: {label}"),
            EngineEvent::LookupUnavailable{icao24} => write!( f, "{icao24}: registry unavailable"),
            EngineEvent::BreakerOpened{until} => {
                write!( f, "registry lookups suspended for {}s", until.saturating_duration_since( Instant::now()).as_secs())
            }
            EngineEvent::BreakerClosed => write!( f, "registry lookups resumed"),
        }
    }
}

#[repr(u8)]
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum IngestState {
    Disconnected = 0,
    Connecting = 1,
    Receiving = 2,
    Processing = 3,
    Idle = 4, // connected but no decoded report for a while
    Paused = 5,
}

impl From<u8> for IngestState {
    fn from (v: u8)->Self {
        match v {
            1 => IngestState::Connecting,
            2 => IngestState::Receiving,
            3 => IngestState::Processing,
            4 => IngestState::Idle,
            5 => IngestState::Paused,
            _ => IngestState::Disconnected,
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestState::Disconnected => "disconnected",
            IngestState::Connecting => "connecting",
            IngestState::Receiving => "receiving",
            IngestState::Processing => "processing",
            IngestState::Idle => "idle",
            IngestState::Paused => "paused",
        };
        write!( f, "{s}")
    }
}

/// lock free state cell shared between the ingest task and readers
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new (state: IngestState)->Self { StateCell( AtomicU8::new( state as u8)) }
    pub fn get (&self)->IngestState { IngestState::from( self.0.load( Ordering::Relaxed)) }
    pub fn set (&self, state: IngestState) { self.0.store( state as u8, Ordering::Relaxed) }
}

macro_rules! define_counters {
    ( $( $field:ident ),* $(,)? ) => {
        /// monotonic event counters. Updated with relaxed atomics - readers get a consistent-enough picture
        #[derive(Debug,Default)]
        pub struct Counters {
            $( pub $field: AtomicU64, )*
        }

        #[derive(Debug,Clone,Copy,Default,PartialEq,Eq)]
        pub struct CounterSnapshot {
            $( pub $field: u64, )*
        }

        impl Counters {
            pub fn snapshot (&self)->CounterSnapshot {
                CounterSnapshot { $( $field: self.$field.load( Ordering::Relaxed), )* }
            }
        }
    }
}

define_counters! {
    lines_received,
    reports_decoded,
    lines_rejected,
    tracks_created,
    tracks_expired,
    reconnects,
    lookups_started,
    lookups_succeeded,
    lookups_not_found,
    lookups_failed,
    lookups_fast_failed,
}

#[inline]
pub fn incr (counter: &AtomicU64) {
    counter.fetch_add( 1, Ordering::Relaxed);
}

#[inline]
pub fn add (counter: &AtomicU64, n: u64) {
    counter.fetch_add( n, Ordering::Relaxed);
}

#[derive(Debug,Clone)]
pub struct EngineStatus {
    pub state: IngestState,
    pub paused: bool,
    pub n_tracks: usize,
    pub last_report: Option<EpochMillis>,
    pub counters: CounterSnapshot,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        write!( f, "{} tracks: {}, lines: {} (rejected: {}), reports: {}, lookups: {}/{} ok, {} not found, {} failed, {} fast-failed",
            self.state, self.n_tracks, c.lines_received, c.lines_rejected, c.reports_decoded,
            c.lookups_succeeded, c.lookups_started, c.lookups_not_found, c.lookups_failed, c.lookups_fast_failed)?;
        if let Some(t) = self.last_report { write!( f, ", last report: {}", t.local_time_of_day())?; }
        Ok(())
    }
}
