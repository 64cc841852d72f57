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

//! the feed ingest loop
//!
//! `Disconnected -> Connecting -> Receiving -> Processing -> Receiving ...` with a reconnect after a
//! fixed backoff whenever the connection fails or closes. While paused we neither connect nor read,
//! and only wake up every `pause_poll_interval` (or when resumed).

use std::{sync::{Arc, atomic::{AtomicBool,AtomicI64,Ordering}}, time::{Duration,Instant}};
use async_trait::async_trait;
use memchr::memchr;
use tokio::{io::AsyncReadExt, net::TcpStream, sync::{broadcast,Notify}, time::{sleep,timeout}};
use tokio_util::sync::CancellationToken;
use tracing::{debug,info,trace,warn};
use radar_common::datetime::EpochMillis;

use crate::{
    config::LiveTrackConfig,
    resolver::EnrichmentResolver,
    sbs,
    status::{incr, Counters, EngineEvent, IngestState, StateCell},
    store::{TrackStore, Upsert},
};

/// accumulates raw socket reads and hands out complete lines. The trailing partial line is kept
/// for the next read. Lines longer than `max_len` are dropped up to their terminating newline
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
    discarding: bool,
    n_dropped: u64,
}

impl LineBuffer {
    pub fn new (max_len: usize)->Self {
        LineBuffer { buf: Vec::with_capacity( max_len.min(65536)), max_len: max_len.max(1), discarding: false, n_dropped: 0 }
    }

    /// number of bytes of the pending (incomplete) line
    pub fn pending (&self)->usize { self.buf.len() }

    pub fn n_dropped (&self)->u64 { self.n_dropped }

    /// process the next chunk of data, calling `f` for each complete line (without line terminator).
    /// Returns the number of lines passed to `f`
    pub fn feed<F> (&mut self, mut data: &[u8], mut f: F)->usize where F: FnMut(&str) {
        let mut n_lines = 0;

        while !data.is_empty() {
            match memchr( b'\n', data) {
                Some(idx) => {
                    let (head, tail) = (&data[..idx], &data[idx+1..]);
                    if self.discarding {
                        self.discarding = false;
                    } else if self.buf.len() + head.len() > self.max_len {
                        self.n_dropped += 1;
                        self.buf.clear();
                    } else {
                        self.buf.extend_from_slice( head);
                        let line = String::from_utf8_lossy( &self.buf);
                        f( line.trim_end_matches('\r'));
                        n_lines += 1;
                        self.buf.clear();
                    }
                    data = tail;
                }
                None => {
                    if !self.discarding {
                        if self.buf.len() + data.len() > self.max_len {
                            self.n_dropped += 1;
                            self.buf.clear();
                            self.discarding = true;
                        } else {
                            self.buf.extend_from_slice( data);
                        }
                    }
                    data = &[];
                }
            }
        }
        n_lines
    }

    pub fn clear (&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

/// external run/liveness signal, e.g. a remote "run" flag. `Some(true)` means run, `Some(false)`
/// means pause and `None` means the signal could not be obtained, in which case the previous state
/// is kept
#[async_trait]
pub trait RunControl: Send + Sync {
    async fn should_run (&self)->Option<bool>;
}

/// state shared between the ingest task and the engine front end
pub struct IngestContext {
    pub config: Arc<LiveTrackConfig>,
    pub store: Arc<TrackStore>,
    pub resolver: Arc<EnrichmentResolver>,
    pub counters: Arc<Counters>,
    pub events: broadcast::Sender<EngineEvent>,
    pub run_control: Option<Arc<dyn RunControl>>,
    pub cancel: CancellationToken,

    pub state: StateCell,
    pub paused: AtomicBool, // requested through the engine API
    pub external_stop: AtomicBool, // last known value of the run control
    pub last_report: AtomicI64, // epoch millis of last decoded report, 0 if none yet
    pub wakeup: Notify,
}

impl IngestContext {
    pub fn is_paused (&self)->bool {
        self.paused.load( Ordering::Relaxed) || self.external_stop.load( Ordering::Relaxed)
    }

    pub fn last_report (&self)->Option<EpochMillis> {
        match self.last_report.load( Ordering::Relaxed) {
            0 => None,
            millis => Some( EpochMillis::new( millis))
        }
    }

    fn publish (&self, event: EngineEvent) {
        let _ = self.events.send( event);
    }

    /// decode one line and merge it into the store, dispatching a lookup if the track is not enriched yet
    pub fn process_line (&self, line: &str) {
        incr( &self.counters.lines_received);

        match sbs::decode( line) {
            Some(report) => {
                incr( &self.counters.reports_decoded);
                self.last_report.store( report.date.millis(), Ordering::Relaxed);

                match self.store.upsert( &report) {
                    Upsert::Created(icao24) => {
                        incr( &self.counters.tracks_created);
                        self.resolver.dispatch( &icao24, &self.store);
                    }
                    Upsert::Updated{ icao24, enrichment_complete: false } => {
                        self.resolver.dispatch( &icao24, &self.store);
                    }
                    _ => {}
                }
            }
            None => {
                incr( &self.counters.lines_rejected);
                trace!("rejected line: {line}");
            }
        }
    }

    async fn poll_control (&self, last_poll: &mut Option<Instant>) {
        let Some(run_control) = &self.run_control else { return };
        let interval = self.config.control_poll_interval;

        if last_poll.map( |t| t.elapsed() >= interval).unwrap_or(true) {
            *last_poll = Some( Instant::now());
            match timeout( interval, run_control.should_run()).await {
                Ok(Some(run)) => self.external_stop.store( !run, Ordering::Relaxed),
                Ok(None) => debug!("run control signal unavailable, keeping state"),
                Err(_) => debug!("run control signal timed out, keeping state"),
            }
        }
    }

    fn check_pause_transition (&self, was_paused: &mut bool)->bool {
        let paused = self.is_paused();
        if paused != *was_paused {
            *was_paused = paused;
            if paused {
                info!("ingest paused");
                self.publish( EngineEvent::Paused);
            } else {
                info!("ingest resumed");
                self.publish( EngineEvent::Resumed);
            }
        }
        paused
    }

    /// park while paused, for at most `dur`. Returns early if resumed through the engine and
    /// returns false if cancelled. Resume only wakes waiters that are already registered, so no
    /// wakeup can be left over for a later backoff
    async fn park (&self, dur: Duration)->bool {
        let resumed = self.wakeup.notified();
        tokio::pin!(resumed);
        resumed.as_mut().enable();

        if !self.is_paused() { return !self.cancel.is_cancelled() } // resumed before we registered

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = resumed => true,
            _ = sleep( dur) => true,
        }
    }

    /// sleep for `dur` unless we get cancelled. Returns false if cancelled
    async fn backoff (&self, dur: Duration)->bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep( dur) => true,
        }
    }
}

/// the ingest task. Runs until the context is cancelled
pub async fn run_ingest (ctx: Arc<IngestContext>) {
    let mut last_control_poll: Option<Instant> = None;
    let mut was_paused = false;
    let mut n_connects: u64 = 0;

    while !ctx.cancel.is_cancelled() {
        ctx.poll_control( &mut last_control_poll).await;

        if ctx.check_pause_transition( &mut was_paused) {
            ctx.state.set( IngestState::Paused);
            if !ctx.park( ctx.config.pause_poll_interval).await { break }
            continue
        }

        ctx.state.set( IngestState::Connecting);
        if n_connects > 0 { incr( &ctx.counters.reconnects); }
        n_connects += 1;

        let addr = ctx.config.feed_addr.as_str();
        let reason = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            res = timeout( ctx.config.connect_timeout, TcpStream::connect( addr)) => match res {
                Ok(Ok(stream)) => {
                    info!("connected to feed {addr}");
                    ctx.publish( EngineEvent::Connected( addr.to_string()));
                    receive( &ctx, stream, &mut last_control_poll, &mut was_paused).await
                }
                Ok(Err(e)) => format!("failed to connect to {addr}: {e}"),
                Err(_) => format!("timeout connecting to {addr}"),
            }
        };

        ctx.state.set( IngestState::Disconnected);
        if ctx.cancel.is_cancelled() { break }

        info!("feed disconnected: {reason}");
        ctx.publish( EngineEvent::Disconnected( reason));

        if ctx.is_paused() { continue } // no backoff needed, the pause branch takes over
        if !ctx.backoff( ctx.config.reconnect_backoff).await { break }
    }

    ctx.state.set( IngestState::Disconnected);
    debug!("ingest task terminated");
}

/// read from a connected feed until it closes, fails, we get paused or cancelled. Returns the reason
async fn receive (ctx: &IngestContext, mut stream: TcpStream, last_control_poll: &mut Option<Instant>, was_paused: &mut bool)->String {
    let config = &ctx.config;
    let mut lines = LineBuffer::new( config.max_line_len);
    let mut buf = vec![0u8; 8192];
    let mut last_data = Instant::now(); // last time we decoded a report (or connected)
    let mut idle_reported = false;

    ctx.state.set( IngestState::Receiving);

    loop {
        ctx.poll_control( last_control_poll).await;
        if ctx.check_pause_transition( was_paused) {
            return "paused".to_string()
        }

        tokio::select! {
            _ = ctx.cancel.cancelled() => return "shutdown".to_string(),

            res = timeout( config.read_poll_interval, stream.read( &mut buf)) => match res {
                Err(_) => {} // poll timeout, just re-check control state
                Ok(Ok(0)) => return "connection closed by feed".to_string(),
                Ok(Ok(len)) => {
                    ctx.state.set( IngestState::Processing);
                    let n_decoded = ctx.counters.reports_decoded.load( Ordering::Relaxed);

                    lines.feed( &buf[..len], |line| ctx.process_line( line));

                    if ctx.counters.reports_decoded.load( Ordering::Relaxed) > n_decoded {
                        last_data = Instant::now();
                        idle_reported = false;
                    }
                    ctx.state.set( IngestState::Receiving);
                }
                Ok(Err(e)) => return format!("read error: {e}"),
            }
        }

        let idle = last_data.elapsed();
        if idle >= config.idle_report_after {
            ctx.state.set( IngestState::Idle);
            if !idle_reported {
                idle_reported = true;
                warn!("no new data for {:?}", idle);
                ctx.publish( EngineEvent::NoNewData( idle));
            }
        }
    }
}
