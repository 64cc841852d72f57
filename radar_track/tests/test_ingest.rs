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
#![allow(unused)]

use std::{sync::{Arc, atomic::{AtomicU8,AtomicUsize,Ordering}}, time::Duration};
use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, net::TcpListener, time::{sleep,timeout}};
use radar_common::datetime::{millis, secs};
use radar_track::{
    enrichment::{LookupOutcome, RegistryLookup},
    ingest::{LineBuffer, RunControl},
    IngestState, LiveTrackConfig, LiveTrackEngine, EngineEvent,
};

const LINE_1: &'static str = "MSG,3,1,1,4CA2D1,1,2024/01/01,12:00:00.000,2024/01/01,12:00:00.000,,35000,450,270,51.5,-0.1,,,,,,0";
const LINE_2: &'static str = "MSG,3,1,1,4CA2D1,1,2024/01/01,12:00:01.000,2024/01/01,12:00:01.000,,35100,451,271,51.51,-0.1,,,,,,0";
const LINE_3: &'static str = "MSG,3,1,1,A0B59D,1,2024/01/01,12:00:01.000,2024/01/01,12:00:01.000,,12000,300,90,51.4,-0.2,,,,,,0";

struct NoRegistry { calls: AtomicUsize }

#[async_trait]
impl RegistryLookup for NoRegistry {
    fn name (&self)->&str { "none" }
    async fn lookup (&self, _icao24: &str)->LookupOutcome {
        self.calls.fetch_add( 1, Ordering::SeqCst);
        LookupOutcome::NotFound
    }
}

/// 0: signal unavailable, 1: run, 2: stop
struct SwitchControl { value: AtomicU8 }

#[async_trait]
impl RunControl for SwitchControl {
    async fn should_run (&self)->Option<bool> {
        match self.value.load( Ordering::SeqCst) {
            1 => Some(true),
            2 => Some(false),
            _ => None
        }
    }
}

fn config (addr: String)->LiveTrackConfig {
    LiveTrackConfig {
        feed_addr: addr,
        connect_timeout: secs(1),
        read_poll_interval: millis(50),
        reconnect_backoff: millis(100),
        pause_poll_interval: millis(100),
        control_poll_interval: millis(50),
        ..LiveTrackConfig::default()
    }
}

fn engine (config: LiveTrackConfig)->(LiveTrackEngine, Arc<NoRegistry>) {
    let registry = Arc::new( NoRegistry { calls: AtomicUsize::new(0) });
    let primary: Arc<dyn RegistryLookup> = registry.clone();
    (LiveTrackEngine::with_lookups( config, primary, None), registry)
}

async fn wait_for<F: Fn()->bool> (cond: F)->bool {
    for _ in 0..100 {
        if cond() { return true }
        sleep( millis(20)).await;
    }
    false
}

// run with "cargo test test_line_buffer -- --nocapture"

#[test]
fn test_line_buffer() {
    let mut lb = LineBuffer::new( 4096);
    let mut lines: Vec<String> = Vec::new();

    let data = format!("{LINE_1}\r\n{LINE_2}\n{}", &LINE_3[..20]);
    let n = lb.feed( data.as_bytes(), |l| lines.push( l.to_string()));
    assert_eq!( n, 2);
    assert_eq!( lines, vec![LINE_1.to_string(), LINE_2.to_string()]);
    assert_eq!( lb.pending(), 20);

    // the partial line is completed by the next read
    let data = format!("{}\n", &LINE_3[20..]);
    lb.feed( data.as_bytes(), |l| lines.push( l.to_string()));
    assert_eq!( lines.len(), 3);
    assert_eq!( lines[2], LINE_3);
    assert_eq!( lb.pending(), 0);
}

#[test]
fn test_line_buffer_overflow() {
    let mut lb = LineBuffer::new( 16);
    let mut lines: Vec<String> = Vec::new();

    lb.feed( b"0123456789", |l| lines.push( l.to_string()));
    lb.feed( b"0123456789", |l| lines.push( l.to_string())); // exceeds max, dropped
    lb.feed( b"xyz\nok\n", |l| lines.push( l.to_string())); // rest of dropped line is skipped

    println!("lines: {lines:?}");
    assert_eq!( lines, vec!["ok".to_string()]);
    assert_eq!( lb.n_dropped(), 1);

    lb.feed( b"01234567890123456789\nfine\n", |l| lines.push( l.to_string()));
    assert_eq!( lines, vec!["ok".to_string(), "fine".to_string()]);
    assert_eq!( lb.n_dropped(), 2);
}

#[tokio::test]
async fn test_ingest() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (engine, registry) = engine( config( addr));
    let mut events = engine.subscribe();
    engine.start().unwrap();

    let (mut socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    match timeout( secs(1), events.recv()).await {
        Ok(Ok(EngineEvent::Connected(a))) => println!("engine connected to {a}"),
        other => panic!("expected Connected event, got {other:?}")
    }

    // write in odd chunks to exercise line re-assembly
    let data = format!("{LINE_1}\n{LINE_2}\ngarbage,line\n{LINE_3}\n");
    let (a,b) = data.split_at( 37);
    socket.write_all( a.as_bytes()).await.unwrap();
    sleep( millis(60)).await;
    socket.write_all( b.as_bytes()).await.unwrap();

    assert!( wait_for( || engine.status().counters.reports_decoded == 3).await);
    let status = engine.status();
    println!("{status}");
    assert_eq!( status.counters.lines_received, 4);
    assert_eq!( status.counters.lines_rejected, 1);
    assert_eq!( status.counters.tracks_created, 2);
    assert!( status.last_report.is_some());

    let t = engine.get("4CA2D1").unwrap().track;
    println!("{t}");
    assert_eq!( t.position.latitude, 51.51);
    assert_eq!( t.previous.unwrap().latitude, 51.5);
    assert_eq!( engine.snapshot().len(), 2);

    // both new tracks were looked up once
    assert!( wait_for( || registry.calls.load( Ordering::SeqCst) == 2).await);

    // feed closes -> disconnect and reconnect after backoff
    drop( socket);
    let (socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    assert!( wait_for( || engine.status().counters.reconnects >= 1).await);

    engine.shutdown().await;
    assert_eq!( engine.status().state, IngestState::Disconnected);
}

#[tokio::test]
async fn test_pause() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (engine, _) = engine( config( addr));
    let mut events = engine.subscribe();

    engine.pause();
    engine.start().unwrap();
    assert!( engine.is_paused());
    assert!( wait_for( || engine.status().state == IngestState::Paused).await);

    // no connection while paused
    assert!( timeout( millis(300), listener.accept()).await.is_err());

    engine.resume();
    let (mut socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    socket.write_all( format!("{LINE_1}\n").as_bytes()).await.unwrap();
    assert!( wait_for( || engine.get("4CA2D1").is_some()).await);

    // pausing drops the connection within a poll interval
    engine.pause();
    assert!( wait_for( || engine.status().state == IngestState::Paused).await);

    let mut seen = Vec::new();
    while let Ok(e) = events.try_recv() { seen.push(e); }
    println!("events: {seen:?}");
    assert!( seen.contains( &EngineEvent::Paused));
    assert!( seen.contains( &EngineEvent::Resumed));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_run_control() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let control = Arc::new( SwitchControl { value: AtomicU8::new(2) });
    let run_control: Arc<dyn RunControl> = control.clone();

    let (engine, _) = engine( config( addr));
    let engine = engine.with_run_control( run_control).unwrap();
    engine.start().unwrap();

    assert!( wait_for( || engine.is_paused()).await);

    // losing the signal keeps the paused state
    control.value.store( 0, Ordering::SeqCst);
    sleep( millis(200)).await;
    assert!( engine.is_paused());
    assert!( timeout( millis(100), listener.accept()).await.is_err());

    control.value.store( 1, Ordering::SeqCst);
    let (_socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    assert!( !engine.is_paused());

    // and losing it again keeps running
    control.value.store( 0, Ordering::SeqCst);
    sleep( millis(200)).await;
    assert!( !engine.is_paused());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_no_new_data() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = LiveTrackConfig { idle_report_after: millis(200), ..config( addr) };
    let (engine, _) = engine( config);
    let mut events = engine.subscribe();
    engine.start().unwrap();

    let (_socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    assert!( wait_for( || engine.status().state == IngestState::Idle).await);

    let mut got_idle = false;
    while let Ok(e) = events.try_recv() {
        if let EngineEvent::NoNewData(d) = e { got_idle = d >= millis(200); }
    }
    assert!( got_idle);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_start_twice() {
    let (engine, _) = engine( config( "127.0.0.1:9".to_string()));
    engine.start().unwrap();
    assert!( engine.start().is_err());
    engine.shutdown().await;
    assert!( engine.start().is_err());
}

#[tokio::test]
async fn test_zero_sweep_interval() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = LiveTrackConfig {
        sweep_interval: Duration::ZERO,
        display_duration: millis(100),
        ..config( addr)
    };
    let (engine, _) = engine( config);
    engine.start().unwrap();

    let (mut socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    socket.write_all( format!("{LINE_1}\n").as_bytes()).await.unwrap();
    assert!( wait_for( || engine.status().counters.tracks_created == 1).await);

    // the sweep task keeps running and evicts the track
    assert!( wait_for( || engine.store().len() == 0).await);
    println!("{}", engine.status());
    assert_eq!( engine.status().counters.tracks_expired, 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_resume_keeps_backoff() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = LiveTrackConfig {
        reconnect_backoff: millis(600),
        read_poll_interval: millis(500),
        ..config( addr)
    };
    let (engine, _) = engine( config);
    engine.start().unwrap();

    let (socket, _) = timeout( secs(2), listener.accept()).await.unwrap().unwrap();
    assert!( wait_for( || engine.status().state == IngestState::Receiving).await);

    // pause and resume before the reader notices
    engine.pause();
    engine.resume();
    assert!( !engine.is_paused());

    drop( socket);
    let t = std::time::Instant::now();
    let (_socket, _) = timeout( secs(3), listener.accept()).await.unwrap().unwrap();
    let elapsed = t.elapsed();
    println!("reconnected after {elapsed:?}");
    assert!( elapsed >= millis(500));

    engine.shutdown().await;
}
