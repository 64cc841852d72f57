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

use std::{path::Path, time::Instant};
use anyhow::Result;
use tokio::{signal, sync::broadcast::error::RecvError, time::interval};
use radar_common::{define_cli, config::load_config_path, datetime::secs, geo::{ScreenGeometry, to_screen_xy, is_within_range}};
use radar_track::{load_config, LiveTrackConfig, LiveTrackEngine, TrackSnapshot};

define_cli! { ARGS [about="monitor live aircraft tracks from an SBS text feed"] =
    config: Option<String> [help="path of config file (default is the live_track.ron lookup)", long],
    addr: Option<String> [help="feed address host:port, overrides config", long],
    ref_lat: f64 [help="latitude of radar center in degrees", long, allow_hyphen_values=true],
    ref_lon: f64 [help="longitude of radar center in degrees", long, allow_hyphen_values=true],
    range_km: f64 [help="radar range in km", long, default_value="50"],
    width: u32 [help="virtual screen width in pixels", long, default_value="800"],
    height: u32 [help="virtual screen height in pixels", long, default_value="480"],
    interval: u64 [help="snapshot interval in seconds", long, default_value="2"]
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt::init();

    let mut config: LiveTrackConfig = match &ARGS.config {
        Some(path) => load_config_path( Path::new(path))?,
        None => load_config("live_track.ron")?
    };
    if let Some(addr) = &ARGS.addr { config.feed_addr = addr.clone() }

    let engine = LiveTrackEngine::new( config)?;
    engine.start()?;

    let screen = ScreenGeometry::new( ARGS.width, ARGS.height);
    let mut events = engine.subscribe();
    let mut ticker = interval( secs( ARGS.interval.max(1)));

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            res = events.recv() => match res {
                Ok(event) => println!("** {event}"),
                Err(RecvError::Lagged(n)) => println!("** {n} status messages dropped"),
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => print_snapshot( &engine, &screen),
        }
    }

    engine.shutdown().await;
    Ok(())
}

fn print_snapshot (engine: &LiveTrackEngine, screen: &ScreenGeometry) {
    let mut tracks: Vec<TrackSnapshot> = engine.snapshot().into_iter()
        .filter( |t| is_within_range( t.track.position.latitude, t.track.position.longitude, ARGS.range_km, ARGS.ref_lat, ARGS.ref_lon))
        .collect();
    tracks.sort_by( |a,b| {
        let da = a.track.distance_km_from( ARGS.ref_lat, ARGS.ref_lon);
        let db = b.track.distance_km_from( ARGS.ref_lat, ARGS.ref_lon);
        da.total_cmp( &db)
    });

    println!("------------------ {}", engine.status());
    for t in &tracks {
        let p = &t.track.position;
        let (x,y) = to_screen_xy( p.latitude, p.longitude, ARGS.range_km, ARGS.ref_lat, ARGS.ref_lon, screen);
        let dist = t.track.distance_km_from( ARGS.ref_lat, ARGS.ref_lon);
        println!("({x:4},{y:4}) {:5.1}km fade: {:.2}  {}", dist, t.fade, t.track);
    }
}
