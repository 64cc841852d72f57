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

use radar_common::{config::from_ron_str, datetime::{millis, secs, minutes}};
use radar_track::{load_config, LiveTrackConfig};

// run with "cargo test test_config -- --nocapture"

#[test]
fn test_load_default_config() {
    let config: LiveTrackConfig = load_config("live_track.ron").unwrap();
    println!("{config:#?}");

    assert_eq!( config.read_poll_interval, millis(500));
    assert_eq!( config.reconnect_backoff, secs(3));
    assert_eq!( config.display_duration, secs(30));
    assert_eq!( config.resolver.not_found_retry_after, minutes(10));
    assert_eq!( config.resolver.breaker.failure_threshold, 5);
    assert_eq!( config.resolver.breaker.cooldown, secs(300));
    assert_eq!( config.resolver.name_aliases.get("Honda Aircraft Company").map( |s| s.as_str()), Some("Honda"));
    assert_eq!( config.resolver.primary_url, "https://hexdb.io/api/v1/aircraft/{icao24}");
}

#[test]
fn test_partial_config() {
    let config: LiveTrackConfig = from_ron_str( r#"LiveTrackConfig( feed_addr: "10.0.0.5:30003", display_duration: "1min", resolver: ( max_concurrent: 2, secondary_url: None ) )"#).unwrap();
    println!("{config:?}");

    assert_eq!( config.feed_addr, "10.0.0.5:30003");
    assert_eq!( config.display_duration, secs(60));
    assert_eq!( config.fade_window, secs(10)); // default
    assert_eq!( config.resolver.max_concurrent, 2);
    assert_eq!( config.resolver.secondary_url, None);
    assert_eq!( config.resolver.request_timeout, secs(5));
}

#[test]
fn test_missing_config() {
    assert!( load_config::<LiveTrackConfig>("no_such_config.ron").is_err());
}
