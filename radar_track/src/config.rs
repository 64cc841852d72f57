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

use std::{collections::HashMap, time::Duration};
use serde::{Serialize,Deserialize};
use radar_common::datetime::{deserialize_duration, serialize_duration, millis, secs, minutes};

/// the engine configuration. All fields have defaults so that config files only have to
/// specify what differs from them. Durations are written as strings, e.g. `"3s"` or `"500ms"`
#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(default)]
pub struct LiveTrackConfig {
    pub feed_addr: String, // host:port of the SBS text feed (dump1090 port 30003)

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub connect_timeout: Duration,

    // max time a single socket read may block before we re-check pause and shutdown
    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub read_poll_interval: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub reconnect_backoff: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub pause_poll_interval: Duration,

    // how often the external run control is queried
    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub control_poll_interval: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub idle_report_after: Duration,

    pub max_line_len: usize,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub display_duration: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub fade_window: Duration,

    pub fade_floor: f32,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub sweep_interval: Duration,

    pub status_capacity: usize,

    pub resolver: ResolverConfig,
}

impl Default for LiveTrackConfig {
    fn default()->Self {
        LiveTrackConfig {
            feed_addr: "localhost:30003".to_string(),
            connect_timeout: secs(5),
            read_poll_interval: millis(500),
            reconnect_backoff: secs(3),
            pause_poll_interval: secs(3),
            control_poll_interval: secs(2),
            idle_report_after: secs(10),
            max_line_len: 4096,
            display_duration: secs(30),
            fade_window: secs(10),
            fade_floor: 0.15,
            sweep_interval: secs(1),
            status_capacity: 20,
            resolver: ResolverConfig::default(),
        }
    }
}

/// registry lookup settings. The URLs contain a `{icao24}` placeholder
#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub primary_url: String,
    pub secondary_url: Option<String>,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub request_timeout: Duration,

    pub max_concurrent: usize,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub not_found_retry_after: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub failure_retry_after: Duration,

    pub cache_capacity: usize,

    pub name_aliases: HashMap<String,String>,

    pub breaker: BreakerConfig,
}

pub const ICAO24_PLACEHOLDER: &'static str = "{icao24}";

impl Default for ResolverConfig {
    fn default()->Self {
        let mut name_aliases = HashMap::new();
        name_aliases.insert( "Avions de Transport Regional".to_string(), "ATR".to_string());
        name_aliases.insert( "Honda Aircraft Company".to_string(), "Honda".to_string());

        ResolverConfig {
            primary_url: "https://hexdb.io/api/v1/aircraft/{icao24}".to_string(),
            secondary_url: Some("https://opensky-network.org/api/metadata/aircraft/icao/{icao24}".to_string()),
            request_timeout: secs(5),
            max_concurrent: 5,
            not_found_retry_after: minutes(10),
            failure_retry_after: secs(60),
            cache_capacity: 4096,
            name_aliases,
            breaker: BreakerConfig::default(),
        }
    }
}

#[derive(Serialize,Deserialize,Debug,Clone)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: usize,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub window: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default()->Self {
        BreakerConfig { failure_threshold: 5, window: secs(120), cooldown: secs(300) }
    }
}
