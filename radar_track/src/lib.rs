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

//! live aircraft track engine for SBS text feeds
//!
//! Decoded feed reports are merged into a [`store::TrackStore`], tracks are enriched asynchronously
//! with registry metadata by the [`resolver::EnrichmentResolver`], and expire once they have not been
//! updated for the configured display duration. [`engine::LiveTrackEngine`] ties these together and is
//! the only object a display front end needs.

use radar_common::define_load_config;

pub mod errors;
pub mod config;
pub mod sbs;
pub mod track;
pub mod store;
pub mod enrichment;
pub mod breaker;
pub mod resolver;
pub mod status;
pub mod ingest;
pub mod engine;

pub use config::{LiveTrackConfig, ResolverConfig, BreakerConfig};
pub use engine::LiveTrackEngine;
pub use status::{EngineEvent, EngineStatus, IngestState};
pub use track::{Track, TrackSnapshot};

define_load_config!{ "live_track.ron" }
