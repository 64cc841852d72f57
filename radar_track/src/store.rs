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

//! the authoritative table of live tracks
//!
//! All operations take the table lock for the duration of a single operation only. Readers get
//! copies, never references into the table, and nothing holds the lock across I/O.

use std::{collections::HashMap, sync::{Arc,RwLock,RwLockReadGuard,RwLockWriteGuard}, time::{Duration,Instant}};
use tracing::trace;
use crate::{enrichment::EnrichmentRecord, sbs::RawReport, track::{Fix,Track,TrackSnapshot}};

/// what an upsert did with a report
#[derive(Debug,Clone,PartialEq,Eq)]
pub enum Upsert {
    Created(Arc<String>),
    Updated { icao24: Arc<String>, enrichment_complete: bool },
    Ignored, // no id, or no position for an unknown id
}

#[derive(Debug,Clone)]
pub struct FadeParams {
    pub display_duration: Duration,
    pub fade_window: Duration,
    pub floor: f32,
}

impl FadeParams {
    pub fn new (display_duration: Duration, fade_window: Duration, floor: f32)->Self {
        FadeParams { display_duration, fade_window, floor }
    }
}

pub struct TrackStore {
    tracks: RwLock<HashMap<String,Track>>,
    fade: FadeParams,
}

impl TrackStore {
    pub fn new (fade: FadeParams)->Self {
        TrackStore { tracks: RwLock::new( HashMap::new()), fade }
    }

    pub fn fade_params (&self)->&FadeParams { &self.fade }

    // a panic while holding the lock does not leave the table in an inconsistent state (all mutations
    // are single field assignments) so we just continue with the poisoned data
    fn read (&self)->RwLockReadGuard<'_,HashMap<String,Track>> {
        self.tracks.read().unwrap_or_else( |poisoned| poisoned.into_inner())
    }

    fn write (&self)->RwLockWriteGuard<'_,HashMap<String,Track>> {
        self.tracks.write().unwrap_or_else( |poisoned| poisoned.into_inner())
    }

    /// merge a decoded report. Reports without id are ignored, as are reports for unknown ids that
    /// don't carry a valid position - tracks are only created from position reports
    pub fn upsert (&self, report: &RawReport)->Upsert {
        let Some(icao24) = report.icao24.as_deref() else { return Upsert::Ignored };
        let mut tracks = self.write();

        if let Some(track) = tracks.get_mut( icao24) {
            if let Some((latitude,longitude)) = report.position() {
                track.push_fix( Fix { latitude, longitude, received: report.received, date: report.date });
            }
            track.merge_fields( report);
            Upsert::Updated { icao24: track.icao24.clone(), enrichment_complete: track.enrichment.is_complete() }

        } else if let Some(track) = Track::from_report( icao24, report) {
            let id = track.icao24.clone();
            trace!("new track {}", track);
            tracks.insert( icao24.to_string(), track);
            Upsert::Created(id)

        } else {
            Upsert::Ignored
        }
    }

    /// sticky merge of enrichment data. Returns false if the track is gone (which is not an error)
    pub fn apply_enrichment (&self, icao24: &str, rec: &EnrichmentRecord)->bool {
        let mut tracks = self.write();
        if let Some(track) = tracks.get_mut( icao24) {
            track.enrichment.merge_sticky( rec);
            true
        } else {
            false
        }
    }

    pub fn enrichment_of (&self, icao24: &str)->Option<EnrichmentRecord> {
        self.read().get( icao24).map( |t| t.enrichment.clone())
    }

    pub fn snapshot (&self)->Vec<TrackSnapshot> {
        self.snapshot_at( Instant::now())
    }

    /// copies of all tracks that are visible at `now`, with their fade weight
    pub fn snapshot_at (&self, now: Instant)->Vec<TrackSnapshot> {
        let tracks = self.read();
        let mut list = Vec::with_capacity( tracks.len());

        for track in tracks.values() {
            if track.is_visible( now, self.fade.display_duration) {
                let fade = track.fade( now, self.fade.display_duration, self.fade.fade_window, self.fade.floor);
                list.push( TrackSnapshot { track: track.clone(), fade });
            }
        }
        list
    }

    pub fn get (&self, icao24: &str)->Option<TrackSnapshot> {
        self.get_at( icao24, Instant::now())
    }

    pub fn get_at (&self, icao24: &str, now: Instant)->Option<TrackSnapshot> {
        let tracks = self.read();
        let track = tracks.get( icao24.to_uppercase().as_str())?;

        if track.is_visible( now, self.fade.display_duration) {
            let fade = track.fade( now, self.fade.display_duration, self.fade.fade_window, self.fade.floor);
            Some( TrackSnapshot { track: track.clone(), fade })
        } else {
            None
        }
    }

    /// remove all tracks with `now - last_update > max_age` and return their ids
    pub fn sweep (&self, now: Instant, max_age: Duration)->Vec<Arc<String>> {
        let mut removed = Vec::new();
        self.write().retain( |_,track| {
            if track.age(now) > max_age {
                removed.push( track.icao24.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len (&self)->usize { self.read().len() }

    pub fn is_empty (&self)->bool { self.read().is_empty() }
}
