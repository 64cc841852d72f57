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

use std::{fmt, sync::Arc, time::{Duration,Instant}};
use uom::si::{length::foot, velocity::{knot,foot_per_minute}, f64::{Length,Velocity}};
use radar_common::{datetime::EpochMillis, geo};
use crate::{enrichment::EnrichmentRecord, sbs::RawReport};

/// an observed position
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub received: Instant,
    pub date: EpochMillis,
}

impl Fix {
    pub fn same_location (&self, other: &Fix)->bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

/// the live record for one aircraft. Tracks are owned by the [`crate::store::TrackStore`], readers only
/// get copies
#[derive(Debug,Clone)]
pub struct Track {
    pub icao24: Arc<String>, // we keep that in an Arc so that we can clone without heap allocation
    pub callsign: Option<String>,

    pub altitude: Option<Length>,
    pub groundspeed: Option<Velocity>,
    pub track_deg: Option<f64>, // ground track angle as reported
    pub vertical_rate: Option<Velocity>,
    pub squawk: Option<String>,

    pub position: Fix,
    pub previous: Option<Fix>, // the last distinct fix before `position`, used for heading

    pub enrichment: EnrichmentRecord,

    pub created: Instant,
    pub last_update: Instant,
    pub last_update_date: EpochMillis,
    pub n_reports: u64,
}

impl Track {
    /// create a track from a report that has a valid position
    pub fn from_report (icao24: &str, report: &RawReport)->Option<Self> {
        let (latitude,longitude) = report.position()?;
        let position = Fix { latitude, longitude, received: report.received, date: report.date };

        let mut track = Track {
            icao24: Arc::new( icao24.to_string()),
            callsign: None,
            altitude: None,
            groundspeed: None,
            track_deg: None,
            vertical_rate: None,
            squawk: None,
            position,
            previous: None,
            enrichment: EnrichmentRecord::unknown( icao24),
            created: report.received,
            last_update: report.received,
            last_update_date: report.date,
            n_reports: 0,
        };
        track.merge_fields( report);
        Some(track)
    }

    /// set every field for which the report has a value, keep the others
    pub fn merge_fields (&mut self, report: &RawReport) {
        if let Some(cs) = &report.callsign { self.callsign = Some(cs.clone()) }
        if let Some(alt) = report.altitude { self.altitude = Some( Length::new::<foot>( alt as f64)) }
        if let Some(spd) = report.groundspeed { self.groundspeed = Some( Velocity::new::<knot>( spd)) }
        if let Some(trk) = report.track { self.track_deg = Some(trk) }
        if let Some(vr) = report.vertical_rate { self.vertical_rate = Some( Velocity::new::<foot_per_minute>( vr as f64)) }
        if let Some(sq) = &report.squawk { self.squawk = Some(sq.clone()) }

        self.last_update = report.received;
        self.last_update_date = report.date;
        self.n_reports += 1;
    }

    /// move to a new fix. The current position only becomes the previous one if the new fix is a
    /// different location, or if we don't have a previous fix yet
    pub fn push_fix (&mut self, fix: Fix) {
        if !fix.same_location( &self.position) || self.previous.is_none() {
            self.previous = Some(self.position);
        }
        self.position = fix;
    }

    pub fn altitude_ft (&self)->Option<f64> { self.altitude.map( |a| a.get::<foot>()) }
    pub fn groundspeed_kn (&self)->Option<f64> { self.groundspeed.map( |v| v.get::<knot>()) }
    pub fn vertical_rate_fpm (&self)->Option<f64> { self.vertical_rate.map( |v| v.get::<foot_per_minute>()) }

    /// heading derived from the two last distinct fixes (screen convention, see [`geo::heading`])
    pub fn heading (&self)->Option<f64> {
        self.previous
            .filter( |prev| !prev.same_location( &self.position))
            .map( |prev| geo::heading( prev.latitude, prev.longitude, self.position.latitude, self.position.longitude))
    }

    pub fn age (&self, now: Instant)->Duration {
        now.saturating_duration_since( self.last_update)
    }

    pub fn is_visible (&self, now: Instant, display_duration: Duration)->bool {
        self.age(now) < display_duration
    }

    pub fn fade (&self, now: Instant, display_duration: Duration, fade_window: Duration, floor: f32)->f32 {
        fade_weight( self.age(now), display_duration, fade_window, floor)
    }

    pub fn distance_km_from (&self, lat: f64, lon: f64)->f64 {
        geo::distance_km( lat, lon, self.position.latitude, self.position.longitude)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Track( icao24: {}", self.icao24)?;
        if let Some(cs) = &self.callsign { write!( f, ", cs: \"{cs}\"")?; }
        write!( f, ", pos: ({:.5},{:.5})", self.position.latitude, self.position.longitude)?;
        if let Some(alt) = self.altitude { write!( f, ", alt: {:.0}", alt.get::<foot>())?; }
        if let Some(spd) = self.groundspeed { write!( f, ", spd: {:.1}", spd.get::<knot>())?; }
        if let Some(trk) = self.track_deg { write!( f, ", trk: {trk:.0}")?; }
        if let Some(hdg) = self.heading() { write!( f, ", hdg: {hdg:.0}")?; }
        if let Some(vr) = self.vertical_rate { write!( f, ", vr: {:.0}", vr.get::<foot_per_minute>())?; }
        if let Some(sq) = &self.squawk { write!( f, ", sqk: {sq}")?; }
        if !self.enrichment.is_unknown() { write!( f, ", ac: \"{}\"", self.enrichment.label())?; }
        write!( f, ", n: {}, time: {})", self.n_reports, self.last_update_date)
    }
}

/// rendering opacity for a track of the given age: 1.0 while more than `fade_window` is left before
/// it expires, then linear down to `floor`. Never returns less than `floor`
pub fn fade_weight (age: Duration, display_duration: Duration, fade_window: Duration, floor: f32)->f32 {
    let floor = floor.clamp( 0.0, 1.0);
    let remaining = display_duration.saturating_sub( age);

    if remaining > fade_window {
        1.0
    } else if fade_window.is_zero() {
        floor
    } else {
        let w = (remaining.as_secs_f64() / fade_window.as_secs_f64()) as f32;
        floor + (1.0 - floor) * w
    }
}

/// a point-in-time copy of a track together with its fade weight at that time
#[derive(Debug,Clone)]
pub struct TrackSnapshot {
    pub track: Track,
    pub fade: f32,
}
