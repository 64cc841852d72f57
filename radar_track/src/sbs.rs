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

//! decoder for the SBS text format ("BaseStation" port 30003 output of dump1090 and similar)
//!
//! SBS as documented on http://woodair.net/SBS/Article/Barebones42_Socket_Data.htm
//!
//! Message examples:
//!  MSG,1,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,13:07:16.626,UAL814  ,,,,,,,,,,,0
//!  MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0
//!  MSG,4,111,11111,AC1FCC,111111,2016/03/11,13:07:07.777,2016/03/11,13:07:07.713,,,316,106,,,1536,,,,,0
//!
//! fields:
//!   0: message type (MSG, SEL, ID, AIR, STA, CLK)
//!   1: transmission type (MSG only: 1-8, 3: ES Airborne Position Message)
//!   4: ICAO 24 bit id (mode S transponder code)
//!  10: callsign
//!  11: mode-C altitude (relative to 1013.2mb (Flight Level), *not* AMSL)
//!  12: ground speed
//!  13: track (from vx,vy, *not* heading)
//!  14: latitude
//!  15: longitude
//!  16: vertical rate (ft/min - 64ft resolution)
//!  17: squawk (mode-A squawk code)
//!
//! Other fields (session/aircraft/flight ids, generated/logged date and time, flags) are not used.
//! We stamp each report with our own receive time instead of parsing the (local timezone) dates.

use std::{fmt, str::FromStr, time::Instant};
use radar_common::datetime::EpochMillis;

pub const MSG_TYPE: &'static str = "MSG";
pub const MIN_FIELDS: usize = 15;

pub const TRANSMISSION_TYPE: usize = 1;
pub const ICAO24: usize = 4;
pub const CALLSIGN: usize = 10;
pub const ALTITUDE: usize = 11;
pub const GROUND_SPEED: usize = 12;
pub const TRACK: usize = 13;
pub const LATITUDE: usize = 14;
pub const LONGITUDE: usize = 15;
pub const VERTICAL_RATE: usize = 16;
pub const SQUAWK: usize = 17;

/// one decoded SBS line. Every value field is optional - a field that is empty or does not parse
/// is `None`, which is different from a parsed `0`
#[derive(Debug,Clone,PartialEq)]
pub struct RawReport {
    pub icao24: Option<String>, // upper case hex id
    pub transmission_type: Option<u8>,
    pub callsign: Option<String>,
    pub altitude: Option<i64>, // ft
    pub groundspeed: Option<f64>, // knots
    pub track: Option<f64>, // degrees
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vertical_rate: Option<i64>, // ft/min
    pub squawk: Option<String>,

    pub received: Instant, // used for ordering and expiry
    pub date: EpochMillis, // wall clock time of reception
}

impl RawReport {
    /// the (lat,lon) of this report if both coordinates are present and within range
    pub fn position (&self)->Option<(f64,f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat),Some(lon)) if is_valid_position( lat, lon) => Some((lat,lon)),
            _ => None
        }
    }

    pub fn has_position (&self)->bool { self.position().is_some() }
}

pub fn is_valid_position (lat: f64, lon: f64)->bool {
    lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
}

impl fmt::Display for RawReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "RawReport( icao24: {}", self.icao24.as_deref().unwrap_or("?"))?;
        if let Some(tt) = self.transmission_type { write!( f, ", tt: {tt}")?; }
        if let Some(cs) = &self.callsign { write!( f, ", cs: \"{cs}\"")?; }
        if let Some(alt) = self.altitude { write!( f, ", alt: {alt}")?; }
        if let Some(spd) = self.groundspeed { write!( f, ", spd: {spd:.1}")?; }
        if let Some(trk) = self.track { write!( f, ", trk: {trk:.0}")?; }
        if let Some((lat,lon)) = self.position() { write!( f, ", pos: ({lat:.5},{lon:.5})")?; }
        if let Some(vr) = self.vertical_rate { write!( f, ", vr: {vr}")?; }
        if let Some(sq) = &self.squawk { write!( f, ", sqk: {sq}")?; }
        write!( f, ", time: {})", self.date)
    }
}

/// decode a single feed line, stamped with the current time. Returns `None` if the line is not a
/// MSG record with at least [`MIN_FIELDS`] fields. Rejection is not an error - noisy feeds produce
/// plenty of those
pub fn decode (line: &str)->Option<RawReport> {
    decode_at( line, Instant::now(), EpochMillis::now())
}

pub fn decode_at (line: &str, received: Instant, date: EpochMillis)->Option<RawReport> {
    let line = line.trim_end_matches( ['\r','\n']);
    let fields: Vec<&str> = line.split(',').collect();

    if fields.len() < MIN_FIELDS || fields[0].trim() != MSG_TYPE {
        return None
    }

    Some( RawReport {
        icao24: text_field( &fields, ICAO24).map( |s| s.to_uppercase()),
        transmission_type: num_field( &fields, TRANSMISSION_TYPE),
        callsign: text_field( &fields, CALLSIGN),
        altitude: int_field( &fields, ALTITUDE),
        groundspeed: float_field( &fields, GROUND_SPEED),
        track: float_field( &fields, TRACK),
        latitude: float_field( &fields, LATITUDE),
        longitude: float_field( &fields, LONGITUDE),
        vertical_rate: int_field( &fields, VERTICAL_RATE),
        squawk: text_field( &fields, SQUAWK),
        received,
        date
    })
}

fn text_field (fields: &[&str], idx: usize)->Option<String> {
    fields.get(idx)
        .map( |s| s.trim())
        .filter( |s| !s.is_empty())
        .map( |s| s.to_string())
}

fn num_field<T: FromStr> (fields: &[&str], idx: usize)->Option<T> {
    fields.get(idx).and_then( |s| s.trim().parse::<T>().ok())
}

fn float_field (fields: &[&str], idx: usize)->Option<f64> {
    num_field::<f64>( fields, idx).filter( |v| v.is_finite())
}

// some decoders report altitudes and rates with a fractional part
fn int_field (fields: &[&str], idx: usize)->Option<i64> {
    num_field::<i64>( fields, idx).or_else( || float_field( fields, idx).map( |v| v.round() as i64))
}
