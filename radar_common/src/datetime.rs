/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
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

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Serialize,Deserialize,Serializer,Deserializer};
use std::time::Duration;
use std::fmt;
use parse_duration::parse;

/// wall clock time in milliseconds since the Unix epoch. We use this for everything that is shown
/// to an operator or exported, whereas ordering and expiry decisions are based on monotonic `Instant`s
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub fn now ()->Self { EpochMillis( Utc::now().timestamp_millis()) }

    pub fn new(millis:i64)->Self { EpochMillis(millis) }

    pub fn from_secs(secs: i64)->Self { EpochMillis(secs*1000) }

    pub fn millis(&self)->i64 { self.0 }

    /// the DateTime<Utc> for this value, or None if it is outside of the chrono range
    pub fn to_datetime(&self)->Option<DateTime<Utc>> { DateTime::<Utc>::from_timestamp_millis(self.0) }

    /// local "HH:MM:SS" time of day, which is what the operator display shows as 'spotted at'
    pub fn local_time_of_day(&self)->String {
        match self.to_datetime() {
            Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
            None => "-".to_string()
        }
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "EpochMillis({})", self.0)
        }
    }
}

impl<Tz> From<DateTime<Tz>> for EpochMillis where Tz: TimeZone {
    fn from (date: DateTime<Tz>)->Self { EpochMillis(date.timestamp_millis()) }
}

#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }

//--- support for serde

/// deserialize a Duration from a human readable string such as "3s", "500ms" or "5min"
pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> Result<S::Ok, S::Error>  {
    let dfm = format!("{:?}", dur);
    s.serialize_str(&dfm)
}
