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

//! flat-earth projection of geographic positions onto a radar screen, plus the spherical
//! bearing/distance functions used to annotate tracks.
//!
//! The projection is an equirectangular approximation around a reference point. It is only
//! valid for ranges of up to a few hundred km, which is all a receiver can see anyways.

use serde::{Serialize,Deserialize};
use crate::{sin,cos,asin,atan2,sqrt,sin2,deg,rad,round_to};

/// approximate km per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEG: f64 = 111.0;

/// mean earth radius used for haversine distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// pixel geometry of the display surface. `center` and `diameter` default to the middle of the
/// screen and the screen width respectively
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    pub center: Option<(i32,i32)>,
    pub diameter: Option<u32>,
}

impl ScreenGeometry {
    pub fn new (width: u32, height: u32)->Self {
        ScreenGeometry { width, height, center: None, diameter: None }
    }

    pub fn with_center (mut self, x: i32, y: i32)->Self {
        self.center = Some((x,y));
        self
    }

    pub fn with_diameter (mut self, diameter: u32)->Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn center (&self)->(i32,i32) {
        self.center.unwrap_or( ((self.width / 2) as i32, (self.height / 2) as i32))
    }

    /// number of pixels that correspond to twice the display range
    pub fn reference_diameter (&self)->u32 {
        self.diameter.unwrap_or( self.width)
    }

    pub fn km_per_pixel (&self, range_km: f64)->f64 {
        (range_km * 2.0) / self.reference_diameter().max(1) as f64
    }
}

/// east/north offset in km of a position relative to the reference point
pub fn local_offset_km (lat: f64, lon: f64, ref_lat: f64, ref_lon: f64)->(f64,f64) {
    let dx = (lon - ref_lon) * KM_PER_DEG * cos( rad(ref_lat));
    let dy = (lat - ref_lat) * KM_PER_DEG;
    (dx,dy)
}

/// map a geographic position to integer screen coordinates. Offsets are truncated towards zero
/// and y grows downwards, i.e. north is up. The reference point always maps to the screen center
pub fn to_screen_xy (lat: f64, lon: f64, range_km: f64, ref_lat: f64, ref_lon: f64, screen: &ScreenGeometry)->(i32,i32) {
    let (cx,cy) = screen.center();
    let km_per_px = screen.km_per_pixel( range_km);
    let (dx,dy) = local_offset_km( lat, lon, ref_lat, ref_lon);

    let x = cx + (dx / km_per_px) as i32;
    let y = cy - (dy / km_per_px) as i32;
    (x,y)
}

/// is the projected point inside of the radar circle
pub fn is_within_range (lat: f64, lon: f64, range_km: f64, ref_lat: f64, ref_lon: f64)->bool {
    let (dx,dy) = local_offset_km( lat, lon, ref_lat, ref_lon);
    sqrt( dx*dx + dy*dy) <= range_km
}

/// initial great circle bearing from the first to the second point, in degrees within [-180,180].
/// Identical points yield atan2(0,0), i.e. 0
pub fn initial_bearing (lat1: f64, lon1: f64, lat2: f64, lon2: f64)->f64 {
    let phi1 = rad(lat1);
    let phi2 = rad(lat2);
    let dlon = rad(lon2 - lon1);

    let y = sin(dlon) * cos(phi2);
    let x = cos(phi1)*sin(phi2) - sin(phi1)*cos(phi2)*cos(dlon);
    deg( atan2(y,x))
}

/// heading of a track between two observed fixes in screen convention: the sign-negated
/// initial bearing, which is what the rotation of the track symbol expects
pub fn heading (prev_lat: f64, prev_lon: f64, lat: f64, lon: f64)->f64 {
    -initial_bearing( prev_lat, prev_lon, lat, lon)
}

/// initial bearing as compass direction within [0,360)
pub fn compass_bearing (lat1: f64, lon1: f64, lat2: f64, lon2: f64)->f64 {
    normalize_360( initial_bearing( lat1, lon1, lat2, lon2))
}

/// haversine distance in km, rounded to one decimal
pub fn distance_km (lat1: f64, lon1: f64, lat2: f64, lon2: f64)->f64 {
    let dlat = rad(lat2 - lat1);
    let dlon = rad(lon2 - lon1);

    let a = sin2(dlat/2.0) + cos(rad(lat1)) * cos(rad(lat2)) * sin2(dlon/2.0);
    let c = 2.0 * asin( sqrt(a).min(1.0));
    round_to( EARTH_RADIUS_KM * c, 1)
}

#[inline]
pub fn normalize_360 (d: f64)->f64 {
    let r = d % 360.0;
    if r < 0.0 { r + 360.0 } else { r }
}
