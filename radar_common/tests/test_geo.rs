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
#![allow(unused)]

use radar_common::geo::*;

// run with "cargo test test_screen -- --nocapture"

#[test]
fn test_screen_center() {
    let screen = ScreenGeometry::new( 800, 480);
    for range in [5.0, 50.0, 250.0] {
        let xy = to_screen_xy( 51.5, -0.1, range, 51.5, -0.1, &screen);
        println!("reference point at range {range}km -> {xy:?}");
        assert_eq!( xy, (400,240));
    }

    let screen = ScreenGeometry::new( 800, 480).with_center( 300, 200).with_diameter( 400);
    let xy = to_screen_xy( 37.0, -122.0, 100.0, 37.0, -122.0, &screen);
    println!("reference point with explicit center -> {xy:?}");
    assert_eq!( xy, (300,200));
}

#[test]
fn test_screen_offsets() {
    let screen = ScreenGeometry::new( 800, 480);
    // 50km range over 800px -> 0.125 km/px

    let (x,y) = to_screen_xy( 0.1, 0.0, 50.0, 0.0, 0.0, &screen);
    println!("0.1deg north of equator reference -> ({x},{y})");
    assert_eq!( (x,y), (400, 240 - 88)); // 11.1km / 0.125 = 88.8 -> truncated

    let (x,y) = to_screen_xy( 0.0, 0.1, 50.0, 0.0, 0.0, &screen);
    println!("0.1deg east of equator reference -> ({x},{y})");
    assert_eq!( (x,y), (400 + 88, 240));

    let (x,y) = to_screen_xy( -0.1, -0.1, 50.0, 0.0, 0.0, &screen);
    println!("0.1deg south-west of equator reference -> ({x},{y})");
    assert_eq!( (x,y), (400 - 88, 240 + 88)); // truncation is towards zero on both sides

    // longitude degrees shrink with cos(ref_lat)
    let (x,_) = to_screen_xy( 60.0, 0.1, 50.0, 60.0, 0.0, &screen);
    println!("0.1deg east at 60N -> x={x}");
    assert_eq!( x, 400 + 44); // 5.55km / 0.125 = 44.4
}

#[test]
fn test_range() {
    assert!( is_within_range( 51.6, -0.1, 50.0, 51.5, -0.1));
    assert!( !is_within_range( 52.0, -0.1, 50.0, 51.5, -0.1));
}

#[test]
fn test_bearing() {
    let north = heading( 0.0, 0.0, 1.0, 0.0);
    let east = heading( 0.0, 0.0, 0.0, 1.0);
    let west = heading( 0.0, 0.0, 0.0, -1.0);
    println!("north: {north}, east: {east}, west: {west}");

    assert!( north.abs() < 1e-9);
    assert!( (east + 90.0).abs() < 1e-9);
    assert!( (west - 90.0).abs() < 1e-9);

    assert!( (compass_bearing( 0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
    assert!( (compass_bearing( 0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-9);
    assert!( (compass_bearing( 1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);

    // degenerate case has to be deterministic and must not panic
    let same = heading( 37.0, -122.0, 37.0, -122.0);
    println!("identical points: {same}");
    assert_eq!( same, heading( 37.0, -122.0, 37.0, -122.0));
    assert!( same.is_finite());

    // antipodal points still give a finite result
    assert!( initial_bearing( 0.0, 0.0, 0.0, 180.0).is_finite());
}

#[test]
fn test_distance() {
    let d = distance_km( 0.0, 0.0, 0.0, 1.0);
    println!("1deg along equator: {d}km");
    assert_eq!( d, 111.2);

    let d = distance_km( 51.5074, -0.1278, 48.8566, 2.3522);
    println!("London - Paris: {d}km");
    assert!( d > 340.0 && d < 347.0);

    assert_eq!( distance_km( 37.0, -122.0, 37.0, -122.0), 0.0);
}

#[test]
fn test_normalize() {
    assert_eq!( normalize_360( -90.0), 270.0);
    assert_eq!( normalize_360( 370.0), 10.0);
    assert_eq!( normalize_360( 0.0), 0.0);
}
