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

use std::time::{Duration,Instant};
use radar_common::datetime::secs;
use radar_track::{breaker::*, config::BreakerConfig};

fn breaker ()->CircuitBreaker {
    CircuitBreaker::new( BreakerConfig { failure_threshold: 5, window: secs(120), cooldown: secs(300) })
}

fn open_at (b: &mut CircuitBreaker, t: Instant) {
    for _ in 0..5 {
        let admission = b.try_acquire( t);
        b.record_failure( admission, t);
    }
}

// run with "cargo test test_breaker -- --nocapture"

#[test]
fn test_open_after_threshold() {
    let mut b = breaker();
    let t0 = Instant::now();

    for i in 0..4 {
        assert_eq!( b.try_acquire( t0 + secs(i)), Admission::Allowed);
        assert_eq!( b.record_failure( Admission::Allowed, t0 + secs(i)), Transition::None);
    }
    assert_eq!( b.n_failures(), 4);
    assert_eq!( b.state(), BreakerState::Closed);

    let transition = b.record_failure( Admission::Allowed, t0 + secs(4));
    println!("5th failure -> {transition:?}");
    assert_eq!( transition, Transition::Opened { until: t0 + secs(304) });
    assert_eq!( b.state(), BreakerState::Open { until: t0 + secs(304) });

    // fast fail until the cooldown has elapsed
    assert_eq!( b.try_acquire( t0 + secs(5)), Admission::Rejected);
    assert_eq!( b.try_acquire( t0 + secs(303)), Admission::Rejected);

    // one probe after cooldown
    assert_eq!( b.try_acquire( t0 + secs(304)), Admission::Probe);
    assert_eq!( b.state(), BreakerState::HalfOpen);
    assert_eq!( b.try_acquire( t0 + secs(305)), Admission::Rejected);

    assert_eq!( b.record_success( Admission::Probe), Transition::Closed);
    assert_eq!( b.state(), BreakerState::Closed);
    assert_eq!( b.try_acquire( t0 + secs(306)), Admission::Allowed);
    assert_eq!( b.n_failures(), 0);
}

#[test]
fn test_success_resets() {
    let mut b = breaker();
    let t0 = Instant::now();

    for i in 0..4 { b.record_failure( Admission::Allowed, t0 + secs(i)); }
    assert_eq!( b.record_success( Admission::Allowed), Transition::None);
    assert_eq!( b.n_failures(), 0);

    for i in 4..8 { b.record_failure( Admission::Allowed, t0 + secs(i)); }
    assert_eq!( b.state(), BreakerState::Closed);
}

#[test]
fn test_sliding_window() {
    let mut b = breaker();
    let t0 = Instant::now();

    // 5 failures, but never more than 3 within 120s
    for i in 0..5 {
        assert_eq!( b.record_failure( Admission::Allowed, t0 + secs(i*50)), Transition::None);
    }
    println!("failures in window: {}", b.n_failures());
    assert_eq!( b.n_failures(), 3);
    assert_eq!( b.state(), BreakerState::Closed);
}

#[test]
fn test_half_open_failure() {
    let mut b = breaker();
    let t0 = Instant::now();

    open_at( &mut b, t0);
    assert_eq!( b.try_acquire( t0 + secs(300)), Admission::Probe);

    // failed probe re-opens for another cooldown
    let transition = b.record_failure( Admission::Probe, t0 + secs(301));
    assert_eq!( transition, Transition::Opened { until: t0 + secs(601) });
    assert_eq!( b.try_acquire( t0 + secs(400)), Admission::Rejected);
    assert_eq!( b.try_acquire( t0 + secs(601)), Admission::Probe);
}

#[test]
fn test_neutral_probe() {
    let mut b = breaker();
    let t0 = Instant::now();

    open_at( &mut b, t0);
    assert_eq!( b.try_acquire( t0 + secs(300)), Admission::Probe);

    // a 'not found' neither closes nor re-opens, but allows the next probe
    b.record_neutral( Admission::Probe);
    assert_eq!( b.state(), BreakerState::HalfOpen);
    assert_eq!( b.try_acquire( t0 + secs(301)), Admission::Probe);
}

#[test]
fn test_late_results_ignored_while_half_open() {
    let mut b = breaker();
    let t0 = Instant::now();

    // a slow call admitted while still closed
    assert_eq!( b.try_acquire( t0), Admission::Allowed);

    open_at( &mut b, t0);
    assert_eq!( b.try_acquire( t0 + secs(300)), Admission::Probe);

    // the slow call finishes while the probe is still running
    assert_eq!( b.record_failure( Admission::Allowed, t0 + secs(301)), Transition::None);
    b.record_neutral( Admission::Allowed);
    assert_eq!( b.record_success( Admission::Allowed), Transition::None);

    assert_eq!( b.state(), BreakerState::HalfOpen);
    assert_eq!( b.try_acquire( t0 + secs(302)), Admission::Rejected); // probe slot still taken

    assert_eq!( b.record_success( Admission::Probe), Transition::Closed);
}

#[test]
fn test_late_failure_while_open() {
    let mut b = breaker();
    let t0 = Instant::now();

    open_at( &mut b, t0);
    let state = b.state();

    assert_eq!( b.record_failure( Admission::Allowed, t0 + secs(10)), Transition::None);
    assert_eq!( b.state(), state);
    assert_eq!( b.try_acquire( t0 + secs(10)), Admission::Rejected);
}
