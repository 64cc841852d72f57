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

//! failure circuit breaker for the remote registry lookups

use std::{collections::VecDeque, time::Instant};
use crate::config::BreakerConfig;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum BreakerState {
    Closed,
    Open { until: Instant },
    HalfOpen, // cooldown has elapsed, one probe call is allowed through
}

/// what a caller is allowed to do
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Admission {
    Allowed,
    Probe, // the single call that decides if a half-open breaker closes again
    Rejected,
}

/// state transitions reported back to the caller so that it can log/publish them
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Transition {
    None,
    Opened { until: Instant },
    Closed,
}

/// counts failures within a sliding window. Reaching the threshold opens the breaker for the cooldown
/// period, during which all calls are rejected without I/O. After the cooldown one probe is admitted -
/// a success closes the breaker, a failure re-opens it. Any success clears the failure history.
///
/// Callers hand the [`Admission`] they got back into `record_*`. Only the outcome of the probe call
/// can change the state of a half-open breaker; late results of calls admitted before the breaker
/// opened are ignored. Time is always passed in explicitly
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    failures: VecDeque<Instant>,
    state: BreakerState,
    probe_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new (config: BreakerConfig)->Self {
        CircuitBreaker { config, failures: VecDeque::new(), state: BreakerState::Closed, probe_in_flight: false }
    }

    pub fn state (&self)->BreakerState { self.state }

    pub fn n_failures (&self)->usize { self.failures.len() }

    pub fn try_acquire (&mut self, now: Instant)->Admission {
        match self.state {
            BreakerState::Closed => Admission::Allowed,
            BreakerState::Open{until} => {
                if now >= until {
                    self.state = BreakerState::HalfOpen;
                    self.probe_in_flight = true;
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
            BreakerState::HalfOpen => {
                if self.probe_in_flight {
                    Admission::Rejected
                } else {
                    self.probe_in_flight = true;
                    Admission::Probe
                }
            }
        }
    }

    pub fn record_success (&mut self, admission: Admission)->Transition {
        match admission {
            Admission::Probe if self.state == BreakerState::HalfOpen => {
                self.failures.clear();
                self.probe_in_flight = false;
                self.state = BreakerState::Closed;
                Transition::Closed
            }
            Admission::Allowed if self.state == BreakerState::Closed => {
                self.failures.clear();
                Transition::None
            }
            _ => Transition::None
        }
    }

    pub fn record_failure (&mut self, admission: Admission, now: Instant)->Transition {
        match admission {
            Admission::Probe if self.state == BreakerState::HalfOpen => {
                self.probe_in_flight = false;
                self.open( now)
            }
            Admission::Allowed if self.state == BreakerState::Closed => {
                while let Some(t) = self.failures.front() {
                    if now.saturating_duration_since(*t) > self.config.window { self.failures.pop_front(); } else { break }
                }
                self.failures.push_back( now);

                if self.failures.len() >= self.config.failure_threshold.max(1) {
                    self.open( now)
                } else {
                    Transition::None
                }
            }
            _ => Transition::None
        }
    }

    /// outcome that neither proves nor disproves the health of the service (e.g. a 404). This only
    /// frees up the probe slot of a half-open breaker
    pub fn record_neutral (&mut self, admission: Admission) {
        if admission == Admission::Probe && self.state == BreakerState::HalfOpen {
            self.probe_in_flight = false;
        }
    }

    fn open (&mut self, now: Instant)->Transition {
        let until = now + self.config.cooldown;
        self.state = BreakerState::Open { until };
        self.failures.clear();
        Transition::Opened { until }
    }
}
