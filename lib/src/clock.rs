// Copyright 2023 The Strata Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Commit timestamps: wall-clock instants and monotonic epoch-based samples.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;

/// A wall-clock instant plus the uncertainty window of the reading that
/// produced it. Monotonic timestamps measure their offset from an epoch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Epoch {
    instant: DateTime<Utc>,
    uncertainty: Duration,
}

impl Epoch {
    pub fn new(instant: DateTime<Utc>, uncertainty: Duration) -> Self {
        Self {
            instant,
            uncertainty,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Width of the window within which the true instant is known to lie.
    pub fn uncertainty(&self) -> Duration {
        self.uncertainty
    }
}

/// When a commit was made: either a plain instant, or a nanosecond offset
/// from a shared [`Epoch`]. Ordering and equality are by the reconstructed
/// absolute instant.
#[derive(Clone, Debug)]
pub enum Timestamp {
    Instant(DateTime<Utc>),
    Monotonic { epoch: Arc<Epoch>, nanos: i64 },
}

impl Timestamp {
    /// The absolute instant this timestamp denotes.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::Instant(instant) => *instant,
            Self::Monotonic { epoch, nanos } => {
                epoch.instant() + chrono::Duration::nanoseconds(*nanos)
            }
        }
    }

    /// The epoch this timestamp is based on, for monotonic samples.
    pub fn epoch(&self) -> Option<&Arc<Epoch>> {
        match self {
            Self::Instant(_) => None,
            Self::Monotonic { epoch, .. } => Some(epoch),
        }
    }

    /// Re-expresses a monotonic timestamp against `epoch`, preserving the
    /// reconstructed instant exactly. Plain instants are returned unchanged,
    /// as is a sample whose offset would not fit the new epoch.
    pub fn rebase(&self, epoch: &Arc<Epoch>) -> Self {
        match self {
            Self::Instant(_) => self.clone(),
            Self::Monotonic { .. } => {
                let offset = self.instant() - epoch.instant();
                match offset.num_nanoseconds() {
                    Some(nanos) => Self::Monotonic {
                        epoch: epoch.clone(),
                        nanos,
                    },
                    None => self.clone(),
                }
            }
        }
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant() == other.instant()
    }
}

impl Eq for Timestamp {}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Source of commit timestamps.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Timestamp;
}

/// A [`Clock`] reading the system wall clock directly.
#[derive(Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        Timestamp::Instant(Utc::now())
    }
}

/// The default [`Clock`]: samples the wall clock once at construction to fix
/// an epoch, then produces strictly increasing monotonic offsets from it.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Arc<Epoch>,
    origin: Instant,
    last_nanos: Mutex<i64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        // Bracket the monotonic origin with two wall readings; the true
        // correspondence lies somewhere inside that window.
        let before = Utc::now();
        let origin = Instant::now();
        let after = Utc::now();
        let spread = after - before;
        let epoch = Epoch::new(
            before + spread / 2,
            spread.to_std().unwrap_or(Duration::ZERO),
        );
        Self {
            epoch: Arc::new(epoch),
            origin,
            last_nanos: Mutex::new(-1),
        }
    }

    pub fn epoch(&self) -> &Arc<Epoch> {
        &self.epoch
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed().as_nanos().try_into().unwrap_or(i64::MAX);
        let mut last_nanos = self.last_nanos.lock().unwrap();
        let nanos = elapsed.max(*last_nanos + 1);
        *last_nanos = nanos;
        Timestamp::Monotonic {
            epoch: self.epoch.clone(),
            nanos,
        }
    }
}
