// Copyright 2026 The Jujutsu Authors
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

//! Epoch-second timestamps. Internal comparisons use this type directly;
//! emission always goes out as UTC epoch seconds (§5).

use std::fmt;
use std::ops::Add;

/// Seconds since the Unix epoch, UTC. `Ord` makes commit-time comparisons and
/// the aggregation gap heuristic (§4.2) direct integer arithmetic.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_epoch_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn epoch_seconds(self) -> i64 {
        self.0
    }

    /// Gap in seconds between two timestamps, always non-negative.
    pub fn gap(self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, seconds: u64) -> Timestamp {
        Timestamp(self.0 + seconds as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_is_symmetric() {
        let a = Timestamp::from_epoch_seconds(100);
        let b = Timestamp::from_epoch_seconds(111);
        assert_eq!(a.gap(b), 11);
        assert_eq!(b.gap(a), 11);
    }

    #[test]
    fn add_seconds_seeds_head_only_timestamps() {
        let head = Timestamp::from_epoch_seconds(1_000);
        assert_eq!((head + 1).epoch_seconds(), 1_001);
    }
}
