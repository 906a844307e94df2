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

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::DateTime;
use pretty_assertions::assert_eq;
use strata_lib::byte_index::HashingByteIndex;
use strata_lib::clock::Clock;
use strata_lib::clock::Epoch;
use strata_lib::clock::Timestamp;
use strata_lib::clock::WallClock;
use strata_lib::engine;
use strata_lib::repo::MemoryRepo;
use testutils::area_of;
use testutils::new_handler;
use testutils::tags_of;

/// A clock pinned to a hand-built epoch, stepping one millisecond per call.
#[derive(Debug)]
struct EpochClock {
    epoch: Arc<Epoch>,
    next_nanos: Mutex<i64>,
}

impl EpochClock {
    fn new(epoch_millis: i64, uncertainty: Duration) -> Self {
        let instant = DateTime::from_timestamp_millis(epoch_millis).unwrap();
        Self {
            epoch: Arc::new(Epoch::new(instant, uncertainty)),
            next_nanos: Mutex::new(0),
        }
    }
}

impl Clock for EpochClock {
    fn now(&self) -> Timestamp {
        let mut next_nanos = self.next_nanos.lock().unwrap();
        *next_nanos += 1_000_000;
        Timestamp::Monotonic {
            epoch: self.epoch.clone(),
            nanos: *next_nanos,
        }
    }
}

#[test]
fn test_optimize_rebases_onto_the_narrowest_epoch() {
    let mut repo = MemoryRepo::new();
    let index = HashingByteIndex::new();
    let wide = EpochClock::new(1_000_000, Duration::from_millis(10));
    let narrow = EpochClock::new(2_000_000, Duration::from_millis(1));

    let first = engine::commit_dangling(
        &mut repo,
        &area_of(&[("/a", "1")]),
        "first",
        tags_of(&[]),
        &wide,
        &index,
        None,
        vec![],
    )
    .unwrap();
    let second = engine::commit_dangling(
        &mut repo,
        &area_of(&[("/a", "2")]),
        "second",
        tags_of(&[]),
        &narrow,
        &index,
        Some(first.clone()),
        vec![],
    )
    .unwrap();

    let instants_before = [
        first.timestamp().instant(),
        second.timestamp().instant(),
    ];
    engine::optimize_timestamps(&repo);

    for commit in [&first, &second] {
        let timestamp = commit.timestamp();
        assert!(Arc::ptr_eq(timestamp.epoch().unwrap(), &narrow.epoch));
    }
    assert_eq!(
        [
            first.timestamp().instant(),
            second.timestamp().instant(),
        ],
        instants_before
    );
}

#[test]
fn test_optimize_ignores_plain_instants() {
    let mut repo = MemoryRepo::new();
    let index = HashingByteIndex::new();
    let commit = engine::commit_dangling(
        &mut repo,
        &area_of(&[("/a", "1")]),
        "wall",
        tags_of(&[]),
        &WallClock,
        &index,
        None,
        vec![],
    )
    .unwrap();

    let before = commit.timestamp();
    engine::optimize_timestamps(&repo);
    assert_eq!(commit.timestamp(), before);
    assert!(commit.timestamp().epoch().is_none());
}

#[test]
fn test_optimize_through_the_handler_keeps_order_and_instants() {
    let mut handler = new_handler();
    let first = handler.commit_to_branch(&area_of(&[("/a", "1")]), "master", "1", tags_of(&[]));
    let second = handler.commit_to_branch(&area_of(&[("/a", "2")]), "master", "2", tags_of(&[]));

    let before = [first.timestamp(), second.timestamp()];
    handler.optimize_timestamps();

    assert_eq!(first.timestamp(), before[0]);
    assert_eq!(second.timestamp(), before[1]);
    assert!(first.timestamp() < second.timestamp());
}

#[test]
fn test_optimizing_an_empty_repo_is_a_no_op() {
    let repo = MemoryRepo::new();
    engine::optimize_timestamps(&repo);
    assert!(repo.all_commits().is_empty());
}
