// Copyright 2022-2023 The Strata Authors
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

//! Stateless repo algorithms: snapshotting, commit placement, checkout,
//! ancestry, timestamp optimization.
//!
//! Everything here is a pure function of its arguments; the stateful
//! [`RepoHandler`](crate::handler::RepoHandler) façade owns the repo and the
//! collaborators and delegates to these.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::area::ContentArea;
use crate::area::SnapshotArea;
use crate::area::StringArea;
use crate::byte_index::ByteIndex;
use crate::clock::Clock;
use crate::commit::Commit;
use crate::commit::CommitKey;
use crate::commit::CommitRef;
use crate::commit::MalformedParentsError;
use crate::content::ContentFactory;
use crate::repo::MemoryRepo;
use crate::repo::walk_ancestors;

/// Builds a commit from `area`: reads the clock once, passes every content's
/// byte form through the interning index, and stores the canonical bytes per
/// path in a fresh snapshot. Placement into a repo is a separate step.
pub fn construct_commit(
    area: &ContentArea,
    message: &str,
    tags: StringArea,
    clock: &dyn Clock,
    index: &dyn ByteIndex,
    first_parent: Option<CommitRef>,
    other_parents: Vec<CommitRef>,
) -> Result<CommitRef, MalformedParentsError> {
    let timestamp = clock.now();
    let mut snapshot = SnapshotArea::new();
    for (path, content) in area.iter() {
        snapshot.put(path, index.intern(&content.to_bytes()));
    }
    let commit = Commit::new(timestamp, message, snapshot, tags, first_parent, other_parents)?;
    Ok(Arc::new(commit))
}

/// Commits `area` without touching any branch: the new commit enters the
/// dangling set and every named parent leaves it.
#[instrument(skip_all, fields(message = %message))]
pub fn commit_dangling(
    repo: &mut MemoryRepo,
    area: &ContentArea,
    message: &str,
    tags: StringArea,
    clock: &dyn Clock,
    index: &dyn ByteIndex,
    first_parent: Option<CommitRef>,
    other_parents: Vec<CommitRef>,
) -> Result<CommitRef, MalformedParentsError> {
    let commit = construct_commit(
        area,
        message,
        tags,
        clock,
        index,
        first_parent,
        other_parents,
    )?;
    repo.add_dangling(&commit);
    let parents: Vec<_> = commit.parents().cloned().collect();
    for parent in &parents {
        repo.remove_dangling(parent);
    }
    Ok(commit)
}

/// Commits `area` to the named branch. An existing tip becomes the first
/// parent and leaves the dangling set; the branch tip moves to the new
/// commit, which never enters the dangling set. `extra_parents` extends the
/// parent list (used by the merge operations) and requires an existing tip.
#[instrument(skip_all, fields(branch = %branch, message = %message))]
pub fn commit_to_branch(
    repo: &mut MemoryRepo,
    area: &ContentArea,
    branch: &str,
    message: &str,
    tags: StringArea,
    clock: &dyn Clock,
    index: &dyn ByteIndex,
    extra_parents: Vec<CommitRef>,
) -> Result<CommitRef, MalformedParentsError> {
    let first_parent = repo.branch_tip(branch).cloned();
    let commit = construct_commit(
        area,
        message,
        tags,
        clock,
        index,
        first_parent.clone(),
        extra_parents,
    )?;
    if let Some(predecessor) = &first_parent {
        // Idempotent: a branch tip is normally not dangling anyway.
        repo.remove_dangling(predecessor);
    }
    for parent in commit.other_parents().to_vec() {
        repo.remove_dangling(&parent);
    }
    repo.set_branch_tip(branch, commit.clone());
    Ok(commit)
}

/// Materializes the snapshot of `commit` into a fresh area, one new content
/// instance per entry. The commit is never mutated.
pub fn checkout(commit: &Commit, factory: &ContentFactory) -> ContentArea {
    let mut area = ContentArea::new();
    checkout_into(commit, &mut area, factory);
    area
}

/// Populates `area` in place from the snapshot of `commit`, without clearing
/// first. Callers clear beforehand if they want a clean slate.
pub fn checkout_into(commit: &Commit, area: &mut ContentArea, factory: &ContentFactory) {
    for (path, bytes) in commit.snapshot().iter() {
        area.put(path, factory(bytes));
    }
}

/// Finds the common ancestor of `destination` and `source`: collects every
/// ancestor of `destination` (itself included, first parent before other
/// parents, guarded by an identity set against malformed cycles), then walks
/// the ancestors of `source` in the same order and returns the first one
/// found in that set. Where several minimal ancestors exist, the first
/// encountered wins.
pub fn find_common_ancestor(destination: &CommitRef, source: &CommitRef) -> Option<CommitRef> {
    let destination_ancestors: HashSet<CommitKey> = walk_ancestors([destination.clone()])
        .iter()
        .map(CommitKey::of)
        .collect();
    walk_ancestors([source.clone()])
        .into_iter()
        .find(|commit| destination_ancestors.contains(&CommitKey::of(commit)))
}

/// Re-bases every monotonic commit timestamp in `repo` onto the reachable
/// epoch with the narrowest uncertainty window, preserving each reconstructed
/// instant. Commit ordering and content never change.
#[instrument(skip_all)]
pub fn optimize_timestamps(repo: &MemoryRepo) {
    let commits = repo.all_commits();
    let best_epoch = commits
        .iter()
        .filter_map(|commit| {
            let timestamp = commit.timestamp();
            timestamp.epoch().cloned()
        })
        .min_by_key(|epoch| epoch.uncertainty());
    let Some(best_epoch) = best_epoch else {
        return;
    };
    for commit in &commits {
        let timestamp = commit.timestamp();
        if timestamp.epoch().is_some() {
            commit.set_timestamp(timestamp.rebase(&best_epoch));
        }
    }
}
