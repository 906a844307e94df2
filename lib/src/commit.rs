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

//! Immutable commit nodes of the history graph.

use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::Mutex;

use smallvec::SmallVec;
use thiserror::Error;

use crate::area::SnapshotArea;
use crate::area::StringArea;
use crate::clock::Timestamp;

/// Shared handle to a commit. Commits are referenced, never copied; graph
/// bookkeeping identifies a commit by this handle's pointer identity.
pub type CommitRef = Arc<Commit>;

/// The parent list named additional parents without a first parent.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("A commit with additional parents requires a first parent")]
pub struct MalformedParentsError;

/// A node in the commit graph: a snapshot of interned bytes plus metadata
/// and parent links.
///
/// Everything is fixed at construction except the timestamp, which may be
/// re-based onto another epoch without changing the instant it denotes.
pub struct Commit {
    timestamp: Mutex<Timestamp>,
    message: String,
    snapshot: SnapshotArea,
    first_parent: Option<CommitRef>,
    other_parents: SmallVec<[CommitRef; 2]>,
    tags: StringArea,
}

impl Commit {
    /// Assembles a commit. Additional parents are only allowed when a first
    /// parent is present.
    pub fn new(
        timestamp: Timestamp,
        message: impl Into<String>,
        snapshot: SnapshotArea,
        tags: StringArea,
        first_parent: Option<CommitRef>,
        other_parents: impl IntoIterator<Item = CommitRef>,
    ) -> Result<Self, MalformedParentsError> {
        let other_parents: SmallVec<[CommitRef; 2]> = other_parents.into_iter().collect();
        if first_parent.is_none() && !other_parents.is_empty() {
            return Err(MalformedParentsError);
        }
        Ok(Self {
            timestamp: Mutex::new(timestamp),
            message: message.into(),
            snapshot,
            first_parent,
            other_parents,
            tags,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp.lock().unwrap().clone()
    }

    /// Replaces the timestamp. Restricted to re-basing: the caller preserves
    /// the denoted instant.
    pub(crate) fn set_timestamp(&self, timestamp: Timestamp) {
        *self.timestamp.lock().unwrap() = timestamp;
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The path-to-interned-bytes snapshot this commit owns.
    pub fn snapshot(&self) -> &SnapshotArea {
        &self.snapshot
    }

    pub fn first_parent(&self) -> Option<&CommitRef> {
        self.first_parent.as_ref()
    }

    pub fn other_parents(&self) -> &[CommitRef] {
        &self.other_parents
    }

    /// All parents in order: the first parent if present, then the others.
    pub fn parents(&self) -> impl Iterator<Item = &CommitRef> {
        self.first_parent.iter().chain(self.other_parents.iter())
    }

    /// Free-form commit metadata (author, committer, description, ...).
    pub fn tags(&self) -> &StringArea {
        &self.tags
    }
}

impl Debug for Commit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("message", &self.message)
            .field("parents", &self.parents().count())
            .finish()
    }
}

/// Pointer-identity key for hash sets and maps over commits.
///
/// Two keys are equal iff they refer to the very same commit allocation;
/// content plays no part. This is what the dangling-tip bookkeeping, the
/// ancestor sets, and the cycle guards key on.
#[derive(Clone)]
pub struct CommitKey(CommitRef);

impl CommitKey {
    pub fn of(commit: &CommitRef) -> Self {
        Self(commit.clone())
    }

    pub fn commit(&self) -> &CommitRef {
        &self.0
    }
}

impl PartialEq for CommitKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CommitKey {}

impl Hash for CommitKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl Debug for CommitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommitKey").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock as _;
    use crate::clock::MonotonicClock;

    fn new_commit(
        message: &str,
        first_parent: Option<CommitRef>,
        other_parents: Vec<CommitRef>,
    ) -> Result<Commit, MalformedParentsError> {
        let clock = MonotonicClock::new();
        Commit::new(
            clock.now(),
            message,
            SnapshotArea::new(),
            StringArea::new(),
            first_parent,
            other_parents,
        )
    }

    #[test]
    fn test_parent_enumeration_is_consistent() {
        let root = Arc::new(new_commit("root", None, vec![]).unwrap());
        assert_eq!(root.parents().count(), 0);

        let child = Arc::new(new_commit("child", Some(root.clone()), vec![]).unwrap());
        assert_eq!(child.parents().count(), 1);

        let other = Arc::new(new_commit("other", None, vec![]).unwrap());
        let merge = new_commit("merge", Some(child.clone()), vec![other.clone()]).unwrap();
        let parents: Vec<_> = merge.parents().cloned().collect();
        assert_eq!(parents.len(), 2);
        assert!(Arc::ptr_eq(&parents[0], &child));
        assert!(Arc::ptr_eq(&parents[1], &other));
    }

    #[test]
    fn test_other_parents_without_first_parent_is_malformed() {
        let root = Arc::new(new_commit("root", None, vec![]).unwrap());
        assert_eq!(
            new_commit("bad", None, vec![root]).unwrap_err(),
            MalformedParentsError
        );
    }

    #[test]
    fn test_commit_key_is_pointer_identity() {
        let a = Arc::new(new_commit("same message", None, vec![]).unwrap());
        let b = Arc::new(new_commit("same message", None, vec![]).unwrap());
        assert_eq!(CommitKey::of(&a), CommitKey::of(&a.clone()));
        assert_ne!(CommitKey::of(&a), CommitKey::of(&b));
    }
}
