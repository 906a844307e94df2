// Copyright 2022 The Strata Authors
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

//! The in-memory commit-graph container: branches, tags, dangling tips.

use std::collections::BTreeMap;
use std::collections::HashSet;

use indexmap::IndexSet;
use thiserror::Error;
use tracing::instrument;

use crate::commit::CommitKey;
use crate::commit::CommitRef;

/// A branch or tag name did not resolve.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RefLookupError {
    #[error(r#"No such branch: "{name}""#)]
    BranchNotFound { name: String },
    #[error(r#"No such tag: "{name}""#)]
    TagNotFound { name: String },
}

/// Holds one entity's history: named branch tips, named tags, and the
/// insertion-ordered set of dangling commits.
///
/// Invariant: a commit sits in the dangling set iff no branch or tag points
/// at it and no tracked commit has it as a parent. Every mutation on this
/// type and on the placement algorithms restores that invariant before
/// returning.
///
/// A repo is not thread-safe; callers serialize mutating operations.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    branch_tips: BTreeMap<String, CommitRef>,
    tags: BTreeMap<String, CommitRef>,
    dangling: IndexSet<CommitKey>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch_tip(&self, name: &str) -> Option<&CommitRef> {
        self.branch_tips.get(name)
    }

    pub fn require_branch_tip(&self, name: &str) -> Result<&CommitRef, RefLookupError> {
        self.branch_tips
            .get(name)
            .ok_or_else(|| RefLookupError::BranchNotFound {
                name: name.to_owned(),
            })
    }

    pub fn tag_target(&self, name: &str) -> Option<&CommitRef> {
        self.tags.get(name)
    }

    pub fn require_tag_target(&self, name: &str) -> Result<&CommitRef, RefLookupError> {
        self.tags.get(name).ok_or_else(|| RefLookupError::TagNotFound {
            name: name.to_owned(),
        })
    }

    /// Branch names in lexicographic order.
    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branch_tips.keys().map(String::as_str)
    }

    /// Tag names in lexicographic order.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Points the named branch at `commit`, creating the branch on first
    /// reference. The new tip leaves the dangling set.
    #[instrument(skip_all, fields(name = %name))]
    pub fn set_branch_tip(&mut self, name: &str, commit: CommitRef) {
        self.remove_dangling(&commit);
        self.branch_tips.insert(name.to_owned(), commit);
    }

    /// Erases the named branch. If the prior tip ends up referenced by
    /// nothing it re-enters the dangling set.
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove_branch(&mut self, name: &str) -> Result<CommitRef, RefLookupError> {
        let tip = self
            .branch_tips
            .remove(name)
            .ok_or_else(|| RefLookupError::BranchNotFound {
                name: name.to_owned(),
            })?;
        self.restore_dangling_if_unreferenced(&tip);
        Ok(tip)
    }

    /// Points the named tag at `commit`. The target leaves the dangling set.
    #[instrument(skip_all, fields(name = %name))]
    pub fn set_tag(&mut self, name: &str, commit: CommitRef) {
        self.remove_dangling(&commit);
        self.tags.insert(name.to_owned(), commit);
    }

    /// Erases the named tag. If the prior target ends up referenced by
    /// nothing it re-enters the dangling set.
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove_tag(&mut self, name: &str) -> Result<CommitRef, RefLookupError> {
        let target = self
            .tags
            .remove(name)
            .ok_or_else(|| RefLookupError::TagNotFound {
                name: name.to_owned(),
            })?;
        self.restore_dangling_if_unreferenced(&target);
        Ok(target)
    }

    /// Enters `commit` into the dangling set.
    pub(crate) fn add_dangling(&mut self, commit: &CommitRef) {
        self.dangling.insert(CommitKey::of(commit));
    }

    /// Drops `commit` from the dangling set. Idempotent: removing a commit
    /// that is not dangling is a no-op.
    pub(crate) fn remove_dangling(&mut self, commit: &CommitRef) {
        self.dangling.shift_remove(&CommitKey::of(commit));
    }

    /// The dangling commits, in insertion order.
    pub fn dangling(&self) -> impl Iterator<Item = &CommitRef> {
        self.dangling.iter().map(CommitKey::commit)
    }

    pub fn dangling_len(&self) -> usize {
        self.dangling.len()
    }

    pub fn is_dangling(&self, commit: &CommitRef) -> bool {
        self.dangling.contains(&CommitKey::of(commit))
    }

    /// Re-enters `commit` into the dangling set unless a branch or tag still
    /// points at it or some tracked commit has it as a parent.
    fn restore_dangling_if_unreferenced(&mut self, commit: &CommitRef) {
        let key = CommitKey::of(commit);
        let named = self
            .branch_tips
            .values()
            .chain(self.tags.values())
            .any(|tip| CommitKey::of(tip) == key);
        if named {
            return;
        }
        let parent_of_tracked = self
            .all_commits()
            .iter()
            .any(|tracked| tracked.parents().any(|parent| CommitKey::of(parent) == key));
        if !parent_of_tracked {
            self.dangling.insert(key);
        }
    }

    /// Every commit reachable from branch tips, tag targets, and the
    /// dangling set, in discovery order. The walk is guarded by a
    /// pointer-identity visited set, so a malformed cyclic graph terminates
    /// silently instead of recursing forever.
    pub fn all_commits(&self) -> Vec<CommitRef> {
        let roots = self
            .branch_tips
            .values()
            .chain(self.tags.values())
            .cloned()
            .chain(self.dangling.iter().map(|key| key.commit().clone()));
        walk_ancestors(roots)
    }
}

/// Depth-first walk over `roots` and all their ancestors, first parent
/// before other parents, deduplicated by pointer identity.
pub(crate) fn walk_ancestors(roots: impl IntoIterator<Item = CommitRef>) -> Vec<CommitRef> {
    let mut visited: HashSet<CommitKey> = HashSet::new();
    let mut ordered = vec![];
    let mut stack: Vec<CommitRef> = roots.into_iter().collect();
    stack.reverse();
    while let Some(commit) = stack.pop() {
        if !visited.insert(CommitKey::of(&commit)) {
            continue;
        }
        // Push in reverse so the first parent is visited first.
        let parents: Vec<_> = commit.parents().cloned().collect();
        stack.extend(parents.into_iter().rev());
        ordered.push(commit);
    }
    ordered
}
