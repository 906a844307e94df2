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

//! Two-way and three-way merging of commit snapshots.

use std::fmt::Debug;

use itertools::EitherOrBoth;
use itertools::Itertools as _;
use thiserror::Error;

use crate::area::ContentArea;
use crate::clock::Timestamp;
use crate::commit::CommitRef;
use crate::commit::MalformedParentsError;
use crate::content::ContentFactory;
use crate::diff::ComparisonState;
use crate::diff::DifferenceEngine;
use crate::path::AreaPath;
use crate::path::AreaPathBuf;
use crate::repo::RefLookupError;

/// Error from a merge operation.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The active policy declined to resolve a conflicting path. The shipped
    /// policies always resolve.
    #[error(r#"Merge conflict at "{path}" left unresolved"#)]
    ConflictUnresolved { path: AreaPathBuf },
    #[error(transparent)]
    RefLookup(#[from] RefLookupError),
    #[error(transparent)]
    MalformedParents(#[from] MalformedParentsError),
}

/// A path both sides changed relative to each other (and to the ancestor,
/// where one exists). `None` means the respective side has no entry. The
/// timestamps are those of the two tip commits being merged, so a policy
/// can tell which side wrote last.
#[derive(Clone, Debug)]
pub struct Conflict<'a> {
    pub path: &'a AreaPath,
    pub ancestor: Option<&'a [u8]>,
    pub destination: Option<&'a [u8]>,
    pub source: Option<&'a [u8]>,
    pub destination_timestamp: Timestamp,
    pub source_timestamp: Timestamp,
}

/// What a [`MergePolicy`] decided for a conflicting path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    KeepDestination,
    TakeSource,
    /// Leave the path out of the merged area.
    Remove,
    /// Store the given bytes instead of either side.
    Replace(Vec<u8>),
}

/// Decides conflicting paths. Returning `None` declines the conflict and
/// fails the merge with [`MergeError::ConflictUnresolved`].
pub trait MergePolicy: Debug + Send + Sync {
    fn resolve(&self, conflict: &Conflict<'_>) -> Option<Resolution>;
}

/// The default policy: the side whose tip commit is newer wins. A tie goes
/// to the source side, so merging a branch that was just committed to takes
/// that branch's values.
#[derive(Clone, Copy, Debug, Default)]
pub struct LastWinsPolicy;

impl MergePolicy for LastWinsPolicy {
    fn resolve(&self, conflict: &Conflict<'_>) -> Option<Resolution> {
        if conflict.destination_timestamp > conflict.source_timestamp {
            Some(Resolution::KeepDestination)
        } else {
            Some(Resolution::TakeSource)
        }
    }
}

/// Resolves by preferring the side that actually moved away from the common
/// ancestor; when both sides moved (or there is no ancestor) it degenerates
/// to last-wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiffFromAncestorPolicy;

impl MergePolicy for DiffFromAncestorPolicy {
    fn resolve(&self, conflict: &Conflict<'_>) -> Option<Resolution> {
        let Some(ancestor) = conflict.ancestor else {
            return Some(Resolution::TakeSource);
        };
        if conflict.destination == Some(ancestor) {
            return Some(Resolution::TakeSource);
        }
        if conflict.source == Some(ancestor) {
            return Some(Resolution::KeepDestination);
        }
        Some(Resolution::TakeSource)
    }
}

/// Merges commit snapshots into a fresh content area. Stateless apart from
/// the difference engine it composes.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeEngine {
    differ: DifferenceEngine,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the merged content area for `destination` and `source`,
    /// three-way against `ancestor` when one is given, two-way otherwise.
    /// The inputs are never mutated; the caller commits the result.
    pub fn merge_commits(
        &self,
        destination: &CommitRef,
        source: &CommitRef,
        ancestor: Option<&CommitRef>,
        policy: &dyn MergePolicy,
        factory: &ContentFactory,
    ) -> Result<ContentArea, MergeError> {
        match ancestor {
            Some(ancestor) => {
                self.merge_three_way(destination, source, ancestor, policy, factory)
            }
            None => self.merge_two_way(destination, source, policy, factory),
        }
    }

    /// No common history: the union of both snapshots, with conflicting
    /// paths handed to the policy.
    fn merge_two_way(
        &self,
        destination: &CommitRef,
        source: &CommitRef,
        policy: &dyn MergePolicy,
        factory: &ContentFactory,
    ) -> Result<ContentArea, MergeError> {
        let mut merged = ContentArea::new();
        for entry in destination
            .snapshot()
            .iter()
            .merge_join_by(source.snapshot().iter(), |(d_path, _), (s_path, _)| {
                d_path.cmp(s_path)
            })
        {
            match entry {
                EitherOrBoth::Left((path, bytes)) | EitherOrBoth::Right((path, bytes)) => {
                    merged.put(path, factory(bytes));
                }
                EitherOrBoth::Both((path, d_bytes), (_, s_bytes)) => {
                    if d_bytes == s_bytes {
                        merged.put(path, factory(d_bytes));
                        continue;
                    }
                    let conflict = Conflict {
                        path,
                        ancestor: None,
                        destination: Some(&**d_bytes),
                        source: Some(&**s_bytes),
                        destination_timestamp: destination.timestamp(),
                        source_timestamp: source.timestamp(),
                    };
                    let resolution = policy.resolve(&conflict).ok_or_else(|| {
                        MergeError::ConflictUnresolved {
                            path: path.to_owned(),
                        }
                    })?;
                    match resolution {
                        Resolution::KeepDestination => merged.put(path, factory(d_bytes)),
                        Resolution::TakeSource => merged.put(path, factory(s_bytes)),
                        Resolution::Remove => {}
                        Resolution::Replace(bytes) => merged.put(path, factory(&bytes)),
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Start from the ancestor, apply the destination's changes, then the
    /// source's; paths both sides touched go through the policy.
    fn merge_three_way(
        &self,
        destination: &CommitRef,
        source: &CommitRef,
        ancestor: &CommitRef,
        policy: &dyn MergePolicy,
        factory: &ContentFactory,
    ) -> Result<ContentArea, MergeError> {
        let delta_destination = self
            .differ
            .difference(ancestor.snapshot(), destination.snapshot());
        let delta_source = self.differ.difference(ancestor.snapshot(), source.snapshot());

        let mut merged = ContentArea::new();
        for (path, bytes) in ancestor.snapshot().iter() {
            merged.put(path, factory(bytes));
        }

        for (path, state) in delta_destination.iter() {
            match state {
                ComparisonState::Added | ComparisonState::Changed => {
                    if let Some(bytes) = destination.snapshot().get(path) {
                        merged.put(path, factory(bytes));
                    }
                }
                ComparisonState::Deleted => {
                    merged.remove(path);
                }
                ComparisonState::Unchanged => {}
            }
        }

        for (path, state) in delta_source.iter() {
            if !delta_destination.has(path) {
                match state {
                    ComparisonState::Added | ComparisonState::Changed => {
                        if let Some(bytes) = source.snapshot().get(path) {
                            merged.put(path, factory(bytes));
                        }
                    }
                    ComparisonState::Deleted => {
                        merged.remove(path);
                    }
                    ComparisonState::Unchanged => {}
                }
                continue;
            }
            // Both sides diverged from the ancestor at this path.
            let conflict = Conflict {
                path,
                ancestor: ancestor.snapshot().get(path).map(|bytes| &**bytes),
                destination: destination.snapshot().get(path).map(|bytes| &**bytes),
                source: source.snapshot().get(path).map(|bytes| &**bytes),
                destination_timestamp: destination.timestamp(),
                source_timestamp: source.timestamp(),
            };
            let resolution =
                policy
                    .resolve(&conflict)
                    .ok_or_else(|| MergeError::ConflictUnresolved {
                        path: path.to_owned(),
                    })?;
            match resolution {
                Resolution::KeepDestination => {}
                Resolution::TakeSource => match source.snapshot().get(path) {
                    Some(bytes) => merged.put(path, factory(bytes)),
                    None => {
                        merged.remove(path);
                    }
                },
                Resolution::Remove => {
                    merged.remove(path);
                }
                Resolution::Replace(bytes) => merged.put(path, factory(&bytes)),
            }
        }
        Ok(merged)
    }
}
