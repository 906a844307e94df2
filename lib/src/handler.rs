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

//! The stateful façade: one repo paired with its collaborators.

use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;

use tracing::instrument;

use crate::area::Area;
use crate::area::ByteContent;
use crate::area::ContentArea;
use crate::area::StringArea;
use crate::byte_index::ByteIndex;
use crate::byte_index::HashingByteIndex;
use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::commit::CommitRef;
use crate::content;
use crate::content::Content;
use crate::diff::Comparison;
use crate::diff::ComparisonEngine;
use crate::diff::Difference;
use crate::diff::DifferenceEngine;
use crate::engine;
use crate::merge::LastWinsPolicy;
use crate::merge::MergeEngine;
use crate::merge::MergeError;
use crate::merge::MergePolicy;
use crate::repo::MemoryRepo;
use crate::repo::RefLookupError;
use crate::search::SearchError;
use crate::search::SearchParameters;
use crate::search::SearchQuery;
use crate::search::SearchQueryDefinition;
use crate::search::SearchResults;

/// Owns a [`MemoryRepo`] together with the byte index, clock, content
/// factory, engines, and merge policy, and delegates every operation to the
/// stateless algorithms in [`engine`] and the engine types.
///
/// A handler is exactly as thread-safe as its repo: callers serialize the
/// mutating operations. The byte index may be shared across handlers to
/// widen deduplication.
pub struct RepoHandler {
    repo: MemoryRepo,
    byte_index: Arc<dyn ByteIndex>,
    clock: Arc<dyn Clock>,
    content_factory: Box<content::ContentFactory>,
    comparison_engine: ComparisonEngine,
    difference_engine: DifferenceEngine,
    merge_engine: MergeEngine,
    merge_policy: Box<dyn MergePolicy>,
}

impl RepoHandler {
    /// A handler over a fresh repo with the default collaborators: hashing
    /// byte index, monotonic clock, byte-content factory, last-wins merge
    /// policy.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RepoHandlerBuilder {
        RepoHandlerBuilder::default()
    }

    pub fn repo(&self) -> &MemoryRepo {
        &self.repo
    }

    pub fn byte_index(&self) -> &Arc<dyn ByteIndex> {
        &self.byte_index
    }

    /// A fresh, empty content area.
    pub fn create_area(&self) -> ContentArea {
        ContentArea::new()
    }

    /// An owned area of this handler's native kind carrying the same
    /// entries, for adopting an area produced elsewhere.
    pub fn cast_or_clone_area(&self, area: &ContentArea) -> ContentArea {
        area.clone()
    }

    /// Commits `area` with no parents; the new commit is a dangling tip.
    pub fn commit(&mut self, area: &ContentArea, message: &str, tags: StringArea) -> CommitRef {
        engine::commit_dangling(
            &mut self.repo,
            area,
            message,
            tags,
            &*self.clock,
            &*self.byte_index,
            None,
            vec![],
        )
        .expect("a parentless commit cannot have a malformed parent list")
    }

    /// Commits `area` with a single parent; the new commit becomes a
    /// dangling tip and `parent` stops being one.
    pub fn commit_with_parent(
        &mut self,
        area: &ContentArea,
        message: &str,
        tags: StringArea,
        parent: &CommitRef,
    ) -> CommitRef {
        self.commit_with_parents(area, message, tags, parent, &[])
    }

    /// Commits `area` with a full parent list, first parent up front.
    pub fn commit_with_parents(
        &mut self,
        area: &ContentArea,
        message: &str,
        tags: StringArea,
        first_parent: &CommitRef,
        other_parents: &[CommitRef],
    ) -> CommitRef {
        engine::commit_dangling(
            &mut self.repo,
            area,
            message,
            tags,
            &*self.clock,
            &*self.byte_index,
            Some(first_parent.clone()),
            other_parents.to_vec(),
        )
        .expect("a first parent is present")
    }

    /// Commits `area` to the named branch, creating the branch on first
    /// use. An existing tip becomes the commit's first parent.
    pub fn commit_to_branch(
        &mut self,
        area: &ContentArea,
        branch: &str,
        message: &str,
        tags: StringArea,
    ) -> CommitRef {
        engine::commit_to_branch(
            &mut self.repo,
            area,
            branch,
            message,
            tags,
            &*self.clock,
            &*self.byte_index,
            vec![],
        )
        .expect("a branch commit without extra parents cannot be malformed")
    }

    pub fn create_branch_at_commit(&mut self, commit: &CommitRef, branch: &str) {
        self.repo.set_branch_tip(branch, commit.clone());
    }

    pub fn remove_branch(&mut self, branch: &str) -> Result<CommitRef, RefLookupError> {
        self.repo.remove_branch(branch)
    }

    pub fn tag_commit(&mut self, commit: &CommitRef, tag: &str) {
        self.repo.set_tag(tag, commit.clone());
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<CommitRef, RefLookupError> {
        self.repo.remove_tag(tag)
    }

    pub fn latest_commit_on_branch(&self, branch: &str) -> Result<CommitRef, RefLookupError> {
        self.repo.require_branch_tip(branch).cloned()
    }

    pub fn commit_for_tag(&self, tag: &str) -> Result<CommitRef, RefLookupError> {
        self.repo.require_tag_target(tag).cloned()
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.repo.branch_names().map(str::to_owned).collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.repo.tag_names().map(str::to_owned).collect()
    }

    /// Materializes the snapshot of `commit` into a fresh area through this
    /// handler's content factory.
    pub fn checkout(&self, commit: &CommitRef) -> ContentArea {
        engine::checkout(commit, &*self.content_factory)
    }

    /// Populates `area` from the snapshot of `commit` without clearing it
    /// first.
    pub fn checkout_into_area(&self, commit: &CommitRef, area: &mut ContentArea) {
        engine::checkout_into(commit, area, &*self.content_factory);
    }

    pub fn compute_comparison_between_areas<A: ByteContent, B: ByteContent>(
        &self,
        from: &Area<A>,
        to: &Area<B>,
    ) -> Comparison {
        self.comparison_engine.compare(from, to)
    }

    pub fn compute_comparison_between_commits(
        &self,
        from: &CommitRef,
        to: &CommitRef,
    ) -> Comparison {
        self.comparison_engine.compare(from.snapshot(), to.snapshot())
    }

    pub fn compute_comparison_between_branches(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Comparison, RefLookupError> {
        let from = self.repo.require_branch_tip(from)?;
        let to = self.repo.require_branch_tip(to)?;
        Ok(self.comparison_engine.compare(from.snapshot(), to.snapshot()))
    }

    pub fn compute_difference_between_areas<A: ByteContent, B: ByteContent>(
        &self,
        from: &Area<A>,
        to: &Area<B>,
    ) -> Difference {
        self.difference_engine.difference(from, to)
    }

    pub fn compute_difference_between_commits(
        &self,
        from: &CommitRef,
        to: &CommitRef,
    ) -> Difference {
        self.difference_engine
            .difference(from.snapshot(), to.snapshot())
    }

    pub fn compute_difference_between_branches(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Difference, RefLookupError> {
        let from = self.repo.require_branch_tip(from)?;
        let to = self.repo.require_branch_tip(to)?;
        Ok(self
            .difference_engine
            .difference(from.snapshot(), to.snapshot()))
    }

    /// Merges the source branch into the destination branch: the merged
    /// area is committed to the destination, whose prior tip becomes the
    /// first parent while the source tip joins the other parents.
    #[instrument(skip_all, fields(destination = %destination_branch, source = %source_branch))]
    pub fn merge_into_branch_from_branch(
        &mut self,
        destination_branch: &str,
        source_branch: &str,
        message: &str,
        tags: StringArea,
    ) -> Result<CommitRef, MergeError> {
        let source = self.repo.require_branch_tip(source_branch)?.clone();
        self.merge_into_branch_from_commit(destination_branch, &source, message, tags)
    }

    /// Merges a bare commit into the destination branch.
    #[instrument(skip_all, fields(destination = %destination_branch))]
    pub fn merge_into_branch_from_commit(
        &mut self,
        destination_branch: &str,
        source: &CommitRef,
        message: &str,
        tags: StringArea,
    ) -> Result<CommitRef, MergeError> {
        let destination = self.repo.require_branch_tip(destination_branch)?.clone();
        let merged = self.merged_area(&destination, source)?;
        let commit = engine::commit_to_branch(
            &mut self.repo,
            &merged,
            destination_branch,
            message,
            tags,
            &*self.clock,
            &*self.byte_index,
            vec![source.clone()],
        )?;
        Ok(commit)
    }

    /// Merges the tip of a branch into a bare commit; the merge commit
    /// becomes a dangling tip with `destination` as its first parent.
    #[instrument(skip_all, fields(source = %source_branch))]
    pub fn merge_into_commit_from_branch(
        &mut self,
        destination: &CommitRef,
        source_branch: &str,
        message: &str,
        tags: StringArea,
    ) -> Result<CommitRef, MergeError> {
        let source = self.repo.require_branch_tip(source_branch)?.clone();
        self.merge_commits(destination, &source, message, tags)
    }

    /// Merges two bare commits; the merge commit becomes a dangling tip
    /// parented on both.
    #[instrument(skip_all, fields(message = %message))]
    pub fn merge_commits(
        &mut self,
        destination: &CommitRef,
        source: &CommitRef,
        message: &str,
        tags: StringArea,
    ) -> Result<CommitRef, MergeError> {
        let merged = self.merged_area(destination, source)?;
        let commit = engine::commit_dangling(
            &mut self.repo,
            &merged,
            message,
            tags,
            &*self.clock,
            &*self.byte_index,
            Some(destination.clone()),
            vec![source.clone()],
        )?;
        Ok(commit)
    }

    fn merged_area(
        &self,
        destination: &CommitRef,
        source: &CommitRef,
    ) -> Result<ContentArea, MergeError> {
        let ancestor = engine::find_common_ancestor(destination, source);
        self.merge_engine.merge_commits(
            destination,
            source,
            ancestor.as_ref(),
            &*self.merge_policy,
            &*self.content_factory,
        )
    }

    pub fn prepare_search_query(&self, definition: SearchQueryDefinition) -> SearchQuery {
        SearchQuery::prepare(definition)
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, SearchError> {
        query.evaluate(&self.repo, &SearchParameters::new())
    }

    /// Like [`RepoHandler::search`], with `overrides` shadowing the
    /// parameters baked into the query definition.
    pub fn search_with_parameters(
        &self,
        query: &SearchQuery,
        overrides: &SearchParameters,
    ) -> Result<SearchResults, SearchError> {
        query.evaluate(&self.repo, overrides)
    }

    /// Re-bases every monotonic commit timestamp onto the reachable epoch
    /// with the narrowest uncertainty window. Observable ordering and
    /// content are unaffected.
    pub fn optimize_timestamps(&mut self) {
        engine::optimize_timestamps(&self.repo);
    }
}

impl Default for RepoHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for RepoHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoHandler")
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`RepoHandler`], substituting collaborators where the
/// defaults don't fit.
#[derive(Default)]
pub struct RepoHandlerBuilder {
    byte_index: Option<Arc<dyn ByteIndex>>,
    clock: Option<Arc<dyn Clock>>,
    content_factory: Option<Box<content::ContentFactory>>,
    merge_policy: Option<Box<dyn MergePolicy>>,
}

impl RepoHandlerBuilder {
    #[must_use]
    pub fn byte_index(mut self, byte_index: Arc<dyn ByteIndex>) -> Self {
        self.byte_index = Some(byte_index);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn content_factory(
        mut self,
        factory: impl Fn(&[u8]) -> Content + Send + Sync + 'static,
    ) -> Self {
        self.content_factory = Some(Box::new(factory));
        self
    }

    #[must_use]
    pub fn merge_policy(mut self, policy: impl MergePolicy + 'static) -> Self {
        self.merge_policy = Some(Box::new(policy));
        self
    }

    pub fn build(self) -> RepoHandler {
        RepoHandler {
            repo: MemoryRepo::new(),
            byte_index: self
                .byte_index
                .unwrap_or_else(|| Arc::new(HashingByteIndex::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            content_factory: self
                .content_factory
                .unwrap_or_else(|| Box::new(content::bytes_content)),
            comparison_engine: ComparisonEngine::new(),
            difference_engine: DifferenceEngine::new(),
            merge_engine: MergeEngine::new(),
            merge_policy: self.merge_policy.unwrap_or_else(|| Box::new(LastWinsPolicy)),
        }
    }
}
