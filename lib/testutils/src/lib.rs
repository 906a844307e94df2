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

//! Shared scaffolding for the strata-lib integration tests.

use std::sync::Arc;

use strata_lib::area::ContentArea;
use strata_lib::area::StringArea;
use strata_lib::content;
use strata_lib::handler::RepoHandler;
use strata_lib::path::AreaPathBuf;
use strata_lib::repo::MemoryRepo;

/// A handler with the default collaborators.
pub fn new_handler() -> RepoHandler {
    RepoHandler::new()
}

/// A handler whose checkouts produce UTF-8 string contents, for tests that
/// round-trip text.
pub fn new_string_handler() -> RepoHandler {
    RepoHandler::builder()
        .content_factory(content::utf8_content)
        .build()
}

pub fn path(value: &str) -> AreaPathBuf {
    AreaPathBuf::new(value).unwrap()
}

/// A content area holding the given `(path, utf8 content)` entries.
pub fn area_of(entries: &[(&str, &str)]) -> ContentArea {
    let mut area = ContentArea::new();
    for (key, value) in entries {
        area.put(&path(key), *value);
    }
    area
}

/// A string area holding the given `(path, value)` entries.
pub fn tags_of(entries: &[(&str, &str)]) -> StringArea {
    let mut tags = StringArea::new();
    for (key, value) in entries {
        tags.put(&path(key), (*value).to_owned());
    }
    tags
}

/// Asserts the dangling-tip invariant over the whole repo: a tracked commit
/// sits in the dangling set iff no branch or tag points at it and no
/// tracked commit has it as a parent.
pub fn assert_dangling_invariant(repo: &MemoryRepo) {
    let commits = repo.all_commits();
    let named: Vec<_> = repo
        .branch_names()
        .filter_map(|name| repo.branch_tip(name).cloned())
        .chain(
            repo.tag_names()
                .filter_map(|name| repo.tag_target(name).cloned()),
        )
        .collect();
    for commit in &commits {
        let is_named = named.iter().any(|tip| Arc::ptr_eq(tip, commit));
        let is_parent = commits
            .iter()
            .any(|child| child.parents().any(|parent| Arc::ptr_eq(parent, commit)));
        assert_eq!(
            repo.is_dangling(commit),
            !is_named && !is_parent,
            "dangling invariant violated for {commit:?}"
        );
    }
    for dangling in repo.dangling() {
        assert!(
            commits.iter().any(|commit| Arc::ptr_eq(commit, dangling)),
            "dangling set contains an untracked commit: {dangling:?}"
        );
    }
}
