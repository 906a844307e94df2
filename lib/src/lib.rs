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

//! Embeddable in-memory version control.
//!
//! Every application entity can carry its own history: a
//! [`RepoHandler`](handler::RepoHandler) owns one commit graph with branches,
//! tags, and dangling tips, records immutable snapshots of path-keyed
//! content areas, compares and diffs them, merges branches two- or
//! three-way, and answers commit-search queries. Byte contents are interned
//! through a [`ByteIndex`](byte_index::ByteIndex) that may be shared across
//! any number of repos.
//!
//! Nothing here touches disk or network; operations are synchronous and a
//! single repo expects its mutations to be serialized by the caller.

pub mod area;
pub mod byte_index;
pub mod clock;
pub mod commit;
pub mod content;
pub mod diff;
pub mod engine;
pub mod handler;
pub mod merge;
pub mod path;
pub mod pattern;
pub mod repo;
pub mod search;
