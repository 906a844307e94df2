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

//! Per-path comparison and difference between two areas.

use std::fmt;
use std::fmt::Formatter;

use itertools::EitherOrBoth;
use itertools::Itertools as _;

use crate::area::Area;
use crate::area::AreaValue;
use crate::area::ByteContent;

/// How a path relates across the two sides of a comparison.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ComparisonState {
    /// Present on both sides with equal bytes.
    Unchanged,
    /// Present on both sides with differing bytes.
    Changed,
    /// Present only on the second side.
    Added,
    /// Present only on the first side.
    Deleted,
}

impl fmt::Display for ComparisonState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unchanged => "Unchanged",
            Self::Changed => "Changed",
            Self::Added => "Added",
            Self::Deleted => "Deleted",
        };
        write!(f, "{name}")
    }
}

impl AreaValue for ComparisonState {
    fn list_display(&self) -> String {
        self.to_string()
    }
}

/// Every path of either side mapped to its [`ComparisonState`].
pub type Comparison = Area<ComparisonState>;

/// Like [`Comparison`], but carrying only the paths whose state is not
/// `Unchanged`.
pub type Difference = Area<ComparisonState>;

/// Computes comparisons. Stateless; a single engine instance may serve any
/// number of threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComparisonEngine;

/// Computes differences. Stateless like [`ComparisonEngine`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DifferenceEngine;

impl ComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Single pass over the union of paths of `from` and `to`. Equality is
    /// byte-wise; encoded strings compare by their bytes under their
    /// declared encoding. Direction-sensitive: paths only in `to` report
    /// `Added`.
    pub fn compare<A: ByteContent, B: ByteContent>(
        &self,
        from: &Area<A>,
        to: &Area<B>,
    ) -> Comparison {
        let mut result = Comparison::new();
        for entry in from
            .iter()
            .merge_join_by(to.iter(), |(from_path, _), (to_path, _)| {
                from_path.cmp(to_path)
            })
        {
            match entry {
                EitherOrBoth::Left((path, _)) => result.put(path, ComparisonState::Deleted),
                EitherOrBoth::Right((path, _)) => result.put(path, ComparisonState::Added),
                EitherOrBoth::Both((path, from_value), (_, to_value)) => {
                    let state = if from_value.to_bytes() == to_value.to_bytes() {
                        ComparisonState::Unchanged
                    } else {
                        ComparisonState::Changed
                    };
                    result.put(path, state);
                }
            }
        }
        result
    }
}

impl DifferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// A comparison with every `Unchanged` entry withheld.
    pub fn difference<A: ByteContent, B: ByteContent>(
        &self,
        from: &Area<A>,
        to: &Area<B>,
    ) -> Difference {
        let mut result = Difference::new();
        for entry in from
            .iter()
            .merge_join_by(to.iter(), |(from_path, _), (to_path, _)| {
                from_path.cmp(to_path)
            })
        {
            match entry {
                EitherOrBoth::Left((path, _)) => result.put(path, ComparisonState::Deleted),
                EitherOrBoth::Right((path, _)) => result.put(path, ComparisonState::Added),
                EitherOrBoth::Both((path, from_value), (_, to_value)) => {
                    if from_value.to_bytes() != to_value.to_bytes() {
                        result.put(path, ComparisonState::Changed);
                    }
                }
            }
        }
        result
    }
}
