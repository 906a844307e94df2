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

//! Commit search: an expression tree evaluated against a repo.
//!
//! Expressions come in two typed kinds, producing a single commit or an
//! ordered commit list. Dispatch is open: anything implementing
//! [`SingleExpression`] or [`ListExpression`] plugs into a query next to the
//! built-in nodes.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::commit::CommitRef;
use crate::repo::MemoryRepo;

/// Error from evaluating a search query. An empty result is not an error.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SearchError {
    #[error(r#"Unbound search parameter "{name}""#)]
    UnboundParameter { name: String },
}

/// String constants a query can reference by `{name}` placeholders.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchParameters {
    values: BTreeMap<String, String>,
}

impl SearchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`SearchParameters::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// This parameter set with every entry of `overrides` shadowing its own.
    pub fn merged_with(&self, overrides: &Self) -> Self {
        let mut values = self.values.clone();
        for (name, value) in &overrides.values {
            values.insert(name.clone(), value.clone());
        }
        Self { values }
    }
}

/// What an expression sees while evaluating: the repo and the fully merged
/// parameter set.
pub struct SearchContext<'a> {
    repo: &'a MemoryRepo,
    parameters: SearchParameters,
}

impl SearchContext<'_> {
    pub fn repo(&self) -> &MemoryRepo {
        self.repo
    }

    pub fn parameters(&self) -> &SearchParameters {
        &self.parameters
    }

    /// Resolves `value`: a `{name}` placeholder looks up the parameter map,
    /// anything else is taken literally.
    pub fn resolve(&self, value: &str) -> Result<String, SearchError> {
        let Some(name) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) else {
            return Ok(value.to_owned());
        };
        self.parameters
            .get(name)
            .map(str::to_owned)
            .ok_or_else(|| SearchError::UnboundParameter {
                name: name.to_owned(),
            })
    }
}

/// An expression producing an ordered list of commits.
pub trait ListExpression: Debug + Send + Sync {
    fn evaluate(&self, ctx: &SearchContext<'_>) -> Result<Vec<CommitRef>, SearchError>;
}

/// An expression producing at most one commit.
pub trait SingleExpression: Debug + Send + Sync {
    fn evaluate(&self, ctx: &SearchContext<'_>) -> Result<Option<CommitRef>, SearchError>;
}

/// The typed root of a query.
#[derive(Clone, Debug)]
pub enum SearchExpression {
    Single(Arc<dyn SingleExpression>),
    List(Arc<dyn ListExpression>),
}

impl SearchExpression {
    pub fn single(expression: impl SingleExpression + 'static) -> Self {
        Self::Single(Arc::new(expression))
    }

    pub fn list(expression: impl ListExpression + 'static) -> Self {
        Self::List(Arc::new(expression))
    }
}

/// Every commit reachable from branch tips, tag targets, or the dangling
/// set, ascending by timestamp. Ties keep a stable discovery order.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllRepoCommits;

impl ListExpression for AllRepoCommits {
    fn evaluate(&self, ctx: &SearchContext<'_>) -> Result<Vec<CommitRef>, SearchError> {
        let mut commits = ctx.repo().all_commits();
        commits.sort_by_key(|commit| commit.timestamp());
        Ok(commits)
    }
}

/// The last commit of an inner list expression (the lists are ordered
/// oldest-first, so this is the newest). An empty list yields no commit.
#[derive(Clone, Debug)]
pub struct TipOf {
    list: Arc<dyn ListExpression>,
}

impl TipOf {
    pub fn new(list: impl ListExpression + 'static) -> Self {
        Self {
            list: Arc::new(list),
        }
    }
}

impl SingleExpression for TipOf {
    fn evaluate(&self, ctx: &SearchContext<'_>) -> Result<Option<CommitRef>, SearchError> {
        let commits = self.list.evaluate(ctx)?;
        Ok(commits.last().cloned())
    }
}

/// The current tip of a named branch. The name may be a `{parameter}`
/// placeholder; an unknown branch yields no commit.
#[derive(Clone, Debug)]
pub struct BranchTip {
    name: String,
}

impl BranchTip {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SingleExpression for BranchTip {
    fn evaluate(&self, ctx: &SearchContext<'_>) -> Result<Option<CommitRef>, SearchError> {
        let name = ctx.resolve(&self.name)?;
        Ok(ctx.repo().branch_tip(&name).cloned())
    }
}

/// A root expression plus the parameter defaults baked into it.
#[derive(Clone, Debug)]
pub struct SearchQueryDefinition {
    pub expression: SearchExpression,
    pub parameters: SearchParameters,
}

impl SearchQueryDefinition {
    pub fn new(expression: SearchExpression) -> Self {
        Self {
            expression,
            parameters: SearchParameters::new(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: SearchParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A prepared, reusable query.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    definition: Arc<SearchQueryDefinition>,
}

impl SearchQuery {
    pub fn prepare(definition: SearchQueryDefinition) -> Self {
        Self {
            definition: Arc::new(definition),
        }
    }

    pub fn definition(&self) -> &SearchQueryDefinition {
        &self.definition
    }

    /// Runs this query against `repo`. `overrides` shadow the definition's
    /// own parameters. A single-commit expression evaluating to nothing
    /// produces an empty list.
    pub fn evaluate(
        &self,
        repo: &MemoryRepo,
        overrides: &SearchParameters,
    ) -> Result<SearchResults, SearchError> {
        let ctx = SearchContext {
            repo,
            parameters: self.definition.parameters.merged_with(overrides),
        };
        let commits = match &self.definition.expression {
            SearchExpression::List(expression) => expression.evaluate(&ctx)?,
            SearchExpression::Single(expression) => {
                expression.evaluate(&ctx)?.into_iter().collect()
            }
        };
        Ok(SearchResults {
            query: self.clone(),
            commits,
        })
    }
}

/// The outcome of a query run: the ordered commits plus the query itself,
/// so the search can be repeated.
#[derive(Clone, Debug)]
pub struct SearchResults {
    query: SearchQuery,
    commits: Vec<CommitRef>,
}

impl SearchResults {
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn commits(&self) -> &[CommitRef] {
        &self.commits
    }

    pub fn into_commits(self) -> Vec<CommitRef> {
        self.commits
    }
}
