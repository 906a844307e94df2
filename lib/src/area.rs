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

//! Content areas: flat path-keyed snapshots of values.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use bstr::ByteSlice as _;
use itertools::Itertools as _;

use crate::content::Content;
use crate::path::AreaPath;
use crate::path::AreaPathBuf;
use crate::pattern::PathPattern;

/// A value that can live inside an [`Area`].
pub trait AreaValue: Clone {
    /// How the value renders inside [`Area::as_list_string`] lines.
    fn list_display(&self) -> String;
}

/// An area value with a byte form. The diff, compare, and merge engines
/// operate on any area whose values implement this.
pub trait ByteContent: AreaValue {
    /// The byte form used for equality decisions.
    fn to_bytes(&self) -> Cow<'_, [u8]>;
}

impl AreaValue for Content {
    fn list_display(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("'{}'", bytes.as_bstr()),
            Self::EncodedString { value, .. } => format!("'{value}'"),
        }
    }
}

impl ByteContent for Content {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        self.to_bytes()
    }
}

impl AreaValue for Arc<[u8]> {
    fn list_display(&self) -> String {
        format!("'{}'", self.as_bstr())
    }
}

impl ByteContent for Arc<[u8]> {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl AreaValue for String {
    fn list_display(&self) -> String {
        format!("'{self}'")
    }
}

impl ByteContent for String {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

/// A mapping from absolute path to a value, conceptually a miniature
/// filesystem snapshot.
///
/// Keys are always stored in absolute form; relative paths absolutize on the
/// way in, for lookups as well as insertions. Iteration is ordered by the
/// absolute path string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Area<V> {
    entries: BTreeMap<AreaPathBuf, V>,
}

/// Area of general content values; the kind callers edit and commit.
pub type ContentArea = Area<Content>;

/// Area of interned byte sequences; the kind stored inside commits.
pub type SnapshotArea = Area<Arc<[u8]>>;

/// Area of plain strings; carries free-form commit metadata.
pub type StringArea = Area<String>;

impl<V> Area<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Stores `value` at the absolute form of `path`, replacing any previous
    /// entry there.
    pub fn put(&mut self, path: &AreaPath, value: impl Into<V>) {
        self.entries
            .insert(path.to_absolute().into_owned(), value.into());
    }

    pub fn get(&self, path: &AreaPath) -> Option<&V> {
        self.entries.get(&*path.to_absolute())
    }

    pub fn remove(&mut self, path: &AreaPath) -> Option<V> {
        self.entries.remove(&*path.to_absolute())
    }

    pub fn has(&self, path: &AreaPath) -> bool {
        self.entries.contains_key(&*path.to_absolute())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears this area, then bulk-inserts `entries`. The clear comes first
    /// so no prior entry survives.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = (AreaPathBuf, V)>) {
        self.entries.clear();
        for (path, value) in entries {
            self.entries.insert(path.into_absolute(), value);
        }
    }

    /// Iterates `(path, value)` entries ascending by absolute path string.
    pub fn iter(&self) -> impl Iterator<Item = (&AreaPath, &V)> {
        self.entries.iter().map(|(path, value)| (&**path, value))
    }

    /// Iterates the absolute paths ascending by path string.
    pub fn paths(&self) -> impl Iterator<Item = &AreaPath> {
        self.entries.keys().map(|path| &**path)
    }

    /// Iterates the entries whose path matches `pattern`, in path order.
    pub fn iter_matching<'a>(
        &'a self,
        pattern: &'a PathPattern,
    ) -> impl Iterator<Item = (&'a AreaPath, &'a V)> {
        self.iter().filter(|(path, _)| pattern.matches(path))
    }
}

impl<V: AreaValue> Area<V> {
    /// Debug view: one line per entry, `"{absolute_path} : {value}"`, sorted
    /// ascending by the absolute path string and joined by `\n` with no
    /// trailing newline. The output is deterministic across runs.
    pub fn as_list_string(&self) -> String {
        self.iter()
            .map(|(path, value)| format!("{path} : {}", value.list_display()))
            .join("\n")
    }
}

impl<V> Default for Area<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(AreaPathBuf, V)> for Area<V> {
    fn from_iter<I: IntoIterator<Item = (AreaPathBuf, V)>>(iter: I) -> Self {
        let mut area = Self::new();
        for (path, value) in iter {
            area.entries.insert(path.into_absolute(), value);
        }
        area
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::path::AreaPath;

    fn path(value: &str) -> &AreaPath {
        AreaPath::new(value).unwrap()
    }

    #[test]
    fn test_put_get_remove_roundtrip() {
        let mut area = ContentArea::new();
        area.put(path("/a"), "one");
        assert_eq!(area.get(path("/a")), Some(&Content::string("one")));
        assert!(area.has(path("/a")));
        assert_eq!(area.remove(path("/a")), Some(Content::string("one")));
        assert!(area.is_empty());
    }

    #[test]
    fn test_relative_paths_absolutize() {
        let mut area = ContentArea::new();
        area.put(path("a/b"), "x");
        assert!(area.has(path("/a/b")));
        assert_eq!(area.get(path("a/b")), area.get(path("/a/b")));
        assert_eq!(area.paths().collect::<Vec<_>>(), [path("/a/b")]);
    }

    #[test]
    fn test_replace_all_clears_residue() {
        let mut area = ContentArea::new();
        area.put(path("/stale"), "old");
        area.replace_all([(AreaPathBuf::new("/fresh").unwrap(), Content::string("new"))]);
        assert_eq!(area.len(), 1);
        assert!(area.has(path("/fresh")));
        assert!(!area.has(path("/stale")));
    }

    #[test]
    fn test_list_string_is_sorted_and_newline_joined() {
        let mut area = ContentArea::new();
        area.put(path("/b"), "2");
        area.put(path("/a"), "1");
        area.put(path("/a/c"), "3");
        assert_eq!(
            area.as_list_string(),
            "/a : '1'\n/a/c : '3'\n/b : '2'"
        );
    }

    #[test]
    fn test_list_string_of_empty_area() {
        assert_eq!(ContentArea::new().as_list_string(), "");
    }

    #[test]
    fn test_iter_matching_filters_by_pattern() {
        let mut area = ContentArea::new();
        area.put(path("/logs/a.log"), "a");
        area.put(path("/logs/deep/b.log"), "b");
        area.put(path("/data/c"), "c");
        let pattern = PathPattern::new("/logs/**").unwrap();
        let matched: Vec<_> = area.iter_matching(&pattern).map(|(p, _)| p).collect();
        assert_eq!(matched, [path("/logs/a.log"), path("/logs/deep/b.log")]);
    }

    #[test]
    fn test_string_area_entries() {
        let mut tags = StringArea::new();
        tags.put(path("author"), "ada".to_owned());
        assert_eq!(tags.as_list_string(), "/author : 'ada'");
    }
}
