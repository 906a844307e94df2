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

//! Glob patterns matching absolute area paths.

use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;

use regex::Regex;
use thiserror::Error;

use crate::path::AreaPath;

/// Error occurred while compiling a path pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The translated glob did not compile as a regular expression.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// A glob compiled to an anchored regex over absolute path strings.
///
/// `**` matches across separators, a single `*` matches within one segment,
/// and `.` is taken literally. Every other character is carried into the
/// regex verbatim, which is also what lets [`PathPattern::or`] and
/// [`PathPattern::and`] splice two compiled sources back together.
#[derive(Clone)]
pub struct PathPattern {
    glob: String,
    regex: Regex,
}

impl PathPattern {
    /// Compiles `glob` into a pattern. A relative glob is anchored by
    /// prepending `/`, so the pattern always applies to absolute paths.
    pub fn new(glob: &str) -> Result<Self, PatternError> {
        let glob = if glob.starts_with('/') {
            glob.to_owned()
        } else {
            format!("/{glob}")
        };
        Self::from_source(glob)
    }

    fn from_source(glob: String) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{})$", translate_glob(&glob)))?;
        Ok(Self { glob, regex })
    }

    /// The glob source this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Whether `path`, taken in its absolute form, matches this pattern.
    pub fn matches(&self, path: &AreaPath) -> bool {
        self.regex.is_match(path.to_absolute().as_str())
    }

    /// Returns the union of this pattern and `other`: the two sources are
    /// recompiled as `(a)|(b)`. Neither receiver is mutated.
    pub fn or(&self, other: &Self) -> Result<Self, PatternError> {
        Self::from_source(format!("({})|({})", self.glob, other.glob))
    }

    /// Returns the conjunction of this pattern and `other`: the two sources
    /// are recompiled as `(a)(b)`, so `a` must match a leading portion of the
    /// path and `b` the rest. Neither receiver is mutated.
    pub fn and(&self, other: &Self) -> Result<Self, PatternError> {
        Self::from_source(format!("({})({})", self.glob, other.glob))
    }
}

impl Debug for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.glob).finish()
    }
}

/// Translates a glob source character by character into a regex source.
/// Characters without a glob meaning keep whatever regex meaning they have.
fn translate_glob(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() + 8);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '.' => regex.push_str(r"\."),
            _ => regex.push(c),
        }
    }
    regex
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::path::AreaPath;

    fn matches(glob: &str, path: &str) -> bool {
        PathPattern::new(glob)
            .unwrap()
            .matches(AreaPath::new(path).unwrap())
    }

    #[test_case("*", "/a", true; "single star within a segment")]
    #[test_case("*", "/a/b", false; "single star stops at separator")]
    #[test_case("**", "/a/b/c", true; "double star crosses separators")]
    #[test_case("/a/*", "/a/b", true; "anchored segment wildcard")]
    #[test_case("/a/*", "/a/b/c", false; "segment wildcard does not descend")]
    #[test_case("/a/**", "/a/b/c", true; "anchored tree wildcard")]
    #[test_case("/a.txt", "/a.txt", true; "dot is literal and matches itself")]
    #[test_case("/a.txt", "/aXtxt", false; "dot does not act as regex any")]
    #[test_case("/a/b", "/a/b", true; "plain literal")]
    #[test_case("/a/b", "/a/c", false; "plain literal mismatch")]
    fn test_matches(glob: &str, path: &str, expected: bool) {
        assert_eq!(matches(glob, path), expected);
    }

    #[test]
    fn test_relative_glob_is_anchored() {
        let pattern = PathPattern::new("a/*").unwrap();
        assert_eq!(pattern.as_str(), "/a/*");
        assert!(pattern.matches(AreaPath::new("/a/b").unwrap()));
        // Relative candidates are absolutized before matching.
        assert!(pattern.matches(AreaPath::new("a/b").unwrap()));
    }

    #[test]
    fn test_or_composition() {
        let a = PathPattern::new("/a/*").unwrap();
        let b = PathPattern::new("/b/**").unwrap();
        let union = a.or(&b).unwrap();
        assert!(union.matches(AreaPath::new("/a/x").unwrap()));
        assert!(union.matches(AreaPath::new("/b/x/y").unwrap()));
        assert!(!union.matches(AreaPath::new("/c").unwrap()));
        // The receivers are unchanged.
        assert_eq!(a.as_str(), "/a/*");
        assert_eq!(b.as_str(), "/b/**");
    }

    #[test]
    fn test_and_composition_concatenates() {
        let prefix = PathPattern::new("/data/**").unwrap();
        let suffix = PathPattern::new("**.bin").unwrap();
        let both = prefix.and(&suffix).unwrap();
        assert!(both.matches(AreaPath::new("/data/x/y.bin").unwrap()));
        assert!(!both.matches(AreaPath::new("/data/x/y.txt").unwrap()));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = PathPattern::new("/a/*.log").unwrap();
        let b = PathPattern::new("/a/*.log").unwrap();
        assert_eq!(a.as_str(), b.as_str());
        assert!(a.matches(AreaPath::new("/a/x.log").unwrap()));
        assert!(b.matches(AreaPath::new("/a/x.log").unwrap()));
    }
}
