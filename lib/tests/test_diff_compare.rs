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

use assert_matches::assert_matches;
use indoc::indoc;
use pretty_assertions::assert_eq;
use strata_lib::diff::ComparisonState;
use strata_lib::repo::RefLookupError;
use testutils::area_of;
use testutils::new_string_handler;
use testutils::path;
use testutils::tags_of;

#[test]
fn test_hello_world_comparison_list_string() {
    let mut handler = new_string_handler();
    let mut area = area_of(&[
        ("/Hello", "Hello World"),
        ("/Static", "Content"),
        ("/Mistake", "Honest"),
    ]);
    let first = handler.commit(&area, "first", tags_of(&[]));

    area.put(&path("/Hello"), "Nano World");
    area.remove(&path("/Mistake"));
    area.put(&path("/Hello/Info"), "Details");
    area.put(&path("/🔧/👍"), "I ❤ NanoVC‼");
    let second = handler.commit_to_branch(&area, "master", "second", tags_of(&[]));

    let comparison = handler.compute_comparison_between_commits(&first, &second);
    assert_eq!(
        comparison.as_list_string(),
        indoc! {"
            /Hello : Changed
            /Hello/Info : Added
            /Mistake : Deleted
            /Static : Unchanged
            /🔧/👍 : Added"}
    );
}

#[test]
fn test_difference_is_the_comparison_without_unchanged() {
    let from = area_of(&[("/same", "x"), ("/edited", "a"), ("/gone", "g")]);
    let to = area_of(&[("/same", "x"), ("/edited", "b"), ("/fresh", "f")]);
    let handler = new_string_handler();

    let comparison = handler.compute_comparison_between_areas(&from, &to);
    let difference = handler.compute_difference_between_areas(&from, &to);

    assert!(difference.paths().all(|p| comparison.has(p)));
    assert!(!difference.has(&path("/same")));
    for (diff_path, state) in difference.iter() {
        assert_eq!(comparison.get(diff_path), Some(state));
        assert_ne!(*state, ComparisonState::Unchanged);
    }
    assert_eq!(comparison.len(), difference.len() + 1);
}

#[test]
fn test_difference_direction() {
    let from = area_of(&[("/kept", "k")]);
    let to = area_of(&[("/kept", "k"), ("/incoming", "i")]);
    let handler = new_string_handler();

    assert_eq!(
        handler
            .compute_difference_between_areas(&from, &to)
            .as_list_string(),
        "/incoming : Added"
    );
    assert_eq!(
        handler
            .compute_difference_between_areas(&to, &from)
            .as_list_string(),
        "/incoming : Deleted"
    );
}

#[test]
fn test_comparison_between_commits_matches_the_areas() {
    let mut handler = new_string_handler();
    let from_area = area_of(&[("/x", "1")]);
    let to_area = area_of(&[("/x", "2")]);
    let from = handler.commit(&from_area, "from", tags_of(&[]));
    let to = handler.commit(&to_area, "to", tags_of(&[]));

    assert_eq!(
        handler
            .compute_comparison_between_commits(&from, &to)
            .as_list_string(),
        handler
            .compute_comparison_between_areas(&from_area, &to_area)
            .as_list_string()
    );
}

#[test]
fn test_comparison_between_branches() {
    let mut handler = new_string_handler();
    handler.commit_to_branch(&area_of(&[("/a", "1")]), "left", "l", tags_of(&[]));
    handler.commit_to_branch(&area_of(&[("/a", "2")]), "right", "r", tags_of(&[]));

    let comparison = handler
        .compute_comparison_between_branches("left", "right")
        .unwrap();
    assert_eq!(comparison.as_list_string(), "/a : Changed");

    let difference = handler
        .compute_difference_between_branches("left", "right")
        .unwrap();
    assert_eq!(difference.as_list_string(), "/a : Changed");

    assert_matches!(
        handler.compute_comparison_between_branches("left", "missing"),
        Err(RefLookupError::BranchNotFound { .. })
    );
}

#[test]
fn test_empty_comparison_renders_as_empty_string() {
    let handler = new_string_handler();
    let empty = handler.create_area();
    assert_eq!(
        handler
            .compute_comparison_between_areas(&empty, &empty)
            .as_list_string(),
        ""
    );
}
