//! Property-based tests for include directive normalization

use proptest::prelude::*;
use stowage::{Include, NavigationPath};

fn segment() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["author", "profile", "comments", "tags", "owner"])
        .prop_map(|s| s.to_string())
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("."))
}

/// No path in a directive is a prefix of another, and none is lost
#[test]
fn test_directive_has_no_redundant_paths() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(path(), 0..12), |paths| {
            let include = Include::of(&paths).unwrap();
            let kept = include.paths();

            for (i, a) in kept.iter().enumerate() {
                for (j, b) in kept.iter().enumerate() {
                    if i != j {
                        prop_assert!(!a.is_prefix_of(b), "{} absorbs into {}", a, b);
                    }
                }
            }

            // Every requested path is covered by some kept path
            for raw in &paths {
                let requested = NavigationPath::parse(raw).unwrap();
                prop_assert!(kept.iter().any(|k| requested.is_prefix_of(k)));
            }
            Ok(())
        })
        .unwrap();
}

/// Merging is order-insensitive in what it covers
#[test]
fn test_merge_covers_same_paths_either_way() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec(path(), 0..6),
                prop::collection::vec(path(), 0..6),
            ),
            |(left, right)| {
                let a = Include::of(&left).unwrap();
                let b = Include::of(&right).unwrap();

                let mut ab: Vec<String> = a.clone().merge(&b).paths().iter().map(|p| p.to_string()).collect();
                let mut ba: Vec<String> = b.merge(&a).paths().iter().map(|p| p.to_string()).collect();
                ab.sort();
                ba.sort();
                prop_assert_eq!(ab, ba);
                Ok(())
            },
        )
        .unwrap();
}
