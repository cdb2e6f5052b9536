//! Property-based tests for key paths and observation delivery.
//!
//! 1. Any dotted path of identifiers parses back to its segments.
//! 2. A path with an empty segment is always rejected.
//! 3. An observer sees exactly the effective changes, in order.
//! 4. The same holds through an intermediate object that is swapped out.
//! 5. Disposing any clone disposes them all and leaves no subscription.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{person, RecordLog};
use kvobs_core::{ChangeRecord, KeyPath, KeyValueObserver, KvoError, ObservationOptions, Record, Value};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn segment_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,8}"
}

fn segments_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(segment_strategy(), 1..=6)
}

const NAMES: [&str; 2] = ["Carol", "Dave"];
const POOL: usize = 4;

/// A mutation of the managers graph
#[derive(Debug, Clone)]
enum Step {
    /// Point the root at manager `i`, or clear it
    Assign(Option<usize>),
    /// Rename manager `i` to `NAMES[n]`
    Rename(usize, usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        proptest::option::of(0..POOL).prop_map(Step::Assign),
        (0..POOL, 0..NAMES.len()).prop_map(|(i, n)| Step::Rename(i, n)),
    ]
}

proptest! {
    #[test]
    fn dotted_identifiers_parse_to_their_segments(segments in segments_strategy()) {
        let joined = segments.join(".");
        let path = KeyPath::parse(&joined).unwrap();

        prop_assert_eq!(path.segments(), segments.as_slice());
        prop_assert_eq!(path.len(), segments.len());
        prop_assert_eq!(path.terminal(), segments.last().unwrap().as_str());
        prop_assert_eq!(path.to_string(), joined);
    }

    #[test]
    fn empty_segment_is_rejected(segments in segments_strategy(), at in 0usize..=6) {
        let mut segments = segments;
        let at = at.min(segments.len());
        segments.insert(at, String::new());

        let err = KeyPath::parse(&segments.join(".")).unwrap_err();
        prop_assert!(matches!(err, KvoError::InvalidSegment { .. }), "expected InvalidSegment, got {:?}", err);
    }

    #[test]
    fn observer_sees_exactly_effective_changes(values in proptest::collection::vec(0i64..4, 0..24)) {
        let counter = Record::builder("Counter").attribute("count", 0i64).build();
        let log = RecordLog::new();
        let _observer = KeyValueObserver::new(
            &counter,
            "count",
            ObservationOptions::OLD_NEW,
            log.block(),
        )
        .unwrap();

        let mut expected = Vec::new();
        let mut current = 0i64;
        for value in values {
            counter.set("count", value).unwrap();
            if value != current {
                expected.push((Some(Value::Int(current)), Some(Value::Int(value))));
                current = value;
            }
        }

        let seen: Vec<_> = log
            .records()
            .into_iter()
            .map(|r| (r.old_value, r.new_value))
            .collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn observer_sees_exactly_effective_changes_through_intermediate(
        steps in proptest::collection::vec(step_strategy(), 0..24),
    ) {
        // Managers start with repeated names so swaps can leave the name unchanged
        let mut names: Vec<&str> = (0..POOL).map(|i| NAMES[i % NAMES.len()]).collect();
        let managers: Vec<_> = names.iter().map(|name| person(name)).collect();
        let root = person("Alice");
        let log = RecordLog::new();
        let _observer = KeyValueObserver::new(
            &root,
            "manager.name",
            ObservationOptions::OLD_NEW,
            log.block(),
        )
        .unwrap();

        let mut current: Option<usize> = None;
        let mut expected = Vec::new();
        for step in steps {
            let before = current.map(|i| Value::from(names[i]));
            match step {
                Step::Assign(Some(i)) => {
                    root.set("manager", Value::object(&managers[i])).unwrap();
                    current = Some(i);
                }
                Step::Assign(None) => {
                    root.clear("manager").unwrap();
                    current = None;
                }
                Step::Rename(i, n) => {
                    managers[i].set("name", NAMES[n]).unwrap();
                    names[i] = NAMES[n];
                }
            }
            let after = current.map(|i| Value::from(names[i]));
            if before != after {
                expected.push((before, after));
            }
        }

        let seen: Vec<_> = log
            .records()
            .into_iter()
            .map(|r| (r.old_value, r.new_value))
            .collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn disposing_any_clone_disposes_all(clones in 1usize..8, pick in 0usize..8) {
        let counter = Record::builder("Counter").attribute("count", 0i64).build();
        let observer = KeyValueObserver::observe(&counter, "count", |_: &ChangeRecord| {}).unwrap();
        let aliases: Vec<_> = (0..clones).map(|_| observer.clone()).collect();

        aliases[pick % clones].dispose();

        prop_assert!(observer.is_disposed());
        prop_assert!(aliases.iter().all(KeyValueObserver::is_disposed));
        prop_assert_eq!(counter.observer_count("count"), 0);
    }
}
