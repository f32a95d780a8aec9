//! Merging a local collection snapshot with the remote one.
//!
//! # Algorithm
//!
//! 1. Every remote record, verbatim and in remote order (remote wins on any
//!    shared id)
//! 2. Then every local record whose id is unknown remotely and is not a
//!    `temp_` placeholder, in local order
//!
//! Local placeholders that did not make it to the remote store in this pass
//! are left out of the merged view.

use std::collections::HashSet;

use crate::SyncRecord;

/// Merge a local and a remote snapshot of the same collection.
pub fn merge_records(local: &[SyncRecord], remote: &[SyncRecord]) -> Vec<SyncRecord> {
    let remote_ids: HashSet<&str> = remote.iter().map(|r| r.id.as_str()).collect();

    let mut merged = Vec::with_capacity(remote.len() + local.len());
    merged.extend(remote.iter().cloned());
    merged.extend(
        local
            .iter()
            .filter(|r| !remote_ids.contains(r.id.as_str()) && !r.is_temp())
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rec(value: Value) -> SyncRecord {
        serde_json::from_value(value).unwrap()
    }

    fn ids(records: &[SyncRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn remote_wins_and_temp_is_dropped() {
        let local = vec![
            rec(json!({"id": "a", "v": 1})),
            rec(json!({"id": "temp_9", "_needsSync": true, "v": 2})),
        ];
        let remote = vec![rec(json!({"id": "a", "v": 99}))];

        let merged = merge_records(&local, &remote);
        assert_eq!(merged, vec![rec(json!({"id": "a", "v": 99}))]);
    }

    #[test]
    fn local_only_confirmed_record_survives() {
        let local = vec![rec(json!({"id": "local-only", "v": 5}))];
        let merged = merge_records(&local, &[]);
        assert_eq!(merged, local);
    }

    #[test]
    fn remote_order_then_local_order() {
        let local = vec![
            rec(json!({"id": "l2"})),
            rec(json!({"id": "r1"})),
            rec(json!({"id": "l1"})),
        ];
        let remote = vec![rec(json!({"id": "r2"})), rec(json!({"id": "r1"}))];

        let merged = merge_records(&local, &remote);
        assert_eq!(ids(&merged), vec!["r2", "r1", "l2", "l1"]);
    }

    #[test]
    fn empty_inputs() {
        assert!(merge_records(&[], &[]).is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn arb_id() -> impl Strategy<Value = String> {
            prop_oneof![
                (0u8..20).prop_map(|n| format!("doc-{}", n)),
                (0u8..5).prop_map(|n| format!("temp_{}", n)),
            ]
        }

        fn arb_records() -> impl Strategy<Value = Vec<SyncRecord>> {
            proptest::collection::vec((arb_id(), 0i64..1000), 0..12).prop_map(|entries| {
                let mut seen = HashSet::new();
                entries
                    .into_iter()
                    .filter(|(id, _)| seen.insert(id.clone()))
                    .map(|(id, v)| rec(json!({"id": id, "v": v})))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn prop_remote_is_a_prefix(local in arb_records(), remote in arb_records()) {
                let merged = merge_records(&local, &remote);
                prop_assert_eq!(&merged[..remote.len()], &remote[..]);
            }

            #[test]
            fn prop_no_temp_from_local_and_no_duplicates(
                local in arb_records(),
                remote in arb_records(),
            ) {
                let merged = merge_records(&local, &remote);

                let mut seen = HashSet::new();
                for record in &merged {
                    prop_assert!(seen.insert(record.id.clone()), "duplicate id {}", record.id);
                }
                for record in &merged[remote.len()..] {
                    prop_assert!(!record.is_temp());
                }
            }

            #[test]
            fn prop_merge_is_idempotent(local in arb_records(), remote in arb_records()) {
                let once = merge_records(&local, &remote);
                let twice = merge_records(&once, &remote);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
