//! Property-based tests for items, patches and search.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Status parsing is case-insensitive and roundtrips
//! - Id parsing accepts exactly the integers
//! - Patches never touch fields they leave empty
//! - Search results are exactly the case-insensitive substring matches
//! - Map store ids are unique and dense

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::sync::Arc;
use todo_app::{Item, ItemId, ItemPatch, ItemStatus, ItemStore, MapStore, NewItem, TodoService};

fn status_strategy() -> impl Strategy<Value = ItemStatus> {
    prop::sample::select(ItemStatus::all().to_vec())
}

fn open_service() -> TodoService {
    let store = Arc::new(MapStore::new());
    store.open().unwrap();
    TodoService::new(store)
}

// ============================================================================
// Parsing
// ============================================================================

proptest! {
    /// Property: status parsing ignores case.
    #[test]
    fn prop_status_parse_case_insensitive(status in status_strategy(), mask in any::<u16>()) {
        let mixed: String = status
            .as_str()
            .chars()
            .enumerate()
            .map(|(i, c)| if mask & (1 << (i % 16)) == 0 { c.to_ascii_lowercase() } else { c })
            .collect();
        prop_assert_eq!(mixed.parse::<ItemStatus>().unwrap(), status);
    }

    /// Property: anything that is not a status name is rejected.
    #[test]
    fn prop_unknown_status_rejected(s in "[a-z]{0,12}") {
        let known = ItemStatus::all().iter().any(|st| st.as_str().eq_ignore_ascii_case(&s));
        prop_assume!(!known);
        prop_assert!(s.parse::<ItemStatus>().is_err());
    }

    /// Property: every i64 roundtrips through the path form.
    #[test]
    fn prop_item_id_roundtrips(raw in any::<i64>()) {
        let id: ItemId = raw.to_string().parse().unwrap();
        prop_assert_eq!(id.get(), raw);
    }

    /// Property: non-numeric path segments never parse as ids.
    #[test]
    fn prop_non_numeric_id_rejected(s in "[a-zA-Z_][a-zA-Z0-9_]{0,10}") {
        prop_assert!(s.parse::<ItemId>().is_err());
    }
}

// ============================================================================
// Partial update
// ============================================================================

proptest! {
    /// Property: a patch changes exactly the non-empty fields.
    #[test]
    fn prop_patch_changes_only_present_fields(
        task in ".{0,40}",
        original in status_strategy(),
        new_task in prop::option::of(".{0,20}"),
        new_status in prop::option::of(status_strategy()),
    ) {
        let mut item = Item { id: ItemId::new(1), task: task.clone(), status: original };
        let patch = ItemPatch {
            task: new_task.clone(),
            status: new_status.map(|s| s.as_str().to_string()),
        };
        patch.apply_to(&mut item).unwrap();

        let expected_task = new_task.filter(|t| !t.is_empty()).unwrap_or(task);
        prop_assert_eq!(item.task, expected_task);
        prop_assert_eq!(item.status, new_status.unwrap_or(original));
        prop_assert_eq!(item.id, ItemId::new(1));
    }

    /// Property: applying the same patch twice equals applying it once.
    #[test]
    fn prop_patch_is_idempotent(
        new_task in prop::option::of("[a-z ]{0,20}"),
        new_status in prop::option::of(status_strategy()),
    ) {
        let patch = ItemPatch {
            task: new_task,
            status: new_status.map(|s| s.as_str().to_string()),
        };
        let mut once = Item {
            id: ItemId::new(0),
            task: "A".to_string(),
            status: ItemStatus::Created,
        };
        patch.apply_to(&mut once).unwrap();
        let mut twice = once.clone();
        patch.apply_to(&mut twice).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// ============================================================================
// Service
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: search returns exactly the items whose task contains the query.
    #[test]
    fn prop_search_matches_substring_filter(
        tasks in prop::collection::vec("[a-dA-D ]{0,12}", 0..20),
        query in "[a-dA-D]{1,3}",
    ) {
        let service = open_service();
        for task in &tasks {
            service.add(NewItem::new(task.clone())).unwrap();
        }

        let mut found: Vec<String> = service
            .search(&query)
            .unwrap()
            .into_iter()
            .map(|i| i.task)
            .collect();
        let needle = query.to_lowercase();
        let mut expected: Vec<String> = tasks
            .into_iter()
            .filter(|t| t.to_lowercase().contains(&needle))
            .collect();
        found.sort();
        expected.sort();
        prop_assert_eq!(found, expected);
    }

    /// Property: map store ids count up from zero without gaps or repeats.
    #[test]
    fn prop_map_store_ids_are_sequential(count in 1usize..50) {
        let service = open_service();
        for i in 0..count {
            let item = service.add(NewItem::new(format!("task {i}"))).unwrap();
            prop_assert_eq!(item.id.get(), i64::try_from(i).unwrap());
            prop_assert_eq!(item.status, ItemStatus::Created);
        }
        prop_assert_eq!(service.get_all().unwrap().len(), count);
    }
}
