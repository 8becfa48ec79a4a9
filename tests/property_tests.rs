//! Property-based tests for the inventory account invariants.
//!
//! These use proptest to verify that no sequence of quantity or level
//! mutations can ever leave an account outside its invariants, and that the
//! ledger records exactly one movement per effective change.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use stockledger::entities::{inventory_account, product, stock_movement::MovementKind};
use stockledger::errors::ServiceError;

fn active_product() -> product::Model {
    let now = Utc::now();
    product::Model {
        id: Uuid::new_v4(),
        sku: "SKU-TEST".to_string(),
        name: "Test product".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn invariants_hold(account: &inventory_account::Model) -> bool {
    0 <= account.quantity_on_hand
        && account.quantity_on_hand <= account.max_level
        && account.reorder_level <= account.max_level
}

proptest! {
    // The prop_assume! below rejects ~2/3 of generated cases, so 500 cases
    // need ~1500 draws; the default global-reject budget of 1024 makes the
    // test flaky. Raise the budget so the same assumptions can be satisfied.
    #![proptest_config(ProptestConfig {
        max_global_rejects: 8192,
        ..ProptestConfig::with_cases(500)
    })]

    #[test]
    fn set_quantity_preserves_invariants(
        initial in 0i32..500,
        reorder in 0i32..500,
        max in 0i32..500,
        targets in prop::collection::vec(-200i32..800, 1..20),
    ) {
        prop_assume!(initial <= max && reorder <= max);

        let actor = Uuid::new_v4();
        let (mut account, opening) = inventory_account::Model::new(
            &active_product(), Uuid::new_v4(), initial, reorder, max, actor,
        ).unwrap();
        prop_assert_eq!(opening.quantity, initial);
        prop_assert!(invariants_hold(&account));

        for target in targets {
            let before = account.clone();
            match account.set_quantity(target, actor) {
                Ok(Some(movement)) => {
                    prop_assert!(invariants_hold(&account));
                    prop_assert_eq!(account.quantity_on_hand, target);
                    prop_assert_eq!(movement.quantity, (target - before.quantity_on_hand).abs());
                    let expected_kind = if target > before.quantity_on_hand {
                        MovementKind::StockIncreaseAdjustment
                    } else {
                        MovementKind::StockDecreaseAdjustment
                    };
                    prop_assert_eq!(movement.kind, expected_kind);
                }
                Ok(None) => {
                    // idempotent no-op: nothing changed, nothing recorded
                    prop_assert_eq!(target, before.quantity_on_hand);
                    prop_assert_eq!(&account, &before);
                }
                Err(ServiceError::InvariantViolation(_)) => {
                    prop_assert!(target < 0 || target > before.max_level);
                    prop_assert_eq!(&account, &before);
                }
                Err(other) => {
                    prop_assert!(false, "unexpected error: {}", other);
                }
            }
        }
    }

    #[test]
    fn update_levels_preserves_invariants(
        initial in 0i32..200,
        updates in prop::collection::vec((0i32..400, 0i32..400, 0i32..400), 1..10),
    ) {
        let actor = Uuid::new_v4();
        let (mut account, _) = inventory_account::Model::new(
            &active_product(), Uuid::new_v4(), initial, 0, 200, actor,
        ).unwrap();

        for (quantity, reorder, ceiling) in updates {
            let before = account.clone();
            match account.update_levels(quantity, reorder, ceiling, actor) {
                Ok(_) => {
                    prop_assert!(invariants_hold(&account));
                    prop_assert_eq!(account.quantity_on_hand, quantity);
                    prop_assert_eq!(account.reorder_level, reorder);
                    prop_assert_eq!(account.max_level, ceiling);
                }
                Err(ServiceError::InvariantViolation(_)) => {
                    prop_assert!(quantity > ceiling || reorder > ceiling);
                    prop_assert_eq!(&account, &before);
                }
                Err(other) => {
                    prop_assert!(false, "unexpected error: {}", other);
                }
            }
        }
    }
}
