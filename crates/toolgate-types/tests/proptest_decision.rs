//! Property-based tests for entitlement decisions
//!
//! These tests verify the metering properties of the decision formula:
//! - Pro accounts are unlimited regardless of usage
//! - Metered remaining is `max(0, limit - count)` and never negative
//! - `allowed` is exactly `remaining > 0`
//! - Only the literal `pro` plan string unlocks unlimited access

use proptest::prelude::*;
use toolgate_types::api::ToolAccessResponse;
use toolgate_types::{EntitlementDecision, Plan};

// ============================================================================
// Strategies
// ============================================================================

/// Plan strings that must never be read as pro
fn arb_non_pro_plan() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{0,12}".prop_filter("literal pro", |s| s != "pro"),
        Just("Pro".to_string()),
        Just("PRO".to_string()),
        Just(" pro".to_string()),
        Just("pro ".to_string()),
        Just("professional".to_string()),
    ]
}

// ============================================================================
// Decision Properties
// ============================================================================

proptest! {
    /// Property: Pro decisions are unlimited for any usage history
    #[test]
    fn prop_pro_always_unlimited(count in any::<u32>(), limit in any::<u32>()) {
        let decision = EntitlementDecision::for_plan(Plan::Pro, count, limit);
        prop_assert!(decision.allowed);
        prop_assert_eq!(decision.remaining, None);
    }

    /// Property: Free decisions follow max(0, limit - count)
    #[test]
    fn prop_free_remaining_formula(count in 0u32..10_000, limit in 0u32..10_000) {
        let decision = EntitlementDecision::for_plan(Plan::Free, count, limit);
        let expected = (i64::from(limit) - i64::from(count)).max(0) as u32;
        prop_assert_eq!(decision.remaining, Some(expected));
        prop_assert_eq!(decision.allowed, expected > 0);
        prop_assert_eq!(decision.allowed, count < limit);
    }

    /// Property: Consuming one use lowers remaining by exactly one until zero
    #[test]
    fn prop_one_use_decrements_by_one(count in 0u32..1_000, limit in 0u32..1_000) {
        let before = EntitlementDecision::from_count(count, limit);
        let after = EntitlementDecision::from_count(count + 1, limit);
        let (before, after) = (before.remaining.unwrap(), after.remaining.unwrap());
        if before > 0 {
            prop_assert_eq!(after, before - 1);
        } else {
            prop_assert_eq!(after, 0);
        }
    }

    /// Property: Non-pro plan strings decode as free
    #[test]
    fn prop_non_pro_strings_are_free(plan in arb_non_pro_plan()) {
        prop_assert_eq!(Plan::from_plan_str(&plan), Plan::Free);
    }

    /// Property: A wire response never yields allowed with zero remaining
    #[test]
    fn prop_wire_decision_consistent(
        allowed in any::<bool>(),
        remaining in proptest::option::of(0u32..100),
        pro in any::<bool>(),
    ) {
        let resp = ToolAccessResponse {
            allowed,
            remaining_uses: remaining,
            plan: if pro { Plan::Pro } else { Plan::Free },
        };
        let decision = resp.decision();
        match decision.remaining {
            None => prop_assert!(pro && decision.allowed),
            Some(n) => prop_assert_eq!(decision.allowed, n > 0),
        }
    }
}
