//! Marginal tier schedule for parent units and the flat child rate.
//!
//! Monthly prices in minor currency units. The nth parent unit is billed at
//! the marginal price of the tier it lands in, so the total for q units is
//! the sum of the first q marginal prices.

use stayrate_core::Cents;

/// Flat monthly price per child unit.
pub const CHILD_UNIT_PRICE: Cents = 399;

/// Properties a trialing tenant may hold.
pub const TRIAL_PROPERTY_LIMIT: u32 = 10;

/// `(last unit index of the tier, marginal price)`, ascending.
const PARENT_TIERS: [(u32, Cents); 5] = [
    (1, 1399),
    (5, 1199),
    (15, 899),
    (30, 549),
    (u32::MAX, 399),
];

/// Marginal price of the nth parent unit (1-based).
pub fn parent_marginal_price(unit_index: u32) -> Cents {
    debug_assert!(unit_index >= 1);
    for (upper, price) in PARENT_TIERS {
        if unit_index <= upper {
            return price;
        }
    }
    // Unreachable: the last tier is unbounded.
    PARENT_TIERS[PARENT_TIERS.len() - 1].1
}

/// Monthly total for `quantity` parent units.
pub fn tiered_parent_total(quantity: u32) -> Cents {
    let mut total = 0;
    let mut unit = 1;
    while unit <= quantity {
        // Walk tier by tier instead of unit by unit.
        let price = parent_marginal_price(unit);
        let tier_upper = PARENT_TIERS
            .iter()
            .find(|(upper, _)| unit <= *upper)
            .map(|(upper, _)| *upper)
            .unwrap_or(u32::MAX);
        let units_in_tier = quantity.min(tier_upper) - unit + 1;
        total += units_in_tier as Cents * price;
        unit += units_in_tier;
    }
    total
}

/// Monthly total for `quantity` child units.
pub fn child_total(quantity: u32) -> Cents {
    quantity as Cents * CHILD_UNIT_PRICE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn marginal_prices_follow_the_schedule() {
        assert_eq!(parent_marginal_price(1), 1399);
        assert_eq!(parent_marginal_price(2), 1199);
        assert_eq!(parent_marginal_price(5), 1199);
        assert_eq!(parent_marginal_price(6), 899);
        assert_eq!(parent_marginal_price(15), 899);
        assert_eq!(parent_marginal_price(16), 549);
        assert_eq!(parent_marginal_price(30), 549);
        assert_eq!(parent_marginal_price(31), 399);
        assert_eq!(parent_marginal_price(500), 399);
    }

    #[test]
    fn seven_parents_total_7993() {
        // 1×1399 + 4×1199 + 2×899
        assert_eq!(tiered_parent_total(7), 7993);
    }

    #[test]
    fn seven_parents_and_two_children_total_8791() {
        assert_eq!(tiered_parent_total(7) + child_total(2), 8791);
    }

    #[test]
    fn zero_quantity_is_zero_not_one() {
        assert_eq!(tiered_parent_total(0), 0);
        assert_eq!(child_total(0), 0);
    }

    #[test]
    fn full_tier_boundaries() {
        assert_eq!(tiered_parent_total(1), 1399);
        assert_eq!(tiered_parent_total(5), 1399 + 4 * 1199);
        assert_eq!(tiered_parent_total(15), 1399 + 4 * 1199 + 10 * 899);
        assert_eq!(
            tiered_parent_total(30),
            1399 + 4 * 1199 + 10 * 899 + 15 * 549
        );
        assert_eq!(
            tiered_parent_total(31),
            1399 + 4 * 1199 + 10 * 899 + 15 * 549 + 399
        );
    }

    proptest! {
        /// The total is exactly the sum of the first q marginal prices.
        #[test]
        fn total_equals_marginal_sum(q in 0u32..200) {
            let expected: Cents = (1..=q).map(parent_marginal_price).sum();
            prop_assert_eq!(tiered_parent_total(q), expected);
        }

        /// Monotone non-decreasing in quantity.
        #[test]
        fn total_is_monotone(q in 0u32..200) {
            prop_assert!(tiered_parent_total(q + 1) >= tiered_parent_total(q));
        }
    }
}
