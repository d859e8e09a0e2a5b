//! Pricing tests
//!
//! Tests for consumable roll-up and margins including:
//! - Aggregation idempotence and additivity
//! - Margin sign and zero selling price
//! - Target margin inverse consistency

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::aggregation::aggregate;
use shared::margin::{self, PricingPolicy};
use shared::{CatalogSnapshot, ExpectedConsumable, Package, PricingError, Product, Treatment};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(name: &str, unit_price: Decimal) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        unit: "unit".to_string(),
        unit_price,
        selling_price: None,
        quantity: 50,
        min_quantity: 10,
        expiry_date: None,
        is_active: true,
    }
}

fn treatment(consumables: Vec<ExpectedConsumable>) -> Treatment {
    Treatment {
        id: Uuid::new_v4(),
        name: "Soin".to_string(),
        description: None,
        price: dec("5000"),
        expected_consumables: consumables,
        is_active: true,
        version: 1,
    }
}

fn package(soin_ids: Vec<Uuid>, prix_reduit: Decimal) -> Package {
    Package {
        id: Uuid::new_v4(),
        name: "Forfait".to_string(),
        description: None,
        soin_ids,
        prix_total: prix_reduit,
        prix_reduit,
        version: 1,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Package [A, A] where A uses 2 units of a 1000 product, sold 9000
    #[test]
    fn test_repeated_soin_package() {
        let p = product("Sérum", dec("1000"));
        let a = treatment(vec![ExpectedConsumable::new(p.id, dec("2"))]);
        let forfait = package(vec![a.id, a.id], dec("9000"));
        let catalog = CatalogSnapshot::new(vec![p.clone()], vec![a], vec![forfait.clone()]);

        let item = margin::pricing_item_for_package(&forfait, &catalog);

        assert_eq!(item.consumables.len(), 1);
        assert_eq!(item.consumables[0].quantity, dec("4"));
        assert_eq!(item.consumables_cost, dec("4000"));
        assert_eq!(item.margin, dec("5000"));
        // 55.56 rounds half up
        assert_eq!(item.margin_percentage, 56);
    }

    /// Unknown product contributes a zero-cost placeholder line
    #[test]
    fn test_unknown_product_line() {
        let missing = Uuid::new_v4();
        let a = treatment(vec![ExpectedConsumable::new(missing, dec("3"))]);
        let catalog = CatalogSnapshot::new(vec![], vec![a.clone()], vec![]);

        let lines = aggregate(&[a.id], &catalog);

        assert_eq!(lines.len(), 1);
        assert!(!lines[0].resolved);
        assert_eq!(lines[0].product_name, "Unknown product");
        assert_eq!(margin::cost(&lines), Decimal::ZERO);
    }

    #[test]
    fn test_price_for_target_margin() {
        let policy = PricingPolicy::default();
        assert_eq!(
            margin::price_for_target_margin(dec("7500"), dec("25"), &policy).unwrap(),
            dec("10000")
        );
        assert!(margin::price_for_target_margin(dec("7500"), dec("100"), &policy).is_err());
        assert!(margin::price_for_target_margin(dec("-1"), dec("25"), &policy).is_err());
    }

    /// CSV export carries one header row and one row per item
    #[test]
    fn test_csv_export_layout() {
        let p = product("Masque", dec("200"));
        let a = treatment(vec![ExpectedConsumable::new(p.id, dec("1.5"))]);
        let catalog = CatalogSnapshot::new(vec![p], vec![a], vec![]);
        let items = margin::pricing_catalog(&catalog);

        let mut wtr = csv::Writer::from_writer(vec![]);
        for row in shared::export::export_rows(&items) {
            wtr.serialize(row).unwrap();
        }
        let csv_data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = csv_data.lines().collect();

        assert_eq!(
            lines[0],
            "type,name,description,consumables,consumables_cost,selling_price,margin,margin_percentage,status"
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("soin,Soin,,Masque x1.5,"));
    }

    /// A cost whose target price leaves the Decimal range is a pricing error
    #[test]
    fn test_unpriceable_cost() {
        let cost = Decimal::from_i128_with_scale(10i128.pow(27), 0);
        assert_eq!(
            margin::recommend(cost, dec("99"), &PricingPolicy::default()).unwrap_err(),
            PricingError::PriceOverflow { cost }
        );
    }

    /// A cent of revenue against an enormous cost is a hugely negative margin
    #[test]
    fn test_margin_percentage_saturates() {
        let m = margin::margin(dec("0.01"), dec("100000000000000000000"));
        assert_eq!(m.margin, dec("-99999999999999999999.99"));
        assert_eq!(m.margin_percentage, i64::MIN);

        let m = margin::margin(dec("0.0000001"), dec("10000000000000000000000000"));
        assert_eq!(m.margin_percentage, i64::MIN);
    }

    #[test]
    fn test_summary_of_empty_catalog() {
        let summary = margin::summarize(&[]);
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.average_margin_percentage, Decimal::ZERO);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating consumable quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 100.00
    }

    /// Strategy for generating unit prices
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=500000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 5000.00
    }

    /// Any representable Decimal, sign and scale included
    fn any_decimal() -> impl Strategy<Value = Decimal> {
        (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28)
            .prop_map(|(lo, mid, hi, negative, scale)| Decimal::from_parts(lo, mid, hi, negative, scale))
    }

    /// Catalog of a few products and treatments plus a random soin list
    fn catalog_strategy() -> impl Strategy<Value = (CatalogSnapshot, Vec<Uuid>)> {
        (
            prop::collection::vec(price_strategy(), 1..5),
            prop::collection::vec(
                prop::collection::vec((0usize..5, quantity_strategy()), 0..4),
                1..4,
            ),
            prop::collection::vec(0usize..4, 0..8),
        )
            .prop_map(|(prices, plans, picks)| {
                let products: Vec<Product> =
                    prices.into_iter().map(|p| product("P", p)).collect();
                let treatments: Vec<Treatment> = plans
                    .into_iter()
                    .map(|plan| {
                        let mut seen = Vec::new();
                        let consumables = plan
                            .into_iter()
                            .filter_map(|(idx, qty)| {
                                let id = products[idx % products.len()].id;
                                if seen.contains(&id) {
                                    return None;
                                }
                                seen.push(id);
                                Some(ExpectedConsumable::new(id, qty))
                            })
                            .collect();
                        treatment(consumables)
                    })
                    .collect();
                let soin_ids = picks
                    .into_iter()
                    .map(|i| treatments[i % treatments.len()].id)
                    .collect();
                (CatalogSnapshot::new(products, treatments, vec![]), soin_ids)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Aggregating the same input twice yields identical output
        #[test]
        fn prop_aggregation_idempotent((catalog, soin_ids) in catalog_strategy()) {
            prop_assert_eq!(aggregate(&soin_ids, &catalog), aggregate(&soin_ids, &catalog));
        }

        /// Repeating the whole soin list doubles every quantity and the cost
        #[test]
        fn prop_aggregation_additive((catalog, soin_ids) in catalog_strategy()) {
            let once = aggregate(&soin_ids, &catalog);
            let doubled_ids: Vec<Uuid> = soin_ids.iter().chain(soin_ids.iter()).copied().collect();
            let twice = aggregate(&doubled_ids, &catalog);

            prop_assert_eq!(once.len(), twice.len());
            for (a, b) in once.iter().zip(twice.iter()) {
                prop_assert_eq!(a.product_id, b.product_id);
                prop_assert_eq!(a.quantity * Decimal::TWO, b.quantity);
            }
            prop_assert_eq!(margin::cost(&once) * Decimal::TWO, margin::cost(&twice));
        }

        /// margin == selling price - cost; percentage is 0 without a price
        #[test]
        fn prop_margin_sign(
            selling in price_strategy(),
            cost in price_strategy()
        ) {
            let m = margin::margin(selling, cost);
            prop_assert_eq!(m.margin, selling - cost);
            if selling == Decimal::ZERO {
                prop_assert_eq!(m.margin_percentage, 0);
            } else if selling > cost {
                prop_assert!(m.margin_percentage >= 0);
            } else {
                prop_assert!(m.margin_percentage <= 0);
            }
        }

        /// Margin math is total: no input pair panics
        #[test]
        fn prop_margin_never_panics(selling in any_decimal(), cost in any_decimal()) {
            let m = margin::margin(selling, cost);
            if selling <= Decimal::ZERO {
                prop_assert_eq!(m.margin_percentage, 0);
            }
            let _ = margin::price_for_target_margin(cost, dec("99"), &PricingPolicy::default());
        }

        /// The recommended price achieves the target within one point
        #[test]
        fn prop_target_margin_inverse(
            cost_cents in 1_000_000i64..=100_000_000i64,
            target in 0i64..=99i64
        ) {
            let cost = Decimal::new(cost_cents, 2);
            let target = Decimal::from(target);
            let rec = margin::recommend(cost, target, &PricingPolicy::default()).unwrap();

            prop_assert!(rec.recommended_price >= cost);
            let achieved = Decimal::from(rec.achieved.margin_percentage);
            prop_assert!((achieved - target).abs() <= Decimal::ONE);
        }
    }
}
