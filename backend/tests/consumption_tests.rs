//! Consumption reconciliation tests
//!
//! Tests for variance reporting including:
//! - Variance sign and cost impact
//! - Strict entity checks
//! - Session reconciliation and statistics

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::variance::{self, ReconciliationScope};
use shared::{ExpectedConsumable, Product, RecordedConsumption, ReconcileError, Treatment};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(unit_price: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Gel".to_string(),
        unit: "ml".to_string(),
        unit_price: dec(unit_price),
        selling_price: None,
        quantity: 40,
        min_quantity: 5,
        expiry_date: None,
        is_active: true,
    }
}

/// Scope with one appointment and one soin planning the given lines
fn scope(products: &[Product], planned: &[(usize, &str)]) -> (ReconciliationScope, Uuid, Uuid) {
    let appointment_id = Uuid::new_v4();
    let soin = Treatment {
        id: Uuid::new_v4(),
        name: "Peeling".to_string(),
        description: None,
        price: dec("8000"),
        expected_consumables: planned
            .iter()
            .map(|(idx, qty)| ExpectedConsumable::new(products[*idx].id, dec(qty)))
            .collect(),
        is_active: true,
        version: 1,
    };
    let soin_id = soin.id;
    (
        ReconciliationScope {
            appointment_ids: vec![appointment_id],
            treatments: vec![soin],
            products: products.to_vec(),
        },
        appointment_id,
        soin_id,
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Expected 2, actual 5, unit price 1000
    #[test]
    fn test_overconsumption() {
        let v = variance::variance(dec("2"), dec("5"), dec("1000"));
        assert_eq!(v.variance_quantity, dec("3"));
        assert_eq!(v.variance_percentage, dec("150"));
        assert_eq!(v.cost_impact, dec("3000"));
    }

    /// Nothing expected: percentage is 0 but the cost still counts
    #[test]
    fn test_nothing_expected() {
        let v = variance::variance(Decimal::ZERO, dec("3"), dec("250"));
        assert_eq!(v.variance_percentage, Decimal::ZERO);
        assert_eq!(v.cost_impact, dec("750"));
    }

    #[test]
    fn test_percentage_rounds_to_two_places() {
        let v = variance::variance(dec("3"), dec("4"), dec("1"));
        assert_eq!(v.variance_percentage, dec("33.33"));
    }

    /// Ratios beyond the Decimal range saturate instead of panicking
    #[test]
    fn test_extreme_variance_saturates() {
        let v = variance::variance(dec("0.0000001"), dec("100000000000000000000000"), dec("1"));
        assert_eq!(v.variance_percentage, Decimal::MAX);
    }

    /// Quantities the report columns cannot hold unchanged are refused
    #[test]
    fn test_unstorable_quantities_rejected() {
        let p = product("100");
        let (scope, appointment_id, soin_id) = scope(&[p.clone()], &[]);
        let now = Utc::now();

        let err = variance::reconcile(&scope, appointment_id, soin_id, p.id, dec("0.0004"), dec("1"), now)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidQuantity { field: "expected_quantity", .. }));

        let err = variance::reconcile(&scope, appointment_id, soin_id, p.id, dec("1"), dec("1000000000"), now)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidQuantity { field: "actual_quantity", .. }));

        let recorded = vec![RecordedConsumption { product_id: p.id, actual_quantity: dec("1.23456") }];
        let err = variance::reconcile_session(&scope, appointment_id, soin_id, &recorded, now).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidQuantity { .. }));

        // smallest expected against the largest actual still fits NUMERIC(18, 2)
        let report = variance::reconcile(&scope, appointment_id, soin_id, p.id, dec("0.001"), dec("999999999.999"), now)
            .unwrap();
        assert_eq!(report.variance_percentage, dec("99999999999800"));
    }

    #[test]
    fn test_unknown_entities_are_rejected() {
        let p = product("100");
        let (scope, appointment_id, soin_id) = scope(&[p.clone()], &[(0, "1")]);
        let now = Utc::now();

        let err = variance::reconcile(&scope, Uuid::new_v4(), soin_id, p.id, dec("1"), dec("1"), now)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownAppointment(_)));

        let err = variance::reconcile(&scope, appointment_id, Uuid::new_v4(), p.id, dec("1"), dec("1"), now)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownTreatment(_)));

        let err = variance::reconcile(&scope, appointment_id, soin_id, Uuid::new_v4(), dec("1"), dec("1"), now)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownProduct(_)));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let p = product("100");
        let (scope, appointment_id, soin_id) = scope(&[p.clone()], &[]);
        let err = variance::reconcile(&scope, appointment_id, soin_id, p.id, dec("1"), dec("-1"), Utc::now())
            .unwrap_err();
        assert_eq!(err, ReconcileError::NegativeQuantity { field: "actual_quantity" });
    }

    /// Planned but unused lines get actual 0; unplanned lines get expected 0
    #[test]
    fn test_session_fills_zeros() {
        let planned = product("10");
        let unused = product("20");
        let extra = product("30");
        let products = vec![planned.clone(), unused.clone(), extra.clone()];
        let (scope, appointment_id, soin_id) = scope(&products, &[(0, "2"), (1, "1")]);

        let recorded = vec![
            RecordedConsumption { product_id: planned.id, actual_quantity: dec("3") },
            RecordedConsumption { product_id: extra.id, actual_quantity: dec("1") },
        ];
        let reports =
            variance::reconcile_session(&scope, appointment_id, soin_id, &recorded, Utc::now()).unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].product_id, planned.id);
        assert_eq!(reports[0].variance_quantity, dec("1"));
        assert_eq!(reports[1].product_id, unused.id);
        assert_eq!(reports[1].actual_quantity, Decimal::ZERO);
        assert_eq!(reports[1].cost_impact, dec("-20"));
        assert_eq!(reports[2].product_id, extra.id);
        assert_eq!(reports[2].expected_quantity, Decimal::ZERO);
        assert_eq!(reports[2].variance_percentage, Decimal::ZERO);
    }

    /// Top overconsumed products keep the five worst averages
    #[test]
    fn test_statistics_ranking() {
        let p = product("1");
        let (scope, appointment_id, soin_id) = scope(&[p.clone()], &[]);
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let mut reports = Vec::new();
        for (i, pct) in [5, 40, 10, 60, -20, 30, 20].iter().enumerate() {
            let product_id = Uuid::new_v4();
            let mut product_scope = scope.clone();
            product_scope.products.push(Product { id: product_id, ..p.clone() });
            let expected = dec("100");
            let actual = expected + Decimal::from(*pct);
            let report = variance::reconcile(&product_scope, appointment_id, soin_id, product_id, expected, actual, date)
                .unwrap()
                .into_report(Uuid::from_u128(i as u128 + 1));
            reports.push(report);
        }

        let stats = variance::statistics(&reports);
        let ranked: Vec<Decimal> = stats
            .top_overconsumed_products
            .iter()
            .map(|p| p.average_variance)
            .collect();

        assert_eq!(stats.total_reports, 7);
        assert_eq!(ranked, vec![dec("60"), dec("40"), dec("30"), dec("20"), dec("10")]);
        assert_eq!(stats.average_variance, dec("20.71"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 1000.00
    }

    /// Any representable Decimal, sign and scale included
    fn any_decimal() -> impl Strategy<Value = Decimal> {
        (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28)
            .prop_map(|(lo, mid, hi, negative, scale)| Decimal::from_parts(lo, mid, hi, negative, scale))
    }

    /// Strategy for generating positive unit prices
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Overconsumption always costs money, underconsumption saves it
        #[test]
        fn prop_variance_sign(
            expected in quantity_strategy(),
            actual in quantity_strategy(),
            unit_price in price_strategy()
        ) {
            let v = variance::variance(expected, actual, unit_price);
            prop_assert_eq!(v.variance_quantity, actual - expected);
            prop_assert_eq!(v.cost_impact, (actual - expected) * unit_price);
            if actual > expected {
                prop_assert!(v.cost_impact > Decimal::ZERO);
            }
            if actual < expected {
                prop_assert!(v.cost_impact < Decimal::ZERO);
            }
        }

        /// Variance math is total over the whole Decimal range
        #[test]
        fn prop_variance_never_panics(
            expected in any_decimal(),
            actual in any_decimal(),
            unit_price in any_decimal()
        ) {
            let v = variance::variance(expected, actual, unit_price);
            if expected <= Decimal::ZERO {
                prop_assert_eq!(v.variance_percentage, Decimal::ZERO);
            }
        }

        /// Percentage is 0 whenever nothing was expected
        #[test]
        fn prop_zero_expected_percentage(
            actual in quantity_strategy(),
            unit_price in price_strategy()
        ) {
            let v = variance::variance(Decimal::ZERO, actual, unit_price);
            prop_assert_eq!(v.variance_percentage, Decimal::ZERO);
        }

        /// A session yields one report per planned or recorded product
        #[test]
        fn prop_session_covers_every_product(
            planned_qty in prop::collection::vec(price_strategy(), 1..4),
            recorded_qty in prop::collection::vec(quantity_strategy(), 0..4)
        ) {
            let products: Vec<Product> = (0..planned_qty.len() + recorded_qty.len())
                .map(|_| product("5"))
                .collect();
            let planned: Vec<(usize, String)> = planned_qty
                .iter()
                .enumerate()
                .map(|(i, q)| (i, q.to_string()))
                .collect();
            let planned_refs: Vec<(usize, &str)> =
                planned.iter().map(|(i, q)| (*i, q.as_str())).collect();
            let (scope, appointment_id, soin_id) = scope(&products, &planned_refs);

            let recorded: Vec<RecordedConsumption> = recorded_qty
                .iter()
                .enumerate()
                .map(|(i, q)| RecordedConsumption {
                    product_id: products[planned_qty.len() + i].id,
                    actual_quantity: *q,
                })
                .collect();

            let reports = variance::reconcile_session(&scope, appointment_id, soin_id, &recorded, Utc::now())
                .unwrap();
            prop_assert_eq!(reports.len(), planned_qty.len() + recorded_qty.len());
        }
    }
}
