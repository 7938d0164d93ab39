//! Dashboard and financial report tests
//!
//! Covers the dashboard summary, outflows grouped by reference, warehouse
//! valuation and the cost delivered to end-use units.

mod common;

use chrono::NaiveDate;
use common::Fixture;
use inventory_server::services::catalog::CreateProductInput;
use inventory_server::services::ledger::RecordMovementInput;
use inventory_server::services::stock::ReportRange;
use inventory_server::AppError;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{MovementKind, ProductCategory};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn dated(input: RecordMovementInput, date: NaiveDate) -> RecordMovementInput {
    RecordMovementInput {
        movement_date: Some(date),
        ..input
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_dashboard_summary() {
        let fx = Fixture::new();
        let bulbs = fx.product("DSH-1", 5).await;
        let towels = fx
            .catalog
            .create_product(CreateProductInput {
                code: "DSH-2".to_string(),
                name: "Towels".to_string(),
                category: ProductCategory::Kitchen,
                cost_price: dec("1.00"),
                sale_price: dec("2.50"),
                supplier_id: None,
                min_stock: 0,
            })
            .await
            .unwrap();
        fx.product("DSH-3", 1).await;

        let main = fx.site("Main").await;
        let annex = fx.site("Annex").await;
        fx.site("Empty").await;
        let apartment = fx.unit("Apt 1").await;

        fx.receive(&bulbs, &main, 8).await;
        fx.receive(&towels, &annex, 4).await;
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        fx.record(dated(
            RecordMovementInput::new(towels.id, MovementKind::In, 1).to_site(annex.id),
            yesterday,
        ))
        .await
        .unwrap();
        fx.record(
            RecordMovementInput::new(bulbs.id, MovementKind::Transfer, 2)
                .from_site(main.id)
                .to_site(apartment.id),
        )
        .await
        .unwrap();
        fx.record(RecordMovementInput::new(bulbs.id, MovementKind::Out, 2).from_site(apartment.id))
            .await
            .unwrap();

        let summary = fx.stock.dashboard_summary().await.unwrap();
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.inventory_value, dec("72.50"));
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.movements_today, 4);

        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, ProductCategory::Maintenance);
        assert_eq!(summary.categories[0].products, 2);
        assert_eq!(summary.categories[1].products, 1);

        // The emptied apartment row still counts; the untouched site does not
        let names: Vec<&str> = summary.sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "Annex", "Apt 1"]);
        assert_eq!(summary.sites[0].value, dec("60.00"));
        assert_eq!(summary.sites[1].value, dec("12.50"));
        assert_eq!(summary.sites[2].value, Decimal::ZERO);
        assert_eq!(summary.sites[2].total_items, 1);
        assert_eq!(summary.sites[2].site_type, "Apartment");
    }

    #[tokio::test]
    async fn test_warehouse_values() {
        let fx = Fixture::new();
        let product = fx.product("WH-1", 1).await;
        let small = fx.site("Small").await;
        let big = fx.site("Big").await;
        let apartment = fx.unit("Apt 2").await;
        fx.receive(&product, &small, 1).await;
        fx.receive(&product, &big, 5).await;
        fx.receive(&product, &apartment, 9).await;

        let values = fx.stock.warehouse_values().await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].site_id, big.id);
        assert_eq!(values[0].value, dec("50.00"));
        assert_eq!(values[1].site_id, small.id);
    }

    #[tokio::test]
    async fn test_outflows_by_reference() {
        let fx = Fixture::new();
        let product = fx.product("OUT-1", 1).await;
        let warehouse = fx.site("W").await;
        let unit = fx.unit("U").await;
        fx.receive(&product, &warehouse, 20).await;

        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Out, 3)
                .from_site(warehouse.id)
                .to_site(unit.id)
                .with_reference("SAL-001"),
            day(1),
        ))
        .await
        .unwrap();
        let replacement = fx
            .record(dated(
                RecordMovementInput::new(product.id, MovementKind::Replacement, 2)
                    .from_site(warehouse.id),
                day(5),
            ))
            .await
            .unwrap();
        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Transfer, 4)
                .from_site(warehouse.id)
                .to_site(unit.id),
            day(5),
        ))
        .await
        .unwrap();
        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::AdjustmentNegative, 1)
                .from_site(warehouse.id),
            day(5),
        ))
        .await
        .unwrap();

        let outflows = fx.stock.outflows_by_reference(ReportRange::default()).await.unwrap();
        assert_eq!(outflows.len(), 2);
        assert_eq!(outflows[0].reference, replacement.movement.reference);
        assert_eq!(outflows[0].value, dec("20.00"));
        assert_eq!(outflows[0].destination_name, None);
        assert_eq!(outflows[1].reference, "SAL-001");
        assert_eq!(outflows[1].movement_date, day(1));
        assert_eq!(outflows[1].total_items, 3);
        assert_eq!(outflows[1].value, dec("30.00"));
        assert_eq!(outflows[1].origin_name.as_deref(), Some("W"));
        assert_eq!(outflows[1].destination_name.as_deref(), Some("U"));

        let later = fx
            .stock
            .outflows_by_reference(ReportRange::new(Some(day(2)), None))
            .await
            .unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].reference, replacement.movement.reference);

        let earlier = fx
            .stock
            .outflows_by_reference(ReportRange::new(Some(day(1)), Some(day(1))))
            .await
            .unwrap();
        assert_eq!(earlier.len(), 1);
        assert_eq!(earlier[0].reference, "SAL-001");
    }

    /// OUT records the receiving unit without crediting it
    #[tokio::test]
    async fn test_unit_costs() {
        let fx = Fixture::new();
        let product = fx.product("UC-1", 1).await;
        let warehouse = fx.site("W1").await;
        let overflow = fx.site("W2").await;
        let first = fx.unit("Unit 1").await;
        let second = fx.unit("Unit 2").await;
        fx.unit("Unit 3").await;
        fx.receive(&product, &warehouse, 20).await;

        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Out, 3)
                .from_site(warehouse.id)
                .to_site(first.id),
            day(1),
        ))
        .await
        .unwrap();
        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Transfer, 2)
                .from_site(warehouse.id)
                .to_site(first.id),
            day(5),
        ))
        .await
        .unwrap();
        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Transfer, 5)
                .from_site(warehouse.id)
                .to_site(overflow.id),
            day(5),
        ))
        .await
        .unwrap();
        fx.record(dated(
            RecordMovementInput::new(product.id, MovementKind::Replacement, 1)
                .from_site(warehouse.id)
                .to_site(second.id),
            day(5),
        ))
        .await
        .unwrap();

        assert_eq!(fx.quantity(&product, &first).await, 2);
        assert_eq!(fx.quantity(&product, &second).await, 0);

        let costs = fx.stock.unit_costs(ReportRange::default()).await.unwrap();
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0].site_id, first.id);
        assert_eq!(costs[0].total_cost, dec("50.00"));

        let later = fx
            .stock
            .unit_costs(ReportRange::new(Some(day(2)), Some(day(31))))
            .await
            .unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].total_cost, dec("20.00"));

        let none = fx
            .stock
            .unit_costs(ReportRange::new(Some(day(6)), None))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let fx = Fixture::new();
        let range = ReportRange::new(Some(day(9)), Some(day(1)));

        let err = fx.stock.outflows_by_reference(range).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "from"));
        let err = fx.stock.unit_costs(range).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Every unit delivered by OUT shows up once in the outflows and in the unit cost
        #[test]
        fn prop_outflows_match_deliveries(quantities in prop::collection::vec(1i32..10, 1..10)) {
            runtime().block_on(async {
                let fx = Fixture::new();
                let product = fx.product("PROP-R", 1).await;
                let warehouse = fx.site("W").await;
                let unit = fx.unit("U").await;
                fx.receive(&product, &warehouse, 100).await;

                for quantity in &quantities {
                    fx.record(
                        RecordMovementInput::new(product.id, MovementKind::Out, *quantity)
                            .from_site(warehouse.id)
                            .to_site(unit.id),
                    )
                    .await
                    .unwrap();
                }

                let delivered: i64 = quantities.iter().map(|q| i64::from(*q)).sum();
                let outflows = fx.stock.outflows_by_reference(ReportRange::default()).await.unwrap();
                prop_assert_eq!(outflows.len(), quantities.len());
                prop_assert_eq!(outflows.iter().map(|o| o.total_items).sum::<i64>(), delivered);

                let costs = fx.stock.unit_costs(ReportRange::default()).await.unwrap();
                prop_assert_eq!(costs.len(), 1);
                prop_assert_eq!(costs[0].total_cost, Decimal::from(delivered) * dec("10.00"));
                prop_assert_eq!(fx.global_stock(&product).await, 100 - delivered);
                Ok(())
            })?;
        }
    }
}
