use super::types::{LegInput, MenuEntry, PersonalStats, Product, SimulationResult, Thresholds};

/// Recomputes the full gap analysis and product menu from scratch.
///
/// Uses the default qualification thresholds; see [`compute_with_thresholds`].
pub fn compute(
    personal: &PersonalStats,
    legs: &[LegInput],
    tax_rate_percent: f64,
    catalog: &[Product],
) -> SimulationResult {
    compute_with_thresholds(
        &Thresholds::default(),
        personal,
        legs,
        tax_rate_percent,
        catalog,
    )
}

pub fn compute_with_thresholds(
    thresholds: &Thresholds,
    personal: &PersonalStats,
    legs: &[LegInput],
    tax_rate_percent: f64,
    catalog: &[Product],
) -> SimulationResult {
    let personal_gap = personal_gap(thresholds, personal);
    let legs_gap = legs_gap(legs);
    let total_gap = personal_gap + legs_gap;

    let product_menu = build_product_menu(catalog, total_gap, tax_rate_percent);
    let cost_to_fix = product_menu
        .first()
        .map(|entry| entry.theoretical_cost)
        .unwrap_or(0.0);

    SimulationResult {
        personal_gap,
        legs_gap,
        total_gap,
        cost_to_fix,
        product_menu,
    }
}

fn personal_gap(thresholds: &Thresholds, personal: &PersonalStats) -> f64 {
    personal
        .dcsv_gap(thresholds)
        .max(personal.gsv_gap(thresholds))
}

fn legs_gap(legs: &[LegInput]) -> f64 {
    legs.iter().map(LegInput::gap).sum()
}

fn build_product_menu(
    catalog: &[Product],
    total_gap: f64,
    tax_rate_percent: f64,
) -> Vec<MenuEntry> {
    let tax_multiplier = 1.0 + tax_rate_percent / 100.0;
    let mut menu: Vec<MenuEntry> = catalog
        .iter()
        .map(|product| {
            let theoretical_qty = units_to_close(total_gap, product.sv);
            MenuEntry {
                product: product.clone(),
                // + 0.0 folds -0.0 into 0.0 so it ties with zero-price items
                efficiency: product.member_price / product.sv + 0.0,
                theoretical_qty,
                theoretical_cost: theoretical_qty as f64 * product.member_price * tax_multiplier,
            }
        })
        .collect();

    // Stable: equal efficiencies keep catalog order.
    menu.sort_by(|a, b| a.efficiency.total_cmp(&b.efficiency));
    menu
}

/// Whole units needed to cover `total_gap`. A quotient too large for `u64`
/// (including one that overflowed to infinity) saturates at `u64::MAX`.
fn units_to_close(total_gap: f64, sv: f64) -> u64 {
    if total_gap > 0.0 {
        (total_gap / sv).ceil() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn product(sku: &str, member_price: f64, sv: f64) -> Product {
        Product {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            member_price,
            sv,
            cv: sv * 0.8,
            is_bundle: false,
        }
    }

    fn sample_catalog() -> Vec<Product> {
        vec![
            product("A-100", 60.0, 40.0),
            product("B-200", 50.0, 100.0),
            product("C-300", 200.0, 250.0),
            product("D-400", 25.0, 50.0),
            product("E-500", 12.0, 6.0),
        ]
    }

    fn qualified() -> PersonalStats {
        PersonalStats {
            current_dcsv: 250.0,
            current_gsv: 3_000.0,
        }
    }

    #[test]
    fn empty_personal_stats_leave_full_group_gap() {
        let personal = PersonalStats::default();
        let result = compute(&personal, &[], 0.0, &sample_catalog());

        assert_approx(result.personal_gap, 3_000.0);
        assert_approx(result.legs_gap, 0.0);
        assert_approx(result.total_gap, 3_000.0);
    }

    #[test]
    fn single_short_leg_sets_legs_gap() {
        let legs = [LegInput::new(1, "Leg 3 (Leader)", 8_000.0, 10_000.0)];
        let result = compute(&qualified(), &legs, 0.0, &sample_catalog());

        assert_approx(result.personal_gap, 0.0);
        assert_approx(result.legs_gap, 2_000.0);
        assert_approx(result.total_gap, 2_000.0);
    }

    #[test]
    fn single_product_quantity_and_taxed_cost() {
        // dcsv gap 250, gsv gap 0 -> total gap 250
        let personal = PersonalStats {
            current_dcsv: 0.0,
            current_gsv: 3_000.0,
        };
        let catalog = [product("ONLY", 50.0, 100.0)];
        let result = compute(&personal, &[], 10.0, &catalog);

        assert_approx(result.total_gap, 250.0);
        let entry = &result.product_menu[0];
        assert_approx(entry.efficiency, 0.5);
        assert_eq!(entry.theoretical_qty, 3);
        assert_approx(entry.theoretical_cost, 165.0);
        assert_approx(result.cost_to_fix, 165.0);
    }

    #[test]
    fn zero_gap_costs_nothing() {
        let legs = [LegInput::new(1, "Leg 1", 12_000.0, 10_000.0)];
        let result = compute(&qualified(), &legs, 8.05, &sample_catalog());

        assert_approx(result.total_gap, 0.0);
        assert_approx(result.cost_to_fix, 0.0);
        for entry in &result.product_menu {
            assert_eq!(entry.theoretical_qty, 0);
            assert_approx(entry.theoretical_cost, 0.0);
        }
    }

    #[test]
    fn empty_catalog_has_zero_cost_to_fix() {
        let result = compute(&PersonalStats::default(), &[], 8.05, &[]);
        assert!(result.product_menu.is_empty());
        assert_approx(result.cost_to_fix, 0.0);
        assert_approx(result.total_gap, 3_000.0);
    }

    #[test]
    fn personal_gap_is_worse_of_two_requirements_not_sum() {
        let personal = PersonalStats {
            current_dcsv: 100.0,
            current_gsv: 2_900.0,
        };
        let result = compute(&personal, &[], 0.0, &[]);
        // dcsv gap 150 beats gsv gap 100
        assert_approx(result.personal_gap, 150.0);
    }

    #[test]
    fn negative_inputs_widen_gap_instead_of_failing() {
        let personal = PersonalStats {
            current_dcsv: -50.0,
            current_gsv: 3_000.0,
        };
        let legs = [LegInput::new(7, "Leg", -100.0, 0.0)];
        let result = compute(&personal, &legs, 0.0, &[]);
        assert_approx(result.personal_gap, 300.0);
        assert_approx(result.legs_gap, 100.0);
    }

    #[test]
    fn menu_is_sorted_by_efficiency_with_catalog_order_on_ties() {
        let catalog = vec![
            product("TIE-1", 10.0, 20.0),
            product("CHEAP", 1.0, 10.0),
            product("TIE-2", 5.0, 10.0),
            product("DEAR", 9.0, 3.0),
        ];
        let result = compute(&PersonalStats::default(), &[], 0.0, &catalog);
        let skus: Vec<&str> = result
            .product_menu
            .iter()
            .map(|entry| entry.product.sku.as_str())
            .collect();
        assert_eq!(skus, ["CHEAP", "TIE-1", "TIE-2", "DEAR"]);
    }

    #[test]
    fn negative_zero_price_keeps_catalog_order_among_free_items() {
        let catalog = vec![product("FREE-1", 0.0, 10.0), product("FREE-2", -0.0, 10.0)];
        let result = compute(&PersonalStats::default(), &[], 0.0, &catalog);
        let skus: Vec<&str> = result
            .product_menu
            .iter()
            .map(|entry| entry.product.sku.as_str())
            .collect();
        assert_eq!(skus, ["FREE-1", "FREE-2"]);
    }

    #[test]
    fn overflowing_quantity_saturates() {
        let personal = PersonalStats {
            current_dcsv: 250.0,
            current_gsv: -f64::MAX,
        };
        let catalog = [product("TINY", 1.0, 1e-300)];
        let result = compute(&personal, &[], 0.0, &catalog);

        assert!(result.total_gap.is_finite());
        assert_eq!(result.product_menu[0].theoretical_qty, u64::MAX);
        assert!(result.cost_to_fix.is_finite());
    }

    #[test]
    fn cost_to_fix_follows_efficiency_not_smallest_bill() {
        // Gap of 10: one big pack costs 90, ten singles would cost 10, but
        // the pack has the better price per SV.
        let catalog = vec![product("SINGLE", 1.0, 1.0), product("PACK", 90.0, 100.0)];
        let personal = PersonalStats {
            current_dcsv: 250.0,
            current_gsv: 2_990.0,
        };
        let result = compute(&personal, &[], 0.0, &catalog);
        assert_eq!(result.product_menu[0].product.sku, "PACK");
        assert_eq!(result.product_menu[0].theoretical_qty, 1);
        assert_approx(result.cost_to_fix, 90.0);
        assert_approx(result.product_menu[1].theoretical_cost, 10.0);
    }

    #[test]
    fn custom_thresholds_replace_defaults() {
        let thresholds = Thresholds {
            direct_customer_volume: 500.0,
            group_volume: 1_000.0,
        };
        let personal = PersonalStats {
            current_dcsv: 100.0,
            current_gsv: 900.0,
        };
        let result = compute_with_thresholds(&thresholds, &personal, &[], 0.0, &[]);
        assert_approx(result.personal_gap, 400.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_gap_decomposition_holds(
            dcsv in -500i32..1_000,
            gsv in -1_000i32..6_000,
            legs in proptest::collection::vec((0u32..50_000, 0u32..50_000), 0..8),
        ) {
            let personal = PersonalStats {
                current_dcsv: dcsv as f64,
                current_gsv: gsv as f64,
            };
            let legs: Vec<LegInput> = legs
                .iter()
                .enumerate()
                .map(|(i, (current, target))| {
                    LegInput::new(i as u32 + 1, format!("Leg {}", i + 1), *current as f64, *target as f64)
                })
                .collect();

            let result = compute(&personal, &legs, 8.05, &sample_catalog());

            let dc_gap = (250.0 - personal.current_dcsv).max(0.0);
            let gsv_gap = (3_000.0 - personal.current_gsv).max(0.0);
            prop_assert_eq!(result.personal_gap, dc_gap.max(gsv_gap));

            let expected_legs: f64 = legs
                .iter()
                .map(|l| (l.target_gsv - l.current_gsv).max(0.0))
                .sum();
            prop_assert_eq!(result.legs_gap, expected_legs);
            prop_assert_eq!(result.total_gap, result.personal_gap + result.legs_gap);
            prop_assert!(result.personal_gap >= 0.0);
            prop_assert!(result.legs_gap >= 0.0);

            if dcsv >= 250 && gsv >= 3_000 {
                prop_assert_eq!(result.personal_gap, 0.0);
            }
        }

        #[test]
        fn prop_menu_is_complete_sorted_and_covers_gap(
            gap_gsv in 0u32..20_000,
            tax_bp in 0u32..2_500,
            products in proptest::collection::vec((0u32..50_000, 1u32..40_000), 0..12),
        ) {
            let catalog: Vec<Product> = products
                .iter()
                .enumerate()
                .map(|(i, (price_cents, sv_tenths))| {
                    product(&format!("SKU-{i}"), *price_cents as f64 / 100.0, *sv_tenths as f64 / 10.0)
                })
                .collect();
            let personal = PersonalStats {
                current_dcsv: 250.0,
                current_gsv: 3_000.0 - gap_gsv as f64,
            };
            let tax = tax_bp as f64 / 100.0;

            let result = compute(&personal, &[], tax, &catalog);

            prop_assert_eq!(result.product_menu.len(), catalog.len());
            for window in result.product_menu.windows(2) {
                prop_assert!(window[0].efficiency <= window[1].efficiency);
            }
            let mut seen: Vec<&str> = result
                .product_menu
                .iter()
                .map(|entry| entry.product.sku.as_str())
                .collect();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), catalog.len());

            for entry in &result.product_menu {
                let covered = entry.theoretical_qty as f64 * entry.product.sv;
                prop_assert!(covered + 1e-9 >= result.total_gap);
                if result.total_gap == 0.0 {
                    prop_assert_eq!(entry.theoretical_qty, 0);
                    prop_assert_eq!(entry.theoretical_cost, 0.0);
                }
            }

            match result.product_menu.first() {
                Some(first) => prop_assert_eq!(result.cost_to_fix, first.theoretical_cost),
                None => prop_assert_eq!(result.cost_to_fix, 0.0),
            }
        }

        #[test]
        fn prop_compute_is_idempotent(
            dcsv in 0u32..500,
            gsv in 0u32..5_000,
            tax_bp in 0u32..2_000,
        ) {
            let personal = PersonalStats {
                current_dcsv: dcsv as f64,
                current_gsv: gsv as f64,
            };
            let legs = [
                LegInput::new(1, "Leg 1", 35_000.0, 40_000.0),
                LegInput::new(2, "Leg 2", 1_500.0, 2_000.0),
            ];
            let tax = tax_bp as f64 / 100.0;
            let first = compute(&personal, &legs, tax, &sample_catalog());
            let second = compute(&personal, &legs, tax, &sample_catalog());
            prop_assert_eq!(first, second);
        }
    }
}
