use std::collections::BTreeMap;

use serde::Serialize;

use super::types::SimulationResult;

/// Units the user intends to buy, keyed by SKU.
pub type Cart = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub total_sv: f64,
    /// Member price total before tax.
    pub total_cost: f64,
    pub remaining_gap: f64,
    pub gap_covered: bool,
}

/// Projects the cart onto a computed result. SKUs absent from the menu are
/// ignored.
pub fn summarize_cart(result: &SimulationResult, cart: &Cart) -> CartSummary {
    let (total_sv, total_cost) =
        result
            .product_menu
            .iter()
            .fold((0.0, 0.0), |(sv, cost), entry| {
                let qty = cart.get(&entry.product.sku).copied().unwrap_or(0) as f64;
                (
                    sv + qty * entry.product.sv,
                    cost + qty * entry.product.member_price,
                )
            });

    let remaining_gap = (result.total_gap - total_sv).max(0.0);
    CartSummary {
        total_sv,
        total_cost,
        remaining_gap,
        gap_covered: remaining_gap == 0.0 && result.total_gap > 0.0,
    }
}
