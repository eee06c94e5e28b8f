use serde::{Deserialize, Serialize};

pub const DEFAULT_TAX_RATE_PERCENT: f64 = 8.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub member_price: f64,
    pub sv: f64,
    pub cv: f64,
    pub is_bundle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegInput {
    pub id: u32,
    pub name: String,
    #[serde(rename = "currentGSV", default)]
    pub current_gsv: f64,
    #[serde(rename = "targetGSV", default)]
    pub target_gsv: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex_reload_date: Option<String>,
}

impl LegInput {
    pub fn new(id: u32, name: impl Into<String>, current_gsv: f64, target_gsv: f64) -> Self {
        Self {
            id,
            name: name.into(),
            current_gsv,
            target_gsv,
            flex_points: None,
            flex_reload_date: None,
        }
    }

    /// Shortfall of this leg against its own target, floored at zero.
    pub fn gap(&self) -> f64 {
        (self.target_gsv - self.current_gsv).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalStats {
    #[serde(rename = "currentDCSV", default)]
    pub current_dcsv: f64,
    #[serde(rename = "currentGSV", default)]
    pub current_gsv: f64,
}

/// Qualification thresholds for the personal volume requirements.
///
/// The direct-customer and group requirements are alternative paths: the
/// personal gap is the larger of the two shortfalls, never their sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub direct_customer_volume: f64,
    pub group_volume: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            direct_customer_volume: 250.0,
            group_volume: 3_000.0,
        }
    }
}

impl PersonalStats {
    pub fn dcsv_gap(&self, thresholds: &Thresholds) -> f64 {
        (thresholds.direct_customer_volume - self.current_dcsv).max(0.0)
    }

    pub fn gsv_gap(&self, thresholds: &Thresholds) -> f64 {
        (thresholds.group_volume - self.current_gsv).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub product: Product,
    pub efficiency: f64,
    pub theoretical_qty: u64,
    pub theoretical_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub personal_gap: f64,
    pub legs_gap: f64,
    pub total_gap: f64,
    pub cost_to_fix: f64,
    pub product_menu: Vec<MenuEntry>,
}
