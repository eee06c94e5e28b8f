use serde::{Deserialize, Serialize};

use super::types::MenuEntry;

const TOP_N: usize = 10;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    Top10,
    All,
}

/// Picks the menu entries to display.
///
/// A non-blank search term matches name or SKU case-insensitively and
/// disables the top-10 limit.
pub fn select_entries<'a>(
    menu: &'a [MenuEntry],
    search: &str,
    mode: ViewMode,
) -> Vec<&'a MenuEntry> {
    let needle = search.trim().to_lowercase();
    if !needle.is_empty() {
        return menu
            .iter()
            .filter(|entry| {
                entry.product.name.to_lowercase().contains(&needle)
                    || entry.product.sku.to_lowercase().contains(&needle)
            })
            .collect();
    }

    match mode {
        ViewMode::Top10 => menu.iter().take(TOP_N).collect(),
        ViewMode::All => menu.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Product;

    fn menu(n: usize) -> Vec<MenuEntry> {
        (0..n)
            .map(|i| MenuEntry {
                product: Product {
                    sku: format!("SKU-{i:02}"),
                    name: if i % 2 == 0 {
                        format!("Protein Shake {i}")
                    } else {
                        format!("Face Serum {i}")
                    },
                    member_price: 10.0 + i as f64,
                    sv: 10.0,
                    cv: 8.0,
                    is_bundle: false,
                },
                efficiency: 1.0 + i as f64 / 10.0,
                theoretical_qty: 0,
                theoretical_cost: 0.0,
            })
            .collect()
    }

    #[test]
    fn top10_limits_without_search() {
        let menu = menu(15);
        let shown = select_entries(&menu, "", ViewMode::Top10);
        assert_eq!(shown.len(), 10);
        assert_eq!(shown[0].product.sku, "SKU-00");
    }

    #[test]
    fn all_shows_everything() {
        let menu = menu(15);
        assert_eq!(select_entries(&menu, "   ", ViewMode::All).len(), 15);
    }

    #[test]
    fn search_ignores_case_and_limit() {
        let menu = menu(30);
        let shown = select_entries(&menu, "  PROTEIN ", ViewMode::Top10);
        assert_eq!(shown.len(), 15);
        assert!(shown.iter().all(|e| e.product.name.starts_with("Protein")));
    }

    #[test]
    fn search_matches_sku() {
        let menu = menu(15);
        let shown = select_entries(&menu, "sku-1", ViewMode::Top10);
        assert_eq!(shown.len(), 5);
    }

    #[test]
    fn view_mode_parses_wire_names() {
        let mode: ViewMode = serde_json::from_str("\"top10\"").expect("alias");
        assert_eq!(mode, ViewMode::Top10);
        let mode: ViewMode = serde_json::from_str("\"all\"").expect("all");
        assert_eq!(mode, ViewMode::All);
    }
}
