use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use super::types::Product;

const EMBEDDED_CATALOG: &str = include_str!("../../data/products.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("product at index {index} has an empty sku")]
    EmptySku { index: usize },
    #[error("duplicate sku `{0}` in catalog")]
    DuplicateSku(String),
    #[error("product `{sku}` must have a finite sv > 0, got {sv}")]
    InvalidSv { sku: String, sv: f64 },
    #[error("product `{sku}` must have a finite member price >= 0, got {price}")]
    InvalidPrice { sku: String, price: f64 },
}

/// Products validated at load so the engine can divide by `sv` unguarded.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(mut products: Vec<Product>) -> Result<Self, CatalogError> {
        validate(&products)?;
        for product in &mut products {
            // -0.0 would sort ahead of 0.0 under total_cmp
            product.member_price += 0.0;
        }
        Ok(Self { products })
    }

    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Self::new(products)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

fn validate(products: &[Product]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(products.len());
    for (index, product) in products.iter().enumerate() {
        if product.sku.trim().is_empty() {
            return Err(CatalogError::EmptySku { index });
        }
        if !seen.insert(product.sku.as_str()) {
            return Err(CatalogError::DuplicateSku(product.sku.clone()));
        }
        if !product.sv.is_finite() || product.sv <= 0.0 {
            return Err(CatalogError::InvalidSv {
                sku: product.sku.clone(),
                sv: product.sv,
            });
        }
        if !product.member_price.is_finite() || product.member_price < 0.0 {
            return Err(CatalogError::InvalidPrice {
                sku: product.sku.clone(),
                price: product.member_price,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, member_price: f64, sv: f64) -> Product {
        Product {
            sku: sku.to_string(),
            name: sku.to_string(),
            member_price,
            sv,
            cv: 0.0,
            is_bundle: false,
        }
    }

    #[test]
    fn embedded_catalog_is_valid_and_non_empty() {
        let catalog = Catalog::embedded().expect("embedded catalog must load");
        assert!(!catalog.is_empty());
        assert!(catalog.products().iter().all(|p| p.sv > 0.0));
    }

    #[test]
    fn parses_original_field_names() {
        let json = r#"[
          {"sku": "KIT-1", "name": "Starter Kit", "memberPrice": 99.5, "sv": 100, "cv": 80, "isBundle": true}
        ]"#;
        let catalog = Catalog::from_json(json).expect("valid catalog");
        let p = &catalog.products()[0];
        assert_eq!(p.sku, "KIT-1");
        assert_eq!(p.member_price, 99.5);
        assert!(p.is_bundle);
    }

    #[test]
    fn rejects_zero_sv() {
        let err = Catalog::new(vec![product("ZERO", 10.0, 0.0)]).expect_err("sv of 0 must fail");
        assert!(matches!(err, CatalogError::InvalidSv { .. }));
    }

    #[test]
    fn negative_zero_price_loads_as_zero() {
        let json = r#"[
          {"sku": "FREE", "name": "Free", "memberPrice": -0.0, "sv": 5, "cv": 0, "isBundle": false}
        ]"#;
        let catalog = Catalog::from_json(json).expect("-0.0 is a valid price");
        let price = catalog.products()[0].member_price;
        assert_eq!(price, 0.0);
        assert!(price.is_sign_positive());
    }

    #[test]
    fn rejects_negative_price() {
        let err = Catalog::new(vec![product("NEG", -1.0, 10.0)]).expect_err("negative price");
        assert!(matches!(err, CatalogError::InvalidPrice { .. }));
    }

    #[test]
    fn rejects_duplicate_sku() {
        let err = Catalog::new(vec![product("DUP", 1.0, 1.0), product("DUP", 2.0, 2.0)])
            .expect_err("duplicate sku");
        assert!(err.to_string().contains("DUP"));
    }

    #[test]
    fn rejects_blank_sku() {
        let err = Catalog::new(vec![product("  ", 1.0, 1.0)]).expect_err("blank sku");
        assert!(matches!(err, CatalogError::EmptySku { index: 0 }));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Catalog::from_path(Path::new("/definitely/not/here/products.json"))
            .expect_err("missing file");
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
