mod cart;
mod catalog;
mod engine;
mod gate;
mod types;
mod view;

pub use cart::{Cart, CartSummary, summarize_cart};
pub use catalog::{Catalog, CatalogError};
pub use engine::{compute, compute_with_thresholds};
pub use gate::{AccessGate, DEFAULT_MASTER_CODE};
pub use types::{
    DEFAULT_TAX_RATE_PERCENT, LegInput, MenuEntry, PersonalStats, Product, SimulationResult,
    Thresholds,
};
pub use view::{ViewMode, select_entries};
