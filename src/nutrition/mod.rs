//! Nutrient intake engine
//!
//! Component rules, the catalog that orders and validates them, and the
//! aggregator that turns a ration into a nutrient intake table.

pub mod aggregator;
pub mod catalog;
pub mod error;
pub mod milk;
pub mod provider;
pub mod rules;
pub mod summary;

pub use aggregator::NutrientAggregator;
pub use catalog::{ComponentCatalog, ComponentRule, RowContext};
pub use error::{IntakeError, IntakeResult};
pub use milk::{target_milk_net_energy, target_milk_net_energy_output};
pub use provider::{FeedCompositionProvider, FeedLibrary};
pub use summary::DietSummary;
