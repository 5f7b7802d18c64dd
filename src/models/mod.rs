//! Data models
//!
//! Rations, feed library records, model inputs and the intake table.

mod coefficients;
mod feed;
mod intake;
mod ration;
mod selection;

pub use coefficients::{
    CoefficientSet, A_FRACTION_ESCAPE, FAT_DIGESTIBILITY_BASE, FA_DIGESTIBILITY_BASE,
    KP_CONCENTRATE, KP_FORAGE, REFERENCE_CP_INTAKE, ROM_DIGESTIBILITY, RUP_INTERCEPT,
};
pub use feed::{FeedCategory, FeedComposition};
pub use intake::{ComponentColumn, ComponentResult, IntakeRow, NutrientIntakeTable, UnitBasis};
pub use ration::{FeedEntry, Ration, DIET_ROW};
pub use selection::{EquationSelection, NdfDigestibilitySource, SelectionFlags, USE_DNDF_IV};
