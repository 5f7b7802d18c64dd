//! Whole-diet derived quantities

use serde::{Deserialize, Serialize};

use crate::models::IntakeRow;

use super::rules::{CP_INTAKE_KG, FORAGE_NDF, NDF_INTAKE_KG, RUP_INTAKE_KG};

/// Quantities that only make sense once the Diet row exists.
///
/// A field is `None` when the catalog did not publish what it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DietSummary {
    pub dm_intake_kg: f64,
    pub cp_intake_kg: Option<f64>,
    pub rup_intake_kg: Option<f64>,
    /// Rumen-degradable protein, kg/d
    pub rdp_kg: Option<f64>,
    pub rdp_fraction_of_cp: Option<f64>,
    pub forage_ndf_fraction_of_ndf: Option<f64>,
}

impl DietSummary {
    /// Derive the summary from the Diet aggregate row
    pub fn from_diet(diet: &IntakeRow) -> Self {
        let cp = diet.quantity(CP_INTAKE_KG);
        let rup = diet.quantity(RUP_INTAKE_KG);
        let rdp = cp.zip(rup).map(|(cp, rup)| cp - rup);

        let forage_ndf = diet.component(FORAGE_NDF).map(|c| c.kg_per_day);
        let ndf = diet.quantity(NDF_INTAKE_KG);

        Self {
            dm_intake_kg: diet.entry.intake_kg,
            cp_intake_kg: cp,
            rup_intake_kg: rup,
            rdp_kg: rdp,
            rdp_fraction_of_cp: rdp.zip(cp).filter(|(_, cp)| *cp > 0.0).map(|(rdp, cp)| rdp / cp),
            forage_ndf_fraction_of_ndf: forage_ndf
                .zip(ndf)
                .filter(|(_, ndf)| *ndf > 0.0)
                .map(|(forage, ndf)| forage / ndf),
        }
    }
}
