//! Model coefficients
//!
//! Named constants shared by the component rules. Built once per run and
//! never mutated while a ration is evaluated.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::nutrition::{IntakeError, IntakeResult};

/// Forage passage rate, %/h
pub const KP_FORAGE: &str = "KpFor";
/// Concentrate passage rate, %/h
pub const KP_CONCENTRATE: &str = "KpConc";
/// RUP intercept, kg/d
pub const RUP_INTERCEPT: &str = "IntRUP";
/// Reference CP intake the intercept was fitted at, kg/d
pub const REFERENCE_CP_INTAKE: &str = "refCPIn";
/// Duodenal escape of the A fraction
pub const A_FRACTION_ESCAPE: &str = "fCPAdu";
/// FA digestibility of fatty acid supplements, %
pub const FA_DIGESTIBILITY_BASE: &str = "TT_dcFA_Base";
/// FA digestibility of fat supplements, %
pub const FAT_DIGESTIBILITY_BASE: &str = "TT_dcFat_Base";
/// True digestibility of residual organic matter, %
pub const ROM_DIGESTIBILITY: &str = "Fd_dcrOM";

/// Immutable coefficient table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoefficientSet {
    values: BTreeMap<String, f64>,
}

impl CoefficientSet {
    /// Coefficients used by the standard component catalog
    pub fn nasem_defaults() -> Self {
        [
            (A_FRACTION_ESCAPE, 0.064),
            (KP_FORAGE, 4.87),
            (KP_CONCENTRATE, 5.28),
            (RUP_INTERCEPT, -0.086),
            (REFERENCE_CP_INTAKE, 3.39),
            (FA_DIGESTIBILITY_BASE, 73.0),
            (FAT_DIGESTIBILITY_BASE, 68.0),
            (ROM_DIGESTIBILITY, 96.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Load a JSON object of `name: value` pairs
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Defaults overlaid with the coefficients in a JSON file
    pub fn defaults_with_overrides<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let overrides = Self::from_json_str(&text)?;
        let mut values = Self::nasem_defaults().values;
        values.extend(overrides.values);
        Ok(Self { values })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look up a coefficient that a rule declared as required
    pub fn get(&self, name: &str) -> IntakeResult<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| IntakeError::MissingCoefficients {
                names: vec![name.to_string()],
            })
    }

    /// Names from `required` that are absent, sorted and deduplicated
    pub fn missing<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = required
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for CoefficientSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
