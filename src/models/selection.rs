//! Equation selection flags
//!
//! Integer switches arrive as a raw name → value map and are mapped onto
//! closed enumerations before any row is evaluated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::nutrition::IntakeError;

/// Flag selecting the NDF digestibility source
pub const USE_DNDF_IV: &str = "Use_DNDF_IV";

/// Raw selection flags as read from input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionFlags {
    values: BTreeMap<String, i64>,
}

impl SelectionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }
}

/// Source of the base NDF digestibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdfDigestibilitySource {
    /// Lignin-based estimate for every feed
    Lignin,
    /// 48 h in-vitro value for forage-containing feeds that have one
    InVitroForages,
    /// 48 h in-vitro value for every feed that has one
    InVitroAll,
}

impl NdfDigestibilitySource {
    const TABLE: [(i64, NdfDigestibilitySource); 3] = [
        (0, NdfDigestibilitySource::Lignin),
        (1, NdfDigestibilitySource::InVitroForages),
        (2, NdfDigestibilitySource::InVitroAll),
    ];

    pub fn from_flag(value: i64) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(code, _)| *code == value)
            .map(|(_, source)| *source)
    }

    pub fn allowed() -> Vec<i64> {
        Self::TABLE.iter().map(|(code, _)| *code).collect()
    }
}

/// Typed equation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationSelection {
    pub ndf_digestibility: NdfDigestibilitySource,
}

impl EquationSelection {
    /// Map raw flags to enumerations, collecting every bad or absent flag
    pub fn from_flags(flags: &SelectionFlags) -> Result<Self, Vec<IntakeError>> {
        let mut errors = Vec::new();

        let ndf_digestibility = match flags.get(USE_DNDF_IV) {
            Some(value) => match NdfDigestibilitySource::from_flag(value) {
                Some(source) => Some(source),
                None => {
                    errors.push(IntakeError::InvalidSelectionFlag {
                        flag: USE_DNDF_IV.to_string(),
                        value,
                        allowed: NdfDigestibilitySource::allowed(),
                    });
                    None
                }
            },
            None => {
                errors.push(IntakeError::MissingSelectionFlag {
                    flag: USE_DNDF_IV.to_string(),
                });
                None
            }
        };

        match ndf_digestibility {
            Some(ndf_digestibility) if errors.is_empty() => Ok(Self { ndf_digestibility }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_each_allowed_value() {
        for (value, expected) in [
            (0, NdfDigestibilitySource::Lignin),
            (1, NdfDigestibilitySource::InVitroForages),
            (2, NdfDigestibilitySource::InVitroAll),
        ] {
            let flags = SelectionFlags::new().with(USE_DNDF_IV, value);
            let selection = EquationSelection::from_flags(&flags).unwrap();
            assert_eq!(selection.ndf_digestibility, expected);
        }
    }

    #[test]
    fn test_rejects_out_of_domain_value() {
        let flags = SelectionFlags::new().with(USE_DNDF_IV, 3);
        let errors = EquationSelection::from_flags(&flags).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            IntakeError::InvalidSelectionFlag { flag, value, allowed } => {
                assert_eq!(flag, USE_DNDF_IV);
                assert_eq!(*value, 3);
                assert_eq!(allowed, &vec![0, 1, 2]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_requires_flag() {
        let errors = EquationSelection::from_flags(&SelectionFlags::new()).unwrap_err();
        assert!(matches!(errors[0], IntakeError::MissingSelectionFlag { .. }));
    }
}
