//! Ration input files
//!
//! Plain text, one item per line:
//!
//! ```text
//! # comment
//! *DMI: 24.5               animal input
//! $Use_DNDF_IV: 1          equation selection flag
//! Corn silage: 45          feed, % of diet DM (kg from *DMI)
//! Soybean meal: 15, 3.6    feed, % of diet DM and kg DM/d
//! ```
//!
//! Lines starting with `#` and lines without `:` are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::models::{FeedEntry, Ration, SelectionFlags};
use crate::nutrition::{target_milk_net_energy, IntakeError};

/// Animal input holding total dry matter intake, kg/d
pub const DMI: &str = "DMI";
pub const MILK_FAT_PCT: &str = "Trg_MilkFatp";
pub const MILK_TRUE_PROTEIN_PCT: &str = "Trg_MilkTPp";
pub const MILK_LACTOSE_PCT: &str = "Trg_MilkLacp";
pub const MILK_YIELD_KG: &str = "Trg_MilkProd";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Feed '{feedstuff}' has no intake and no *DMI is given")]
    MissingIntake { feedstuff: String },

    #[error(transparent)]
    Ration(#[from] IntakeError),
}

/// One feed line as written
#[derive(Debug, Clone, PartialEq)]
pub struct RationLine {
    pub feedstuff: String,
    pub dm_pct: f64,
    pub intake_kg: Option<f64>,
}

/// Parsed contents of a ration input file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RationInput {
    pub feeds: Vec<RationLine>,
    pub animal: BTreeMap<String, f64>,
    pub flags: SelectionFlags,
}

fn parse_number<T: std::str::FromStr>(line: usize, key: &str, raw: &str) -> Result<T, InputError> {
    raw.trim().parse().map_err(|_| InputError::Parse {
        line,
        message: format!("'{}' is not a valid number for {}", raw.trim(), key),
    })
}

impl RationInput {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, InputError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, InputError> {
        let mut input = RationInput::default();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };

            if let Some(name) = key.strip_prefix('*') {
                let name = name.trim();
                input.animal.insert(name.to_string(), parse_number(line, name, value)?);
            } else if let Some(name) = key.strip_prefix('$') {
                let name = name.trim();
                input.flags.insert(name, parse_number(line, name, value)?);
            } else {
                let feedstuff = key.trim().to_string();
                let (dm_pct, intake_kg) = match value.split_once(',') {
                    Some((pct, kg)) => (
                        parse_number(line, &feedstuff, pct)?,
                        Some(parse_number(line, &feedstuff, kg)?),
                    ),
                    None => (parse_number(line, &feedstuff, value)?, None),
                };
                input.feeds.push(RationLine {
                    feedstuff,
                    dm_pct,
                    intake_kg,
                });
            }
        }

        tracing::debug!(
            feeds = input.feeds.len(),
            animal_inputs = input.animal.len(),
            flags = ?input.flags,
            "Parsed ration input"
        );
        Ok(input)
    }

    pub fn animal_input(&self, name: &str) -> Option<f64> {
        self.animal.get(name).copied()
    }

    /// Build the ration, filling missing intakes from `*DMI`
    pub fn to_ration(&self) -> Result<Ration, InputError> {
        let dmi = self.animal_input(DMI);
        let entries = self
            .feeds
            .iter()
            .map(|feed| {
                let intake_kg = match (feed.intake_kg, dmi) {
                    (Some(kg), _) => kg,
                    (None, Some(dmi)) => feed.dm_pct / 100.0 * dmi,
                    (None, None) => {
                        return Err(InputError::MissingIntake {
                            feedstuff: feed.feedstuff.clone(),
                        })
                    }
                };
                Ok(FeedEntry::new(feed.feedstuff.clone(), feed.dm_pct, intake_kg))
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        Ok(Ration::new(entries)?)
    }

    /// Target milk net energy, Mcal/kg, when milk fat is given.
    ///
    /// Missing protein or lactose fall through to the fat-only equation.
    pub fn target_milk_net_energy(&self) -> Option<f64> {
        let fat = self.animal_input(MILK_FAT_PCT)?;
        let protein = self.animal_input(MILK_TRUE_PROTEIN_PCT).unwrap_or(f64::NAN);
        let lactose = self.animal_input(MILK_LACTOSE_PCT).unwrap_or(f64::NAN);
        Some(target_milk_net_energy(fat, protein, lactose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::USE_DNDF_IV;

    const SAMPLE: &str = "\
# Lactating cow ration
*DMI: 20
*Trg_MilkFatp: 3.8
$Use_DNDF_IV: 1

Corn silage: 60
Soybean meal: 40, 7.5
notes without a separator
";

    #[test]
    fn test_parse_sample() {
        let input = RationInput::parse(SAMPLE).unwrap();
        assert_eq!(input.animal_input(DMI), Some(20.0));
        assert_eq!(input.flags.get(USE_DNDF_IV), Some(1));
        assert_eq!(input.feeds.len(), 2);
        assert_eq!(
            input.feeds[1],
            RationLine {
                feedstuff: "Soybean meal".to_string(),
                dm_pct: 40.0,
                intake_kg: Some(7.5),
            }
        );
    }

    #[test]
    fn test_intake_defaults_from_dmi() {
        let ration = RationInput::parse(SAMPLE).unwrap().to_ration().unwrap();
        assert_eq!(ration.entries()[0].intake_kg, 12.0);
        assert_eq!(ration.entries()[1].intake_kg, 7.5);
    }

    #[test]
    fn test_missing_intake_without_dmi() {
        let input = RationInput::parse("Hay: 100").unwrap();
        assert!(matches!(input.to_ration(), Err(InputError::MissingIntake { .. })));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let err = RationInput::parse("# header\nHay: lots").unwrap_err();
        assert!(matches!(err, InputError::Parse { line: 2, .. }));

        let err = RationInput::parse("$Use_DNDF_IV: 1.5").unwrap_err();
        assert!(matches!(err, InputError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_invalid_ration_surfaces() {
        let input = RationInput::parse("Hay: 50, 10\nHay: 50, 10").unwrap();
        assert!(matches!(input.to_ration(), Err(InputError::Ration(IntakeError::InvalidRation(_)))));
    }

    #[test]
    fn test_milk_energy_needs_fat() {
        assert!(RationInput::parse("Hay: 100, 20").unwrap().target_milk_net_energy().is_none());
        let energy = RationInput::parse(SAMPLE).unwrap().target_milk_net_energy().unwrap();
        assert!((energy - (0.36 + 9.69 * 3.8 / 100.0)).abs() < 1e-12);
    }
}
