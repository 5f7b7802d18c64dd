//! Ration model
//!
//! The ordered list of feeds offered to the animal, with their intakes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::nutrition::{IntakeError, IntakeResult};

/// Name of the synthetic aggregate row; not a legal feedstuff name
pub const DIET_ROW: &str = "Diet";

/// One feed in a ration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub feedstuff: String,
    /// Share of diet dry matter, percent (0-100)
    pub dm_pct: f64,
    /// Dry matter intake of this feed, kg/d
    pub intake_kg: f64,
}

impl FeedEntry {
    pub fn new(feedstuff: impl Into<String>, dm_pct: f64, intake_kg: f64) -> Self {
        Self {
            feedstuff: feedstuff.into(),
            dm_pct,
            intake_kg,
        }
    }

    /// Share of diet dry matter as a fraction (0-1)
    pub fn dm_fraction(&self) -> f64 {
        self.dm_pct / 100.0
    }
}

/// A validated, immutable ration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ration {
    entries: Vec<FeedEntry>,
}

impl Ration {
    /// Build a ration, rejecting blank, reserved or duplicate names and
    /// out-of-range amounts.
    pub fn new(entries: Vec<FeedEntry>) -> IntakeResult<Self> {
        let mut seen = HashSet::new();

        for entry in &entries {
            let name = entry.feedstuff.trim();
            if name.is_empty() {
                return Err(IntakeError::InvalidRation("feedstuff name cannot be empty".to_string()));
            }
            if name == DIET_ROW {
                return Err(IntakeError::InvalidRation(format!(
                    "'{}' is reserved for the diet aggregate row",
                    DIET_ROW
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(IntakeError::InvalidRation(format!(
                    "feedstuff '{}' appears more than once",
                    name
                )));
            }
            if !entry.dm_pct.is_finite() || !(0.0..=100.0).contains(&entry.dm_pct) {
                return Err(IntakeError::InvalidRation(format!(
                    "dm_pct for '{}' must be between 0 and 100, got {}",
                    name, entry.dm_pct
                )));
            }
            if !entry.intake_kg.is_finite() || entry.intake_kg < 0.0 {
                return Err(IntakeError::InvalidRation(format!(
                    "intake_kg for '{}' must be non-negative, got {}",
                    name, entry.intake_kg
                )));
            }
        }

        let entries = entries
            .into_iter()
            .map(|e| FeedEntry {
                feedstuff: e.feedstuff.trim().to_string(),
                ..e
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total dry matter intake of the diet, kg/d
    pub fn total_intake_kg(&self) -> f64 {
        self.entries.iter().map(|e| e.intake_kg).sum()
    }

    /// Sum of dm_pct across all feeds; 100 for a complete ration
    pub fn total_dm_pct(&self) -> f64 {
        self.entries.iter().map(|e| e.dm_pct).sum()
    }

    pub fn feedstuff_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.feedstuff.as_str()).collect()
    }
}
