//! Nutrient intake table
//!
//! Per-feed and whole-diet results of evaluating the component catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ration::{FeedEntry, Ration, DIET_ROW};
use crate::nutrition::DietSummary;

/// How a component's value is expressed and scaled to kg/d
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitBasis {
    /// Fraction of feed DM, scaled by diet share and total diet intake
    PercentOfDm,
    /// Fraction of feed CP, scaled through the feed's CP fraction
    PercentOfCrudeProtein,
    /// kg per kg of feed DM, scaled by the feed's own intake
    IntakeScaled,
}

/// Value triple for one component of one row
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub value: f64,
    /// Fraction of diet DM contributed
    pub pct_of_diet: f64,
    pub kg_per_day: f64,
}

impl ComponentResult {
    pub fn new(value: f64, pct_of_diet: f64, kg_per_day: f64) -> Self {
        Self {
            value,
            pct_of_diet,
            kg_per_day,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.pct_of_diet.is_finite() && self.kg_per_day.is_finite()
    }
}

/// Column metadata for one catalog component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentColumn {
    pub name: String,
    pub label: String,
    pub basis: UnitBasis,
}

impl std::ops::Add for ComponentResult {
    type Output = ComponentResult;

    fn add(self, other: ComponentResult) -> ComponentResult {
        ComponentResult {
            value: self.value + other.value,
            pct_of_diet: self.pct_of_diet + other.pct_of_diet,
            kg_per_day: self.kg_per_day + other.kg_per_day,
        }
    }
}

impl std::iter::Sum for ComponentResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ComponentResult::default(), |acc, c| acc + c)
    }
}

/// One row of the table: a feed, or the Diet aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRow {
    pub entry: FeedEntry,
    pub components: BTreeMap<String, ComponentResult>,
    /// Intermediate quantities published by rules (intakes, digestibilities)
    pub quantities: BTreeMap<String, f64>,
}

impl IntakeRow {
    pub fn new(entry: FeedEntry) -> Self {
        Self {
            entry,
            components: BTreeMap::new(),
            quantities: BTreeMap::new(),
        }
    }

    pub fn feedstuff(&self) -> &str {
        &self.entry.feedstuff
    }

    pub fn is_diet(&self) -> bool {
        self.entry.feedstuff == DIET_ROW
    }

    pub fn component(&self, name: &str) -> Option<&ComponentResult> {
        self.components.get(name)
    }

    pub fn quantity(&self, name: &str) -> Option<f64> {
        self.quantities.get(name).copied()
    }

    pub fn set_quantity(&mut self, name: &str, value: f64) {
        self.quantities.insert(name.to_string(), value);
    }

    /// Drop every computed column, keeping the feed entry
    pub fn clear(&mut self) {
        self.components.clear();
        self.quantities.clear();
    }
}

/// The nutrient intake table for one ration.
///
/// Only built from a validated [`Ration`] or by the aggregator, so it is
/// serialized for reports but never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientIntakeTable {
    columns: Vec<ComponentColumn>,
    rows: Vec<IntakeRow>,
    summary: Option<DietSummary>,
}

impl NutrientIntakeTable {
    /// Empty working table seeded with the ration's feeds
    pub fn from_ration(ration: &Ration) -> Self {
        Self {
            columns: Vec::new(),
            rows: ration.entries().iter().cloned().map(IntakeRow::new).collect(),
            summary: None,
        }
    }

    /// Component columns in evaluation order; empty until aggregated
    pub fn columns(&self) -> &[ComponentColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ComponentColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn rows(&self) -> &[IntakeRow] {
        &self.rows
    }

    /// Rows for individual feeds, excluding the Diet aggregate
    pub fn feed_rows(&self) -> impl Iterator<Item = &IntakeRow> {
        self.rows.iter().filter(|r| !r.is_diet())
    }

    pub fn row(&self, feedstuff: &str) -> Option<&IntakeRow> {
        self.rows.iter().find(|r| r.feedstuff() == feedstuff)
    }

    pub fn diet(&self) -> Option<&IntakeRow> {
        self.row(DIET_ROW)
    }

    pub fn summary(&self) -> Option<&DietSummary> {
        self.summary.as_ref()
    }

    /// Remove any Diet aggregate and the summary derived from it.
    ///
    /// Returns true if an aggregate row was present.
    pub fn discard_diet(&mut self) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| !r.is_diet());
        self.summary = None;
        self.rows.len() != before
    }

    pub(crate) fn into_rows(self) -> Vec<IntakeRow> {
        self.rows
    }

    pub(crate) fn assemble(columns: Vec<ComponentColumn>, rows: Vec<IntakeRow>, summary: DietSummary) -> Self {
        Self {
            columns,
            rows,
            summary: Some(summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ration() -> Ration {
        Ration::new(vec![
            FeedEntry::new("Corn silage", 60.0, 12.0),
            FeedEntry::new("Soybean meal", 40.0, 8.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_component_sum() {
        let total: ComponentResult = vec![
            ComponentResult::new(0.1, 0.05, 1.0),
            ComponentResult::new(0.2, 0.10, 2.5),
        ]
        .into_iter()
        .sum();
        assert!((total.kg_per_day - 3.5).abs() < 1e-12);
        assert!((total.pct_of_diet - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_from_ration_has_no_diet_row() {
        let table = NutrientIntakeTable::from_ration(&ration());
        assert_eq!(table.rows().len(), 2);
        assert!(table.diet().is_none());
        assert!(table.summary().is_none());
        assert_eq!(table.feed_rows().count(), 2);
    }

    #[test]
    fn test_discard_diet() {
        let mut rows = NutrientIntakeTable::from_ration(&ration()).into_rows();
        rows.push(IntakeRow::new(FeedEntry::new(DIET_ROW, 100.0, 20.0)));
        let mut table = NutrientIntakeTable::assemble(Vec::new(), rows, DietSummary::default());

        assert!(table.diet().is_some());
        assert!(table.discard_diet());
        assert!(table.diet().is_none());
        assert!(table.summary().is_none());
        assert!(!table.discard_diet());
    }

    #[test]
    fn test_row_quantities() {
        let mut row = IntakeRow::new(FeedEntry::new("Hay", 100.0, 20.0));
        row.set_quantity("cp_intake_kg", 3.2);
        assert_eq!(row.quantity("cp_intake_kg"), Some(3.2));
        row.clear();
        assert_eq!(row.quantity("cp_intake_kg"), None);
        assert!(!row.is_diet());
    }
}
