//! Ration nutrient aggregation
//!
//! Validates model inputs, evaluates the component catalog for every feed and
//! appends the Diet row (the column-wise sum of the feed rows).

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::models::{
    CoefficientSet, EquationSelection, FeedComposition, FeedEntry, IntakeRow, NutrientIntakeTable,
    Ration, SelectionFlags, DIET_ROW,
};

use super::catalog::{ComponentCatalog, RowContext};
use super::provider::FeedCompositionProvider;
use super::summary::DietSummary;
use super::{IntakeError, IntakeResult};

/// Allowed deviation of the ration's dm_pct total from 100
const DM_PCT_TOLERANCE: f64 = 0.5;

/// Computes nutrient intake tables with a fixed component catalog
#[derive(Default)]
pub struct NutrientAggregator {
    catalog: ComponentCatalog,
}

impl NutrientAggregator {
    pub fn new(catalog: ComponentCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Check coefficients and selection flags together, reporting every problem
    pub fn validate(
        &self,
        coefficients: &CoefficientSet,
        flags: &SelectionFlags,
    ) -> IntakeResult<EquationSelection> {
        let mut errors = Vec::new();

        if let Err(e) = self.catalog.validate_coefficients(coefficients) {
            errors.push(e);
        }
        let selection = match EquationSelection::from_flags(flags) {
            Ok(selection) => Some(selection),
            Err(flag_errors) => {
                errors.extend(flag_errors);
                None
            }
        };

        match (IntakeError::from_many(errors), selection) {
            (Some(err), _) => Err(err),
            (None, Some(selection)) => Ok(selection),
            (None, None) => Err(IntakeError::Catalog("selection flags rejected without an error".to_string())),
        }
    }

    /// Evaluate a ration from scratch
    pub fn run<P>(
        &self,
        ration: &Ration,
        provider: &P,
        coefficients: &CoefficientSet,
        flags: &SelectionFlags,
    ) -> IntakeResult<NutrientIntakeTable>
    where
        P: FeedCompositionProvider + ?Sized,
    {
        self.aggregate(NutrientIntakeTable::from_ration(ration), provider, coefficients, flags)
    }

    /// Recompute every column of `table` and append a fresh Diet row.
    ///
    /// Any Diet row already in the table is discarded first, so running this
    /// on its own output gives the same table. The remaining rows must still
    /// form a valid ration.
    pub fn aggregate<P>(
        &self,
        mut table: NutrientIntakeTable,
        provider: &P,
        coefficients: &CoefficientSet,
        flags: &SelectionFlags,
    ) -> IntakeResult<NutrientIntakeTable>
    where
        P: FeedCompositionProvider + ?Sized,
    {
        let selection = self.validate(coefficients, flags)?;

        if table.discard_diet() {
            debug!("Discarded existing Diet row");
        }
        let rows = table.into_rows();
        Ration::new(rows.iter().map(|r| r.entry.clone()).collect())?;

        info!(
            rows = rows.len(),
            components = self.catalog.len(),
            "Aggregating ration"
        );

        let total_dm_pct: f64 = rows.iter().map(|r| r.entry.dm_pct).sum();
        if (total_dm_pct - 100.0).abs() > DM_PCT_TOLERANCE {
            warn!(total_dm_pct, "Ration dm_pct does not sum to 100");
        }
        let diet_intake_kg: f64 = rows.iter().map(|r| r.entry.intake_kg).sum();

        let names: Vec<&str> = rows.iter().map(|r| r.feedstuff()).collect();
        let feeds = provider.lookup_many(&names)?;

        // The first unknown feed in ration order is reported
        let mut resolved: Vec<(IntakeRow, FeedComposition)> = Vec::with_capacity(rows.len());
        for (row, feed) in rows.into_iter().zip(feeds) {
            let feed = feed.ok_or_else(|| IntakeError::UnknownFeedstuff {
                name: row.feedstuff().to_string(),
            })?;
            resolved.push((row, feed));
        }

        let catalog = &self.catalog;
        let evaluated: Vec<IntakeResult<IntakeRow>> = resolved
            .into_par_iter()
            .map(|(mut row, feed)| {
                let entry = row.entry.clone();
                let ctx = RowContext {
                    entry: &entry,
                    feed: &feed,
                    coefficients,
                    selection: &selection,
                    diet_intake_kg,
                };
                catalog.evaluate_row(&ctx, &mut row)?;
                Ok(row)
            })
            .collect();

        // Errors are picked in row order, not completion order
        let mut rows = evaluated.into_iter().collect::<IntakeResult<Vec<_>>>()?;

        let diet = diet_row(&rows);
        let summary = DietSummary::from_diet(&diet);
        info!(
            dm_intake_kg = summary.dm_intake_kg,
            cp_intake_kg = ?summary.cp_intake_kg,
            rdp_kg = ?summary.rdp_kg,
            "Ration aggregated"
        );

        rows.push(diet);
        Ok(NutrientIntakeTable::assemble(self.catalog.columns(), rows, summary))
    }
}

/// Column-wise sum of the feed rows, in row order
fn diet_row(rows: &[IntakeRow]) -> IntakeRow {
    let dm_pct = rows.iter().map(|r| r.entry.dm_pct).sum();
    let intake_kg = rows.iter().map(|r| r.entry.intake_kg).sum();
    let mut diet = IntakeRow::new(FeedEntry::new(DIET_ROW, dm_pct, intake_kg));

    for row in rows {
        for (name, result) in &row.components {
            let total = diet.components.entry(name.clone()).or_default();
            *total = *total + *result;
        }
        for (name, value) in &row.quantities {
            *diet.quantities.entry(name.clone()).or_default() += *value;
        }
    }
    diet
}
