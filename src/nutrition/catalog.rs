//! Component catalog
//!
//! The registry of nutrient component rules. Every rule declares its unit
//! basis, the components it reads from the same row, and the coefficients it
//! needs, so the whole catalog can be checked before a single row is touched.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{
    CoefficientSet, ComponentColumn, ComponentResult, EquationSelection, FeedComposition, FeedEntry,
    IntakeRow, UnitBasis,
};

use super::rules;
use super::{IntakeError, IntakeResult};

/// Everything a rule may read while evaluating one feed row
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub entry: &'a FeedEntry,
    pub feed: &'a FeedComposition,
    pub coefficients: &'a CoefficientSet,
    pub selection: &'a EquationSelection,
    /// Total diet DM intake, kg/d
    pub diet_intake_kg: f64,
}

impl RowContext<'_> {
    pub fn coefficient(&self, name: &str) -> IntakeResult<f64> {
        self.coefficients.get(name)
    }

    /// Build a NumericDomain error for this row
    pub fn undefined(&self, component: &str, detail: impl Into<String>) -> IntakeError {
        IntakeError::NumericDomain {
            component: component.to_string(),
            feedstuff: self.entry.feedstuff.clone(),
            detail: detail.into(),
        }
    }

    /// `numerator / denominator`, failing instead of producing inf or NaN
    pub fn divide(&self, component: &str, numerator: f64, denominator: f64, what: &str) -> IntakeResult<f64> {
        if denominator == 0.0 || !denominator.is_finite() {
            return Err(self.undefined(component, format!("{} is {}", what, denominator)));
        }
        Ok(numerator / denominator)
    }
}

/// A single nutrient component rule
pub trait ComponentRule: Send + Sync {
    /// Column name, unique within a catalog
    fn name(&self) -> &'static str;

    /// Human readable name
    fn label(&self) -> &'static str;

    fn basis(&self) -> UnitBasis;

    /// Components that must be evaluated earlier in the same row
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    fn required_coefficients(&self) -> &'static [&'static str] {
        &[]
    }

    /// Concentration of this component in the feed, as a fraction in the
    /// rule's basis. The catalog scales it to a diet share and kg/d.
    ///
    /// Results of dependencies are already in `row.components`; auxiliary
    /// quantities may be published with `row.set_quantity`.
    fn evaluate(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<f64>;
}

/// Scale a rule's value to its full triple according to its unit basis
pub fn scale(
    basis: UnitBasis,
    ctx: &RowContext<'_>,
    row: &IntakeRow,
    value: f64,
) -> IntakeResult<ComponentResult> {
    let dm_fraction = ctx.entry.dm_fraction();
    let result = match basis {
        UnitBasis::PercentOfDm => {
            let pct_of_diet = value * dm_fraction;
            ComponentResult::new(value, pct_of_diet, pct_of_diet * ctx.diet_intake_kg)
        }
        UnitBasis::PercentOfCrudeProtein => {
            let crude_protein = row.component(rules::CRUDE_PROTEIN).ok_or_else(|| {
                IntakeError::Catalog(format!(
                    "percent-of-CP value needs '{}' earlier in the row",
                    rules::CRUDE_PROTEIN
                ))
            })?;
            let pct_of_diet = value * dm_fraction * crude_protein.value;
            ComponentResult::new(value, pct_of_diet, pct_of_diet * ctx.diet_intake_kg)
        }
        UnitBasis::IntakeScaled => ComponentResult::new(value, value * dm_fraction, value * ctx.entry.intake_kg),
    };
    Ok(result)
}

/// Percent-of-CP rules scale through crude protein, so they must depend on it
fn check_basis(rule: &dyn ComponentRule) -> IntakeResult<()> {
    if rule.basis() == UnitBasis::PercentOfCrudeProtein && !rule.depends_on().contains(&rules::CRUDE_PROTEIN) {
        return Err(IntakeError::Catalog(format!(
            "component '{}' is expressed per unit of CP but does not depend on '{}'",
            rule.name(),
            rules::CRUDE_PROTEIN
        )));
    }
    Ok(())
}

/// Ordered set of component rules
pub struct ComponentCatalog {
    /// Always held in a valid evaluation order
    rules: Vec<Box<dyn ComponentRule>>,
}

impl ComponentCatalog {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard dairy feed component catalog
    pub fn standard() -> Self {
        Self {
            rules: rules::standard_rules(),
        }
    }

    /// Build a catalog from rules in any order.
    ///
    /// Rejects duplicate names, unknown dependencies and dependency cycles.
    pub fn from_rules(rules: Vec<Box<dyn ComponentRule>>) -> IntakeResult<Self> {
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            check_basis(rule.as_ref())?;
            if index.insert(rule.name(), i).is_some() {
                return Err(IntakeError::Catalog(format!(
                    "component '{}' is registered twice",
                    rule.name()
                )));
            }
        }

        let mut remaining: Vec<HashSet<usize>> = Vec::with_capacity(rules.len());
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];
        for (i, rule) in rules.iter().enumerate() {
            let mut deps = HashSet::new();
            for dep in rule.depends_on() {
                let j = *index.get(dep).ok_or_else(|| {
                    IntakeError::Catalog(format!(
                        "component '{}' depends on unknown component '{}'",
                        rule.name(),
                        dep
                    ))
                })?;
                deps.insert(j);
                dependents[j].push(i);
            }
            remaining.push(deps);
        }

        // Kahn's algorithm, seeded in registration order
        let mut queue: VecDeque<usize> = (0..rules.len()).filter(|&i| remaining[i].is_empty()).collect();
        let mut order = Vec::with_capacity(rules.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &d in &dependents[i] {
                if remaining[d].remove(&i) && remaining[d].is_empty() {
                    queue.push_back(d);
                }
            }
        }

        if order.len() != rules.len() {
            let stuck: Vec<&str> = (0..rules.len())
                .filter(|i| !order.contains(i))
                .map(|i| rules[i].name())
                .collect();
            return Err(IntakeError::Catalog(format!(
                "dependency cycle between components: {}",
                stuck.join(", ")
            )));
        }

        let mut slots: Vec<Option<Box<dyn ComponentRule>>> = rules.into_iter().map(Some).collect();
        let rules = order.into_iter().filter_map(|i| slots[i].take()).collect();

        Ok(Self { rules })
    }

    /// Append a rule whose dependencies are already registered
    pub fn register(&mut self, rule: Box<dyn ComponentRule>) -> IntakeResult<()> {
        if self.get(rule.name()).is_some() {
            return Err(IntakeError::Catalog(format!(
                "component '{}' is registered twice",
                rule.name()
            )));
        }
        check_basis(rule.as_ref())?;
        if let Some(dep) = rule.depends_on().iter().find(|d| self.get(d).is_none()) {
            return Err(IntakeError::Catalog(format!(
                "component '{}' depends on unknown component '{}'",
                rule.name(),
                dep
            )));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn ComponentRule> {
        self.rules.iter().find(|r| r.name() == name).map(|r| r.as_ref())
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &dyn ComponentRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Column metadata in evaluation order
    pub fn columns(&self) -> Vec<ComponentColumn> {
        self.rules
            .iter()
            .map(|r| ComponentColumn {
                name: r.name().to_string(),
                label: r.label().to_string(),
                basis: r.basis(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every coefficient any rule declares, deduplicated
    pub fn required_coefficients(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .rules
            .iter()
            .flat_map(|r| r.required_coefficients().iter().copied())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Check all declared coefficients at once
    pub fn validate_coefficients(&self, coefficients: &CoefficientSet) -> IntakeResult<()> {
        let missing = coefficients.missing(self.required_coefficients());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IntakeError::MissingCoefficients { names: missing })
        }
    }

    /// Evaluate every rule against one row, in catalog order
    pub fn evaluate_row(&self, ctx: &RowContext<'_>, row: &mut IntakeRow) -> IntakeResult<()> {
        row.clear();
        for rule in &self.rules {
            let value = rule.evaluate(ctx, row)?;
            let result = scale(rule.basis(), ctx, row, value)?;
            if !result.is_finite() {
                return Err(ctx.undefined(rule.name(), format!("non-finite result {:?}", result)));
            }
            row.components.insert(rule.name().to_string(), result);
        }
        Ok(())
    }
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
