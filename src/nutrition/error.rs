//! Nutrient intake errors

use thiserror::Error;

use crate::db::DbError;

/// Errors raised while validating inputs or evaluating a ration
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Missing coefficients: {}", .names.join(", "))]
    MissingCoefficients { names: Vec<String> },

    #[error("Unknown feedstuff '{name}': no composition record in the feed library")]
    UnknownFeedstuff { name: String },

    #[error("Selection flag {flag} = {value} is not one of {allowed:?}")]
    InvalidSelectionFlag {
        flag: String,
        value: i64,
        allowed: Vec<i64>,
    },

    #[error("Selection flag {flag} is not set")]
    MissingSelectionFlag { flag: String },

    #[error("Undefined result for {component} of '{feedstuff}': {detail}")]
    NumericDomain {
        component: String,
        feedstuff: String,
        detail: String,
    },

    #[error("{} validation errors: {}", .0.len(), join_errors(.0))]
    Validation(Vec<IntakeError>),

    #[error("Invalid ration: {0}")]
    InvalidRation(String),

    #[error("Invalid component catalog: {0}")]
    Catalog(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

fn join_errors(errors: &[IntakeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for intake calculations
pub type IntakeResult<T> = Result<T, IntakeError>;

impl IntakeError {
    /// Fold collected validation failures into a single error
    pub fn from_many(mut errors: Vec<IntakeError>) -> Option<IntakeError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(IntakeError::Validation(errors)),
        }
    }
}
