//! Errors the import pipeline can return.
//!
//! One enum per stage:
//!
//! - [`ValidationError`] is raised locally and never reaches the network.
//! - [`DecodeError`] is raised while reading the uploaded file.
//! - [`ReferenceFetchError`] is raised while loading budgets and saving goals.
//! - [`CommitError`] is raised by the batch committer.
//!
//! [`ImportError`] wraps all of them for callers driving the whole pipeline.
use std::time::Duration;

use thiserror::Error;

use crate::row::RowId;

/// Failure reported by a backend collaborator (HTTP client or fake).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend answered {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

/// Why a single row cannot be committed as it stands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
    #[error("missing transaction type")]
    MissingType,
    #[error("missing payment method")]
    MissingPaymentMethod,
    #[error("invalid date \"{0}\"")]
    InvalidDate(String),
    #[error("date {0} is outside the selected timeframe")]
    DateOutsideTimeframe(String),
    #[error("category {category} cannot be used for {kind} rows")]
    CategoryMismatch { category: String, kind: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("upload is disabled for month {month:?} / year {year:?}")]
    Timeframe { month: Option<u32>, year: Option<i32> },
    #[error(
        "{} row(s) missing a category, {} invalid row(s)",
        .missing.len(),
        .invalid.len()
    )]
    Incomplete {
        missing: Vec<RowId>,
        invalid: Vec<(RowId, RowProblem)>,
    },
    #[error("unknown row {0}")]
    UnknownRow(RowId),
    #[error("unknown category \"{0}\"")]
    UnknownCategory(String),
    #[error("row {row}: {problem}")]
    InvalidRow { row: RowId, problem: RowProblem },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no file selected")]
    NoFile,
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("file is {size} bytes, above the {limit} bytes limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed workbook: {0}")]
    Workbook(String),
    #[error("workbook has no sheets")]
    NoSheet,
    #[error("line {line}, {column}: {message}")]
    Cell {
        line: usize,
        column: &'static str,
        message: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFetchError {
    #[error("failed to load budgets: {0}")]
    Budgets(BackendError),
    #[error("failed to load saving goals: {0}")]
    SavingGoals(BackendError),
    #[error("reference data request timed out after {0:?}")]
    Timeout(Duration),
}

/// Why the submission of one row failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowFailure {
    #[error("row has no category")]
    MissingCategory,
    #[error("category {0} is no longer available, refresh the categories")]
    StaleCategory(String),
    #[error("row cannot be submitted: {0}")]
    Invalid(RowProblem),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("commit blocked: {0}")]
    Validation(#[from] ValidationError),
    #[error("row {row} (position {index}) failed after {} committed row(s): {source}", .committed.len())]
    Row {
        index: usize,
        row: RowId,
        committed: Vec<RowId>,
        #[source]
        source: RowFailure,
    },
    #[error("commit cancelled after {} committed row(s)", .committed.len())]
    Cancelled { committed: Vec<RowId> },
}

impl CommitError {
    /// Rows that reached the backend before the batch stopped.
    pub fn committed(&self) -> &[RowId] {
        match self {
            Self::Validation(_) => &[],
            Self::Row { committed, .. } | Self::Cancelled { committed } => committed,
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    ReferenceFetch(#[from] ReferenceFetchError),
    #[error(transparent)]
    Commit(#[from] CommitError),
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_failure_message_names_the_row() {
        let err = CommitError::Row {
            index: 1,
            row: RowId(1),
            committed: vec![RowId(0)],
            source: RowFailure::Backend(BackendError::Rejected {
                status: 400,
                message: "Invalid amount".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "row 1 (position 1) failed after 1 committed row(s): backend answered 400: Invalid amount"
        );
        assert_eq!(err.committed(), &[RowId(0)]);
    }

    #[test]
    fn incomplete_counts_both_kinds() {
        let err = ValidationError::Incomplete {
            missing: vec![RowId(2)],
            invalid: Vec::new(),
        };
        assert_eq!(err.to_string(), "1 row(s) missing a category, 0 invalid row(s)");
    }
}
