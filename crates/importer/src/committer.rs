//! Batch commit of staged rows.
//!
//! Rows are checked all at once before the first request; then they are
//! posted one by one, in row order, and the batch stops at the first failure.
//! Progress is published on a `watch` channel as a [`CommitState`].

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use api_types::transaction::TransactionNew;
use chrono::NaiveDate;
use tokio::sync::watch;

use crate::{
    error::{BackendError, CommitError, RowFailure, RowProblem, ValidationError},
    resolver::{CategoryCatalog, CategoryModel},
    row::{CategoryRef, RowId, RowSet, UploadedRow},
    timeframe::Timeframe,
};

/// Write side of the backend used by the committer.
pub trait Backend {
    /// Creates one transaction; only a `201 Created` answer is a success.
    fn create_transaction(
        &self,
        payload: &TransactionNew,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CommitState {
    #[default]
    Idle,
    Validating,
    /// Pre-flight check failed; nothing was sent.
    Blocked { missing: Vec<RowId> },
    Committing {
        index: usize,
        row: RowId,
        total: usize,
    },
    Succeeded { committed: usize },
    PartiallyFailed {
        index: usize,
        row: RowId,
        committed: usize,
        message: String,
    },
    Cancelled { committed: usize },
}

impl CommitState {
    /// Whether a "saving" indicator should be shown.
    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Validating | Self::Committing { .. })
    }
}

/// Stops a running commit before its next row.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub committed: Vec<RowId>,
}

/// Pre-flight check of a whole batch.
///
/// Collects every row without a category and every row that cannot be
/// submitted as it stands; any hit blocks the commit.
pub fn check_rows(rows: &RowSet, timeframe: Timeframe) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    let mut invalid = Vec::new();

    for row in rows.rows() {
        if row.category.is_none() {
            missing.push(row.id);
        }
        if let Some(problem) = row_problem(row, timeframe) {
            invalid.push((row.id, problem));
        }
    }

    if missing.is_empty() && invalid.is_empty() {
        return Ok(());
    }
    Err(ValidationError::Incomplete { missing, invalid })
}

fn row_problem(row: &UploadedRow, timeframe: Timeframe) -> Option<RowProblem> {
    if !row.amount.is_positive() {
        return Some(RowProblem::NonPositiveAmount);
    }
    let Some(kind) = row.kind else {
        return Some(RowProblem::MissingType);
    };
    if row.payment_method.is_none() {
        return Some(RowProblem::MissingPaymentMethod);
    }
    let Ok(date) = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") else {
        return Some(RowProblem::InvalidDate(row.date.clone()));
    };
    if !timeframe.contains(date) {
        return Some(RowProblem::DateOutsideTimeframe(row.date.clone()));
    }
    match &row.category {
        Some(category) if category.kind() != kind => Some(RowProblem::CategoryMismatch {
            category: category.to_string(),
            kind: kind.as_str(),
        }),
        _ => None,
    }
}

/// Builds the `POST /transaction` body of one row.
///
/// Expense references must still be present in `catalog`; a missing one
/// fails the row instead of falling back to an empty category.
pub fn build_payload(
    row: &UploadedRow,
    catalog: &CategoryCatalog,
) -> Result<TransactionNew, RowFailure> {
    let kind = row
        .kind
        .ok_or(RowFailure::Invalid(RowProblem::MissingType))?;
    let payment_method = row
        .payment_method
        .ok_or(RowFailure::Invalid(RowProblem::MissingPaymentMethod))?;
    let category = row.category.as_ref().ok_or(RowFailure::MissingCategory)?;
    if category.kind() != kind {
        return Err(RowFailure::Invalid(RowProblem::CategoryMismatch {
            category: category.to_string(),
            kind: kind.as_str(),
        }));
    }

    let (name, budget_id, saving_goal_id) = match category {
        CategoryRef::Income(label) => (label.as_str().to_string(), None, None),
        expense => {
            let option = catalog
                .lookup(expense)
                .ok_or_else(|| RowFailure::StaleCategory(expense.to_string()))?;
            match option.model {
                CategoryModel::Budget => (option.name.clone(), Some(option.id.clone()), None),
                CategoryModel::SavingGoal => (option.name.clone(), None, Some(option.id.clone())),
            }
        }
    };

    Ok(TransactionNew {
        kind,
        amount: row.amount.to_major(),
        date: row.date.clone(),
        payment_method,
        note: row.note.clone(),
        category: name,
        budget_id,
        saving_goal_id,
    })
}

pub struct Committer<B> {
    backend: B,
    timeout: Duration,
    cancel: CancelToken,
    state: watch::Sender<CommitState>,
}

impl<B: Backend> Committer<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        let (state, _) = watch::channel(CommitState::Idle);
        Self {
            backend,
            timeout,
            cancel: CancelToken::default(),
            state,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CommitState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CommitState {
        self.state.borrow().clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Commits `rows` fail-fast.
    ///
    /// Nothing is sent when the pre-flight check fails. Otherwise rows are
    /// posted in order and the first failing row ends the batch; the error
    /// carries that row and the ids already committed.
    pub async fn commit(
        &self,
        rows: &RowSet,
        timeframe: Timeframe,
        catalog: &CategoryCatalog,
    ) -> Result<CommitSummary, CommitError> {
        self.set(CommitState::Validating);
        if let Err(err) = check_rows(rows, timeframe) {
            let missing = match &err {
                ValidationError::Incomplete { missing, .. } => missing.clone(),
                _ => Vec::new(),
            };
            tracing::debug!("commit blocked: {err}");
            self.set(CommitState::Blocked { missing });
            return Err(err.into());
        }

        let total = rows.len();
        let mut committed = Vec::with_capacity(total);
        for (index, row) in rows.rows().iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("commit cancelled after {} rows", committed.len());
                self.set(CommitState::Cancelled {
                    committed: committed.len(),
                });
                return Err(CommitError::Cancelled { committed });
            }

            self.set(CommitState::Committing {
                index,
                row: row.id,
                total,
            });
            if let Err(source) = self.submit(row, catalog).await {
                tracing::error!("row {} failed: {source}", row.id);
                self.set(CommitState::PartiallyFailed {
                    index,
                    row: row.id,
                    committed: committed.len(),
                    message: source.to_string(),
                });
                return Err(CommitError::Row {
                    index,
                    row: row.id,
                    committed,
                    source,
                });
            }
            tracing::debug!("row {} committed ({}/{total})", row.id, index + 1);
            committed.push(row.id);
        }

        tracing::info!("committed {} rows", committed.len());
        self.set(CommitState::Succeeded {
            committed: committed.len(),
        });
        Ok(CommitSummary { committed })
    }

    async fn submit(&self, row: &UploadedRow, catalog: &CategoryCatalog) -> Result<(), RowFailure> {
        let payload = build_payload(row, catalog)?;
        tokio::time::timeout(self.timeout, self.backend.create_transaction(&payload))
            .await
            .map_err(|_| RowFailure::Timeout(self.timeout))??;
        Ok(())
    }

    fn set(&self, state: CommitState) {
        self.state.send_replace(state);
    }
}
