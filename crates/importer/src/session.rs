//! Staged import kept between user corrections.
//!
//! A [`StagingSession`] holds what the preview shows: the decoded rows, the
//! catalog they were checked against, the flagged rows, the rows the last
//! pre-flight check refused and the row that failed the last commit. It is plain data so callers can persist it.

use serde::{Deserialize, Serialize};

use crate::{
    committer::{Backend, CommitSummary, Committer},
    error::{CommitError, ReferenceFetchError, ValidationError},
    resolver::{self, CategoryCatalog},
    row::{CategoryRef, RowId, RowSet},
    timeframe::Timeframe,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRow {
    pub row: RowId,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSession {
    pub timeframe: Timeframe,
    #[serde(default)]
    pub source_file: Option<String>,
    pub rows: RowSet,
    #[serde(default)]
    pub catalog: CategoryCatalog,
    /// Rows highlighted as needing a category.
    #[serde(default)]
    pub flagged: Vec<RowId>,
    /// Rows the last commit attempt found invalid, with the reason.
    #[serde(default)]
    pub invalid: Vec<(RowId, String)>,
    #[serde(default)]
    pub failed: Option<FailedRow>,
    /// Last reference fetch failure, shown as a retryable warning.
    #[serde(default)]
    pub warning: Option<String>,
}

impl StagingSession {
    pub fn new(timeframe: Timeframe, source_file: Option<String>, rows: RowSet) -> Self {
        Self {
            timeframe,
            source_file,
            rows,
            catalog: CategoryCatalog::default(),
            flagged: Vec::new(),
            invalid: Vec::new(),
            failed: None,
            warning: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Installs freshly loaded reference data; rows are left as they are.
    pub fn replace_catalog(&mut self, catalog: CategoryCatalog) {
        self.catalog = catalog;
        self.warning = None;
        self.flagged = self.unresolved();
    }

    /// Keeps rows and catalog, remembers the failure for the preview.
    pub fn record_fetch_error(&mut self, err: &ReferenceFetchError) {
        self.warning = Some(err.to_string());
    }

    pub fn assign(&mut self, id: RowId, category: CategoryRef) -> Result<(), ValidationError> {
        self.rows = resolver::assign(&self.rows, id, category, &self.catalog)?;
        self.flagged.retain(|flagged| *flagged != id);
        if self.failed.as_ref().is_some_and(|failed| failed.row == id) {
            self.failed = None;
        }
        Ok(())
    }

    /// Fills the empty categories that have a single obvious match.
    pub fn auto_resolve(&mut self) -> Vec<RowId> {
        let (rows, resolved) = resolver::auto_resolve(&self.rows, &self.catalog);
        self.rows = rows;
        self.flagged = self.unresolved();
        resolved
    }

    pub fn unresolved(&self) -> Vec<RowId> {
        resolver::unresolved(&self.rows, &self.catalog)
    }

    /// Runs `committer` over the staged rows.
    ///
    /// Success empties the session. On failure the rows stay staged: missing
    /// categories are flagged, already committed rows are dropped and the
    /// failing row is marked.
    pub async fn commit<B: Backend>(
        &mut self,
        committer: &Committer<B>,
    ) -> Result<CommitSummary, CommitError> {
        match committer
            .commit(&self.rows, self.timeframe, &self.catalog)
            .await
        {
            Ok(summary) => {
                self.rows = RowSet::default();
                self.flagged.clear();
                self.invalid.clear();
                self.failed = None;
                Ok(summary)
            }
            Err(err) => {
                self.invalid.clear();
                match &err {
                    CommitError::Validation(ValidationError::Incomplete { missing, invalid }) => {
                        self.flagged = missing.clone();
                        self.invalid = invalid
                            .iter()
                            .map(|(row, problem)| (*row, problem.to_string()))
                            .collect();
                    }
                    CommitError::Row { row, source, .. } => {
                        self.failed = Some(FailedRow {
                            row: *row,
                            message: source.to_string(),
                        });
                    }
                    _ => {}
                }
                if !err.committed().is_empty() {
                    self.rows = self.rows.without(err.committed());
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use api_types::{
        budget::Budget,
        transaction::{PaymentMethod, TransactionNew, TransactionType},
    };
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        error::BackendError,
        money::Amount,
        row::{IncomeCategory, UploadedRow},
    };

    fn timeframe() -> Timeframe {
        Timeframe::select(
            Some(3),
            Some(2025),
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        )
        .unwrap()
    }

    fn session() -> StagingSession {
        let rows = (0..3)
            .map(|id| UploadedRow {
                id: RowId(id),
                amount: Amount::new(2_500),
                kind: Some(if id == 1 {
                    TransactionType::Income
                } else {
                    TransactionType::Expense
                }),
                date: "2025-03-10".to_string(),
                note: if id == 0 { "Food".to_string() } else { String::new() },
                payment_method: Some(PaymentMethod::Cash),
                category: None,
            })
            .collect();
        let mut session = StagingSession::new(timeframe(), None, RowSet::new(rows));
        session.replace_catalog(CategoryCatalog::new(
            timeframe(),
            vec![Budget {
                id: "b1".to_string(),
                category: "Food".to_string(),
                amount: 200.0,
                used_amount: 0.0,
                threshold: None,
                month: Some(2),
                year: Some(2025),
            }],
            Vec::new(),
        ));
        session
    }

    #[derive(Clone, Default)]
    struct Recorder {
        posted: Arc<Mutex<Vec<TransactionNew>>>,
        reject_call: Option<usize>,
    }

    impl Backend for Recorder {
        async fn create_transaction(&self, payload: &TransactionNew) -> Result<(), BackendError> {
            let mut posted = self.posted.lock().unwrap();
            let call = posted.len();
            posted.push(payload.clone());
            match self.reject_call {
                Some(reject) if reject == call => Err(BackendError::Rejected {
                    status: 500,
                    message: "Database unavailable".to_string(),
                }),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn new_catalog_flags_every_empty_row() {
        assert_eq!(session().flagged, vec![RowId(0), RowId(1), RowId(2)]);
    }

    #[test]
    fn auto_resolve_and_assign_clear_flags() {
        let mut session = session();
        assert_eq!(session.auto_resolve(), vec![RowId(0)]);
        assert_eq!(session.flagged, vec![RowId(1), RowId(2)]);

        session
            .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
            .unwrap();
        assert_eq!(session.flagged, vec![RowId(2)]);
    }

    #[test]
    fn fetch_error_keeps_rows_and_catalog() {
        let mut session = session();
        session.auto_resolve();
        let before = session.clone();

        session.record_fetch_error(&ReferenceFetchError::Timeout(Duration::from_secs(15)));

        assert_eq!(session.rows, before.rows);
        assert_eq!(session.catalog, before.catalog);
        assert!(session.warning.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn blocked_commit_flags_missing_rows() {
        let mut session = session();
        session.flagged.clear();
        let backend = Recorder::default();
        let committer = Committer::new(backend.clone(), Duration::from_secs(5));

        assert!(session.commit(&committer).await.is_err());

        assert_eq!(session.flagged, vec![RowId(0), RowId(1), RowId(2)]);
        assert_eq!(session.rows.len(), 3);
        assert!(backend.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_commit_keeps_the_reason_of_each_invalid_row() {
        let mut session = session();
        session.auto_resolve();
        session
            .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
            .unwrap();
        session
            .assign(RowId(2), CategoryRef::Budget("b1".to_string()))
            .unwrap();
        let mut rows = session.rows.rows().to_vec();
        rows[1].date = "2025-04-01".to_string();
        session.rows = RowSet::new(rows);
        let backend = Recorder::default();
        let committer = Committer::new(backend.clone(), Duration::from_secs(5));

        assert!(session.commit(&committer).await.is_err());

        assert!(session.flagged.is_empty());
        assert_eq!(
            session.invalid,
            vec![(
                RowId(1),
                "date 2025-04-01 is outside the selected timeframe".to_string()
            )]
        );
        assert!(backend.posted.lock().unwrap().is_empty());

        // fixed and committed, nothing is left to report
        let mut rows = session.rows.rows().to_vec();
        rows[1].date = "2025-03-31".to_string();
        session.rows = RowSet::new(rows);
        session.commit(&committer).await.unwrap();
        assert!(session.invalid.is_empty());
    }

    #[tokio::test]
    async fn partial_failure_drops_committed_rows_and_marks_the_failing_one() {
        let mut session = session();
        session.auto_resolve();
        session
            .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
            .unwrap();
        session
            .assign(RowId(2), CategoryRef::Budget("b1".to_string()))
            .unwrap();
        let backend = Recorder {
            reject_call: Some(1),
            ..Recorder::default()
        };
        let committer = Committer::new(backend.clone(), Duration::from_secs(5));

        let err = session.commit(&committer).await.unwrap_err();

        assert_eq!(err.committed(), &[RowId(0)]);
        assert_eq!(
            session.rows.rows().iter().map(|row| row.id).collect::<Vec<_>>(),
            vec![RowId(1), RowId(2)]
        );
        let failed = session.failed.clone().unwrap();
        assert_eq!(failed.row, RowId(1));
        assert!(failed.message.contains("Database unavailable"));

        // retry sends only what is left
        let retry = Recorder::default();
        let committer = Committer::new(retry.clone(), Duration::from_secs(5));
        let summary = session.commit(&committer).await.unwrap();
        assert_eq!(summary.committed, vec![RowId(1), RowId(2)]);
        assert_eq!(retry.posted.lock().unwrap().len(), 2);
        assert!(session.is_empty());
        assert_eq!(session.failed, None);
    }
}
