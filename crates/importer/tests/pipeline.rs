use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use api_types::{
    budget::{Budget, BudgetQuery},
    saving_goal::SavingGoal,
    transaction::{TransactionNew, TransactionType},
};
use chrono::NaiveDate;
use importer::{
    Backend, BackendError, CategoryRef, CommitError, CommitState, Committer, Decoder,
    DroppedFile, IncomeCategory, ReferenceSource, RefreshOutcome, RowId, RowSet, SharedResolver,
    StagingSession, TimeframeGate, ValidationError, filter_dropped,
};

const UPLOAD: &str = "\
amount,type,date,note,paymentMethod
100,EXPENSE,2025-03-05,,CARD
50,INCOME,2025-03-10,,CASH
2000,EXPENSE,2025-03-01,Rent,CHEQUE
";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

#[derive(Default)]
struct FakeBackend {
    budget_queries: Mutex<Vec<BudgetQuery>>,
    posted: Arc<Mutex<Vec<TransactionNew>>>,
    reject_call: Option<usize>,
}

impl ReferenceSource for FakeBackend {
    async fn budgets(&self, query: BudgetQuery) -> Result<Vec<Budget>, BackendError> {
        self.budget_queries.lock().unwrap().push(query);
        Ok(vec![Budget {
            id: "b1".to_string(),
            category: "Food".to_string(),
            amount: 200.0,
            used_amount: 0.0,
            threshold: Some(80.0),
            month: Some(query.month),
            year: Some(query.year),
        }])
    }

    async fn saving_goals(&self) -> Result<Vec<SavingGoal>, BackendError> {
        Ok(vec![SavingGoal {
            id: "g1".to_string(),
            name: "Holiday".to_string(),
            current_amount: 0.0,
            target_amount: 1500.0,
            target_date: None,
        }])
    }
}

impl Backend for FakeBackend {
    async fn create_transaction(&self, payload: &TransactionNew) -> Result<(), BackendError> {
        let mut posted = self.posted.lock().unwrap();
        let call = posted.len();
        posted.push(payload.clone());
        if self.reject_call == Some(call) {
            return Err(BackendError::Rejected {
                status: 422,
                message: "Budget exceeded".to_string(),
            });
        }
        Ok(())
    }
}

/// Gate for 03/2025, upload the three-row file, load categories.
async fn staged(backend: &FakeBackend, dir: &tempfile::TempDir) -> StagingSession {
    let mut gate = TimeframeGate::default();
    gate.set_month(Some(3));
    gate.set_year(Some(2025));
    assert!(!gate.is_upload_disabled(today()));
    let timeframe = gate.take_fetch(today()).unwrap();

    let path = dir.path().join("march.csv");
    std::fs::write(&path, UPLOAD).unwrap();
    let selection = filter_dropped([DroppedFile::new(&path), DroppedFile::new("notes.txt")]);
    assert_eq!(selection.rejected.len(), 1);
    let rows = Decoder::default().decode_first(&selection.accepted).unwrap();

    let resolver = SharedResolver::default();
    assert_eq!(
        resolver
            .refresh(backend, timeframe, Duration::from_secs(15))
            .await,
        Ok(RefreshOutcome::Applied)
    );
    let catalog = resolver.catalog().unwrap();

    let mut session =
        StagingSession::new(timeframe, Some("march.csv".to_string()), RowSet::new(rows));
    session.replace_catalog(catalog);
    session
}

#[tokio::test]
async fn missing_category_blocks_the_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();
    let mut session = staged(&backend, &dir).await;

    assert_eq!(
        *backend.budget_queries.lock().unwrap(),
        vec![BudgetQuery {
            month: 2,
            year: 2025
        }]
    );
    assert_eq!(
        session.rows.rows().iter().map(|row| row.id).collect::<Vec<_>>(),
        vec![RowId(0), RowId(1), RowId(2)]
    );

    session
        .assign(RowId(0), CategoryRef::Budget("b1".to_string()))
        .unwrap();
    session
        .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
        .unwrap();

    let committer = Committer::new(
        FakeBackend {
            posted: Arc::clone(&backend.posted),
            ..FakeBackend::default()
        },
        Duration::from_secs(15),
    );
    let err = session.commit(&committer).await.unwrap_err();

    assert!(matches!(
        err,
        CommitError::Validation(ValidationError::Incomplete { ref missing, .. })
            if missing == &vec![RowId(2)]
    ));
    assert_eq!(session.flagged, vec![RowId(2)]);
    assert!(backend.posted.lock().unwrap().is_empty());
    assert_eq!(
        committer.state(),
        CommitState::Blocked {
            missing: vec![RowId(2)]
        }
    );
}

#[tokio::test]
async fn complete_batch_posts_every_row_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();
    let mut session = staged(&backend, &dir).await;
    session
        .assign(RowId(0), CategoryRef::Budget("b1".to_string()))
        .unwrap();
    session
        .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
        .unwrap();
    session
        .assign(RowId(2), CategoryRef::SavingGoal("g1".to_string()))
        .unwrap();

    let committer = Committer::new(backend, Duration::from_secs(15));
    let summary = session.commit(&committer).await.unwrap();

    assert_eq!(summary.committed, vec![RowId(0), RowId(1), RowId(2)]);
    assert!(session.is_empty());

    let posted = committer.backend().posted.lock().unwrap();
    assert_eq!(posted.len(), 3);

    assert_eq!(posted[0].kind, TransactionType::Expense);
    assert_eq!(posted[0].amount, 100.0);
    assert_eq!(posted[0].category, "Food");
    assert_eq!(posted[0].budget_id.as_deref(), Some("b1"));
    assert_eq!(posted[0].saving_goal_id, None);

    assert_eq!(posted[1].category, "Salary");
    assert_eq!(posted[1].budget_id, None);
    assert_eq!(posted[1].saving_goal_id, None);

    assert_eq!(posted[2].category, "Holiday");
    assert_eq!(posted[2].budget_id, None);
    assert_eq!(posted[2].saving_goal_id.as_deref(), Some("g1"));
    assert_eq!(posted[2].note, "Rent");
}

#[tokio::test]
async fn rejected_row_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();
    let mut session = staged(&backend, &dir).await;
    session
        .assign(RowId(0), CategoryRef::Budget("b1".to_string()))
        .unwrap();
    session
        .assign(RowId(1), CategoryRef::Income(IncomeCategory::Salary))
        .unwrap();
    session
        .assign(RowId(2), CategoryRef::SavingGoal("g1".to_string()))
        .unwrap();

    let committer = Committer::new(
        FakeBackend {
            reject_call: Some(1),
            ..FakeBackend::default()
        },
        Duration::from_secs(15),
    );
    let err = session.commit(&committer).await.unwrap_err();

    match &err {
        CommitError::Row {
            index,
            row,
            committed,
            source,
        } => {
            assert_eq!(*index, 1);
            assert_eq!(*row, RowId(1));
            assert_eq!(committed, &vec![RowId(0)]);
            assert!(source.to_string().contains("Budget exceeded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(committer.backend().posted.lock().unwrap().len(), 2);
    assert_eq!(
        session.rows.rows().iter().map(|row| row.id).collect::<Vec<_>>(),
        vec![RowId(1), RowId(2)]
    );
    assert_eq!(session.failed.as_ref().map(|failed| failed.row), Some(RowId(1)));
    assert!(!committer.state().is_saving());
}

#[test]
fn closed_gate_never_fetches() {
    let mut gate = TimeframeGate::default();
    gate.set_month(Some(7));
    gate.set_year(Some(2025));
    assert!(gate.is_upload_disabled(today()));
    assert_eq!(gate.take_fetch(today()), None);
}
