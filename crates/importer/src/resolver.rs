//! Category resolution.
//!
//! Budgets of the selected month and all saving goals are loaded together
//! and merged into a [`CategoryCatalog`]; rows are then checked and assigned
//! against it.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use api_types::{
    budget::{Budget, BudgetQuery},
    saving_goal::SavingGoal,
    transaction::TransactionType,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{BackendError, ReferenceFetchError, RowProblem, ValidationError},
    row::{CategoryRef, IncomeCategory, RowId, RowSet, UploadedRow},
    timeframe::Timeframe,
};

/// Read side of the backend needed to resolve categories.
pub trait ReferenceSource {
    /// Budgets of a month; `query.month` is 0-based.
    fn budgets(
        &self,
        query: BudgetQuery,
    ) -> impl Future<Output = Result<Vec<Budget>, BackendError>> + Send;

    fn saving_goals(&self) -> impl Future<Output = Result<Vec<SavingGoal>, BackendError>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryModel {
    Budget,
    #[serde(rename = "Saving Goal")]
    SavingGoal,
}

impl CategoryModel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Budget => "Budget",
            Self::SavingGoal => "Saving Goal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
    pub model: CategoryModel,
}

impl CategoryOption {
    pub fn reference(&self) -> CategoryRef {
        match self.model {
            CategoryModel::Budget => CategoryRef::Budget(self.id.clone()),
            CategoryModel::SavingGoal => CategoryRef::SavingGoal(self.id.clone()),
        }
    }
}

/// Expense targets available for one timeframe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCatalog {
    timeframe: Option<Timeframe>,
    options: Vec<CategoryOption>,
}

impl CategoryCatalog {
    pub fn new(timeframe: Timeframe, budgets: Vec<Budget>, saving_goals: Vec<SavingGoal>) -> Self {
        let budgets = budgets.into_iter().map(|budget| CategoryOption {
            id: budget.id,
            name: budget.category,
            model: CategoryModel::Budget,
        });
        let goals = saving_goals.into_iter().map(|goal| CategoryOption {
            id: goal.id,
            name: goal.name,
            model: CategoryModel::SavingGoal,
        });
        Self {
            timeframe: Some(timeframe),
            options: budgets.chain(goals).collect(),
        }
    }

    pub fn timeframe(&self) -> Option<Timeframe> {
        self.timeframe
    }

    pub fn options(&self) -> &[CategoryOption] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Option an expense reference points at; `None` for income labels and
    /// for ids the catalog does not know (stale references).
    pub fn lookup(&self, category: &CategoryRef) -> Option<&CategoryOption> {
        let (model, id) = match category {
            CategoryRef::Budget(id) => (CategoryModel::Budget, id),
            CategoryRef::SavingGoal(id) => (CategoryModel::SavingGoal, id),
            CategoryRef::Income(_) => return None,
        };
        self.options
            .iter()
            .find(|option| option.model == model && &option.id == id)
    }

    /// Whether `category` is an acceptable value for a row of type `kind`.
    pub fn accepts(&self, kind: TransactionType, category: &CategoryRef) -> bool {
        match (kind, category) {
            (TransactionType::Income, CategoryRef::Income(_)) => true,
            (TransactionType::Expense, CategoryRef::Budget(_) | CategoryRef::SavingGoal(_)) => {
                self.lookup(category).is_some()
            }
            _ => false,
        }
    }

    /// Every value a row of type `kind` may take.
    pub fn candidates(&self, kind: TransactionType) -> Vec<CategoryRef> {
        match kind {
            TransactionType::Income => IncomeCategory::ALL
                .into_iter()
                .map(CategoryRef::Income)
                .collect(),
            TransactionType::Expense => self.options.iter().map(CategoryOption::reference).collect(),
        }
    }
}

/// Loads budgets and saving goals concurrently, each call bounded by
/// `timeout`.
pub async fn fetch_catalog<S: ReferenceSource>(
    source: &S,
    timeframe: Timeframe,
    timeout: Duration,
) -> Result<CategoryCatalog, ReferenceFetchError> {
    tracing::debug!("loading categories for {timeframe}");
    let (budgets, saving_goals) = tokio::join!(
        tokio::time::timeout(timeout, source.budgets(timeframe.budget_query())),
        tokio::time::timeout(timeout, source.saving_goals()),
    );

    let budgets = budgets
        .map_err(|_| ReferenceFetchError::Timeout(timeout))?
        .map_err(ReferenceFetchError::Budgets)?;
    let saving_goals = saving_goals
        .map_err(|_| ReferenceFetchError::Timeout(timeout))?
        .map_err(ReferenceFetchError::SavingGoals)?;

    tracing::debug!(
        "loaded {} budgets and {} saving goals for {timeframe}",
        budgets.len(),
        saving_goals.len()
    );
    Ok(CategoryCatalog::new(timeframe, budgets, saving_goals))
}

/// Handle of one reference refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
    timeframe: Timeframe,
}

impl RefreshTicket {
    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh started after this one; its result was dropped.
    Discarded,
}

/// Owns the current catalog and makes the latest refresh authoritative.
#[derive(Debug, Default)]
pub struct Resolver {
    generation: u64,
    catalog: Option<CategoryCatalog>,
    last_error: Option<ReferenceFetchError>,
}

impl Resolver {
    pub fn catalog(&self) -> Option<&CategoryCatalog> {
        self.catalog.as_ref()
    }

    pub fn last_error(&self) -> Option<&ReferenceFetchError> {
        self.last_error.as_ref()
    }

    pub fn begin_refresh(&mut self, timeframe: Timeframe) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket {
            generation: self.generation,
            timeframe,
        }
    }

    /// Records the result of the refresh identified by `ticket`.
    ///
    /// A failed current refresh keeps the previous catalog and is returned
    /// as an error; results of superseded refreshes are discarded.
    pub fn complete(
        &mut self,
        ticket: RefreshTicket,
        result: Result<CategoryCatalog, ReferenceFetchError>,
    ) -> Result<RefreshOutcome, ReferenceFetchError> {
        if ticket.generation != self.generation {
            tracing::warn!(
                "discarding categories for {} (refresh {} superseded by {})",
                ticket.timeframe,
                ticket.generation,
                self.generation
            );
            return Ok(RefreshOutcome::Discarded);
        }
        match result {
            Ok(catalog) => {
                self.catalog = Some(catalog);
                self.last_error = None;
                Ok(RefreshOutcome::Applied)
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

}

/// Cloneable handle to a [`Resolver`] for refreshes that may overlap.
///
/// The lock is taken to start and to record a refresh, never across the
/// fetch, so a refresh started later always supersedes an earlier one that
/// is still in flight.
#[derive(Clone, Debug, Default)]
pub struct SharedResolver(Arc<Mutex<Resolver>>);

impl SharedResolver {
    pub fn catalog(&self) -> Option<CategoryCatalog> {
        self.lock().catalog.clone()
    }

    pub fn last_error(&self) -> Option<ReferenceFetchError> {
        self.lock().last_error.clone()
    }

    /// Runs a whole refresh for `timeframe` against `source`.
    pub async fn refresh<S: ReferenceSource>(
        &self,
        source: &S,
        timeframe: Timeframe,
        timeout: Duration,
    ) -> Result<RefreshOutcome, ReferenceFetchError> {
        let ticket = self.lock().begin_refresh(timeframe);
        let result = fetch_catalog(source, timeframe, timeout).await;
        self.lock().complete(ticket, result)
    }

    fn lock(&self) -> MutexGuard<'_, Resolver> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sets the category of one row after checking it against the catalog.
///
/// Rows whose type is still unknown accept any known category; the mismatch
/// is caught again before commit.
pub fn assign(
    rows: &RowSet,
    id: RowId,
    category: CategoryRef,
    catalog: &CategoryCatalog,
) -> Result<RowSet, ValidationError> {
    let row = rows.get(id).ok_or(ValidationError::UnknownRow(id))?;

    match row.kind {
        Some(kind) if !catalog.accepts(kind, &category) => {
            if category.kind() != kind {
                return Err(ValidationError::InvalidRow {
                    row: id,
                    problem: RowProblem::CategoryMismatch {
                        category: category.to_string(),
                        kind: kind.as_str(),
                    },
                });
            }
            return Err(ValidationError::UnknownCategory(category.to_string()));
        }
        None if !catalog.accepts(category.kind(), &category) => {
            return Err(ValidationError::UnknownCategory(category.to_string()));
        }
        _ => {}
    }

    rows.with_category(id, Some(category))
}

/// Fills empty categories whose note names exactly one candidate.
///
/// Returns the new set and the ids it resolved.
pub fn auto_resolve(rows: &RowSet, catalog: &CategoryCatalog) -> (RowSet, Vec<RowId>) {
    let mut resolved = Vec::new();
    let mut current = rows.clone();

    for row in rows.rows() {
        if row.category.is_some() {
            continue;
        }
        let Some(category) = guess(row, catalog) else {
            continue;
        };
        if let Ok(next) = current.with_category(row.id, Some(category)) {
            current = next;
            resolved.push(row.id);
        }
    }

    if !resolved.is_empty() {
        tracing::debug!("auto-resolved {} rows", resolved.len());
    }
    (current, resolved)
}

fn guess(row: &UploadedRow, catalog: &CategoryCatalog) -> Option<CategoryRef> {
    let note = row.note.trim();
    if note.is_empty() {
        return None;
    }
    match row.kind? {
        TransactionType::Income => IncomeCategory::parse(note).map(CategoryRef::Income),
        TransactionType::Expense => {
            let mut matches = catalog
                .options()
                .iter()
                .filter(|option| option.name.trim().eq_ignore_ascii_case(note));
            let first = matches.next()?;
            if matches.next().is_some() {
                return None;
            }
            Some(first.reference())
        }
    }
}

/// Rows that cannot be committed yet: no category, or one the catalog no
/// longer accepts.
pub fn unresolved(rows: &RowSet, catalog: &CategoryCatalog) -> Vec<RowId> {
    rows.rows()
        .iter()
        .filter(|row| match (&row.category, row.kind) {
            (None, _) => true,
            (Some(category), Some(kind)) => !catalog.accepts(kind, category),
            (Some(category), None) => !catalog.accepts(category.kind(), category),
        })
        .map(|row| row.id)
        .collect()
}
