//! Staged rows.
//!
//! An [`UploadedRow`] is a transaction candidate decoded from a file. Rows
//! live in a [`RowSet`] that is never edited in place: every mutation returns
//! a new set, so a half-applied edit can never be observed.

use std::{fmt, str::FromStr};

use api_types::transaction::{PaymentMethod, TransactionType};
use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, money::Amount};

/// Batch-local row id, assigned at decode time in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Categories accepted for INCOME rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeCategory {
    Salary,
    Freelance,
    Investments,
    Rental,
    Business,
    Gifts,
    Refunds,
    Other,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 8] = [
        Self::Salary,
        Self::Freelance,
        Self::Investments,
        Self::Rental,
        Self::Business,
        Self::Gifts,
        Self::Refunds,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Salary => "Salary",
            Self::Freelance => "Freelance",
            Self::Investments => "Investments",
            Self::Rental => "Rental",
            Self::Business => "Business",
            Self::Gifts => "Gifts",
            Self::Refunds => "Refunds",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive lookup of a label.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

/// What a row's category points at.
///
/// The textual forms `"Budget:<id>"`, `"Saving Goal:<id>"` and the income
/// labels are parsed exactly once, when the value enters the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryRef {
    Budget(String),
    SavingGoal(String),
    Income(IncomeCategory),
}

const BUDGET_PREFIX: &str = "Budget:";
const SAVING_GOAL_PREFIX: &str = "Saving Goal:";

impl CategoryRef {
    /// Row type the reference can be assigned to.
    pub fn kind(&self) -> TransactionType {
        match self {
            Self::Budget(_) | Self::SavingGoal(_) => TransactionType::Expense,
            Self::Income(_) => TransactionType::Income,
        }
    }
}

impl fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Budget(id) => write!(f, "{BUDGET_PREFIX}{id}"),
            Self::SavingGoal(id) => write!(f, "{SAVING_GOAL_PREFIX}{id}"),
            Self::Income(category) => f.write_str(category.as_str()),
        }
    }
}

impl FromStr for CategoryRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unknown = || ValidationError::UnknownCategory(trimmed.to_string());

        if let Some(id) = trimmed.strip_prefix(BUDGET_PREFIX) {
            let id = id.trim();
            return if id.is_empty() {
                Err(unknown())
            } else {
                Ok(Self::Budget(id.to_string()))
            };
        }
        if let Some(id) = trimmed.strip_prefix(SAVING_GOAL_PREFIX) {
            let id = id.trim();
            return if id.is_empty() {
                Err(unknown())
            } else {
                Ok(Self::SavingGoal(id.to_string()))
            };
        }
        IncomeCategory::parse(trimmed)
            .map(Self::Income)
            .ok_or_else(unknown)
    }
}

impl TryFrom<String> for CategoryRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CategoryRef> for String {
    fn from(value: CategoryRef) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedRow {
    pub id: RowId,
    pub amount: Amount,
    pub kind: Option<TransactionType>,
    /// Raw date text, expected as `YYYY-MM-DD`.
    pub date: String,
    pub note: String,
    pub payment_method: Option<PaymentMethod>,
    pub category: Option<CategoryRef>,
}

/// Ordered, copy-on-write collection of staged rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowSet {
    rows: Vec<UploadedRow>,
}

impl RowSet {
    pub fn new(rows: Vec<UploadedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[UploadedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: RowId) -> Option<&UploadedRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Returns a new set where only row `id` has its category replaced.
    pub fn with_category(
        &self,
        id: RowId,
        category: Option<CategoryRef>,
    ) -> Result<Self, ValidationError> {
        if self.get(id).is_none() {
            return Err(ValidationError::UnknownRow(id));
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                if row.id == id {
                    UploadedRow {
                        category: category.clone(),
                        ..row.clone()
                    }
                } else {
                    row.clone()
                }
            })
            .collect();
        Ok(Self { rows })
    }

    /// Returns a new set without the given rows.
    pub fn without(&self, ids: &[RowId]) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| !ids.contains(&row.id))
                .cloned()
                .collect(),
        }
    }

    /// Ids of the rows that still have no category, in row order.
    pub fn missing_category(&self) -> Vec<RowId> {
        self.rows
            .iter()
            .filter(|row| row.category.is_none())
            .map(|row| row.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: usize, kind: TransactionType) -> UploadedRow {
        UploadedRow {
            id: RowId(id),
            amount: Amount::new(100),
            kind: Some(kind),
            date: "2025-03-05".to_string(),
            note: String::new(),
            payment_method: Some(PaymentMethod::Card),
            category: None,
        }
    }

    #[test]
    fn category_ref_parses_all_forms() {
        assert_eq!(
            "Budget:b1".parse::<CategoryRef>().unwrap(),
            CategoryRef::Budget("b1".to_string())
        );
        assert_eq!(
            "Saving Goal:g1".parse::<CategoryRef>().unwrap(),
            CategoryRef::SavingGoal("g1".to_string())
        );
        assert_eq!(
            "salary".parse::<CategoryRef>().unwrap(),
            CategoryRef::Income(IncomeCategory::Salary)
        );
        assert!("Budget:".parse::<CategoryRef>().is_err());
        assert!("Lottery".parse::<CategoryRef>().is_err());
    }

    #[test]
    fn category_ref_display_is_the_wire_form() {
        for raw in ["Budget:b1", "Saving Goal:g1", "Refunds"] {
            assert_eq!(raw.parse::<CategoryRef>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn with_category_touches_only_the_target_row() {
        let set = RowSet::new(vec![
            row(0, TransactionType::Expense),
            row(1, TransactionType::Income),
        ]);
        let salary = Some(CategoryRef::Income(IncomeCategory::Salary));

        let updated = set.with_category(RowId(1), salary.clone()).unwrap();

        assert_eq!(updated.get(RowId(0)), set.get(RowId(0)));
        assert_eq!(updated.get(RowId(1)).unwrap().category, salary);
        assert_eq!(set.get(RowId(1)).unwrap().category, None);
    }

    #[test]
    fn with_category_is_idempotent() {
        let set = RowSet::new(vec![row(0, TransactionType::Expense)]);
        let budget = Some(CategoryRef::Budget("b1".to_string()));

        let once = set.with_category(RowId(0), budget.clone()).unwrap();
        let twice = once.with_category(RowId(0), budget).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn with_category_rejects_unknown_rows() {
        let set = RowSet::new(vec![row(0, TransactionType::Expense)]);
        assert_eq!(
            set.with_category(RowId(7), None),
            Err(ValidationError::UnknownRow(RowId(7)))
        );
    }

    #[test]
    fn category_ref_round_trips_through_json_as_text() {
        let json = serde_json::to_string(&CategoryRef::SavingGoal("g1".to_string())).unwrap();
        assert_eq!(json, "\"Saving Goal:g1\"");
        let back: CategoryRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CategoryRef::SavingGoal("g1".to_string()));
    }
}
