//! JSON contracts of the MoneySmart backend.
//!
//! Field names follow the backend's camelCase convention; ids are opaque
//! strings (the backend accepts both `id` and `_id` on the way in).

use serde::{Deserialize, Serialize};

pub mod budget {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Budget {
        #[serde(alias = "_id")]
        pub id: String,
        /// Spending category the budget caps (e.g. "Food").
        pub category: String,
        #[serde(default)]
        pub amount: f64,
        #[serde(default)]
        pub used_amount: f64,
        #[serde(default)]
        pub threshold: Option<f64>,
        /// 0-based month, as stored by the backend.
        #[serde(default)]
        pub month: Option<u32>,
        #[serde(default)]
        pub year: Option<i32>,
    }

    /// Query string of `GET /budgets`.
    ///
    /// `month` is 0-based (January = 0).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetQuery {
        pub month: u32,
        pub year: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetsResponse {
        pub budgets: Vec<Budget>,
    }
}

pub mod saving_goal {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SavingGoal {
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(alias = "purpose")]
        pub name: String,
        #[serde(default)]
        pub current_amount: f64,
        #[serde(default)]
        pub target_amount: f64,
        #[serde(default)]
        pub target_date: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SavingGoalsResponse {
        pub saving_goals: Vec<SavingGoal>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionType {
        Income,
        Expense,
    }

    impl TransactionType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Income => "INCOME",
                Self::Expense => "EXPENSE",
            }
        }

        /// Case-insensitive parse of the spreadsheet/user spelling.
        pub fn parse(value: &str) -> Option<Self> {
            match value.trim().to_ascii_uppercase().as_str() {
                "INCOME" => Some(Self::Income),
                "EXPENSE" => Some(Self::Expense),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum PaymentMethod {
        Cash,
        Cheque,
        Card,
    }

    impl PaymentMethod {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Cash => "CASH",
                Self::Cheque => "CHEQUE",
                Self::Card => "CARD",
            }
        }

        /// Case-insensitive parse of the spreadsheet/user spelling.
        pub fn parse(value: &str) -> Option<Self> {
            match value.trim().to_ascii_uppercase().as_str() {
                "CASH" => Some(Self::Cash),
                "CHEQUE" => Some(Self::Cheque),
                "CARD" => Some(Self::Card),
                _ => None,
            }
        }
    }

    /// Body of `POST /transaction`.
    ///
    /// At most one of `budget_id` / `saving_goal_id` is set; both are
    /// serialized (as `null` when absent).
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionNew {
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub amount: f64,
        /// `YYYY-MM-DD`.
        pub date: String,
        pub payment_method: PaymentMethod,
        pub note: String,
        pub category: String,
        pub budget_id: Option<String>,
        pub saving_goal_id: Option<String>,
    }
}

pub mod error {
    use super::*;

    /// Error body returned by the backend on any non-success status.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub message: String,
    }
}
