use std::time::Duration;

use api_types::{
    budget::{Budget, BudgetQuery, BudgetsResponse},
    error::ErrorBody,
    saving_goal::{SavingGoal, SavingGoalsResponse},
    transaction::TransactionNew,
};
use importer::{Backend, BackendError, ReferenceSource};
use reqwest::{RequestBuilder, Response, StatusCode, Url};

use crate::error::{AppError, Result};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{status}: {message}")]
    Validation { status: u16, message: String },
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => Self::Rejected {
                status: 401,
                message: "unauthorized".to_string(),
            },
            ClientError::Forbidden => Self::Rejected {
                status: 403,
                message: "forbidden".to_string(),
            },
            ClientError::NotFound(message) => Self::Rejected {
                status: 404,
                message,
            },
            ClientError::Validation { status, message } | ClientError::Server { status, message } => {
                Self::Rejected { status, message }
            }
            ClientError::Endpoint(message) => Self::Transport(message),
            ClientError::Transport(err) if err.is_decode() => Self::Decode(err.to_string()),
            ClientError::Transport(err) => Self::Transport(err.to_string()),
        }
    }
}

/// HTTP client of the MoneySmart backend.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|err| AppError::BaseUrl(err.to_string()))?;
        // `join` replaces the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http,
            token: token.filter(|token| !token.is_empty()),
        })
    }

    fn url(&self, path: &str) -> std::result::Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::Endpoint(err.to_string()))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// `GET /budgets`; `query.month` is 0-based.
    pub async fn fetch_budgets(
        &self,
        query: BudgetQuery,
    ) -> std::result::Result<Vec<Budget>, ClientError> {
        let req = self.http.get(self.url("budgets")?).query(&query);
        let res = self.authorize(req).send().await?;
        if !res.status().is_success() {
            return Err(error_from(res).await);
        }
        Ok(res.json::<BudgetsResponse>().await?.budgets)
    }

    pub async fn fetch_saving_goals(&self) -> std::result::Result<Vec<SavingGoal>, ClientError> {
        let req = self.http.get(self.url("saving-goals")?);
        let res = self.authorize(req).send().await?;
        if !res.status().is_success() {
            return Err(error_from(res).await);
        }
        Ok(res.json::<SavingGoalsResponse>().await?.saving_goals)
    }

    /// `POST /transaction`; anything but `201 Created` is a failure.
    pub async fn post_transaction(
        &self,
        payload: &TransactionNew,
    ) -> std::result::Result<(), ClientError> {
        let req = self.http.post(self.url("transaction")?).json(payload);
        let res = self.authorize(req).send().await?;
        if res.status() == StatusCode::CREATED {
            return Ok(());
        }
        Err(error_from(res).await)
    }
}

async fn error_from(res: Response) -> ClientError {
    let status = res.status();
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    match status.as_u16() {
        401 => ClientError::Unauthorized,
        403 => ClientError::Forbidden,
        404 => ClientError::NotFound(message),
        status @ (400 | 409 | 422) => ClientError::Validation { status, message },
        status => ClientError::Server { status, message },
    }
}

impl ReferenceSource for Client {
    async fn budgets(&self, query: BudgetQuery) -> std::result::Result<Vec<Budget>, BackendError> {
        Ok(self.fetch_budgets(query).await?)
    }

    async fn saving_goals(&self) -> std::result::Result<Vec<SavingGoal>, BackendError> {
        Ok(self.fetch_saving_goals().await?)
    }
}

impl Backend for Client {
    async fn create_transaction(
        &self,
        payload: &TransactionNew,
    ) -> std::result::Result<(), BackendError> {
        Ok(self.post_transaction(payload).await?)
    }
}
