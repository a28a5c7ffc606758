use crate::config::ScoringConfig;
use crate::errors::AppError;
use crate::models::{
    CreateClientRequest, CreateClientResponse, QueryScoreResponse, RegisteredClient, ScoreResult,
    ScoreTokenResponse, TransactionRecord,
};
use crate::store::{KeyValueStore, MemoryStore};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Highest score the scale can produce.
pub const MAX_SCORE: f64 = 850.0;
/// Floor of the score scale.
pub const BASE_SCORE: f64 = 300.0;

/// Sum of the alternative-channel credit and credit-transaction amounts
/// across all records.
pub fn base_credit_amount(records: &[TransactionRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.alternativechanneltrnscr_amount + r.credittransactions_amount)
        .sum()
}

/// `1 + averageMonthlyBalance / 1_000_000`; an empty record set scores as 1.
pub fn balance_multiplier(records: &[TransactionRecord]) -> f64 {
    if records.is_empty() {
        return 1.0;
    }
    let avg = records.iter().map(|r| r.monthly_balance).sum::<f64>() / records.len() as f64;
    1.0 + avg / 1_000_000.0
}

/// Total bounced-cheque count (debit and credit legs) across all records.
pub fn total_bounced_cheques(records: &[TransactionRecord]) -> i64 {
    records
        .iter()
        .map(|r| r.bounced_cheques_debit_number + r.bouncedchequescredit_number)
        .sum()
}

/// `1 - 0.05 * bounced` when any cheques bounced, else 1.
///
/// May go negative for very high counts; the resulting negative limit is a
/// documented business decision, not clamped here.
pub fn risk_penalty(total_bounced: i64) -> f64 {
    if total_bounced > 0 {
        1.0 - 0.05 * total_bounced as f64
    } else {
        1.0
    }
}

/// Credit limit derived from a customer's transaction aggregates.
pub fn limit_amount(records: &[TransactionRecord]) -> f64 {
    base_credit_amount(records)
        * 2.0
        * balance_multiplier(records)
        * risk_penalty(total_bounced_cheques(records))
}

/// Score on the 300-850 scale, clamped at the top.
pub fn score_from_base(base_credit: f64) -> f64 {
    (BASE_SCORE + base_credit / 1000.0).min(MAX_SCORE)
}

/// Shared state of the scoring service.
///
/// Both tables are keyed maps with per-key atomicity; no cross-key
/// transactions are needed.
pub struct ScoringState {
    /// Registered clients keyed by their long-lived service token.
    pub clients: MemoryStore<RegisteredClient>,
    /// Computed scores keyed by their single-use score token.
    pub scores: MemoryStore<ScoreResult>,
    client: reqwest::Client,
    next_client_id: AtomicU64,
}

impl ScoringState {
    pub fn new(config: &ScoringConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.callback_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create callback client: {}", e))
            })?;

        Ok(Self {
            clients: MemoryStore::new(),
            scores: MemoryStore::new(),
            client,
            next_client_id: AtomicU64::new(0),
        })
    }

    /// Resolves the `client-token` header to a registered client.
    async fn authorize(&self, headers: &HeaderMap) -> Result<RegisteredClient, AppError> {
        let token = headers
            .get("client-token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing client-token header".to_string()))?;

        self.clients
            .get(token)
            .await
            .ok_or_else(|| AppError::Unauthorized("Unknown client-token".to_string()))
    }

    /// Pulls transaction records back from a registered client's callback URL
    /// under the Basic credential stored at registration.
    async fn pull_transactions(
        &self,
        client: &RegisteredClient,
        customer_number: &str,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        tracing::info!(
            "Pulling transactions for customer {} from {}",
            customer_number,
            client.client_url
        );

        let response = self
            .client
            .get(&client.client_url)
            .query(&[("customerNumber", customer_number)])
            .basic_auth(&client.username, Some(&client.password))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::UpstreamUnavailable(format!(
                "Client callback returned {}",
                status
            )));
        }

        let transactions = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse callback response: {}", e))
        })?;

        Ok(transactions)
    }
}

/// POST /api/v1/client/createClient
///
/// Registers a client and returns its long-lived service token. Tokens are
/// random v4 UUIDs, never reused across clients or restarts.
pub async fn create_client(
    State(state): State<Arc<ScoringState>>,
    Json(body): Json<CreateClientRequest>,
) -> Result<Json<CreateClientResponse>, AppError> {
    if body.client_name.trim().is_empty()
        || body.client_description.trim().is_empty()
        || body.client_url.trim().is_empty()
        || body.username.trim().is_empty()
        || body.password.trim().is_empty()
    {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    }

    let token = Uuid::new_v4().to_string();
    let id = state.next_client_id.fetch_add(1, Ordering::Relaxed);

    let client = RegisteredClient {
        client_name: body.client_name.clone(),
        client_description: body.client_description.clone(),
        client_url: body.client_url.clone(),
        username: body.username.clone(),
        password: body.password.clone(),
    };
    state.clients.put(token.clone(), client).await;

    tracing::info!(
        "Client registered: {}, URL: {}, token: {}",
        body.client_name,
        body.client_url,
        token
    );

    Ok(Json(CreateClientResponse {
        id,
        url: body.client_url,
        name: body.client_name,
        username: body.username,
        password: body.password,
        token,
    }))
}

/// GET /api/v1/scoring/initiateQueryScore/:customerNumber
///
/// Pulls the customer's transactions back from the registered client, computes
/// the score inputs, and returns a fresh single-use score token. Nothing is
/// stored when the callback pull fails.
pub async fn initiate_query_score(
    State(state): State<Arc<ScoringState>>,
    Path(customer_number): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ScoreTokenResponse>, AppError> {
    let client = state.authorize(&headers).await?;

    let records = state.pull_transactions(&client, &customer_number).await?;

    let base = base_credit_amount(&records);
    let limit = limit_amount(&records);

    let score_token = Uuid::new_v4().to_string();
    state
        .scores
        .put(
            score_token.clone(),
            ScoreResult {
                customer_number: customer_number.clone(),
                base_credit_amount: base,
                limit_amount: limit,
            },
        )
        .await;

    tracing::info!(
        "Scoring initiated for customer {}: base={:.2}, limit={:.2}",
        customer_number,
        base,
        limit
    );

    Ok(Json(ScoreTokenResponse { token: score_token }))
}

/// GET /api/v1/scoring/queryScore/:token
///
/// Returns the computed score and limit, consuming the stored result: a
/// second query with the same token yields 404.
pub async fn query_score(
    State(state): State<Arc<ScoringState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<QueryScoreResponse>, AppError> {
    state.authorize(&headers).await?;

    let result = state
        .scores
        .remove(&token)
        .await
        .ok_or_else(|| AppError::NotFound("Score not found".to_string()))?;

    tracing::info!(
        "Score consumed for customer {}: token {}",
        result.customer_number,
        token
    );

    Ok(Json(QueryScoreResponse {
        score: score_from_base(result.base_credit_amount),
        limit_amount: result.limit_amount,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "scoring-engine",
        "version": "0.1.0"
    }))
}

/// Builds the scoring service router.
pub fn router(state: Arc<ScoringState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/client/createClient", post(create_client))
        .route(
            "/api/v1/scoring/initiateQueryScore/:customer_number",
            get(initiate_query_score),
        )
        .route("/api/v1/scoring/queryScore/:token", get(query_score))
        .with_state(state)
}
