use crate::bank::BankGatewayClient;
use crate::config::LendingConfig;
use crate::errors::AppError;
use crate::lending::{RetryPolicy, ScoringClient};
use crate::models::{
    Customer, LoanDecisionResponse, LoanRequestBody, LoanStatus, LoanStatusResponse,
    SubscribeRequest, SubscribeResponse,
};
use crate::store::{CustomerRepository, LoanRepository};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into the lending handlers.
pub struct AppState {
    /// Application configuration.
    pub config: LendingConfig,
    /// Subscribed customers.
    pub customers: Arc<dyn CustomerRepository>,
    /// Loan requests, keyed by request id.
    pub loans: Arc<dyn LoanRepository>,
    /// Direct client to the banking gateway (KYC lookups).
    pub bank: BankGatewayClient,
    /// Client for the broker token endpoint and the scoring engine.
    pub scoring: ScoringClient,
    /// Poll policy for the scoring query loop.
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(
        config: LendingConfig,
        customers: Arc<dyn CustomerRepository>,
        loans: Arc<dyn LoanRepository>,
    ) -> Result<Self, AppError> {
        let bank = BankGatewayClient::new(
            config.bank_base_url.clone(),
            config.bank_username.clone(),
            config.bank_password.clone(),
            config.data_timeout(),
        )?;
        let scoring = ScoringClient::new(&config)?;
        let retry = RetryPolicy::new(
            config.poll_max_attempts,
            std::time::Duration::from_secs(config.poll_interval_secs),
        );

        Ok(Self {
            config,
            customers,
            loans,
            bank,
            scoring,
            retry,
        })
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lms-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /subscribe
///
/// Registers a customer with the LMS: fetches KYC data from the banking
/// gateway and persists it verbatim. A second subscribe for the same customer
/// number is rejected with a conflict.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, AppError> {
    if body.customer_number.trim().is_empty() {
        return Err(AppError::BadRequest("Customer number required".to_string()));
    }
    let customer_number = body.customer_number;
    tracing::info!("POST /subscribe - customer {}", customer_number);

    if state.customers.get(&customer_number).await.is_some() {
        return Err(AppError::Conflict("Customer already subscribed".to_string()));
    }

    let kyc = state
        .bank
        .fetch_customer(&customer_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found in CBS".to_string()))?;

    state
        .customers
        .insert_new(Customer {
            customer_number: customer_number.clone(),
            kyc,
        })
        .await?;

    tracing::info!("Customer {} subscribed", customer_number);
    Ok(Json(SubscribeResponse {
        status: "subscribed".to_string(),
        customer_number,
    }))
}

/// POST /loan/request
///
/// Runs the full scoring orchestration for one loan request and always
/// returns with the loan in a terminal state:
/// credential fetch, scoring initiation, pending loan creation, then a
/// bounded poll loop whose exhaustion finalizes the loan as rejected.
pub async fn request_loan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoanRequestBody>,
) -> Result<Json<LoanDecisionResponse>, AppError> {
    if body.customer_number.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Customer number and amount required".to_string(),
        ));
    }
    if body.amount <= 0.0 || !body.amount.is_finite() {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }
    let customer_number = body.customer_number;
    tracing::info!(
        "POST /loan/request - customer {} amount {}",
        customer_number,
        body.amount
    );

    if state.customers.get(&customer_number).await.is_none() {
        return Err(AppError::NotFound("Customer not subscribed".to_string()));
    }
    if state.loans.has_active(&customer_number).await {
        return Err(AppError::Conflict("Active loan exists".to_string()));
    }

    let broker_token = state.scoring.fetch_scoring_token().await?;

    let score_token = state
        .scoring
        .initiate_scoring(&broker_token, &customer_number)
        .await?;

    // Atomic check-and-insert; a concurrent request that raced past the
    // advisory check above loses here with a conflict.
    let loan = state
        .loans
        .create_pending(&customer_number, body.amount, &score_token)
        .await?;

    let status = match state
        .scoring
        .poll_score(&broker_token, &score_token, &state.retry)
        .await
    {
        Some(score) if body.amount <= score.limit_amount => LoanStatus::Approved,
        Some(_) => LoanStatus::Rejected,
        // Fail closed: poll exhaustion rejects rather than leaving the
        // request pending.
        None => LoanStatus::Rejected,
    };

    let loan = state.loans.finalize(&loan.request_id, status).await?;
    tracing::info!(
        "Loan {} for customer {} finalized as {}",
        loan.request_id,
        customer_number,
        loan.status
    );

    Ok(Json(LoanDecisionResponse {
        status: loan.status,
        request_id: loan.request_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanStatusQuery {
    pub request_id: Option<String>,
}

/// GET /loan/status?requestId=<id>
pub async fn loan_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanStatusQuery>,
) -> Result<Json<LoanStatusResponse>, AppError> {
    let request_id = query
        .request_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Request ID required".to_string()))?;

    let loan = state
        .loans
        .get(&request_id)
        .await
        .ok_or_else(|| AppError::NotFound("Loan not found".to_string()))?;

    Ok(Json(LoanStatusResponse {
        status: loan.status,
        amount: loan.amount,
        request_id: loan.request_id,
    }))
}

/// Builds the lending orchestrator router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/subscribe", post(subscribe))
        .route("/loan/request", post(request_loan))
        .route("/loan/status", get(loan_status))
        .with_state(state)
}
