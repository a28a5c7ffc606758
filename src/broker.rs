use crate::bank::BankGatewayClient;
use crate::config::BrokerConfig;
use crate::errors::AppError;
use crate::models::{
    BrokerTokenResponse, CreateClientRequest, CreateClientResponse, TransactionRecord,
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The broker's registered identity, established once at startup.
///
/// Constructed by `register` and handed into every request handler through
/// the shared state; never re-derived per request.
#[derive(Debug, Clone)]
pub struct BrokerIdentity {
    /// Long-lived token identifying this broker to the scoring engine.
    pub service_token: String,
    /// Credential pair the scoring engine will present on callback.
    pub username: String,
    pub password: String,
    /// Scoring engine base URL the registration succeeded against.
    pub scoring_engine_url: String,
}

impl BrokerIdentity {
    /// The exact `Authorization` header value the scoring engine must send.
    pub fn expected_basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }
}

/// Shared state of the credential broker.
pub struct BrokerState {
    pub config: BrokerConfig,
    identity: RwLock<Option<BrokerIdentity>>,
    bank: BankGatewayClient,
    client: reqwest::Client,
}

impl BrokerState {
    pub fn new(config: BrokerConfig) -> Result<Self, AppError> {
        let bank = BankGatewayClient::new(
            config.bank_base_url.clone(),
            config.bank_username.clone(),
            config.bank_password.clone(),
            config.data_timeout(),
        )?;

        let client = reqwest::Client::builder()
            .timeout(config.registration_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create registration client: {}", e))
            })?;

        Ok(Self {
            config,
            identity: RwLock::new(None),
            bank,
            client,
        })
    }

    /// Registers this broker with the scoring engine.
    ///
    /// Tries the primary endpoint, then the configured fallback if any. The
    /// process must not serve traffic without a registered identity, so the
    /// caller treats an `Err` here as fatal.
    pub async fn register(&self) -> Result<BrokerIdentity, AppError> {
        let mut endpoints = vec![self.config.scoring_base_url.clone()];
        if let Some(ref fallback) = self.config.scoring_fallback_url {
            endpoints.push(fallback.clone());
        }

        let mut last_err = AppError::UpstreamUnavailable("No registration endpoint".to_string());
        for base_url in endpoints {
            match self.register_at(&base_url).await {
                Ok(identity) => {
                    tracing::info!(
                        "Broker registered with scoring engine at {}, token: {}",
                        base_url,
                        identity.service_token
                    );
                    let mut slot = self.identity.write().await;
                    *slot = Some(identity.clone());
                    return Ok(identity);
                }
                Err(e) => {
                    tracing::error!("Registration against {} failed: {}", base_url, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn register_at(&self, base_url: &str) -> Result<BrokerIdentity, AppError> {
        let url = format!("{}/api/v1/client/createClient", base_url);
        let payload = CreateClientRequest {
            client_name: self.config.client_name.clone(),
            client_description: self.config.client_description.clone(),
            client_url: self.config.callback_url.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamUnavailable(format!(
                "Registration returned {}: {}",
                status, error_text
            )));
        }

        let body: CreateClientResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse registration response: {}", e))
        })?;

        // The credential pair echoed by the scoring engine is authoritative;
        // it is what the engine will present on callback.
        Ok(BrokerIdentity {
            service_token: body.token,
            username: body.username,
            password: body.password,
            scoring_engine_url: base_url.to_string(),
        })
    }

    /// Returns the current identity, or `NotRegistered` before registration
    /// completes.
    pub async fn identity(&self) -> Result<BrokerIdentity, AppError> {
        let slot = self.identity.read().await;
        slot.clone().ok_or(AppError::NotRegistered)
    }

    /// Test hook: installs an identity without a network round trip.
    pub async fn set_identity(&self, identity: BrokerIdentity) {
        let mut slot = self.identity.write().await;
        *slot = Some(identity);
    }
}

/// Deterministic synthetic record set for degraded-mode testing.
///
/// Derived only from the customer number so repeated calls for the same
/// customer return identical data.
pub fn synthetic_transactions(customer_number: &str) -> Vec<TransactionRecord> {
    let seed: u64 = customer_number
        .bytes()
        .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));

    let base = (seed % 90_000 + 10_000) as f64;
    vec![TransactionRecord {
        account_number: format!("ACC{}-1", customer_number),
        alternativechanneltrnscr_amount: base,
        alternativechanneltrnscr_number: (seed % 10) as i64,
        credittransactions_amount: base / 10.0,
        monthly_balance: base * 25.0,
        transaction_value: (seed % 100) as f64,
        ..Default::default()
    }]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsQuery {
    customer_number: Option<String>,
}

/// GET /transactions?customerNumber=<id>
///
/// Invoked by the scoring engine, not the LMS. The Authorization header must
/// match the Basic credential established at registration; the error response
/// never reveals the expected value.
async fn get_transactions(
    State(state): State<Arc<BrokerState>>,
    Query(query): Query<TransactionsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let customer_number = query
        .customer_number
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Customer number required".to_string()))?;

    let identity = state.identity().await?;
    let provided = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided != identity.expected_basic_auth() {
        return Err(AppError::Unauthorized(
            "Bad or missing Basic credential on transactions proxy".to_string(),
        ));
    }

    match state.bank.fetch_transactions(&customer_number).await {
        Ok(transactions) => Ok(Json(transactions)),
        Err(e) if state.config.synthetic_fallback => {
            tracing::warn!(
                "Banking gateway failed for customer {} ({}); serving synthetic records",
                customer_number,
                e
            );
            Ok(Json(synthetic_transactions(&customer_number)))
        }
        Err(e) => Err(e),
    }
}

/// GET /token
///
/// Hands the current scoring token and engine URL to the LMS. Guarded by the
/// shared `x-api-key` so only the orchestrator can read the credential.
async fn get_token(
    State(state): State<Arc<BrokerState>>,
    headers: HeaderMap,
) -> Result<Json<BrokerTokenResponse>, AppError> {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if api_key != state.config.lms_api_key {
        return Err(AppError::Unauthorized("Bad x-api-key".to_string()));
    }

    let identity = state.identity().await?;
    Ok(Json(BrokerTokenResponse {
        scoring_token: identity.service_token,
        scoring_engine_url: identity.scoring_engine_url,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "credential-broker",
        "version": "0.1.0"
    }))
}

/// Builds the broker router.
pub fn router(state: Arc<BrokerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/token", get(get_token))
        .route("/transactions", get(get_transactions))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_basic_auth_matches_rfc_encoding() {
        let identity = BrokerIdentity {
            service_token: "tok".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
            scoring_engine_url: "http://localhost:5000".to_string(),
        };
        // base64("user:pass")
        assert_eq!(identity.expected_basic_auth(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn synthetic_records_are_deterministic() {
        let a = synthetic_transactions("1001");
        let b = synthetic_transactions("1001");
        assert_eq!(a.len(), 1);
        assert_eq!(
            a[0].alternativechanneltrnscr_amount,
            b[0].alternativechanneltrnscr_amount
        );
        assert_eq!(a[0].monthly_balance, b[0].monthly_balance);

        let c = synthetic_transactions("2002");
        assert_ne!(
            a[0].alternativechanneltrnscr_amount,
            c[0].alternativechanneltrnscr_amount
        );
    }
}
