use crate::config::LendingConfig;
use crate::errors::AppError;
use crate::models::{BrokerTokenResponse, QueryScoreResponse, ScoreTokenResponse};
use std::time::Duration;

/// Retry policy for the scoring poll loop.
///
/// Fixed spacing by default; a multiplicative backoff factor can stretch the
/// interval per attempt. Tests inject a zero-delay policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub backoff: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff: 1.0,
        }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Policy with no inter-attempt delay, for tests.
    pub fn zero_delay(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay to wait after the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.backoff == 1.0 {
            return self.interval;
        }
        self.interval
            .mul_f64(self.backoff.powi(attempt.saturating_sub(1) as i32))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

/// Client for the broker's token endpoint and the scoring engine's two-phase
/// API, as used by the lending orchestrator.
#[derive(Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    broker_base_url: String,
    lms_api_key: String,
}

impl ScoringClient {
    pub fn new(config: &LendingConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.data_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create scoring client: {}", e))
            })?;

        Ok(Self {
            client,
            broker_base_url: config.broker_base_url.clone(),
            lms_api_key: config.lms_api_key.clone(),
        })
    }

    /// Fetches the current scoring token and engine URL from the broker.
    pub async fn fetch_scoring_token(&self) -> Result<BrokerTokenResponse, AppError> {
        let url = format!("{}/token", self.broker_base_url);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.lms_api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::UpstreamUnavailable(format!(
                "Broker token endpoint returned {}",
                status
            )));
        }

        let token: BrokerTokenResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse broker token response: {}", e))
        })?;

        tracing::debug!("Fetched scoring token from broker");
        Ok(token)
    }

    /// Initiates scoring for a customer; returns the single-use score token.
    pub async fn initiate_scoring(
        &self,
        broker_token: &BrokerTokenResponse,
        customer_number: &str,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/api/v1/scoring/initiateQueryScore/{}",
            broker_token.scoring_engine_url, customer_number
        );

        let response = self
            .client
            .get(&url)
            .header("client-token", &broker_token.scoring_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::UpstreamUnavailable(format!(
                "Scoring initiate returned {}",
                status
            )));
        }

        let body: ScoreTokenResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse initiate response: {}", e))
        })?;

        tracing::info!(
            "Scoring initiated for customer {}: score token {}",
            customer_number,
            body.token
        );
        Ok(body.token)
    }

    /// Queries the score for a previously initiated token.
    pub async fn query_score(
        &self,
        broker_token: &BrokerTokenResponse,
        score_token: &str,
    ) -> Result<QueryScoreResponse, AppError> {
        let url = format!(
            "{}/api/v1/scoring/queryScore/{}",
            broker_token.scoring_engine_url, score_token
        );

        let response = self
            .client
            .get(&url)
            .header("client-token", &broker_token.scoring_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::UpstreamUnavailable(format!(
                "Scoring query returned {}",
                status
            )));
        }

        let body: QueryScoreResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse query response: {}", e))
        })?;

        Ok(body)
    }

    /// Polls queryScore under the retry policy and returns the first result.
    ///
    /// `None` after exhaustion; the caller applies the fail-closed rejection.
    /// Sleeps are scoped to this request's task and never block the process.
    pub async fn poll_score(
        &self,
        broker_token: &BrokerTokenResponse,
        score_token: &str,
        policy: &RetryPolicy,
    ) -> Option<QueryScoreResponse> {
        for attempt in 1..=policy.max_attempts {
            match self.query_score(broker_token, score_token).await {
                Ok(score) => {
                    tracing::info!(
                        "Score available on attempt {}/{}: limit {:.2}",
                        attempt,
                        policy.max_attempts,
                        score.limit_amount
                    );
                    return Some(score);
                }
                Err(e) => {
                    tracing::warn!(
                        "Score poll attempt {}/{} failed: {}",
                        attempt,
                        policy.max_attempts,
                        e
                    );
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay_for(attempt)).await;
                    }
                }
            }
        }
        None
    }
}
