use crate::errors::AppError;
use crate::models::{KycRecord, TransactionRecord};
use std::time::Duration;

/// Client for the external banking gateway (core banking system).
///
/// Exposes the two lookups the orchestration needs: a customer KYC record and
/// the customer's transaction-history aggregates. Every call carries Basic
/// auth and an explicit timeout.
#[derive(Clone)]
pub struct BankGatewayClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl BankGatewayClient {
    /// Creates a new `BankGatewayClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the banking gateway.
    /// * `username` / `password` - Basic auth credential pair.
    /// * `timeout` - Deadline applied to every request.
    pub fn new(
        base_url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create bank gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            username,
            password,
        })
    }

    /// Fetches the KYC record for a customer.
    ///
    /// Returns `Ok(None)` when the gateway has no record for the customer
    /// number; any other non-success status is an upstream failure.
    pub async fn fetch_customer(
        &self,
        customer_number: &str,
    ) -> Result<Option<KycRecord>, AppError> {
        let url = format!("{}/customer/{}", self.base_url, customer_number);
        tracing::info!("Fetching KYC for customer {} from {}", customer_number, url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::info!("Customer {} not found in banking gateway", customer_number);
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamUnavailable(format!(
                "Banking gateway returned {}: {}",
                status, error_text
            )));
        }

        let kyc: KycRecord = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse KYC response: {}", e))
        })?;

        Ok(Some(kyc))
    }

    /// Fetches the transaction-history aggregates for a customer.
    pub async fn fetch_transactions(
        &self,
        customer_number: &str,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let url = format!("{}/transactions/{}", self.base_url, customer_number);
        tracing::info!(
            "Fetching transactions for customer {} from {}",
            customer_number,
            url
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamUnavailable(format!(
                "Banking gateway returned {}: {}",
                status, error_text
            )));
        }

        let transactions: Vec<TransactionRecord> = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse transactions response: {}", e))
        })?;

        tracing::info!(
            "Fetched {} transaction records for customer {}",
            transactions.len(),
            customer_number
        );
        Ok(transactions)
    }
}
