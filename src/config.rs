use serde::Deserialize;
use std::time::Duration;

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))
        .and_then(|v| {
            if v.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(v)
        })
}

fn required_url(name: &str) -> anyhow::Result<String> {
    required(name).and_then(|url| {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("{} must start with http:// or https://", name);
        }
        Ok(url)
    })
}

fn optional_url(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
}

fn port_var(name: &str, default: u16) -> anyhow::Result<u16> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number between 1-65535", name))
}

/// Configuration for the Lending Orchestrator (LMS).
#[derive(Debug, Clone, Deserialize)]
pub struct LendingConfig {
    pub port: u16,
    /// Banking gateway (CBS) base URL, queried directly for KYC data.
    pub bank_base_url: String,
    pub bank_username: String,
    pub bank_password: String,
    /// Credential broker base URL, queried for the scoring token.
    pub broker_base_url: String,
    /// API key presented to the broker's /token endpoint.
    pub lms_api_key: String,
    /// Bounded poll loop over the scoring service's queryScore endpoint.
    pub poll_max_attempts: u32,
    pub poll_interval_secs: u64,
    /// Timeout applied to every outbound data call.
    pub data_timeout_secs: u64,
}

impl LendingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: port_var("LMS_PORT", 3000)?,
            bank_base_url: required_url("CBS_BASE_URL")?,
            bank_username: required("CBS_USERNAME")?,
            bank_password: required("CBS_PASSWORD")?,
            broker_base_url: required_url("BROKER_BASE_URL")?,
            lms_api_key: required("LMS_API_KEY")?,
            poll_max_attempts: std::env::var("LMS_POLL_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LMS_POLL_ATTEMPTS must be a positive integer"))?,
            poll_interval_secs: std::env::var("LMS_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LMS_POLL_INTERVAL_SECS must be a number"))?,
            data_timeout_secs: std::env::var("LMS_DATA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("LMS_DATA_TIMEOUT_SECS must be a number"))?,
        };

        tracing::info!("Lending configuration loaded");
        tracing::debug!("CBS base URL: {}", config.bank_base_url);
        tracing::debug!("Broker base URL: {}", config.broker_base_url);
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }
}

/// Configuration for the Credential Broker (middleware).
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub port: u16,
    /// Scoring engine base URL used for startup registration.
    pub scoring_base_url: String,
    /// Secondary registration endpoint, tried once when the primary fails.
    pub scoring_fallback_url: Option<String>,
    /// Identity sent to the scoring engine's createClient endpoint.
    pub client_name: String,
    pub client_description: String,
    /// Publicly reachable URL of this broker's /transactions endpoint.
    pub callback_url: String,
    pub username: String,
    pub password: String,
    /// API key the LMS must present to the /token endpoint.
    pub lms_api_key: String,
    /// Banking gateway reached when proxying transaction lookups.
    pub bank_base_url: String,
    pub bank_username: String,
    pub bank_password: String,
    /// When true, a banking-gateway failure on the proxy endpoint is masked
    /// with a deterministic synthetic record set instead of surfacing a 502.
    pub synthetic_fallback: bool,
    pub registration_timeout_secs: u64,
    pub data_timeout_secs: u64,
}

impl BrokerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: port_var("BROKER_PORT", 4000)?,
            scoring_base_url: required_url("SCORING_BASE_URL")?,
            scoring_fallback_url: optional_url("SCORING_FALLBACK_URL"),
            client_name: std::env::var("BROKER_CLIENT_NAME")
                .unwrap_or_else(|_| "TransactionMiddleware".to_string()),
            client_description: std::env::var("BROKER_CLIENT_DESCRIPTION")
                .unwrap_or_else(|_| "Transaction data middleware".to_string()),
            callback_url: required_url("BROKER_CALLBACK_URL")?,
            username: required("MIDDLEWARE_USER")?,
            password: required("MIDDLEWARE_PASSWORD")?,
            lms_api_key: required("LMS_API_KEY")?,
            bank_base_url: required_url("CBS_BASE_URL")?,
            bank_username: required("CBS_USERNAME")?,
            bank_password: required("CBS_PASSWORD")?,
            synthetic_fallback: std::env::var("BROKER_SYNTHETIC_FALLBACK")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            registration_timeout_secs: std::env::var("BROKER_REGISTRATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("BROKER_REGISTRATION_TIMEOUT_SECS must be a number")
                })?,
            data_timeout_secs: std::env::var("BROKER_DATA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BROKER_DATA_TIMEOUT_SECS must be a number"))?,
        };

        tracing::info!("Broker configuration loaded");
        tracing::debug!("Scoring base URL: {}", config.scoring_base_url);
        if let Some(ref fallback) = config.scoring_fallback_url {
            tracing::info!("Scoring fallback URL configured: {}", fallback);
        }
        tracing::debug!("Callback URL: {}", config.callback_url);
        if config.synthetic_fallback {
            tracing::warn!("Synthetic transaction fallback ENABLED (degraded mode)");
        }

        Ok(config)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }
}

/// Configuration for the Scoring Service.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub port: u16,
    /// Timeout for the callback pull to a registered client's transactions URL.
    pub callback_timeout_secs: u64,
}

impl ScoringConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: port_var("SCORING_PORT", 5000)?,
            callback_timeout_secs: std::env::var("SCORING_CALLBACK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SCORING_CALLBACK_TIMEOUT_SECS must be a number"))?,
        };

        tracing::info!("Scoring configuration loaded");
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_empty() {
        std::env::set_var("TEST_REQUIRED_EMPTY", "  ");
        assert!(required("TEST_REQUIRED_EMPTY").is_err());
        std::env::remove_var("TEST_REQUIRED_EMPTY");
    }

    #[test]
    fn required_url_rejects_bare_host() {
        std::env::set_var("TEST_REQUIRED_URL", "localhost:4000");
        assert!(required_url("TEST_REQUIRED_URL").is_err());
        std::env::set_var("TEST_REQUIRED_URL", "http://localhost:4000");
        assert_eq!(
            required_url("TEST_REQUIRED_URL").unwrap(),
            "http://localhost:4000"
        );
        std::env::remove_var("TEST_REQUIRED_URL");
    }
}
