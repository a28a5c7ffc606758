use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// KYC record returned by the banking gateway for a customer.
///
/// Stored verbatim on subscription; the orchestrator never edits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRecord {
    pub customer_number: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub monthly_income: f64,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub id_type: Option<IdType>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub status: Option<CustomerStatus>,
    #[serde(default)]
    pub dob: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdType {
    Passport,
    NationalId,
    DriversLicense,
    VotersId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Inactive,
}

/// Account-level transaction aggregates returned by the banking gateway.
///
/// The upstream schema carries dozens of aggregate columns; this struct keeps
/// the fields the scoring formulas consume plus enough context to round-trip
/// realistic payloads. Sparse upstream records still decode because every
/// numeric field defaults to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub alternativechanneltrnscr_amount: f64,
    #[serde(default)]
    pub alternativechanneltrnscr_number: i64,
    #[serde(default)]
    pub alternativechanneltrnsdebit_amount: f64,
    #[serde(default)]
    pub alternativechanneltrnsdebit_number: i64,
    #[serde(default)]
    pub atm_transactions_number: i64,
    #[serde(default)]
    pub atmtransactions_amount: f64,
    #[serde(default)]
    pub bounced_cheques_debit_number: i64,
    #[serde(default)]
    pub bouncedchequescredit_number: i64,
    #[serde(default)]
    pub bouncedchequetransactionscr_amount: f64,
    #[serde(default)]
    pub bouncedchequetransactionsdr_amount: f64,
    #[serde(default)]
    pub cheque_debit_transactions_amount: f64,
    #[serde(default)]
    pub cheque_debit_transactions_number: i64,
    #[serde(default)]
    pub credittransactions_amount: f64,
    #[serde(default)]
    pub monthly_balance: f64,
    #[serde(default)]
    pub monthlydebittransactions_amount: f64,
    #[serde(default)]
    pub overdraft_limit: f64,
    #[serde(default)]
    pub transaction_value: f64,
    #[serde(default)]
    pub last_transaction_date: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Customer as persisted by the lending orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_number: String,
    pub kyc: KycRecord,
}

/// Loan request lifecycle states. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Rejected)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Pending => write!(f, "pending"),
            LoanStatus::Approved => write!(f, "approved"),
            LoanStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A loan request owned by the lending orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    pub request_id: String,
    pub customer_number: String,
    pub amount: f64,
    pub status: LoanStatus,
    pub scoring_token: String,
}

/// A computed score held by the scoring service until its single read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub customer_number: String,
    pub base_credit_amount: f64,
    pub limit_amount: f64,
}

/// A client registered with the scoring service, keyed by its service token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredClient {
    pub client_name: String,
    pub client_description: String,
    pub client_url: String,
    pub username: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Body of the scoring service's createClient endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_description: String,
    #[serde(default)]
    pub client_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Response of the scoring service's createClient endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientResponse {
    pub id: u64,
    pub url: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub token: String,
}

/// Response of initiateQueryScore: the single-use score token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTokenResponse {
    pub token: String,
}

/// Response of queryScore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryScoreResponse {
    pub score: f64,
    pub limit_amount: f64,
}

/// Response of the broker's /token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerTokenResponse {
    pub scoring_token: String,
    pub scoring_engine_url: String,
}

/// Body of the LMS subscribe endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(default)]
    pub customer_number: String,
}

/// Response of the LMS subscribe endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub status: String,
    pub customer_number: String,
}

/// Body of the LMS loan request endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequestBody {
    #[serde(default)]
    pub customer_number: String,
    #[serde(default)]
    pub amount: f64,
}

/// Response of the LMS loan request and status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDecisionResponse {
    pub status: LoanStatus,
    pub request_id: String,
}

/// Response of the LMS loan status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanStatusResponse {
    pub status: LoanStatus,
    pub amount: f64,
    pub request_id: String,
}
