/// Scoring engine tests: registration validation, the authenticated
/// initiate/query cycle, and single-read consumption of score results.
/// The registered client's callback URL is mocked with wiremock.
use rust_lms_api::config::ScoringConfig;
use rust_lms_api::scoring::{self, ScoringState};
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> ScoringConfig {
    ScoringConfig {
        port: 0,
        callback_timeout_secs: 5,
    }
}

/// Serves a router on an ephemeral port and returns its base URL.
async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start_scoring() -> String {
    let state = Arc::new(ScoringState::new(&test_config()).unwrap());
    serve(scoring::router(state)).await
}

/// Registers a client pointing at the given callback URL; returns its token.
async fn register_client(scoring_url: &str, callback_url: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/client/createClient", scoring_url))
        .json(&serde_json::json!({
            "clientName": "TransactionMiddleware",
            "clientDescription": "test middleware",
            "clientUrl": callback_url,
            "username": "user",
            "password": "pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn seeded_transactions() -> serde_json::Value {
    // base credit = 6000 + 4000 = 10_000; balance 0; no bounced cheques
    // => limit 20_000, score 310.
    serde_json::json!([{
        "accountNumber": "ACC1001-1",
        "alternativechanneltrnscrAmount": 6000.0,
        "credittransactionsAmount": 4000.0,
        "monthlyBalance": 0.0,
        "bouncedChequesDebitNumber": 0,
        "bouncedchequescreditNumber": 0
    }])
}

#[tokio::test]
async fn create_client_rejects_missing_fields() {
    let scoring_url = start_scoring().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/client/createClient", scoring_url))
        .json(&serde_json::json!({
            "clientName": "TransactionMiddleware",
            "clientUrl": "",
            "username": "user",
            "password": "pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // The description is required too, not just the connection fields.
    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/client/createClient", scoring_url))
        .json(&serde_json::json!({
            "clientName": "TransactionMiddleware",
            "clientDescription": "",
            "clientUrl": "http://localhost:4000/transactions",
            "username": "user",
            "password": "pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn create_client_issues_unique_tokens() {
    let scoring_url = start_scoring().await;

    let a = register_client(&scoring_url, "http://localhost:4000/transactions").await;
    let b = register_client(&scoring_url, "http://localhost:4001/transactions").await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn initiate_rejects_unknown_client_token() {
    let scoring_url = start_scoring().await;

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/v1/scoring/initiateQueryScore/1001",
            scoring_url
        ))
        .header("client-token", "no-such-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/v1/scoring/initiateQueryScore/1001",
            scoring_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn initiate_pulls_callback_with_stored_basic_credential() {
    let callback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .and(query_param("customerNumber", "1001"))
        // base64("user:pass")
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(seeded_transactions()))
        .expect(1)
        .mount(&callback)
        .await;

    let scoring_url = start_scoring().await;
    let token = register_client(&scoring_url, &format!("{}/transactions", callback.uri())).await;

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/v1/scoring/initiateQueryScore/1001",
            scoring_url
        ))
        .header("client-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn query_score_returns_computed_values_then_consumes() {
    let callback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(seeded_transactions()))
        .mount(&callback)
        .await;

    let scoring_url = start_scoring().await;
    let token = register_client(&scoring_url, &format!("{}/transactions", callback.uri())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "{}/api/v1/scoring/initiateQueryScore/1001",
            scoring_url
        ))
        .header("client-token", &token)
        .send()
        .await
        .unwrap();
    let score_token = resp.json::<serde_json::Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = client
        .get(format!(
            "{}/api/v1/scoring/queryScore/{}",
            scoring_url, score_token
        ))
        .header("client-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["limitAmount"].as_f64().unwrap(), 20_000.0);
    assert_eq!(body["score"].as_f64().unwrap(), 310.0);

    // Single-read semantics: the second query must be a 404.
    let resp = client
        .get(format!(
            "{}/api/v1/scoring/queryScore/{}",
            scoring_url, score_token
        ))
        .header("client-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn query_score_rejects_unknown_client_token() {
    let scoring_url = start_scoring().await;

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/v1/scoring/queryScore/some-token",
            scoring_url
        ))
        .header("client-token", "bogus")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn failed_callback_issues_no_score_token() {
    let callback = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&callback)
        .await;

    let scoring_url = start_scoring().await;
    let token = register_client(&scoring_url, &format!("{}/transactions", callback.uri())).await;

    let resp = reqwest::Client::new()
        .get(format!(
            "{}/api/v1/scoring/initiateQueryScore/1001",
            scoring_url
        ))
        .header("client-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
}
