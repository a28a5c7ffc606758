/// End-to-end scenario across the real scoring engine, real broker, and real
/// LMS routers, with only the banking gateway mocked. Exercises the full
/// control flow: register -> subscribe -> token fetch -> initiate ->
/// callback data pull -> poll -> finalize.
use rust_lms_api::broker::{self, BrokerState};
use rust_lms_api::config::{BrokerConfig, LendingConfig, ScoringConfig};
use rust_lms_api::handlers::{self, AppState};
use rust_lms_api::scoring::{self, ScoringState};
use rust_lms_api::store::{InMemoryCustomerRepository, InMemoryLoanRepository};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start_cbs() -> MockServer {
    let cbs = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customer/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "customerNumber": "1001",
            "firstName": "FirstName1001",
            "lastName": "LastName1001",
            "email": "user1001@example.com",
            "monthlyIncome": 5000.0,
            "status": "ACTIVE"
        })))
        .mount(&cbs)
        .await;
    Mock::given(method("GET"))
        .and(path("/transactions/1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "accountNumber": "ACC1001-1",
            "alternativechanneltrnscrAmount": 6000.0,
            "credittransactionsAmount": 4000.0,
            "monthlyBalance": 0.0,
            "bouncedChequesDebitNumber": 0,
            "bouncedchequescreditNumber": 0
        }])))
        .mount(&cbs)
        .await;
    cbs
}

/// Brings up the whole constellation and returns the LMS base URL.
async fn start_stack(cbs_url: String) -> String {
    let scoring_state = Arc::new(
        ScoringState::new(&ScoringConfig {
            port: 0,
            callback_timeout_secs: 5,
        })
        .unwrap(),
    );
    let scoring_url = serve(scoring::router(scoring_state)).await;

    // The broker needs to know its own address before registering, so bind
    // the listener first and derive the callback URL from it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let broker_addr = listener.local_addr().unwrap();
    let broker_url = format!("http://{}", broker_addr);

    let broker_state = Arc::new(
        BrokerState::new(BrokerConfig {
            port: broker_addr.port(),
            scoring_base_url: scoring_url,
            scoring_fallback_url: None,
            client_name: "TransactionMiddleware".to_string(),
            client_description: "e2e middleware".to_string(),
            callback_url: format!("{}/transactions", broker_url),
            username: "mw_user".to_string(),
            password: "mw_pass".to_string(),
            lms_api_key: "lms-key".to_string(),
            bank_base_url: cbs_url.clone(),
            bank_username: "admin".to_string(),
            bank_password: "pwd123".to_string(),
            synthetic_fallback: false,
            registration_timeout_secs: 30,
            data_timeout_secs: 5,
        })
        .unwrap(),
    );
    let app = broker::router(broker_state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    broker_state.register().await.unwrap();

    let lms_state = Arc::new(
        AppState::new(
            LendingConfig {
                port: 0,
                bank_base_url: cbs_url,
                bank_username: "admin".to_string(),
                bank_password: "pwd123".to_string(),
                broker_base_url: broker_url,
                lms_api_key: "lms-key".to_string(),
                poll_max_attempts: 5,
                poll_interval_secs: 0,
                data_timeout_secs: 5,
            },
            Arc::new(InMemoryCustomerRepository::new()),
            Arc::new(InMemoryLoanRepository::new()),
        )
        .unwrap(),
    );
    serve(handlers::router(lms_state)).await
}

#[tokio::test]
async fn full_loan_cycle_approves_within_seeded_limit() {
    let cbs = start_cbs().await;
    let lms = start_stack(cbs.uri()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/subscribe", lms))
        .json(&serde_json::json!({"customerNumber": "1001"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Seeded data yields limit 20_000, comfortably above the ask.
    let resp = client
        .post(format!("{}/loan/request", lms))
        .json(&serde_json::json!({"customerNumber": "1001", "amount": 1000.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "approved");
    let request_id = body["request_id"].as_str().unwrap().to_string();

    let resp = client
        .get(format!("{}/loan/status?requestId={}", lms, request_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "approved");
    assert_eq!(body["request_id"], request_id);
    assert_eq!(body["amount"], 1000.0);
}

#[tokio::test]
async fn oversized_ask_is_rejected_end_to_end() {
    let cbs = start_cbs().await;
    let lms = start_stack(cbs.uri()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/subscribe", lms))
        .json(&serde_json::json!({"customerNumber": "1001"}))
        .send()
        .await
        .unwrap();

    // Limit from the seeded data is 20_000.
    let resp = client
        .post(format!("{}/loan/request", lms))
        .json(&serde_json::json!({"customerNumber": "1001", "amount": 50000.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "rejected");

    // A rejected loan frees the customer for another attempt.
    let resp = client
        .post(format!("{}/loan/request", lms))
        .json(&serde_json::json!({"customerNumber": "1001", "amount": 1000.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "approved");
}
