//! End-to-end API flow over the in-memory store and ledger: challenge
//! creation, counter-offer, acceptance, dispute, and settlement.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use sidepot_api::{app, AppState};
use sidepot_core::{PartyId, TokenSymbol};
use sidepot_dispute::{DisputeMonitor, InMemoryDisputeStore, MonitorConfig};
use sidepot_escrow::{EscrowManager, InMemoryLedger};
use sidepot_negotiation::{InMemoryChallengeStore, NegotiationService, NullNotifier};

struct TestApp {
    router: Router,
    initiator: PartyId,
    recipient: PartyId,
}

fn usdc() -> TokenSymbol {
    TokenSymbol::new("USDC").unwrap()
}

fn test_app() -> TestApp {
    let initiator = PartyId::new();
    let recipient = PartyId::new();
    let ledger = Arc::new(InMemoryLedger::new(PartyId::new(), [usdc()]));
    ledger.credit(initiator, usdc(), dec!(1000));
    ledger.credit(recipient, usdc(), dec!(1000));
    let escrow = Arc::new(EscrowManager::new(ledger));
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let disputes = Arc::new(InMemoryDisputeStore::new());
    let negotiation = Arc::new(NegotiationService::new(
        challenges.clone(),
        escrow.clone(),
        Arc::new(NullNotifier),
    ));
    let monitor = Arc::new(DisputeMonitor::new(
        disputes,
        challenges,
        escrow,
        Arc::new(NullNotifier),
        MonitorConfig {
            poll_interval: Duration::from_secs(1),
        },
    ));
    TestApp {
        router: app(AppState::new(negotiation, monitor)),
        initiator,
        recipient,
    }
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    party: Option<&PartyId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(party) = party {
        builder = builder.header("x-party-id", party.as_uuid().to_string());
    }
    let request = builder
        .body(Body::from(
            body.map(|v| v.to_string()).unwrap_or_else(|| "{}".to_string()),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn challenge_body(recipient: &PartyId, wager: &str) -> Value {
    json!({
        "recipient": recipient.as_uuid().to_string(),
        "description": "plank three minutes daily",
        "wager": wager,
        "token": "USDC",
        "expiry_days": 14,
    })
}

fn terms_body(wager: &str) -> Value {
    json!({
        "description": "plank three minutes daily",
        "wager": wager,
        "token": "USDC",
        "expiry_days": 14,
    })
}

#[tokio::test]
async fn full_negotiation_and_dispute_flow() {
    let tapp = test_app();

    // Initiator sends a challenge.
    let (status, challenge) = send(
        &tapp.router,
        "POST",
        "/v1/challenges",
        Some(&tapp.initiator),
        Some(challenge_body(&tapp.recipient, "10")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(challenge["status"], "PENDING");
    let challenge_id = challenge["id"].as_str().unwrap().to_string();

    // Recipient counter-proposes a higher stake.
    let (status, round) = send(
        &tapp.router,
        "POST",
        &format!("/v1/challenges/{challenge_id}/negotiations"),
        Some(&tapp.recipient),
        Some(terms_body("15")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(round["round_number"], 1);
    assert_eq!(round["direction"], "RECIPIENT_TO_INITIATOR");
    assert!(round["escrow_binding"].is_string());
    assert_eq!(round["money_flow"]["delta"], "5");
    let round_id = round["id"].as_str().unwrap().to_string();

    // A second round is rejected while the first is open.
    let (status, body) = send(
        &tapp.router,
        "POST",
        &format!("/v1/challenges/{challenge_id}/negotiations"),
        Some(&tapp.initiator),
        Some(terms_body("12")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // The initiator accepts and finalizes.
    let (status, accepted) = send(
        &tapp.router,
        "POST",
        &format!("/v1/negotiations/{round_id}/accept"),
        Some(&tapp.initiator),
        Some(json!({ "finalize": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["challenge_status"], "ACCEPTED");
    assert_eq!(accepted["new_terms"]["wager"], "15");

    // Completion is contested; a dispute opens with an already-expired
    // voting window so it can settle immediately.
    let (status, dispute) = send(
        &tapp.router,
        "POST",
        &format!("/v1/challenges/{challenge_id}/disputes"),
        Some(&tapp.initiator),
        Some(json!({ "voting_window_secs": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dispute["status"], "VOTING");
    assert_eq!(dispute["wager"], "15");
    let dispute_id = dispute["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&tapp.router, "GET", "/v1/disputes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Manual settlement: no votes were cast, so the outcome is a tie.
    let (status, resolved) = send(
        &tapp.router,
        "POST",
        &format!("/v1/disputes/{dispute_id}/resolve"),
        Some(&tapp.initiator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["outcome"], "TIE");

    // The challenge terminalized and the dispute left the active list.
    let (_, challenge) = send(
        &tapp.router,
        "GET",
        &format!("/v1/challenges/{challenge_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(challenge["status"], "TIE_RESOLVED");
    let (_, listed) = send(&tapp.router, "GET", "/v1/disputes", None, None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_identity_header_is_unauthorized() {
    let tapp = test_app();
    let (status, body) = send(
        &tapp.router,
        "POST",
        "/v1/challenges",
        None,
        Some(challenge_body(&tapp.recipient, "10")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn stranger_cannot_accept_a_round() {
    let tapp = test_app();
    let (_, challenge) = send(
        &tapp.router,
        "POST",
        "/v1/challenges",
        Some(&tapp.initiator),
        Some(challenge_body(&tapp.recipient, "10")),
    )
    .await;
    let challenge_id = challenge["id"].as_str().unwrap();
    let (_, round) = send(
        &tapp.router,
        "POST",
        &format!("/v1/challenges/{challenge_id}/negotiations"),
        Some(&tapp.initiator),
        Some(terms_body("15")),
    )
    .await;
    let round_id = round["id"].as_str().unwrap();

    let stranger = PartyId::new();
    let (status, body) = send(
        &tapp.router,
        "POST",
        &format!("/v1/negotiations/{round_id}/accept"),
        Some(&stranger),
        Some(json!({ "finalize": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn unknown_challenge_is_not_found() {
    let tapp = test_app();
    let (status, body) = send(
        &tapp.router,
        "GET",
        &format!("/v1/challenges/{}", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn bad_token_symbol_is_a_validation_error() {
    let tapp = test_app();
    let mut body = challenge_body(&tapp.recipient, "10");
    body["token"] = json!("not a token");
    let (status, response) = send(
        &tapp.router,
        "POST",
        "/v1/challenges",
        Some(&tapp.initiator),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}
