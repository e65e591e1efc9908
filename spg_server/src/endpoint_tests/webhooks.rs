use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use spg_engine::{
    helpers::compute_signature,
    order_types::{OrderId, OrderStatusType, PaymentMethod},
    SettlementConfig,
};

use super::helpers::{json, place_order, post_json, send, test_engine, TestEngine};
use crate::config::ServerOptions;

const SECRET: &str = "whsec_test";
const PUSH: &[u8] = br#"{"payment_hash":"hash123","settled":true}"#;

fn push(path: &str, body: &[u8], signature: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post().uri(path).set_payload(body.to_vec());
    if let Some(signature) = signature {
        req = req.insert_header(("X-Webhook-Signature", signature));
    }
    req
}

async fn status_of(engine: &TestEngine, alias: &str) -> String {
    let (_, body) = post_json(engine, "/payments/status", json!({ "alias": alias })).await;
    json(&body)["status"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn signed_push_settles_every_alias() {
    let (engine, rail) = test_engine(SettlementConfig::default().with_webhook_secret(SECRET));
    rail.issue_aliases(&["hash123", "req456"]);
    let order = place_order(&engine, PaymentMethod::Lightning).await;
    let signature = compute_signature(SECRET, PUSH);
    let req = push("/webhooks/settlement?rail=lightning", PUSH, Some(&signature));
    let (status, body) = send(&engine, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(status_of(&engine, "hash123").await, "paid");
    assert_eq!(status_of(&engine, "req456").await, "paid");
    let order_id = OrderId::from(order["order_id"].as_str().unwrap().to_string());
    let stored = engine.orders().fetch(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Paid);
    assert!(engine.claims().is_claimed(&order_id).await.unwrap());
}

#[actix_web::test]
async fn bad_signatures_are_unauthorized() {
    let (engine, rail) = test_engine(SettlementConfig::default().with_webhook_secret(SECRET));
    rail.issue_aliases(&["hash123"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let (status, body) = send(&engine, ServerOptions::default(), push("/webhooks/settlement", PUSH, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].is_string());
    let forged = compute_signature("not the secret", PUSH);
    let req = push("/webhooks/settlement", PUSH, Some(&forged));
    let (status, _) = send(&engine, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(&engine, "hash123").await, "pending");
}

#[actix_web::test]
async fn the_signature_header_is_configurable() {
    let (engine, rail) = test_engine(SettlementConfig::default().with_webhook_secret(SECRET));
    rail.issue_aliases(&["hash123"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let options = ServerOptions { signature_header: "X-Lnbits-Signature".into(), ..Default::default() };
    let req = TestRequest::post()
        .uri("/webhooks/settlement")
        .insert_header(("X-Lnbits-Signature", compute_signature(SECRET, PUSH)))
        .set_payload(PUSH.to_vec());
    let (status, _) = send(&engine, options, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_of(&engine, "hash123").await, "paid");
}

#[actix_web::test]
async fn unusable_pushes_are_acknowledged() {
    let (engine, _) = test_engine(SettlementConfig::default());
    for (path, body) in [
        ("/webhooks/settlement", b"this is not json".as_slice()),
        ("/webhooks/settlement", br#"{"amount":100,"settled":true}"#.as_slice()),
        ("/webhooks/settlement", br#"{"payment_hash":"never-issued","settled":true}"#.as_slice()),
        ("/webhooks/settlement?rail=paypal", PUSH),
    ] {
        let (status, response) = send(&engine, ServerOptions::default(), push(path, body, None)).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(response, "OK");
    }
}

#[actix_web::test]
async fn unreadable_query_strings_fall_back_to_the_default_rail() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.issue_aliases(&["hash123"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let req = push("/webhooks/settlement?rail=lightning&rail=ideal", PUSH, None);
    let (status, body) = send(&engine, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(status_of(&engine, "hash123").await, "paid");
}

#[actix_web::test]
async fn mollie_pushes_are_looked_up() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.issue_aliases(&["tr_WDqYK6vllg"]);
    place_order(&engine, PaymentMethod::Ideal).await;
    rail.set_settled("tr_WDqYK6vllg", true);
    let req = push("/webhooks/settlement?rail=ideal", b"id=tr_WDqYK6vllg", None)
        .insert_header(("Content-Type", "application/x-www-form-urlencoded"));
    let (status, _) = send(&engine, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rail.lookup_count(), 1);
    assert_eq!(status_of(&engine, "tr_WDqYK6vllg").await, "paid");
}

#[actix_web::test]
async fn redelivered_pushes_do_not_regress() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.issue_aliases(&["hash123", "req456"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let unsettled = br#"{"payment_hash":"hash123","settled":false}"#;
    for body in [PUSH, PUSH, unsettled.as_slice(), PUSH] {
        let (status, _) = send(&engine, ServerOptions::default(), push("/webhooks/settlement", body, None)).await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status_of(&engine, "req456").await, "paid");
}

#[actix_web::test]
async fn webhooks_only_accept_post() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let (status, _) = send(&engine, ServerOptions::default(), TestRequest::get().uri("/webhooks/settlement")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&engine, ServerOptions::default(), TestRequest::put().uri("/webhooks/settlement")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
