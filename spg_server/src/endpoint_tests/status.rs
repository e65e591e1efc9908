use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use spg_engine::{order_types::PaymentMethod, SettlementConfig};

use super::helpers::{json, place_order, post_json, send, test_engine};
use crate::config::{ServerOptions, UnknownStatusPolicy};

#[actix_web::test]
async fn never_seen_aliases_are_unknown() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let (status, body) = post_json(&engine, "/payments/status", json!({ "alias": "nope" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({ "paid": "unknown", "status": "unknown" }));
}

#[actix_web::test]
async fn issued_payments_are_pending() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.issue_aliases(&["hash123", "req456"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let (status, body) = post_json(&engine, "/payments/status", json!({ "paymentHash": "hash123" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({ "paid": false, "status": "pending" }));
    let (_, body) = post_json(&engine, "/payments/status", json!({ "alias": "req456" })).await;
    assert_eq!(json(&body)["status"], "pending");
}

#[actix_web::test]
async fn secondary_alias_is_consulted_when_the_primary_is_unknown() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.issue_aliases(&["hash123"]);
    place_order(&engine, PaymentMethod::Lightning).await;
    let request = json!({ "alias": "something-else", "secondary": "hash123" });
    let (_, body) = post_json(&engine, "/payments/status", request).await;
    assert_eq!(json(&body)["status"], "pending");
}

#[actix_web::test]
async fn missing_alias_is_a_bad_request() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let (status, body) = post_json(&engine, "/payments/status", json!({ "alias": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), json!({ "error": "Missing required field: alias" }));
    let (status, _) = post_json(&engine, "/payments/status", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_can_be_reported_as_pending() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let options = ServerOptions { unknown_status_policy: UnknownStatusPolicy::Pending, ..Default::default() };
    let req = TestRequest::post().uri("/payments/status").set_json(json!({ "alias": "nope" }));
    let (status, body) = send(&engine, options, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({ "paid": false, "status": "pending" }));
}

#[actix_web::test]
async fn polling_with_get_is_not_allowed() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let (status, body) = send(&engine, ServerOptions::default(), TestRequest::get().uri("/payments/status")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json(&body), json!({ "error": "Method not allowed" }));
}
