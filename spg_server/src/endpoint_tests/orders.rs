use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use spg_engine::{order_types::PaymentMethod, traits::RailError, SettlementConfig};

use super::helpers::{json, place_order, post_json, send, test_engine};
use crate::config::ServerOptions;

#[actix_web::test]
async fn place_ideal_order() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    let body = place_order(&engine, PaymentMethod::Ideal).await;
    let order_id = body["order_id"].as_str().unwrap();
    assert!(order_id.starts_with("ORD-"));
    assert_eq!(body["status"], "awaiting_payment");
    assert_eq!(body["total_price"], "6.00");
    assert_eq!(body["payment_method"], "ideal");
    assert!(body["url"].is_string());
    assert!(body.get("invoice").is_none());
    assert_eq!(body["aliases"].as_array().unwrap().len(), 2);
    assert_eq!(rail.issued_orders().len(), 1);
}

#[actix_web::test]
async fn missing_fields_are_rejected() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    let request = json!({ "name": "Anna", "product": "half", "quantity": 1, "price": 3.0, "payment_method": "ideal" });
    let (status, body) = post_json(&engine, "/orders", request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), json!({ "error": "Missing required field: email" }));
    assert!(rail.issued_orders().is_empty());
}

#[actix_web::test]
async fn tampered_prices_are_rejected() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let request = json!({
        "name": "Anna",
        "email": "anna@example.com",
        "product": "heel",
        "quantity": 2,
        "price": 1.0,
        "payment_method": "lightning"
    });
    let (status, body) = post_json(&engine, "/orders", request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("does not match"), "{body}");
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"name\": \"Anna\",");
    let (status, body) = send(&engine, ServerOptions::default(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());
}

#[actix_web::test]
async fn rail_failures_are_bad_gateway() {
    let (engine, rail) = test_engine(SettlementConfig::default());
    rail.fail_issue(Some(RailError::Unavailable("connection refused".into())));
    let request = serde_json::to_value(spg_engine::test_utils::order_request(1, PaymentMethod::Ideal)).unwrap();
    let (status, body) = post_json(&engine, "/orders", request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json(&body)["error"].as_str().unwrap().contains("connection refused"), "{body}");
}

#[actix_web::test]
async fn wrong_methods_are_not_allowed() {
    let (engine, _) = test_engine(SettlementConfig::default());
    let (status, _) = send(&engine, ServerOptions::default(), TestRequest::get().uri("/orders")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&engine, ServerOptions::default(), TestRequest::post().uri("/health")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, body) = send(&engine, ServerOptions::default(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
