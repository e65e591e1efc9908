use std::time::Duration;

use cucumber::{then, when};
use spg_engine::{
    order_types::{Alias, NewOrderRequest, OrderStatusType, PaymentMethod, SettlementStatus},
    OrderFlowError,
};

use crate::cucumber::SettlementWorld;

#[when(expr = "a customer orders {int} x {word} for {float} EUR paying with {word}")]
async fn place_order(world: &mut SettlementWorld, quantity: i64, product: String, price: f64, method: String) {
    let request = NewOrderRequest {
        name: Some("Anna de Vries".into()),
        email: Some("anna@example.com".into()),
        product: Some(product),
        quantity: Some(quantity),
        price: Some(price),
        payment_method: Some(method),
        fulfillment_date: None,
        note: None,
    };
    let result = world.system().engine.order_flow().place_order(request).await;
    world.last_order = Some(result);
}

#[when(regex = r"^a (\w+) push arrives with body (.+)$")]
async fn push_arrives(world: &mut SettlementWorld, rail: String, body: String) {
    let method = rail.parse::<PaymentMethod>().expect("Unknown rail");
    world.system().engine.worker().ingest(method, body.as_bytes(), None).await.expect("Push was rejected");
}

#[then("the order is accepted")]
async fn order_accepted(world: &mut SettlementWorld) {
    let _ = world.placed_order();
}

#[then(expr = "the order is rejected with a message containing {string}")]
async fn order_rejected(world: &mut SettlementWorld, fragment: String) {
    match &world.last_order {
        Some(Err(OrderFlowError::Validation(e))) => assert!(e.0.contains(&fragment), "Unexpected message: {e}"),
        other => panic!("Expected a validation error, got {other:?}"),
    }
}

#[then(expr = "the order total is {int} cents")]
async fn order_total(world: &mut SettlementWorld, cents: i64) {
    assert_eq!(world.placed_order().order.total_price.value(), cents);
}

#[then(expr = "the order status is {word}")]
async fn order_status(world: &mut SettlementWorld, status: String) {
    let expected: OrderStatusType = serde_json::from_value(serde_json::Value::String(status)).expect("Unknown status");
    let order_id = world.placed_order().order.order_id.clone();
    let stored = world.system().engine.orders().fetch(&order_id).await.unwrap().expect("Order not stored");
    assert_eq!(stored.status, expected);
}

#[then(expr = "a poll for {string} reports {word}")]
async fn poll_reports(world: &mut SettlementWorld, alias: String, status: String) {
    let expected: SettlementStatus =
        serde_json::from_value(serde_json::Value::String(status)).expect("Unknown settlement status");
    let actual = world.system().engine.poller().check_status(&Alias::from(alias), None).await;
    assert_eq!(actual, expected);
}

#[then(expr = "exactly {int} confirmation(s) is/are dispatched")]
async fn confirmations(world: &mut SettlementWorld, expected: usize) {
    // confirmations are dispatched by the event handler task
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(world.system().notifier.count(), expected);
}
