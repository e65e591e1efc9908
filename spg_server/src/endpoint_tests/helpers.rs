use actix_web::{http::StatusCode, test, test::TestRequest, App};
use serde_json::Value;
use spg_engine::{
    events::EventProducers,
    order_types::PaymentMethod,
    test_utils::{memory_engine, order_request, StubRail},
    MemoryStore,
    SettlementConfig,
    SettlementEngine,
};

use crate::{config::ServerOptions, server::configure_routes};

pub type TestEngine = SettlementEngine<MemoryStore, StubRail>;

pub fn test_engine(config: SettlementConfig) -> (TestEngine, StubRail) {
    let _ = env_logger::try_init().ok();
    memory_engine(config, EventProducers::default())
}

/// Runs one request against a fresh app over `engine`.
pub async fn send(engine: &TestEngine, options: ServerOptions, req: TestRequest) -> (StatusCode, String) {
    let app = App::new().configure(configure_routes(engine.clone(), options));
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn post_json(engine: &TestEngine, path: &str, body: Value) -> (StatusCode, String) {
    send(engine, ServerOptions::default(), TestRequest::post().uri(path).set_json(body)).await
}

/// Places a valid order for two halves and returns the response body.
pub async fn place_order(engine: &TestEngine, method: PaymentMethod) -> Value {
    let request = serde_json::to_value(order_request(2, method)).unwrap();
    let (status, body) = post_json(engine, "/orders", request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Not JSON ({e}): {body}"))
}
