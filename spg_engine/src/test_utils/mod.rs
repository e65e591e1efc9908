#[cfg(feature = "sqlite")]
pub mod prepare_env;
pub mod stub_rail;

use crate::{
    catalog::Catalog,
    events::EventProducers,
    order_types::{NewOrderRequest, PaymentMethod},
    spg_api::{engine::SettlementEngine, order_intake::OrderIntake, settlement_config::SettlementConfig},
    stores::MemoryStore,
};
pub use stub_rail::StubRail;

/// An engine over a fresh [`MemoryStore`] and a [`StubRail`] that serves both payment methods.
pub fn memory_engine(
    config: SettlementConfig,
    producers: EventProducers,
) -> (SettlementEngine<MemoryStore, StubRail>, StubRail) {
    let rail = StubRail::new();
    let intake = OrderIntake::new(Catalog::default(), vec![PaymentMethod::Ideal, PaymentMethod::Lightning]);
    let engine = SettlementEngine::new(MemoryStore::new(), rail.clone(), config, intake, producers);
    (engine, rail)
}

/// A valid request for `quantity` halves (€3.00 each).
pub fn order_request(quantity: i64, method: PaymentMethod) -> NewOrderRequest {
    NewOrderRequest {
        name: Some("Anna de Vries".into()),
        email: Some("anna@example.com".into()),
        product: Some("half".into()),
        quantity: Some(quantity),
        price: Some(3.0 * quantity as f64),
        payment_method: Some(method.to_string()),
        fulfillment_date: None,
        note: Some("Sliced, please".into()),
    }
}
