use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use cucumber::World;
use log::*;
use spg_engine::{
    catalog::Catalog,
    events::{EventHandlers, EventHooks},
    order_types::{Order, PaymentMethod, SettlementDetails},
    stores::SqliteStore,
    test_utils::{
        prepare_env::{prepare_test_store, random_db_path},
        StubRail,
    },
    traits::Notifier,
    OrderFlowError,
    OrderIntake,
    PlacedOrder,
    SettlementConfig,
    SettlementEngine,
};
use tempfile::TempDir;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    pub last_order: Option<Result<PlacedOrder, OrderFlowError>>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub _db_dir: TempDir,
    pub db_url: String,
    pub engine: SettlementEngine<SqliteStore, StubRail>,
    pub rail: StubRail,
    pub notifier: Arc<CountingNotifier>,
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("Settlement engine not initialised")
    }

    pub fn placed_order(&self) -> &PlacedOrder {
        match &self.last_order {
            Some(Ok(placed)) => placed,
            Some(Err(e)) => panic!("The last order was rejected: {e}"),
            None => panic!("No order has been placed"),
        }
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let (dir, url) = random_db_path();
        let store = prepare_test_store(&url).await;
        let notifier = Arc::new(CountingNotifier::default());
        let mut hooks = EventHooks::default();
        hooks.notify_with(Arc::clone(&notifier));
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let rail = StubRail::new();
        let intake = OrderIntake::new(Catalog::default(), vec![PaymentMethod::Ideal, PaymentMethod::Lightning]);
        let engine = SettlementEngine::new(store, rail.clone(), SettlementConfig::default(), intake, producers);
        debug!("🚀️ Settlement engine ready on {url}");
        Self { _db_dir: dir, db_url: url, engine, rail, notifier }
    }
}

#[derive(Debug, Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Notifier for CountingNotifier {
    fn notify(&self, order: &Order, details: &SettlementDetails) {
        info!("🚀️ Confirmation for order {} ({})", order.order_id, details.alias);
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
