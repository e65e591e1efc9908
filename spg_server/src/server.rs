use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use spg_engine::{
    events::{EventHandlers, EventHooks},
    traits::{KeyValueStore, PaymentRail},
    MemoryStore,
    OrderIntake,
    SettlementEngine,
    SqliteStore,
};
use spg_rails::RailRouter;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    notifications::LogNotifier,
    routes::{json_config, HealthRoute, PaymentStatusRoute, PlaceOrderRoute, SettlementWebhookRoute},
    sweep_worker::start_sweep_worker,
};

const EVENT_BUFFER_SIZE: usize = 256;
const DB_MAX_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let catalog = config.catalog()?;
    let mut settlement = config.settlement.clone();
    settlement.field_mappings = config.field_mappings()?;
    let rail = RailRouter::from_config(&config.rails).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let methods = rail.configured_methods();
    if methods.is_empty() {
        warn!("🚨️ No payment rail is configured. Every order will be rejected.");
    }
    let intake = OrderIntake::new(catalog, methods);

    let mut hooks = EventHooks::default();
    hooks.notify_with(Arc::new(LogNotifier));
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    match &config.database_url {
        Some(url) => {
            let store = SqliteStore::new_with_url(url, DB_MAX_CONNECTIONS)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            store.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
            info!("🚀️ Working state is kept in {url}");
            let engine = SettlementEngine::new(store, rail, settlement, intake, producers);
            serve(config, engine).await
        },
        None => {
            info!("🚀️ Working state is kept in memory");
            let engine = SettlementEngine::new(MemoryStore::new(), rail, settlement, intake, producers);
            serve(config, engine).await
        },
    }
}

async fn serve<S, R>(config: ServerConfig, engine: SettlementEngine<S, R>) -> Result<(), ServerError>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    let sweeper = start_sweep_worker(engine.store().clone(), config.sweep_interval);
    let srv = create_server_instance(config, engine)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    sweeper.abort();
    result
}

pub fn create_server_instance<S, R>(config: ServerConfig, engine: SettlementEngine<S, R>) -> Result<Server, ServerError>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %r").log_target("spg::access_log"))
            .configure(configure_routes(engine.clone(), options.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the engine, the handler options and every route on an app.
pub fn configure_routes<S, R>(engine: SettlementEngine<S, R>, options: ServerOptions) -> impl FnOnce(&mut ServiceConfig)
where
    S: KeyValueStore,
    R: PaymentRail,
{
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(engine))
            .app_data(web::Data::new(options))
            .app_data(json_config())
            .service(HealthRoute::new())
            .service(PlaceOrderRoute::<S, R>::new())
            .service(PaymentStatusRoute::<S, R>::new())
            .service(SettlementWebhookRoute::<S, R>::new());
    }
}
