use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    events::EventProducers,
    spg_api::{
        identity_index::IdentityIndex,
        order_flow_api::OrderFlowApi,
        order_intake::OrderIntake,
        order_repository::OrderRepository,
        payment_issuer::PaymentIssuer,
        poll_responder::PollResponder,
        reconciliation::ReconciliationWorker,
        settlement_config::SettlementConfig,
        side_effect_claims::SideEffectClaims,
        status_cache::StatusCache,
    },
    traits::{KeyValueStore, PaymentRail},
};

/// All engine components, wired over one shared store and one rail.
///
/// Cloning is cheap; clones share the store, the rail and the event producers.
#[derive(Clone)]
pub struct SettlementEngine<S, R> {
    store: S,
    config: Arc<SettlementConfig>,
    index: IdentityIndex<S>,
    cache: StatusCache<S>,
    claims: SideEffectClaims<S>,
    orders: OrderRepository<S>,
    order_flow: OrderFlowApi<S, R>,
    worker: ReconciliationWorker<S, R>,
    poller: PollResponder<S, R>,
}

impl<S, R> Debug for SettlementEngine<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementEngine")
    }
}

impl<S, R> SettlementEngine<S, R>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    pub fn new(store: S, rail: R, config: SettlementConfig, intake: OrderIntake, producers: EventProducers) -> Self {
        if config.webhook_secret.is_none() {
            warn!(
                "🔄️ No webhook secret is configured. Push notifications will be accepted WITHOUT signature \
                 verification. Do not run like this in production"
            );
        }
        let config = Arc::new(config);
        let index = IdentityIndex::new(store.clone(), config.alias_ttl);
        let cache = StatusCache::new(store.clone(), index.clone(), config.status_ttl, config.paid_ttl());
        let claims = SideEffectClaims::new(store.clone(), config.claim_ttl);
        let orders = OrderRepository::new(store.clone(), config.order_retention);
        let issuer =
            PaymentIssuer::new(rail.clone(), index.clone(), cache.clone(), orders.clone(), config.rail_timeout);
        let order_flow = OrderFlowApi::new(intake, orders.clone(), issuer);
        let worker = ReconciliationWorker::new(
            rail.clone(),
            index.clone(),
            cache.clone(),
            claims.clone(),
            orders.clone(),
            producers,
            Arc::clone(&config),
        );
        let poller =
            PollResponder::new(rail, index.clone(), cache.clone(), orders.clone(), worker.clone(), Arc::clone(&config));
        Self { store, config, index, cache, claims, orders, order_flow, worker, poller }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn identity_index(&self) -> &IdentityIndex<S> {
        &self.index
    }

    pub fn status_cache(&self) -> &StatusCache<S> {
        &self.cache
    }

    pub fn claims(&self) -> &SideEffectClaims<S> {
        &self.claims
    }

    pub fn orders(&self) -> &OrderRepository<S> {
        &self.orders
    }

    pub fn order_flow(&self) -> &OrderFlowApi<S, R> {
        &self.order_flow
    }

    pub fn worker(&self) -> &ReconciliationWorker<S, R> {
        &self.worker
    }

    pub fn poller(&self) -> &PollResponder<S, R> {
        &self.poller
    }
}
