use std::sync::Arc;

use log::*;

use crate::{
    order_types::{Alias, PaymentMethod, SettlementStatus},
    spg_api::{
        identity_index::IdentityIndex,
        order_repository::OrderRepository,
        reconciliation::ReconciliationWorker,
        settlement_config::SettlementConfig,
        status_cache::StatusCache,
    },
    traits::{KeyValueStore, PaymentRail},
};

/// Answers "has this been paid?" for client polls.
///
/// The answer comes from the status cache and is returned verbatim: `unknown` stays `unknown`. How a client should
/// treat `unknown` is a presentation decision made at the HTTP layer.
#[derive(Clone)]
pub struct PollResponder<S, R> {
    rail: R,
    index: IdentityIndex<S>,
    cache: StatusCache<S>,
    orders: OrderRepository<S>,
    worker: ReconciliationWorker<S, R>,
    config: Arc<SettlementConfig>,
}

impl<S, R> PollResponder<S, R>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    pub fn new(
        rail: R,
        index: IdentityIndex<S>,
        cache: StatusCache<S>,
        orders: OrderRepository<S>,
        worker: ReconciliationWorker<S, R>,
        config: Arc<SettlementConfig>,
    ) -> Self {
        Self { rail, index, cache, orders, worker, config }
    }

    /// Never fails. Storage errors are logged and reported as `unknown`.
    pub async fn check_status(&self, alias: &Alias, secondary: Option<&Alias>) -> SettlementStatus {
        let mut status = self.read(alias).await;
        if status == SettlementStatus::Unknown {
            if let Some(secondary) = secondary.filter(|s| *s != alias) {
                status = self.read(secondary).await;
            }
        }
        if status != SettlementStatus::Paid && self.config.poll_lookup {
            if let Some(method) = self.rail_confirms_settlement(alias).await {
                let aliases = std::iter::once(alias.clone()).chain(secondary.cloned()).collect::<Vec<_>>();
                return self.settle_from_poll(method, &aliases, status).await;
            }
        }
        trace!("🔍️ Poll for {alias}: {status}");
        status
    }

    async fn read(&self, alias: &Alias) -> SettlementStatus {
        self.cache.read(alias).await.unwrap_or_else(|e| {
            error!("🔍️ Could not read the status of {alias}. Reporting unknown. {e}");
            SettlementStatus::Unknown
        })
    }

    /// Returns the order's payment method if the rail says the payment behind `alias` has settled.
    async fn rail_confirms_settlement(&self, alias: &Alias) -> Option<PaymentMethod> {
        let order = match self.index.resolve(alias).await {
            Ok(Some(order_id)) => self.orders.fetch(&order_id).await.ok().flatten(),
            Ok(None) => None,
            Err(e) => {
                debug!("🔍️ Could not resolve {alias}. {e}");
                None
            },
        };
        let Some(order) = order else {
            trace!("🔍️ {alias} does not belong to a stored order. Skipping the rail lookup");
            return None;
        };
        let method = order.payment_method;
        match tokio::time::timeout(self.config.rail_timeout, self.rail.lookup_settlement(method, alias)).await {
            Ok(Ok(Some(true))) => Some(method),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                debug!("🔍️ Rail lookup for {alias} failed. {e}");
                None
            },
            Err(_) => {
                debug!("🔍️ Rail lookup for {alias} timed out");
                None
            },
        }
    }

    async fn settle_from_poll(
        &self,
        method: PaymentMethod,
        aliases: &[Alias],
        fallback: SettlementStatus,
    ) -> SettlementStatus {
        match self.worker.apply_settlement(method, aliases, "poll").await {
            Ok(outcome) => {
                debug!("🔍️ The rail confirmed settlement of {} during a poll: {outcome:?}", aliases[0]);
                SettlementStatus::Paid
            },
            Err(e) => {
                error!("🔍️ The rail confirmed settlement of {}, but it could not be recorded. {e}", aliases[0]);
                fallback
            },
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::{
        events::EventProducers,
        test_utils::{memory_engine, order_request, StubRail},
        traits::RailError,
        IngestOutcome,
    };

    #[tokio::test]
    async fn polls_report_the_cached_status() {
        let (engine, _) = memory_engine(SettlementConfig::default(), EventProducers::default());
        let poller = engine.poller();
        assert_eq!(poller.check_status(&Alias::from("never-seen"), None).await, SettlementStatus::Unknown);

        let placed = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let aliases = StubRail::default_aliases(&placed.order.order_id);
        assert_eq!(poller.check_status(&aliases[0], None).await, SettlementStatus::Pending);

        engine.status_cache().observe(&aliases[1], SettlementStatus::Paid, Utc::now()).await.unwrap();
        assert_eq!(poller.check_status(&aliases[0], None).await, SettlementStatus::Paid);
    }

    #[tokio::test]
    async fn the_secondary_alias_is_consulted_when_the_primary_is_unknown() {
        let (engine, _) = memory_engine(SettlementConfig::default(), EventProducers::default());
        let poller = engine.poller();
        let placed = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let aliases = StubRail::default_aliases(&placed.order.order_id);
        let unknown = Alias::from("from-another-device");
        assert_eq!(poller.check_status(&unknown, Some(&aliases[1])).await, SettlementStatus::Pending);
        assert_eq!(poller.check_status(&unknown, Some(&unknown)).await, SettlementStatus::Unknown);
    }

    #[tokio::test]
    async fn no_rail_lookup_unless_enabled() {
        let (engine, rail) = memory_engine(SettlementConfig::default(), EventProducers::default());
        let placed = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let aliases = StubRail::default_aliases(&placed.order.order_id);
        rail.set_settled(aliases[0].as_str(), true);
        assert_eq!(engine.poller().check_status(&aliases[0], None).await, SettlementStatus::Pending);
        assert_eq!(rail.lookup_count(), 0);
    }

    #[tokio::test]
    async fn poll_lookup_settles_through_the_claim() {
        let config = SettlementConfig { poll_lookup: true, ..Default::default() };
        let (engine, rail) = memory_engine(config, EventProducers::default());
        let placed = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let order_id = placed.order.order_id.clone();
        let aliases = StubRail::default_aliases(&order_id);

        assert_eq!(engine.poller().check_status(&aliases[0], None).await, SettlementStatus::Pending);
        rail.set_settled(aliases[0].as_str(), true);
        assert_eq!(engine.poller().check_status(&aliases[0], None).await, SettlementStatus::Paid);
        assert!(engine.claims().is_claimed(&order_id).await.unwrap());

        // a late push finds the claim taken
        let body = format!(r#"{{"payment_hash":"{}","settled":true}}"#, aliases[0].as_str());
        let outcome = engine.worker().ingest(PaymentMethod::Lightning, body.as_bytes(), None).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Paid { order_id, dispatched: false });
    }

    #[tokio::test]
    async fn lookup_failures_fall_back_to_the_cache() {
        let config = SettlementConfig { poll_lookup: true, ..Default::default() };
        let (engine, rail) = memory_engine(config, EventProducers::default());
        let placed = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let aliases = StubRail::default_aliases(&placed.order.order_id);
        rail.fail_lookups(Some(RailError::Unavailable("down".into())));
        assert_eq!(engine.poller().check_status(&aliases[0], None).await, SettlementStatus::Pending);
    }
}
