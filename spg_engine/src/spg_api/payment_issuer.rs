use std::time::Duration;

use chrono::Utc;
use log::*;

use crate::{
    order_types::{IssuedPayment, Order, OrderStatusType, SettlementStatus},
    spg_api::{
        errors::IssueError,
        identity_index::IdentityIndex,
        order_repository::OrderRepository,
        status_cache::StatusCache,
    },
    traits::{KeyValueStore, PaymentRail},
};

/// Obtains a payment request for an order and wires its aliases into the index and the status cache.
#[derive(Clone)]
pub struct PaymentIssuer<S, R> {
    rail: R,
    index: IdentityIndex<S>,
    cache: StatusCache<S>,
    orders: OrderRepository<S>,
    timeout: Duration,
}

impl<S, R> PaymentIssuer<S, R>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    pub fn new(
        rail: R,
        index: IdentityIndex<S>,
        cache: StatusCache<S>,
        orders: OrderRepository<S>,
        timeout: Duration,
    ) -> Self {
        Self { rail, index, cache, orders, timeout }
    }

    /// Requests payment for `order` from the rail that serves its payment method.
    ///
    /// On success, every alias resolves to the order, every alias reads `pending` (so an early poll does not see
    /// `unknown`), and the stored order is `awaiting_payment`.
    pub async fn issue_payment(&self, order: &Order) -> Result<IssuedPayment, IssueError> {
        let order_id = &order.order_id;
        debug!("🧾️ Requesting a {} payment of {} for order {order_id}", order.payment_method, order.total_price);
        let payment = match tokio::time::timeout(self.timeout, self.rail.issue(order)).await {
            Ok(Ok(payment)) => payment,
            Ok(Err(e)) => {
                warn!("🧾️ Payment request for order {order_id} failed. {e}");
                return Err(e.into());
            },
            Err(_) => {
                warn!("🧾️ Payment request for order {order_id} timed out after {:?}", self.timeout);
                return Err(IssueError::ProviderUnavailable(format!("No response within {:?}", self.timeout)));
            },
        };
        if payment.aliases.is_empty() {
            error!("🧾️ The {} rail issued a payment for order {order_id} without any identifier", order.payment_method);
            return Err(IssueError::ProviderUnavailable("The rail returned no payment identifier".into()));
        }
        for alias in &payment.aliases {
            self.index.register(alias, order_id).await?;
        }
        let now = Utc::now();
        for alias in &payment.aliases {
            self.cache.observe(alias, SettlementStatus::Pending, now).await?;
        }
        self.orders.transition(order_id, OrderStatusType::AwaitingPayment).await?;
        info!(
            "🧾️ Payment of {} issued for order {order_id} with {} alias(es)",
            payment.native_amount,
            payment.aliases.len()
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        events::EventProducers,
        order_types::{Alias, OrderId, PaymentMethod},
        spg_api::{errors::AliasConflictError, settlement_config::SettlementConfig},
        test_utils::{memory_engine, order_request, StubRail},
        traits::RailError,
    };

    #[tokio::test]
    async fn issuing_registers_aliases_and_marks_them_pending() {
        let (engine, _rail) = memory_engine(SettlementConfig::default(), EventProducers::default());
        let placed = engine.order_flow().place_order(order_request(2, PaymentMethod::Lightning)).await.unwrap();
        let order_id = &placed.order.order_id;
        let aliases = StubRail::default_aliases(order_id);
        assert_eq!(placed.payment.aliases, aliases);
        for alias in &aliases {
            assert_eq!(engine.identity_index().resolve(alias).await.unwrap().as_ref(), Some(order_id));
            assert_eq!(engine.status_cache().read(alias).await.unwrap(), SettlementStatus::Pending);
        }
        let stored = engine.orders().fetch(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatusType::AwaitingPayment);
    }

    #[tokio::test]
    async fn rail_failures_map_to_issue_errors() {
        let (engine, rail) = memory_engine(SettlementConfig::default(), EventProducers::default());
        rail.fail_issue(Some(RailError::Rejected("amount too small".into())));
        let err = engine.order_flow().place_order(order_request(1, PaymentMethod::Ideal)).await.unwrap_err();
        assert!(matches!(err, crate::OrderFlowError::Issue(IssueError::ProviderRejected(_))), "{err:?}");

        rail.fail_issue(Some(RailError::Unavailable("connection refused".into())));
        let err = engine.order_flow().place_order(order_request(1, PaymentMethod::Ideal)).await.unwrap_err();
        assert!(matches!(err, crate::OrderFlowError::Issue(IssueError::ProviderUnavailable(_))), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_rails_time_out() {
        let config = SettlementConfig { rail_timeout: Duration::from_secs(5), ..Default::default() };
        let (engine, rail) = memory_engine(config, EventProducers::default());
        rail.delay_issue(Some(Duration::from_secs(30)));
        let err = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap_err();
        assert!(matches!(err, crate::OrderFlowError::Issue(IssueError::ProviderUnavailable(_))), "{err:?}");
    }

    #[tokio::test]
    async fn a_rail_reusing_an_alias_is_a_conflict() {
        let (engine, rail) = memory_engine(SettlementConfig::default(), EventProducers::default());
        rail.issue_aliases(&["same-hash"]);
        let first = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap();
        let err = engine.order_flow().place_order(order_request(1, PaymentMethod::Lightning)).await.unwrap_err();
        match err {
            crate::OrderFlowError::Issue(IssueError::AliasConflict(AliasConflictError { alias, existing, .. })) => {
                assert_eq!(alias, Alias::from("same-hash"));
                assert_eq!(existing, first.order.order_id);
            },
            e => panic!("Expected an alias conflict, got {e:?}"),
        }
        let resolved: Option<OrderId> = engine.identity_index().resolve(&Alias::from("same-hash")).await.unwrap();
        assert_eq!(resolved, Some(first.order.order_id));
    }

    #[tokio::test]
    async fn a_rail_without_aliases_is_unusable() {
        let (engine, rail) = memory_engine(SettlementConfig::default(), EventProducers::default());
        rail.issue_aliases(&[]);
        let err = engine.order_flow().place_order(order_request(1, PaymentMethod::Ideal)).await.unwrap_err();
        assert!(matches!(err, crate::OrderFlowError::Issue(IssueError::ProviderUnavailable(_))), "{err:?}");
    }
}
