//! # Push ingestion
//!
//! [`ReconciliationWorker::ingest`] is what the webhook endpoint calls with the raw request body. The rules are:
//!
//! * Only a bad (or missing) signature is reported back to the caller. Everything else, including payloads we cannot
//!   read, is acknowledged so that the rail stops redelivering.
//! * Pushes are redelivered and race with polls, so every step is idempotent. Status updates are monotonic (see
//!   [`StatusCache`]), and the "order paid" side effect is guarded by a [`SideEffectClaims`] claim. The claim is taken
//!   *before* the event is published, which makes the confirmation at-most-once.
//! * Internal failures (store hiccups, an unreachable rail during a settlement lookup) are retried in the background
//!   with exponential backoff while the push itself is acknowledged immediately.
use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;

use crate::{
    events::{EventProducers, OrderPaidEvent},
    helpers::NormalizedEvent,
    order_types::{Alias, OrderId, OrderStatusType, PaymentMethod, SettlementDetails, SettlementStatus},
    spg_api::{
        errors::{SettlementError, SignatureInvalidError},
        identity_index::IdentityIndex,
        order_repository::OrderRepository,
        settlement_config::SettlementConfig,
        side_effect_claims::SideEffectClaims,
        status_cache::StatusCache,
    },
    traits::{KeyValueStore, PaymentRail},
};

/// What happened to a push. Every variant is acknowledged to the rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The body could not be parsed, or there is no field mapping for the rail.
    Unreadable,
    /// The payload carries no alias we recognise.
    NoAlias,
    /// The payment has not settled yet. The aliases were observed `pending`.
    Pending,
    /// The payment settled, but none of its aliases belongs to an order we know.
    Unresolved,
    /// The order is paid. `dispatched` is true if this push won the side-effect claim.
    Paid { order_id: OrderId, dispatched: bool },
    /// Processing failed and has been handed to a background retry.
    RetryScheduled,
}

#[derive(Clone)]
pub struct ReconciliationWorker<S, R> {
    rail: R,
    index: IdentityIndex<S>,
    cache: StatusCache<S>,
    claims: SideEffectClaims<S>,
    orders: OrderRepository<S>,
    producers: EventProducers,
    config: Arc<SettlementConfig>,
}

impl<S, R> Debug for ReconciliationWorker<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationWorker")
    }
}

impl<S, R> ReconciliationWorker<S, R>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    pub fn new(
        rail: R,
        index: IdentityIndex<S>,
        cache: StatusCache<S>,
        claims: SideEffectClaims<S>,
        orders: OrderRepository<S>,
        producers: EventProducers,
        config: Arc<SettlementConfig>,
    ) -> Self {
        Self { rail, index, cache, claims, orders, producers, config }
    }

    /// Ingests one push notification for the given rail.
    pub async fn ingest(
        &self,
        method: PaymentMethod,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<IngestOutcome, SignatureInvalidError> {
        self.check_signature(raw_body, signature)?;
        let event = match self.config.field_mappings.normalize(method, raw_body) {
            Ok(event) => event,
            Err(e) => {
                warn!("🔄️ Ignoring a {method} push. {e}");
                return Ok(IngestOutcome::Unreadable);
            },
        };
        if event.aliases.is_empty() {
            info!("🔄️ Ignoring a {method} push that carries no payment identifier");
            return Ok(IngestOutcome::NoAlias);
        }
        match self.reconcile(&event).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_transient() => {
                warn!("🔄️ Could not process a {method} push for {}. {e}. Retrying in the background", event.aliases[0]);
                self.schedule_retry(event);
                Ok(IngestOutcome::RetryScheduled)
            },
            Err(e) => {
                error!("🔄️ Giving up on a {method} push for {}. {e}", event.aliases[0]);
                Ok(IngestOutcome::Unresolved)
            },
        }
    }

    fn check_signature(&self, raw_body: &[u8], signature: Option<&str>) -> Result<(), SignatureInvalidError> {
        let Some(secret) = &self.config.webhook_secret else {
            warn!("🔄️ No webhook secret is configured. Accepting the push WITHOUT verifying its signature");
            return Ok(());
        };
        let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            warn!("🔄️ Rejecting an unsigned push");
            SignatureInvalidError::Missing
        })?;
        if self.rail.verify_signature(raw_body, signature, secret.reveal()) {
            trace!("🔄️ Push signature verified");
            Ok(())
        } else {
            warn!("🔄️ Rejecting a push with an invalid signature");
            Err(SignatureInvalidError::Mismatch)
        }
    }

    /// Works out whether the event means "settled" (asking the rail if the payload does not say) and applies it.
    async fn reconcile(&self, event: &NormalizedEvent) -> Result<IngestOutcome, SettlementError> {
        let settled = match event.settled {
            Some(settled) => settled,
            None => self.lookup_settled(event.payment_method, &event.aliases).await?,
        };
        if settled {
            self.apply_settlement(event.payment_method, &event.aliases, "webhook").await
        } else {
            let now = Utc::now();
            for alias in &event.aliases {
                self.cache.observe(alias, SettlementStatus::Pending, now).await?;
            }
            debug!("🔄️ {} push for {}: not settled yet", event.payment_method, event.aliases[0]);
            Ok(IngestOutcome::Pending)
        }
    }

    async fn lookup_settled(&self, method: PaymentMethod, aliases: &[Alias]) -> Result<bool, SettlementError> {
        for alias in aliases {
            let lookup = self.rail.lookup_settlement(method, alias);
            match tokio::time::timeout(self.config.rail_timeout, lookup).await {
                Ok(Ok(Some(settled))) => {
                    debug!("🔄️ The {method} rail reports {alias} as {}", if settled { "settled" } else { "open" });
                    return Ok(settled);
                },
                Ok(Ok(None)) => trace!("🔄️ The {method} rail cannot look up {alias}"),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(SettlementError::LookupTimeout),
            }
        }
        warn!("🔄️ The {method} push did not say whether it settled, and the rail could not tell us. Treating it as open");
        Ok(false)
    }

    /// Marks the order behind `aliases` as paid and dispatches the confirmation if nobody has yet.
    ///
    /// Safe to call any number of times, from pushes and polls alike.
    pub async fn apply_settlement(
        &self,
        method: PaymentMethod,
        aliases: &[Alias],
        source: &str,
    ) -> Result<IngestOutcome, SettlementError> {
        let now = Utc::now();
        for alias in aliases {
            self.cache.observe(alias, SettlementStatus::Paid, now).await?;
        }
        let mut resolved = None;
        for alias in aliases {
            if let Some(order_id) = self.index.resolve(alias).await? {
                resolved = Some((alias.clone(), order_id));
                break;
            }
        }
        let Some((alias, order_id)) = resolved else {
            warn!("🔄️ Settlement ({source}) for {} does not match any order we know of", aliases.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "));
            return Ok(IngestOutcome::Unresolved);
        };
        let order = self.orders.transition(&order_id, OrderStatusType::Paid).await?;
        if !self.claims.try_claim(&order_id, source).await? {
            debug!("🔄️ Order {order_id} is paid and its confirmation was already dispatched");
            return Ok(IngestOutcome::Paid { order_id, dispatched: false });
        }
        let details = SettlementDetails { payment_method: method, alias, settled_at: now, source: source.to_string() };
        info!("🔄️ Order {order_id} is paid ({source}). Dispatching confirmation");
        self.producers.publish_order_paid(OrderPaidEvent::new(order, details)).await;
        Ok(IngestOutcome::Paid { order_id, dispatched: true })
    }

    fn schedule_retry(&self, event: NormalizedEvent) {
        let worker = self.clone();
        tokio::spawn(async move {
            let attempts = worker.config.retry_attempts;
            for attempt in 1..=attempts {
                tokio::time::sleep(worker.config.retry_delay(attempt)).await;
                match worker.reconcile(&event).await {
                    Ok(outcome) => {
                        info!("🔄️ Retry {attempt}/{attempts} for {} succeeded: {outcome:?}", event.aliases[0]);
                        return;
                    },
                    Err(e) if e.is_transient() => {
                        warn!("🔄️ Retry {attempt}/{attempts} for {} failed. {e}", event.aliases[0]);
                    },
                    Err(e) => {
                        error!("🔄️ Retry {attempt}/{attempts} for {} failed permanently. {e}", event.aliases[0]);
                        return;
                    },
                }
            }
            error!(
                "🔄️ Giving up on the {} push for {} after {attempts} retries. The next poll or redelivery will pick it up",
                event.payment_method, event.aliases[0]
            );
        });
    }
}
