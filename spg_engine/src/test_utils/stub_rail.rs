//! A scriptable [`PaymentRail`] for tests.
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{Duration as ChronoDuration, Utc};

use crate::{
    order_types::{Alias, IssuedPayment, NativeAmount, Order, OrderId, PaymentInstructions, PaymentMethod},
    traits::{PaymentRail, RailError},
};

#[derive(Default)]
struct StubState {
    fixed_aliases: Option<Vec<Alias>>,
    issue_failure: Option<RailError>,
    issue_delay: Option<Duration>,
    settled: HashMap<Alias, bool>,
    lookup_failure: Option<RailError>,
    issued: Vec<OrderId>,
    lookups: usize,
}

/// Issues `hash-<order id>` and `req-<order id>` aliases unless told otherwise, and answers settlement lookups from
/// a map filled in by the test. Clones share their state.
#[derive(Clone, Default)]
pub struct StubRail {
    state: Arc<Mutex<StubState>>,
}

impl Debug for StubRail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StubRail")
    }
}

impl StubRail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_aliases(order_id: &OrderId) -> Vec<Alias> {
        vec![Alias::from(format!("hash-{}", order_id.as_str())), Alias::from(format!("req-{}", order_id.as_str()))]
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StubState) -> T) -> T {
        let mut state = self.state.lock().expect("stub rail state poisoned");
        f(&mut state)
    }

    /// Every following payment request gets exactly these aliases.
    pub fn issue_aliases(&self, aliases: &[&str]) {
        self.with_state(|s| s.fixed_aliases = Some(aliases.iter().map(|a| Alias::from(*a)).collect()));
    }

    pub fn fail_issue(&self, error: Option<RailError>) {
        self.with_state(|s| s.issue_failure = error);
    }

    pub fn delay_issue(&self, delay: Option<Duration>) {
        self.with_state(|s| s.issue_delay = delay);
    }

    pub fn set_settled(&self, alias: &str, settled: bool) {
        self.with_state(|s| s.settled.insert(Alias::from(alias), settled));
    }

    pub fn fail_lookups(&self, error: Option<RailError>) {
        self.with_state(|s| s.lookup_failure = error);
    }

    pub fn issued_orders(&self) -> Vec<OrderId> {
        self.with_state(|s| s.issued.clone())
    }

    pub fn lookup_count(&self) -> usize {
        self.with_state(|s| s.lookups)
    }
}

impl PaymentRail for StubRail {
    async fn issue(&self, order: &Order) -> Result<IssuedPayment, RailError> {
        let delay = self.with_state(|s| s.issue_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.with_state(|s| {
            if let Some(e) = &s.issue_failure {
                return Err(e.clone());
            }
            s.issued.push(order.order_id.clone());
            Ok(s.fixed_aliases.clone().unwrap_or_else(|| Self::default_aliases(&order.order_id)))
        });
        let aliases = result?;
        let label = aliases.first().map(|a| a.as_str().to_string()).unwrap_or_default();
        let (native_amount, instructions) = match order.payment_method {
            PaymentMethod::Ideal => (
                NativeAmount { value: order.total_price.value(), unit: "EUR cents".into() },
                PaymentInstructions {
                    checkout_url: Some(format!("https://pay.example.com/{label}")),
                    invoice: None,
                },
            ),
            PaymentMethod::Lightning => (
                NativeAmount { value: order.total_price.value() * 15, unit: "sat".into() },
                PaymentInstructions { checkout_url: None, invoice: Some(format!("lnbc{label}")) },
            ),
        };
        Ok(IssuedPayment {
            aliases,
            native_amount,
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            instructions,
        })
    }

    async fn lookup_settlement(&self, _method: PaymentMethod, alias: &Alias) -> Result<Option<bool>, RailError> {
        self.with_state(|s| {
            s.lookups += 1;
            match &s.lookup_failure {
                Some(e) => Err(e.clone()),
                None => Ok(Some(s.settled.get(alias).copied().unwrap_or(false))),
            }
        })
    }
}
