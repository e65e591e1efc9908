use std::time::Duration;

use spg_common::Secret;

use crate::helpers::FieldMappings;

pub const DEFAULT_ALIAS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_PAID_RETENTION: Duration = Duration::from_secs(48 * 60 * 60);
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_ORDER_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_RAIL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Tunables for the reconciliation engine.
///
/// Every TTL here bounds how long a piece of working state survives in the key-value store. The alias TTL must cover
/// the longest plausible delay between issuing a payment request and its settlement push.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub alias_ttl: Duration,
    pub status_ttl: Duration,
    /// Minimum lifetime of a `paid` status entry. The effective TTL is the larger of this and `status_ttl`.
    pub paid_retention: Duration,
    pub claim_ttl: Duration,
    pub order_retention: Duration,
    pub rail_timeout: Duration,
    pub retry_attempts: u32,
    /// Delay before the first retry; doubled for every further attempt.
    pub retry_base_delay: Duration,
    /// Shared secret for push signatures. `None` runs the webhook in degraded (unverified) mode.
    pub webhook_secret: Option<Secret<String>>,
    /// Ask the rail directly when a poll finds no `paid` status.
    pub poll_lookup: bool,
    pub field_mappings: FieldMappings,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            alias_ttl: DEFAULT_ALIAS_TTL,
            status_ttl: DEFAULT_STATUS_TTL,
            paid_retention: DEFAULT_PAID_RETENTION,
            claim_ttl: DEFAULT_CLAIM_TTL,
            order_retention: DEFAULT_ORDER_RETENTION,
            rail_timeout: DEFAULT_RAIL_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            webhook_secret: None,
            poll_lookup: false,
            field_mappings: FieldMappings::default(),
        }
    }
}

impl SettlementConfig {
    pub fn with_webhook_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.webhook_secret = Some(Secret::new(secret.into()));
        self
    }

    pub fn paid_ttl(&self) -> Duration {
        self.status_ttl.max(self.paid_retention)
    }

    /// The backoff delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_base_delay.saturating_mul(factor)
    }
}
