use spg_common::EuroCents;

use crate::RailApiError;

/// Where the EUR → satoshi rate comes from.
pub trait ExchangeRateSource: Send + Sync {
    /// `None` if no rate is available.
    fn sats_per_euro(&self) -> Option<f64>;
}

/// A rate fixed in configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedExchangeRate {
    sats_per_euro: f64,
}

impl FixedExchangeRate {
    pub fn new(sats_per_euro: f64) -> Self {
        Self { sats_per_euro }
    }
}

impl ExchangeRateSource for FixedExchangeRate {
    fn sats_per_euro(&self) -> Option<f64> {
        Some(self.sats_per_euro)
    }
}

/// Converts an amount to whole satoshis, rounding to the nearest sat.
pub fn euro_cents_to_sats(amount: EuroCents, source: &dyn ExchangeRateSource) -> Result<i64, RailApiError> {
    let rate = source
        .sats_per_euro()
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| RailApiError::InvalidAmount("No EUR/sats exchange rate is available".into()))?;
    let sats = (amount.as_euros() * rate).round();
    if sats < 1.0 || sats > i64::MAX as f64 {
        return Err(RailApiError::InvalidAmount(format!("{amount} is {sats} sats, which cannot be invoiced")));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(sats as i64)
}
