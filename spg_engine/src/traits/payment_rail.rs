use std::future::Future;

use thiserror::Error;

use crate::{
    helpers::signature::verify_signature,
    order_types::{Alias, IssuedPayment, Order, PaymentMethod},
};

#[derive(Debug, Clone, Error)]
pub enum RailError {
    #[error("The payment rail for {0} is not configured")]
    NotConfigured(String),
    #[error("The payment rail could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment rail rejected the request. {0}")]
    Rejected(String),
    #[error("The payment rail returned a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// The boundary contract for payment rails (Mollie, LNbits, ...).
///
/// A single `PaymentRail` value may front several rails; it is expected to route on `order.payment_method`.
pub trait PaymentRail: Clone + Send + Sync + 'static {
    /// Requests a new payment for the order and returns every alias the rail will use to refer to it.
    fn issue(&self, order: &Order) -> impl Future<Output = Result<IssuedPayment, RailError>> + Send;

    /// Asks the rail directly whether the payment behind `alias` has settled.
    ///
    /// `Ok(None)` means the rail does not support lookups for this alias.
    fn lookup_settlement(
        &self,
        _method: PaymentMethod,
        _alias: &Alias,
    ) -> impl Future<Output = Result<Option<bool>, RailError>> + Send {
        async { Ok(None) }
    }

    /// Checks a push notification's signature. The default is HMAC-SHA256 over the raw body.
    fn verify_signature(&self, raw_body: &[u8], signature: &str, secret: &str) -> bool {
        verify_signature(secret, raw_body, signature)
    }
}
