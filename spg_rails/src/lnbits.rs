//! Lightning invoices on an LNbits wallet.
//!
//! An invoice is known by two aliases, its payment hash and the BOLT11 payment request. LNbits webhooks post the
//! full payment object, so the push normally says itself whether it settled.
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use log::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use spg_engine::order_types::{Alias, IssuedPayment, NativeAmount, Order, PaymentInstructions};

use crate::{
    exchange_rate::{euro_cents_to_sats, ExchangeRateSource},
    rest_client::RestClient,
    LnbitsConfig,
    RailApiError,
    RailsConfig,
};

/// Invoice lifetime requested from LNbits.
const INVOICE_EXPIRY_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Deserialize)]
struct LnbitsInvoice {
    payment_hash: String,
    #[serde(alias = "bolt11")]
    payment_request: String,
    checking_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LnbitsPaymentStatus {
    paid: bool,
}

#[derive(Clone)]
pub struct LnbitsRail {
    client: RestClient,
    webhook_url: String,
    rate: Arc<dyn ExchangeRateSource>,
}

impl LnbitsRail {
    pub fn new(
        config: &LnbitsConfig,
        rails: &RailsConfig,
        rate: Arc<dyn ExchangeRateSource>,
    ) -> Result<Self, RailApiError> {
        let client =
            RestClient::new(&config.url, ("X-Api-Key", config.api_key.reveal().clone()), rails.request_timeout)?;
        Ok(Self { client, webhook_url: rails.webhook_url("lightning"), rate })
    }

    pub fn invoice_request_body(&self, order: &Order, sats: i64) -> Value {
        json!({
            "out": false,
            "amount": sats,
            "memo": format!("Order {}", order.order_id),
            "expiry": INVOICE_EXPIRY_SECS,
            "webhook": self.webhook_url,
        })
    }

    pub async fn create_invoice(&self, order: &Order) -> Result<IssuedPayment, RailApiError> {
        let sats = euro_cents_to_sats(order.total_price, self.rate.as_ref())?;
        let body = self.invoice_request_body(order, sats);
        debug!("Creating a {sats} sat LNbits invoice for order {}", order.order_id);
        let invoice = self.client.rest_query::<LnbitsInvoice, Value>(Method::POST, "/api/v1/payments", Some(body)).await?;
        info!("LNbits invoice {} created for order {}", invoice.payment_hash, order.order_id);
        let mut aliases = vec![Alias::from(invoice.payment_hash), Alias::from(invoice.payment_request.clone())];
        if let Some(checking_id) = invoice.checking_id.map(Alias::from) {
            if !aliases.contains(&checking_id) {
                aliases.push(checking_id);
            }
        }
        Ok(IssuedPayment {
            aliases,
            native_amount: NativeAmount { value: sats, unit: "sat".into() },
            expires_at: Some(Utc::now() + ChronoDuration::seconds(INVOICE_EXPIRY_SECS)),
            instructions: PaymentInstructions { checkout_url: None, invoice: Some(invoice.payment_request) },
        })
    }

    /// Only payment hashes (and checking ids) can be looked up. Payment requests return `None`.
    pub async fn invoice_paid(&self, alias: &str) -> Result<Option<bool>, RailApiError> {
        if alias.to_ascii_lowercase().starts_with("ln") {
            trace!("{alias} looks like a payment request. LNbits cannot look it up");
            return Ok(None);
        }
        let path = format!("/api/v1/payments/{}", url::form_urlencoded::byte_serialize(alias.as_bytes()).collect::<String>());
        let status = self.client.rest_query::<LnbitsPaymentStatus, ()>(Method::GET, &path, None).await?;
        debug!("LNbits invoice {alias} paid: {}", status.paid);
        Ok(Some(status.paid))
    }
}
