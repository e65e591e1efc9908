use std::sync::Arc;

use log::*;
use spg_engine::{
    order_types::{Alias, IssuedPayment, Order, PaymentMethod},
    traits::{PaymentRail, RailError},
};

use crate::{FixedExchangeRate, LnbitsRail, MollieRail, RailApiError, RailsConfig};

/// Fronts every configured provider and routes on the payment method.
#[derive(Clone, Default)]
pub struct RailRouter {
    mollie: Option<MollieRail>,
    lnbits: Option<LnbitsRail>,
}

impl RailRouter {
    pub fn new(mollie: Option<MollieRail>, lnbits: Option<LnbitsRail>) -> Self {
        Self { mollie, lnbits }
    }

    pub fn from_config(config: &RailsConfig) -> Result<Self, RailApiError> {
        let mollie = config.mollie.as_ref().map(|m| MollieRail::new(m, config)).transpose()?;
        let lnbits = match (&config.lnbits, config.sats_per_euro) {
            (Some(lnbits), Some(rate)) => Some(LnbitsRail::new(lnbits, config, Arc::new(FixedExchangeRate::new(rate)))?),
            (Some(_), None) => {
                warn!("🪛️ LNbits is configured but there is no EUR/sats rate. Lightning payments are disabled");
                None
            },
            (None, _) => None,
        };
        let router = Self { mollie, lnbits };
        info!("🪛️ Payment rails available: {:?}", router.configured_methods());
        Ok(router)
    }

    /// The payment methods that can actually be issued.
    pub fn configured_methods(&self) -> Vec<PaymentMethod> {
        let mut methods = Vec::with_capacity(2);
        if self.mollie.is_some() {
            methods.push(PaymentMethod::Ideal);
        }
        if self.lnbits.is_some() {
            methods.push(PaymentMethod::Lightning);
        }
        methods
    }

    fn mollie(&self) -> Result<&MollieRail, RailError> {
        self.mollie.as_ref().ok_or_else(|| RailError::NotConfigured(PaymentMethod::Ideal.to_string()))
    }

    fn lnbits(&self) -> Result<&LnbitsRail, RailError> {
        self.lnbits.as_ref().ok_or_else(|| RailError::NotConfigured(PaymentMethod::Lightning.to_string()))
    }
}

impl PaymentRail for RailRouter {
    async fn issue(&self, order: &Order) -> Result<IssuedPayment, RailError> {
        let payment = match order.payment_method {
            PaymentMethod::Ideal => self.mollie()?.create_payment(order).await,
            PaymentMethod::Lightning => self.lnbits()?.create_invoice(order).await,
        };
        payment.map_err(|e| {
            warn!("💳️ Could not issue a {} payment for order {}. {e}", order.payment_method, order.order_id);
            RailError::from(e)
        })
    }

    async fn lookup_settlement(&self, method: PaymentMethod, alias: &Alias) -> Result<Option<bool>, RailError> {
        let result = match method {
            PaymentMethod::Ideal => self.mollie()?.payment_status(alias.as_str()).await.map(Some),
            PaymentMethod::Lightning => self.lnbits()?.invoice_paid(alias.as_str()).await,
        };
        result.map_err(RailError::from)
    }
}
