use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    order_types::{IssuedPayment, NewOrderRequest, Order, OrderStatusType},
    spg_api::{
        errors::OrderFlowError,
        order_intake::OrderIntake,
        order_repository::OrderRepository,
        payment_issuer::PaymentIssuer,
    },
    traits::{KeyValueStore, PaymentRail},
};

/// The order placed, and how the customer pays for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: IssuedPayment,
}

/// `OrderFlowApi` runs the checkout pipeline: validate the request, persist the order, issue the payment request.
#[derive(Clone)]
pub struct OrderFlowApi<S, R> {
    intake: OrderIntake,
    orders: OrderRepository<S>,
    issuer: PaymentIssuer<S, R>,
}

impl<S, R> Debug for OrderFlowApi<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<S, R> OrderFlowApi<S, R>
where
    S: KeyValueStore,
    R: PaymentRail,
{
    pub fn new(intake: OrderIntake, orders: OrderRepository<S>, issuer: PaymentIssuer<S, R>) -> Self {
        Self { intake, orders, issuer }
    }

    pub fn intake(&self) -> &OrderIntake {
        &self.intake
    }

    /// Validates and stores a new order, then requests its payment.
    ///
    /// If the payment request fails, the order stays in working storage as `pending` until it expires. It is never
    /// reused; the customer simply places a new order.
    pub async fn place_order(&self, request: NewOrderRequest) -> Result<PlacedOrder, OrderFlowError> {
        let mut order = self.intake.create_order(request).map_err(|e| {
            debug!("📦️ Order rejected. {e}");
            e
        })?;
        self.orders.save(&order).await?;
        let payment = self.issuer.issue_payment(&order).await?;
        order.status = OrderStatusType::AwaitingPayment;
        info!("📦️ Order {} placed. Awaiting {} payment", order.order_id, order.payment_method);
        Ok(PlacedOrder { order, payment })
    }
}
