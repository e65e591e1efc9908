use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use spg_engine::{
    order_types::{Alias, NativeAmount, OrderId, OrderStatusType, PaymentMethod, SettlementStatus},
    PlacedOrder,
};

/// The reply to a successful `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    /// The server-computed total, in euros (e.g. `"9.00"`)
    pub total_price: String,
    pub payment_method: PaymentMethod,
    /// Every identifier the rail issued. Any of them can be polled.
    pub aliases: Vec<Alias>,
    pub amount: NativeAmount,
    pub expires_at: Option<DateTime<Utc>>,
    /// iDEAL checkout page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// BOLT11 invoice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
}

impl From<PlacedOrder> for OrderResponse {
    fn from(placed: PlacedOrder) -> Self {
        let PlacedOrder { order, payment } = placed;
        Self {
            order_id: order.order_id,
            status: order.status,
            total_price: order.total_price.to_decimal_string(),
            payment_method: order.payment_method,
            aliases: payment.aliases,
            amount: payment.native_amount,
            expires_at: payment.expires_at,
            url: payment.instructions.checkout_url,
            invoice: payment.instructions.invoice,
        }
    }
}

/// The body of `POST /payments/status`.
///
/// Field names from older clients (`paymentHash`, `paymentRequest`) are accepted too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRequest {
    #[serde(default, alias = "paymentHash", alias = "payment_hash", alias = "paymentId")]
    pub alias: Option<String>,
    #[serde(default, alias = "paymentRequest", alias = "payment_request")]
    pub secondary: Option<String>,
}

/// `paid` is `true`, `false`, or the string `"unknown"`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(serialize_with = "serialize_paid")]
    pub paid: SettlementStatus,
    pub status: SettlementStatus,
}

impl StatusResponse {
    pub fn new(status: SettlementStatus) -> Self {
        Self { paid: status, status }
    }
}

fn serialize_paid<S: Serializer>(status: &SettlementStatus, serializer: S) -> Result<S::Ok, S::Error> {
    match status {
        SettlementStatus::Paid => serializer.serialize_bool(true),
        SettlementStatus::Pending => serializer.serialize_bool(false),
        SettlementStatus::Unknown => serializer.serialize_str("unknown"),
    }
}

/// Query string of `POST /webhooks/settlement`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookParams {
    pub rail: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn paid_is_three_valued() {
        let json = |s| serde_json::to_string(&StatusResponse::new(s)).unwrap();
        assert_eq!(json(SettlementStatus::Paid), r#"{"paid":true,"status":"paid"}"#);
        assert_eq!(json(SettlementStatus::Pending), r#"{"paid":false,"status":"pending"}"#);
        assert_eq!(json(SettlementStatus::Unknown), r#"{"paid":"unknown","status":"unknown"}"#);
    }

    #[test]
    fn status_requests_accept_legacy_field_names() {
        let req: StatusRequest = serde_json::from_str(r#"{"paymentHash":"hash123"}"#).unwrap();
        assert_eq!(req.alias.as_deref(), Some("hash123"));
        let req: StatusRequest = serde_json::from_str(r#"{"alias":"hash123","paymentRequest":"req456"}"#).unwrap();
        assert_eq!(req.secondary.as_deref(), Some("req456"));
        let req: StatusRequest = serde_json::from_str("{}").unwrap();
        assert!(req.alias.is_none());
    }
}
