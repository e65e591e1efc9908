use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use log::error;
use rand::{distributions::Uniform, Rng};
use serde::{Deserialize, Serialize};
use spg_common::EuroCents;
use thiserror::Error;

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ORDER_ID_RANDOM_LEN: usize = 10;

impl OrderId {
    /// Generates a new order id of the form `ORD-<base36 unix millis>-<10 random base36 chars>`.
    ///
    /// The random suffix gives 36^10 (~3.6e15) possibilities per millisecond, so collisions are statistically
    /// negligible, but ids are not cryptographically unguessable.
    pub fn generate() -> Self {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut rng = rand::thread_rng();
        let dist = Uniform::from(0..BASE36.len());
        let suffix = (0..ORDER_ID_RANDOM_LEN).map(|_| BASE36[rng.sample(dist)] as char).collect::<String>();
        Self(format!("ORD-{}-{suffix}", to_base36(millis)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------         Alias         ---------------------------------------------------------
/// An identifier issued by a payment rail for one payment attempt. A rail may issue several aliases for the same
/// attempt (e.g. a Lightning payment hash and the payment request string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alias(pub String);

impl Alias {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Into<String>> From<S> for Alias {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Lightning payment requests are several hundred characters long
        if self.0.len() > 24 {
            write!(f, "{}…", &self.0[..self.0.char_indices().nth(24).map(|(i, _)| i).unwrap_or(self.0.len())])
        } else {
            write!(f, "{}", self.0)
        }
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// iDEAL bank payments, issued through Mollie.
    Ideal,
    /// Bitcoin Lightning invoices, issued through LNbits.
    Lightning,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Ideal => write!(f, "ideal"),
            PaymentMethod::Lightning => write!(f, "lightning"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment method: {0}")]
pub struct ConversionError(pub String);

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ideal" => Ok(Self::Ideal),
            "lightning" => Ok(Self::Lightning),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been validated and created, but no payment request has been issued yet.
    Pending,
    /// A payment request has been issued and we are waiting for the rail to report settlement.
    AwaitingPayment,
    /// The rail has confirmed settlement. This status is terminal.
    Paid,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::AwaitingPayment => write!(f, "awaiting_payment"),
            OrderStatusType::Paid => write!(f, "paid"),
        }
    }
}

impl OrderStatusType {
    /// Order statuses only ever move forward.
    pub fn can_transition_to(self, next: OrderStatusType) -> bool {
        next > self
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer: Customer,
    pub product: String,
    pub quantity: u32,
    pub total_price: EuroCents,
    pub weight_grams: u32,
    pub payment_method: PaymentMethod,
    pub fulfillment_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchase request as submitted by a client. Every field is optional at this level so that the intake can report
/// precisely what is missing instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<i64>,
    /// The total price the client displayed, in euros. Only used as a tamper check.
    pub price: Option<f64>,
    pub payment_method: Option<String>,
    pub fulfillment_date: Option<NaiveDate>,
    pub note: Option<String>,
}

//--------------------------------------   SettlementStatus    ---------------------------------------------------------
/// The three-valued settlement status of a payment alias.
///
/// `Unknown` means "no information" (never observed, or the observation has expired). It is *not* the same as
/// `Pending`, and callers must not treat it as such.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    #[default]
    Unknown,
    Pending,
    Paid,
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStatus::Unknown => write!(f, "unknown"),
            SettlementStatus::Pending => write!(f, "pending"),
            SettlementStatus::Paid => write!(f, "paid"),
        }
    }
}

impl From<String> for SettlementStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "paid" => Self::Paid,
            "pending" => Self::Pending,
            "unknown" => Self::Unknown,
            _ => {
                error!("Invalid settlement status: {value}. Treating it as unknown");
                Self::Unknown
            },
        }
    }
}

/// The value stored in the status cache for each alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: SettlementStatus,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    IssuedPayment      ---------------------------------------------------------
/// An amount in the rail's own unit, e.g. `{ value: 600, unit: "EUR cents" }` or `{ value: 9120, unit: "sat" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAmount {
    pub value: i64,
    pub unit: String,
}

impl Display for NativeAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// What the customer needs in order to pay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstructions {
    /// Hosted checkout page (iDEAL)
    pub checkout_url: Option<String>,
    /// BOLT11 payment request (Lightning)
    pub invoice: Option<String>,
}

/// The result of a successful payment request against a rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedPayment {
    pub aliases: Vec<Alias>,
    pub native_amount: NativeAmount,
    pub expires_at: Option<DateTime<Utc>>,
    pub instructions: PaymentInstructions,
}

//--------------------------------------  SettlementDetails    ---------------------------------------------------------
/// Supplied to notification dispatchers along with the paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementDetails {
    pub payment_method: PaymentMethod,
    /// The alias the settlement was reported against
    pub alias: Alias,
    pub settled_at: DateTime<Utc>,
    /// How the settlement was discovered, e.g. "webhook" or "poll"
    pub source: String,
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn order_id_format() {
        let id = OrderId::generate();
        let parts = id.as_str().split('-').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[2].len(), ORDER_ID_RANDOM_LEN);
        assert!(id.as_str().chars().all(|c| c == '-' || c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn a_million_order_ids_do_not_collide() {
        let ids = (0..1_000_000).map(|_| OrderId::generate()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 1_000_000);
    }

    #[test]
    fn base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "LOYW3V28");
    }

    #[test]
    fn order_status_only_moves_forward() {
        use OrderStatusType::*;
        assert!(Pending.can_transition_to(AwaitingPayment));
        assert!(Pending.can_transition_to(Paid));
        assert!(AwaitingPayment.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(AwaitingPayment));
        assert!(!Paid.can_transition_to(Paid));
    }

    #[test]
    fn payment_method_parsing() {
        assert_eq!("iDEAL".parse::<PaymentMethod>().unwrap(), PaymentMethod::Ideal);
        assert_eq!(" lightning".parse::<PaymentMethod>().unwrap(), PaymentMethod::Lightning);
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn long_aliases_are_truncated_for_display() {
        let alias = Alias::from("lnbc10u1pjabcdefghijklmnopqrstuvwxyz0123456789");
        assert_eq!(alias.to_string(), "lnbc10u1pjabcdefghijklmn…");
        assert_eq!(Alias::from("hash123").to_string(), "hash123");
    }
}
