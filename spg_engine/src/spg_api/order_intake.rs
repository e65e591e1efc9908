//! Turns a client's purchase request into a canonical [`Order`].
//!
//! Nothing the client says about money or weight is trusted. The total is recomputed from the catalog, and the
//! client's `price` only serves as a tamper check against it.
use chrono::{NaiveDate, Utc};
use log::*;
use regex::Regex;
use spg_common::EuroCents;

use crate::{
    catalog::{Catalog, PRICE_TOLERANCE},
    order_types::{Customer, NewOrderRequest, Order, OrderId, OrderStatusType, PaymentMethod},
    spg_api::errors::ValidationError,
};

pub const MAX_NOTE_LENGTH: usize = 500;

#[derive(Debug, Clone)]
pub struct OrderIntake {
    catalog: Catalog,
    payment_methods: Vec<PaymentMethod>,
    email_pattern: Regex,
}

impl OrderIntake {
    /// `payment_methods` lists the rails that are actually configured. Orders for any other method are rejected.
    pub fn new(catalog: Catalog, payment_methods: Vec<PaymentMethod>) -> Self {
        // A literal pattern; it cannot fail to compile
        let email_pattern = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
        Self { catalog, payment_methods, email_pattern }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn payment_methods(&self) -> &[PaymentMethod] {
        &self.payment_methods
    }

    pub fn create_order(&self, request: NewOrderRequest) -> Result<Order, ValidationError> {
        self.create_order_on(request, Utc::now().date_naive())
    }

    /// As [`Self::create_order`], with an explicit "today" for the fulfillment date check.
    pub fn create_order_on(&self, request: NewOrderRequest, today: NaiveDate) -> Result<Order, ValidationError> {
        let name = required_text("name", request.name)?;
        let email = required_text("email", request.email)?;
        let product = required_text("product", request.product)?;
        let quantity = request.quantity.ok_or_else(|| missing("quantity"))?;
        let price = request.price.ok_or_else(|| missing("price"))?;
        let method = required_text("payment_method", request.payment_method)?;

        if !self.email_pattern.is_match(&email) {
            return Err(ValidationError::new(format!("'{email}' is not a valid email address")));
        }
        let entry =
            self.catalog.get(&product).ok_or_else(|| ValidationError::new(format!("Unknown product '{product}'")))?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| (1..=entry.max_quantity).contains(q))
            .ok_or_else(|| {
                ValidationError::new(format!("Quantity must be between 1 and {} for {product}", entry.max_quantity))
            })?;
        let payment_method = method
            .parse::<PaymentMethod>()
            .ok()
            .filter(|m| self.payment_methods.contains(m))
            .ok_or_else(|| ValidationError::new(format!("Payment method '{method}' is not available")))?;
        let note = request.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
            return Err(ValidationError::new(format!("The note may be at most {MAX_NOTE_LENGTH} characters long")));
        }
        if let Some(date) = request.fulfillment_date {
            if date < today {
                return Err(ValidationError::new(format!("The fulfillment date {date} is in the past")));
            }
        }

        let total_price = entry.unit_price * i64::from(quantity);
        if !price.is_finite() || (price - total_price.as_euros()).abs() > PRICE_TOLERANCE {
            warn!("📦️ Price mismatch for {quantity} x {product}: client said {price}, catalog says {total_price}");
            return Err(ValidationError::new(format!(
                "The price {price:.2} does not match the expected total of {}",
                total_price.to_decimal_string()
            )));
        }

        let now = Utc::now();
        let order = Order {
            order_id: OrderId::generate(),
            customer: Customer { name, email },
            product,
            quantity,
            total_price,
            weight_grams: entry.unit_weight_grams * quantity,
            payment_method,
            fulfillment_date: request.fulfillment_date,
            note,
            status: OrderStatusType::Pending,
            created_at: now,
            updated_at: now,
        };
        debug!("📦️ Order {} created: {quantity} x {} for {}", order.order_id, order.product, order.total_price);
        Ok(order)
    }
}

fn missing(field: &str) -> ValidationError {
    ValidationError::new(format!("Missing required field: {field}"))
}

fn required_text(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).ok_or_else(|| missing(field))
}

/// Convenience for computing the expected total in tests and UIs.
pub fn expected_total(catalog: &Catalog, product: &str, quantity: u32) -> Option<EuroCents> {
    catalog.get(product).map(|e| e.unit_price * i64::from(quantity))
}
