//! iDEAL payments through the Mollie v2 payments API.
//!
//! Mollie's webhook only posts the payment id (`id=tr_...`, form-encoded), so the settled state always comes from
//! [`MollieRail::payment_status`].
use chrono::{DateTime, Utc};
use log::*;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use spg_engine::order_types::{Alias, IssuedPayment, NativeAmount, Order, PaymentInstructions};

use crate::{rest_client::RestClient, MollieConfig, RailApiError, RailsConfig};

#[derive(Debug, Clone, Deserialize)]
struct MollieLink {
    href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MollieLinks {
    checkout: Option<MollieLink>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MolliePayment {
    id: String,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default)]
    links: MollieLinks,
}

#[derive(Clone)]
pub struct MollieRail {
    client: RestClient,
    webhook_url: String,
    rails: RailsConfig,
}

impl MollieRail {
    pub fn new(config: &MollieConfig, rails: &RailsConfig) -> Result<Self, RailApiError> {
        let auth = format!("Bearer {}", config.api_key.reveal());
        let client = RestClient::new(&config.api_url, ("Authorization", auth), rails.request_timeout)?;
        Ok(Self { client, webhook_url: rails.webhook_url("ideal"), rails: rails.clone() })
    }

    pub fn payment_request_body(&self, order: &Order) -> Value {
        json!({
            "amount": { "currency": "EUR", "value": order.total_price.to_decimal_string() },
            "description": format!("Order {}", order.order_id),
            "redirectUrl": self.rails.redirect_url(order.order_id.as_str()),
            "webhookUrl": self.webhook_url,
            "metadata": { "orderId": order.order_id.as_str(), "email": order.customer.email },
            "method": "ideal",
        })
    }

    pub async fn create_payment(&self, order: &Order) -> Result<IssuedPayment, RailApiError> {
        let body = self.payment_request_body(order);
        debug!("Creating Mollie payment for order {}", order.order_id);
        let payment = self.client.rest_query::<MolliePayment, Value>(Method::POST, "/payments", Some(body)).await?;
        let checkout = payment.links.checkout.map(|l| l.href).ok_or_else(|| {
            RailApiError::JsonError(format!("Mollie payment {} has no checkout link (status {})", payment.id, payment.status))
        })?;
        info!("Mollie payment {} created for order {}", payment.id, order.order_id);
        Ok(IssuedPayment {
            aliases: vec![Alias::from(payment.id)],
            native_amount: NativeAmount { value: order.total_price.value(), unit: "EUR cents".into() },
            expires_at: payment.expires_at,
            instructions: PaymentInstructions { checkout_url: Some(checkout), invoice: None },
        })
    }

    /// `true` once Mollie reports the payment as `paid`.
    pub async fn payment_status(&self, payment_id: &str) -> Result<bool, RailApiError> {
        let path = format!("/payments/{}", url::form_urlencoded::byte_serialize(payment_id.as_bytes()).collect::<String>());
        let payment = self.client.rest_query::<MolliePayment, ()>(Method::GET, &path, None).await?;
        debug!("Mollie payment {} is {}", payment.id, payment.status);
        Ok(payment.status == "paid")
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use spg_common::{EuroCents, Secret};
    use spg_engine::order_types::{Customer, OrderId, OrderStatusType, PaymentMethod};
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    fn order() -> Order {
        Order {
            order_id: OrderId::from("ORD-LOYW3V28-ABCDEFGHIJ".to_string()),
            customer: Customer { name: "Anna".into(), email: "anna@example.com".into() },
            product: "half".into(),
            quantity: 2,
            total_price: EuroCents::from(600),
            weight_grams: 800,
            payment_method: PaymentMethod::Ideal,
            fulfillment_date: None,
            note: None,
            status: OrderStatusType::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn rail(server: &MockServer) -> MollieRail {
        let config = MollieConfig { api_url: format!("{}/v2", server.uri()), api_key: Secret::new("test_key".into()) };
        let rails = RailsConfig { public_url: "https://brood.example.nl".into(), ..Default::default() };
        MollieRail::new(&config, &rails).unwrap()
    }

    #[tokio::test]
    async fn creates_an_ideal_payment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/payments"))
            .and(header("authorization", "Bearer test_key"))
            .and(body_partial_json(json!({
                "amount": { "currency": "EUR", "value": "6.00" },
                "method": "ideal",
                "webhookUrl": "https://brood.example.nl/webhooks/settlement?rail=ideal",
                "metadata": { "orderId": "ORD-LOYW3V28-ABCDEFGHIJ" },
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "resource": "payment",
                "id": "tr_WDqYK6vllg",
                "status": "open",
                "expiresAt": "2024-10-19T12:15:00+00:00",
                "_links": { "checkout": { "href": "https://www.mollie.com/checkout/select-method/WDqYK6vllg" } }
            })))
            .expect(1)
            .mount(&server)
            .await;
        let payment = rail(&server).create_payment(&order()).await.unwrap();
        assert_eq!(payment.aliases, vec![Alias::from("tr_WDqYK6vllg")]);
        assert_eq!(payment.native_amount.value, 600);
        assert!(payment.expires_at.is_some());
        assert_eq!(
            payment.instructions.checkout_url.as_deref(),
            Some("https://www.mollie.com/checkout/select-method/WDqYK6vllg")
        );
    }

    #[tokio::test]
    async fn validation_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/payments"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "status": 422, "detail": "amount too low" })))
            .mount(&server)
            .await;
        let err = rail(&server).create_payment(&order()).await.unwrap_err();
        assert!(matches!(err, RailApiError::QueryError { status: 422, .. }), "{err}");
    }

    #[tokio::test]
    async fn looks_up_payment_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/payments/tr_paid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "tr_paid", "status": "paid" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/payments/tr_open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "tr_open", "status": "open" })))
            .mount(&server)
            .await;
        let rail = rail(&server);
        assert!(rail.payment_status("tr_paid").await.unwrap());
        assert!(!rail.payment_status("tr_open").await.unwrap());
    }
}
