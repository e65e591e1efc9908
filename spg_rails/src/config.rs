use std::time::Duration;

use log::*;
use spg_common::Secret;

const DEFAULT_MOLLIE_API_URL: &str = "https://api.mollie.com/v2";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8360";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MollieConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct LnbitsConfig {
    /// The LNbits instance, e.g. `https://legend.lnbits.com`
    pub url: String,
    /// The wallet's invoice/read key
    pub api_key: Secret<String>,
}

/// Rails are optional. A rail whose credentials are missing is simply not offered.
#[derive(Debug, Clone)]
pub struct RailsConfig {
    pub mollie: Option<MollieConfig>,
    pub lnbits: Option<LnbitsConfig>,
    /// Where the server is reachable from the outside. Webhook and redirect URLs are derived from it.
    pub public_url: String,
    pub request_timeout: Duration,
    /// The fixed EUR → sats conversion rate for Lightning invoices.
    pub sats_per_euro: Option<f64>,
}

impl Default for RailsConfig {
    fn default() -> Self {
        Self {
            mollie: None,
            lnbits: None,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sats_per_euro: None,
        }
    }
}

impl RailsConfig {
    pub fn new_from_env_or_default() -> Self {
        let mollie = match std::env::var("SPG_MOLLIE_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                let api_url = std::env::var("SPG_MOLLIE_API_URL").unwrap_or_else(|_| DEFAULT_MOLLIE_API_URL.to_string());
                Some(MollieConfig { api_url, api_key: Secret::new(key.trim().to_string()) })
            },
            _ => {
                warn!("🪛️ SPG_MOLLIE_API_KEY is not set. iDEAL payments are disabled");
                None
            },
        };
        let lnbits = match (std::env::var("SPG_LNBITS_URL"), std::env::var("SPG_LNBITS_API_KEY")) {
            (Ok(url), Ok(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some(LnbitsConfig { url: url.trim().trim_end_matches('/').to_string(), api_key: Secret::new(key) })
            },
            _ => {
                warn!("🪛️ SPG_LNBITS_URL and/or SPG_LNBITS_API_KEY are not set. Lightning payments are disabled");
                None
            },
        };
        let public_url = std::env::var("SPG_PUBLIC_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ SPG_PUBLIC_URL is not set. Using {DEFAULT_PUBLIC_URL}. Rails will not be able to reach the webhook");
                DEFAULT_PUBLIC_URL.to_string()
            });
        let request_timeout = std::env::var("SPG_RAIL_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SPG_RAIL_TIMEOUT ({s}): {e}. Using the default"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let sats_per_euro = match std::env::var("SPG_SATS_PER_EURO").ok().map(|s| s.parse::<f64>()) {
            Some(Ok(rate)) if rate.is_finite() && rate > 0.0 => Some(rate),
            Some(_) => {
                error!("🪛️ SPG_SATS_PER_EURO must be a positive number. Lightning invoices cannot be priced");
                None
            },
            None => {
                if lnbits.is_some() {
                    warn!("🪛️ SPG_SATS_PER_EURO is not set. Lightning invoices cannot be priced");
                }
                None
            },
        };
        Self { mollie, lnbits, public_url, request_timeout, sats_per_euro }
    }

    pub fn webhook_url(&self, rail: &str) -> String {
        format!("{}/webhooks/settlement?rail={rail}", self.public_url)
    }

    pub fn redirect_url(&self, order_id: &str) -> String {
        let mut url = format!("{}/thanks", self.public_url);
        url.push_str("?order=");
        url.push_str(&url::form_urlencoded::byte_serialize(order_id.as_bytes()).collect::<String>());
        url
    }
}
