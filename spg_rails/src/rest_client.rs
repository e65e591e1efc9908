use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::RailApiError;

/// A JSON REST client bound to one provider's base URL and credentials.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    client: Arc<Client>,
}

impl RestClient {
    pub fn new(base_url: &str, auth_header: (&'static str, String), timeout: Duration) -> Result<Self, RailApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let (name, value) = auth_header;
        let mut val = HeaderValue::from_str(&value).map_err(|e| RailApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(name, val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RailApiError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, RailApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| RailApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| RailApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| RailApiError::RestRequestError(e.to_string()))?;
            Err(RailApiError::QueryError { status, message })
        }
    }
}
