//! # Push payload normalization
//!
//! Every rail describes a settled payment differently. LNbits posts the full payment object, Alby Hub uses `settled`
//! or `state`, and Mollie only posts the payment id (form-encoded) and expects you to ask for the status.
//!
//! Instead of probing fields ad hoc in code, each rail has a [`FieldMapping`]: the ordered list of payload fields that
//! may carry an alias, and a [`SettledSource`] saying where the settled/unsettled determination comes from. The
//! mappings are plain data ([`FieldMappings`] deserializes from JSON), and [`FieldMappings::normalize`] is the only
//! place that interprets a payload.
//!
//! Field names may be dotted paths (`data.payment_hash`) to reach into nested objects.
use std::collections::HashMap;

use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::order_types::{Alias, PaymentMethod};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    #[error("No field mapping is configured for {0}")]
    NoMapping(PaymentMethod),
    #[error("The payload is neither a JSON object nor a form-encoded body")]
    UnreadablePayload,
}

/// A payload field and the values that indicate a settled payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledRule {
    pub field: String,
    pub equals: Vec<Value>,
}

impl SettledRule {
    pub fn new<S: Into<String>>(field: S, equals: Vec<Value>) -> Self {
        Self { field: field.into(), equals }
    }

    fn matches(&self, payload: &Map<String, Value>) -> bool {
        lookup(payload, &self.field).map(|v| self.equals.contains(v)).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettledSource {
    /// The payload itself says whether the payment settled. Any matching rule means "settled".
    Payload { rules: Vec<SettledRule> },
    /// The payload only identifies the payment; the rail must be asked for the status.
    RailLookup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Fields that may hold an alias, in order of preference.
    pub alias_fields: Vec<String>,
    pub settled: SettledSource,
}

impl FieldMapping {
    pub fn lightning() -> Self {
        Self {
            alias_fields: ["payment_hash", "checking_id", "r_hash", "hash", "payment_request", "bolt11"]
                .into_iter()
                .map(String::from)
                .collect(),
            settled: SettledSource::Payload {
                rules: vec![
                    SettledRule::new("settled", vec![Value::Bool(true)]),
                    SettledRule::new("paid", vec![Value::Bool(true)]),
                    SettledRule::new("state", vec![Value::from("SETTLED")]),
                    SettledRule::new("status", vec![Value::from("settled"), Value::from("SETTLED")]),
                ],
            },
        }
    }

    pub fn ideal() -> Self {
        Self { alias_fields: vec!["id".into()], settled: SettledSource::RailLookup }
    }
}

/// A push event reduced to what the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub payment_method: PaymentMethod,
    /// Every distinct alias found in the payload, in mapping order. May be empty.
    pub aliases: Vec<Alias>,
    /// `None` when the settled state has to be looked up from the rail.
    pub settled: Option<bool>,
}

/// The per-rail lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMappings {
    mappings: HashMap<PaymentMethod, FieldMapping>,
}

impl Default for FieldMappings {
    fn default() -> Self {
        let mut mappings = HashMap::new();
        mappings.insert(PaymentMethod::Lightning, FieldMapping::lightning());
        mappings.insert(PaymentMethod::Ideal, FieldMapping::ideal());
        Self { mappings }
    }
}

impl FieldMappings {
    pub fn get(&self, method: PaymentMethod) -> Option<&FieldMapping> {
        self.mappings.get(&method)
    }

    pub fn with_mapping(mut self, method: PaymentMethod, mapping: FieldMapping) -> Self {
        self.mappings.insert(method, mapping);
        self
    }

    pub fn normalize(&self, method: PaymentMethod, raw: &[u8]) -> Result<NormalizedEvent, NormalizationError> {
        let mapping = self.get(method).ok_or(NormalizationError::NoMapping(method))?;
        let payload = parse_payload(raw)?;
        let mut aliases: Vec<Alias> = Vec::with_capacity(mapping.alias_fields.len());
        for field in &mapping.alias_fields {
            match lookup(&payload, field) {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    let alias = Alias::from(s.trim());
                    if !aliases.contains(&alias) {
                        aliases.push(alias);
                    }
                },
                Some(Value::Null) | None => {},
                Some(v) => trace!("🔄️ Ignoring non-string value in alias field {field}: {v}"),
            }
        }
        let settled = match &mapping.settled {
            SettledSource::Payload { rules } => Some(rules.iter().any(|r| r.matches(&payload))),
            SettledSource::RailLookup => None,
        };
        Ok(NormalizedEvent { payment_method: method, aliases, settled })
    }
}

fn parse_payload(raw: &[u8]) -> Result<Map<String, Value>, NormalizationError> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(NormalizationError::UnreadablePayload),
        Err(_) => {
            // Mollie (and others) post `application/x-www-form-urlencoded` bodies
            let text = std::str::from_utf8(raw).map_err(|_| NormalizationError::UnreadablePayload)?;
            if text.trim().is_empty() || !text.contains('=') {
                return Err(NormalizationError::UnreadablePayload);
            }
            let map = url::form_urlencoded::parse(text.trim().as_bytes())
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect::<Map<String, Value>>();
            Ok(map)
        },
    }
}

fn lookup<'a>(payload: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    parts.try_fold(payload.get(first)?, |value, part| value.as_object().and_then(|o| o.get(part)))
}
