use std::{collections::HashMap, env, fs, path::PathBuf, str::FromStr, time::Duration};

use log::*;
use spg_common::{helpers::parse_boolean_flag, Secret};
use spg_engine::{
    catalog::Catalog,
    helpers::{FieldMapping, FieldMappings},
    order_types::{PaymentMethod, SettlementStatus},
    SettlementConfig,
};
use spg_rails::RailsConfig;

use crate::errors::ServerError;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8360;
const DEFAULT_SIGNATURE_HEADER: &str = "X-Webhook-Signature";
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// What a poll reports when nothing is known about an alias.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownStatusPolicy {
    /// Report `unknown` and let the client decide.
    #[default]
    Report,
    /// Report `unknown` as `pending`, for clients that cannot handle a third state.
    Pending,
}

impl UnknownStatusPolicy {
    pub fn apply(self, status: SettlementStatus) -> SettlementStatus {
        match (self, status) {
            (Self::Pending, SettlementStatus::Unknown) => SettlementStatus::Pending,
            (_, status) => status,
        }
    }
}

impl FromStr for UnknownStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "pending" => Ok(Self::Pending),
            other => Err(format!("'{other}' is not a valid unknown-status policy. Use 'report' or 'pending'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, the working state is kept in this SQLite database. Otherwise it lives in memory and is lost on restart.
    pub database_url: Option<String>,
    /// The request header that carries push signatures.
    pub signature_header: String,
    /// The rail assumed for pushes that do not name one in the `rail` query parameter.
    pub default_rail: PaymentMethod,
    pub unknown_status_policy: UnknownStatusPolicy,
    /// How often expired entries are purged from the store.
    pub sweep_interval: Duration,
    pub catalog_file: Option<PathBuf>,
    pub field_mapping_file: Option<PathBuf>,
    pub settlement: SettlementConfig,
    pub rails: RailsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            default_rail: PaymentMethod::Lightning,
            unknown_status_policy: UnknownStatusPolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            catalog_file: None,
            field_mapping_file: None,
            settlement: SettlementConfig::default(),
            rails: RailsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        if database_url.is_none() {
            warn!("🪛️ SPG_DATABASE_URL is not set. Working state is kept in memory and will be lost on restart.");
        }
        let signature_header = env::var("SPG_SIGNATURE_HEADER").unwrap_or_else(|_| DEFAULT_SIGNATURE_HEADER.into());
        let default_rail = env::var("SPG_DEFAULT_RAIL")
            .ok()
            .and_then(|s| {
                s.parse::<PaymentMethod>()
                    .map_err(|e| warn!("🪛️ Invalid SPG_DEFAULT_RAIL. {e}. Using {}", defaults.default_rail))
                    .ok()
            })
            .unwrap_or(defaults.default_rail);
        let unknown_status_policy = env::var("SPG_UNKNOWN_STATUS_POLICY")
            .ok()
            .and_then(|s| s.parse::<UnknownStatusPolicy>().map_err(|e| warn!("🪛️ {e}. Reporting 'unknown'.")).ok())
            .unwrap_or_default();
        let sweep_interval = seconds_from_env("SPG_SWEEP_INTERVAL", DEFAULT_SWEEP_INTERVAL);
        let catalog_file = env::var("SPG_CATALOG_FILE").ok().map(PathBuf::from);
        let field_mapping_file = env::var("SPG_FIELD_MAPPING_FILE").ok().map(PathBuf::from);
        let settlement = settlement_config_from_env();
        let rails = RailsConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            signature_header,
            default_rail,
            unknown_status_policy,
            sweep_interval,
            catalog_file,
            field_mapping_file,
            settlement,
            rails,
        }
    }

    /// The product catalog, from `catalog_file` if one is configured.
    pub fn catalog(&self) -> Result<Catalog, ServerError> {
        match &self.catalog_file {
            Some(path) => {
                let catalog: Catalog = read_json_file(path)?;
                if catalog.is_empty() {
                    return Err(ServerError::ConfigurationError(format!("The catalog in {} is empty", path.display())));
                }
                info!("🪛️ Loaded the product catalog from {}", path.display());
                Ok(catalog)
            },
            None => {
                info!("🪛️ SPG_CATALOG_FILE is not set. Using the built-in catalog.");
                Ok(Catalog::default())
            },
        }
    }

    /// The push payload mappings, from `field_mapping_file` if one is configured. Rails missing from the file keep
    /// their built-in mapping.
    pub fn field_mappings(&self) -> Result<FieldMappings, ServerError> {
        let Some(path) = &self.field_mapping_file else {
            return Ok(self.settlement.field_mappings.clone());
        };
        let overrides: HashMap<PaymentMethod, FieldMapping> = read_json_file(path)?;
        info!("🪛️ Loaded field mappings for {} rail(s) from {}", overrides.len(), path.display());
        let mappings = overrides
            .into_iter()
            .fold(self.settlement.field_mappings.clone(), |mappings, (method, mapping)| {
                mappings.with_mapping(method, mapping)
            });
        Ok(mappings)
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. Secrets stay out of it.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub signature_header: String,
    pub default_rail: PaymentMethod,
    pub unknown_status_policy: UnknownStatusPolicy,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            signature_header: config.signature_header.clone(),
            default_rail: config.default_rail,
            unknown_status_policy: config.unknown_status_policy,
        }
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, ServerError> {
    let data = fs::read_to_string(path)
        .map_err(|e| ServerError::ConfigurationError(format!("Could not read {}. {e}", path.display())))?;
    serde_json::from_str(&data)
        .map_err(|e| ServerError::ConfigurationError(format!("{} is not valid. {e}", path.display())))
}

fn settlement_config_from_env() -> SettlementConfig {
    let defaults = SettlementConfig::default();
    let webhook_secret = match env::var("SPG_WEBHOOK_SECRET") {
        Ok(s) if !s.trim().is_empty() => Some(Secret::new(s.trim().to_string())),
        _ => {
            warn!("🪛️ SPG_WEBHOOK_SECRET is not set. Push notifications will not be authenticated.");
            None
        },
    };
    let retry_attempts = env::var("SPG_RETRY_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse::<u32>().map_err(|e| warn!("🪛️ Invalid SPG_RETRY_ATTEMPTS ({s}). {e}")).ok())
        .unwrap_or(defaults.retry_attempts);
    let poll_lookup = parse_boolean_flag(env::var("SPG_POLL_LOOKUP").ok(), false);
    SettlementConfig {
        alias_ttl: seconds_from_env("SPG_ALIAS_TTL", defaults.alias_ttl),
        status_ttl: seconds_from_env("SPG_STATUS_TTL", defaults.status_ttl),
        paid_retention: seconds_from_env("SPG_PAID_RETENTION", defaults.paid_retention),
        claim_ttl: seconds_from_env("SPG_CLAIM_TTL", defaults.claim_ttl),
        order_retention: seconds_from_env("SPG_ORDER_RETENTION", defaults.order_retention),
        rail_timeout: seconds_from_env("SPG_RAIL_TIMEOUT", defaults.rail_timeout),
        retry_attempts,
        webhook_secret,
        poll_lookup,
        ..defaults
    }
}

/// Reads a duration given in whole seconds. Zero and unparseable values fall back to the default.
fn seconds_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => match s.trim().parse::<u64>() {
            Ok(0) => {
                warn!("🪛️ {name} must be positive. Using the default value of {}s.", default.as_secs());
                default
            },
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default of {}s.", default.as_secs());
                default
            },
        },
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default value of {}s.", default.as_secs());
            default
        },
    }
}
