use thiserror::Error;

use crate::{
    order_types::{Alias, OrderId},
    traits::RailError,
};

/// An order request failed validation. The message is meant for the customer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Alias {alias} is already bound to order {existing}. It cannot be rebound to order {requested}")]
pub struct AliasConflictError {
    pub alias: Alias,
    pub existing: OrderId,
    pub requested: OrderId,
}

/// Failures of the key-value store underneath the engine components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Key-value store error: {0}")]
    Backend(String),
    #[error("The value stored under {key} could not be read. {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Gave up updating {0} after repeated concurrent modifications")]
    Contention(String),
    #[error("Order {0} does not exist (or has expired from working storage)")]
    OrderNotFound(OrderId),
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),
}

impl StorageError {
    pub fn backend<E: std::error::Error>(e: E) -> Self {
        Self::Backend(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityIndexError {
    #[error(transparent)]
    AliasConflict(#[from] AliasConflictError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error("The payment provider is unavailable. {0}")]
    ProviderUnavailable(String),
    #[error("The payment provider rejected the payment request. {0}")]
    ProviderRejected(String),
    #[error(transparent)]
    AliasConflict(#[from] AliasConflictError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<IdentityIndexError> for IssueError {
    fn from(e: IdentityIndexError) -> Self {
        match e {
            IdentityIndexError::AliasConflict(c) => Self::AliasConflict(c),
            IdentityIndexError::Storage(s) => Self::Storage(s),
        }
    }
}

impl From<RailError> for IssueError {
    fn from(e: RailError) -> Self {
        match e {
            RailError::Rejected(msg) => Self::ProviderRejected(msg),
            e => Self::ProviderUnavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureInvalidError {
    #[error("The push notification carries no signature")]
    Missing,
    #[error("The push notification signature does not match")]
    Mismatch,
}

/// Internal failures while applying a settlement. These never reach the rail that sent the push.
#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Settlement lookup failed. {0}")]
    Lookup(#[from] RailError),
    #[error("Settlement lookup timed out")]
    LookupTimeout,
}

impl SettlementError {
    /// Whether trying again later could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Storage(StorageError::OrderNotFound(_)) | Self::Storage(StorageError::Corrupt { .. }))
    }
}

impl From<IdentityIndexError> for SettlementError {
    fn from(e: IdentityIndexError) -> Self {
        match e {
            IdentityIndexError::Storage(s) => Self::Storage(s),
            // resolution never registers, so a conflict here means someone wired things up wrongly
            IdentityIndexError::AliasConflict(c) => Self::Storage(StorageError::Backend(c.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Issue(#[from] IssueError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
