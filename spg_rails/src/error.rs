use spg_engine::traits::RailError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RailApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<RailApiError> for RailError {
    fn from(e: RailApiError) -> Self {
        match e {
            RailApiError::Initialization(msg) => RailError::NotConfigured(msg),
            RailApiError::RestRequestError(msg) => RailError::Unavailable(msg),
            RailApiError::JsonError(msg) => RailError::InvalidResponse(msg),
            RailApiError::QueryError { status, message } if (400..500).contains(&status) && status != 429 => {
                RailError::Rejected(format!("{status}: {message}"))
            },
            RailApiError::QueryError { status, message } => RailError::Unavailable(format!("{status}: {message}")),
            RailApiError::InvalidAmount(msg) => RailError::Rejected(msg),
        }
    }
}
