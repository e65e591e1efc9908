use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use spg_engine::{IssueError, OrderFlowError, SignatureInvalidError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("The payment provider could not create a payment. {0}")]
    PaymentProviderError(String),
    #[error("Invalid webhook signature. {0}")]
    InvalidSignature(#[from] SignatureInvalidError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::Validation(v) => Self::ValidationError(v.to_string()),
            OrderFlowError::Issue(IssueError::ProviderUnavailable(msg)) => Self::PaymentProviderError(msg),
            OrderFlowError::Issue(IssueError::ProviderRejected(msg)) => Self::PaymentProviderError(msg),
            OrderFlowError::Issue(IssueError::AliasConflict(c)) => {
                error!("💻️ The payment provider reused an identifier. {c}");
                Self::BackendError("The payment could not be registered".into())
            },
            OrderFlowError::Issue(IssueError::Storage(e)) | OrderFlowError::Storage(e) => e.into(),
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(e: StorageError) -> Self {
        error!("💻️ Storage failure. {e}");
        Self::BackendError(e.to_string())
    }
}
