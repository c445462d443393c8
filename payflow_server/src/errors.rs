use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use payflow_engine::{identity::IdentityError, NotificationApiError, PaymentApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("No caller identity was provided")]
    MissingIdentity,
    #[error("Invalid caller identity. {0}")]
    InvalidIdentity(#[from] IdentityError),
    #[error("The caller identity does not carry a user id")]
    AnonymousCaller,
    #[error("The gateway notification signature is missing or invalid")]
    InvalidSignature,
    #[error("{0}")]
    PaymentError(#[from] PaymentApiError),
    #[error("{0}")]
    NotificationError(#[from] NotificationApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidQueryParameter(_) => StatusCode::BAD_REQUEST,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
            Self::AnonymousCaller => StatusCode::FORBIDDEN,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::PaymentError(e) => match e {
                PaymentApiError::AlreadyExists(_) => StatusCode::CONFLICT,
                PaymentApiError::InvalidPaymentMethod(_) => StatusCode::BAD_REQUEST,
                PaymentApiError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                PaymentApiError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
                PaymentApiError::NotFound(_) => StatusCode::NOT_FOUND,
                PaymentApiError::Forbidden => StatusCode::FORBIDDEN,
                PaymentApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
                PaymentApiError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PaymentApiError::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
            },
            Self::NotificationError(e) => match e {
                NotificationApiError::NotFound(_) => StatusCode::NOT_FOUND,
                NotificationApiError::Forbidden => StatusCode::FORBIDDEN,
                NotificationApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
