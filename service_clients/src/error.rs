use payflow_engine::traits::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceClientError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid request: {0}")]
    RequestError(String),
    #[error("Could not reach the service: {0}")]
    ConnectionError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The service returned an empty response")]
    EmptyResponse,
}

impl From<ServiceClientError> for ServiceError {
    fn from(e: ServiceClientError) -> Self {
        match e {
            ServiceClientError::QueryError { status: 404, message } => ServiceError::NotFound(message),
            ServiceClientError::QueryError { status, message } => ServiceError::Rejected { status, message },
            ServiceClientError::Initialization(s) |
            ServiceClientError::RequestError(s) |
            ServiceClientError::ConnectionError(s) => ServiceError::Unavailable(s),
            ServiceClientError::JsonError(s) => ServiceError::InvalidResponse(s),
            ServiceClientError::EmptyResponse => ServiceError::InvalidResponse("empty response".into()),
        }
    }
}
