use thiserror::Error;

use crate::cache::transport::TransportError;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    RfcError(#[from] koyomi_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] koyomi_core::error::CoreError),

    #[error(transparent)]
    TransportError(#[from] TransportError),

    #[error("Refresh task failed: {0}")]
    JoinError(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
