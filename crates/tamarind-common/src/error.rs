//! Error types and error codes for Tamarind
//!
//! This module defines:
//! - `TamarindError`: the typed error every service operation returns
//! - `ErrorCode`: structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Service-level error kinds
///
/// Storage faults never surface with their raw cause; services log the cause
/// and return `Internal` with a short operation description.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TamarindError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Ciphertext failed authentication or could not be decoded.
    ///
    /// Carries no detail so that callers cannot distinguish tampering from
    /// a wrong key.
    #[error("integrity check failed")]
    Integrity,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TamarindError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TamarindError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        TamarindError::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        TamarindError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        TamarindError::Internal(msg.into())
    }

    /// Maps the error kind onto its API error code
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            TamarindError::Validation(_) => PARAMETER_VALIDATE_ERROR,
            TamarindError::NotFound(_) => RESOURCE_NOT_FOUND,
            TamarindError::Conflict(_) => RESOURCE_CONFLICT,
            TamarindError::Integrity => INTEGRITY_ERROR,
            TamarindError::Configuration(_) => CONFIGURATION_ERROR,
            TamarindError::Delivery(_) => DELIVERY_ERROR,
            TamarindError::Internal(_) => SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TamarindError::NotFound(_))
    }
}

/// Result alias used by the service crates
pub type Result<T> = std::result::Result<T, TamarindError>;

/// Error code structure for API responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

// Validation and lookup errors
pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

// Secret handling
pub const INTEGRITY_ERROR: ErrorCode<'static> = ErrorCode {
    code: 21001,
    message: "ciphertext integrity check failed",
};

pub const CONFIGURATION_ERROR: ErrorCode<'static> = ErrorCode {
    code: 21002,
    message: "server configuration error",
};

// Watch delivery
pub const DELIVERY_ERROR: ErrorCode<'static> = ErrorCode {
    code: 22001,
    message: "webhook delivery failed",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
