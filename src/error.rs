use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    NetworkFailure,
    HttpTimeout,
    HttpStatus,
    MalformedPayload,
}

impl ApiErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorCode::NetworkFailure => "NETWORK_FAILURE",
            ApiErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            ApiErrorCode::HttpStatus => "HTTP_STATUS",
            ApiErrorCode::MalformedPayload => "MALFORMED_PAYLOAD",
        }
    }

    /// Transport failures never produced a response to inspect.
    pub fn is_transport(self) -> bool {
        matches!(self, ApiErrorCode::NetworkFailure | ApiErrorCode::HttpTimeout)
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote operations exposed by the occupancy service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    BestLocation,
    CurrentOccupancies,
    UploadImage,
}

impl ApiOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiOperation::BestLocation => "bestLocation",
            ApiOperation::CurrentOccupancies => "currentOccupancies",
            ApiOperation::UploadImage => "uploadImage",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            ApiOperation::BestLocation => "/api/best-location",
            ApiOperation::CurrentOccupancies => "/api/current-occupancies",
            ApiOperation::UploadImage => "/api/upload-image",
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Api {
        code: ApiErrorCode,
        operation: ApiOperation,
        message: String,
        status: Option<u16>,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn api(code: ApiErrorCode, operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::api_with_details(code, operation, message, None, None, None)
    }

    pub fn api_with_details(
        code: ApiErrorCode,
        operation: ApiOperation,
        message: impl Into<String>,
        status: Option<u16>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        warn!(
            target: "app::api::error",
            code = %code,
            operation = %operation,
            status = ?status,
            correlation_id = ?correlation,
            details = ?details,
            %message
        );

        AppError::Api {
            code,
            operation,
            message,
            status,
            correlation_id: correlation,
            details,
        }
    }

    pub fn api_code(&self) -> Option<ApiErrorCode> {
        match self {
            AppError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn api_operation(&self) -> Option<ApiOperation> {
        match self {
            AppError::Api { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn api_status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn api_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Api { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn api_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}
