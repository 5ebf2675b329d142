pub mod session;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::{error, warn};

use crate::error::{AppError, AppResult};
use crate::services::notifier::Notifier;
use crate::services::occupancy_api::{ApiConfig, HttpOccupancyApi, OccupancyApi};
use crate::services::session_service::SessionService;

#[derive(Clone)]
pub struct AppState {
    config: ApiConfig,
    session_service: Arc<SessionService>,
}

impl AppState {
    pub fn new(config: ApiConfig, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        let api: Arc<dyn OccupancyApi> = Arc::new(HttpOccupancyApi::try_new(&config)?);
        Ok(Self::with_api(config, api, notifier))
    }

    pub fn with_api(
        config: ApiConfig,
        api: Arc<dyn OccupancyApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session_service = Arc::new(SessionService::new(api, notifier));
        Self {
            config,
            session_service,
        }
    }

    pub fn session(&self) -> Arc<SessionService> {
        Arc::clone(&self.session_service)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation { message, details } => {
                CommandError::new("VALIDATION_ERROR", message, details)
            }
            AppError::Api {
                code,
                operation,
                message,
                status,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                merged.insert("operation".to_string(), json!(operation.as_str()));
                if let Some(status) = status {
                    merged.insert("status".to_string(), json!(status));
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                CommandError::new(code.as_str(), message, Some(JsonValue::Object(merged)))
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Io(error) => {
                warn!(target: "app::command", error = %error, "io error in command");
                CommandError::new("IO_ERROR", error.to_string(), None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}
