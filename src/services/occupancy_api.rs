use std::time::{Duration as StdDuration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiErrorCode, ApiOperation, AppError, AppResult};
use crate::models::occupancy::{ImageOccupancy, OccupancyRecord, Recommendation};
use crate::models::upload::ImageUpload;
use crate::services::response_schema::decode_response;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BOOKING_URL: &str = "https://calendar.lib.usf.edu/spaces";
const IMAGE_FIELD: &str = "image";

/// Contract of the remote occupancy service.
#[async_trait::async_trait]
pub trait OccupancyApi: Send + Sync {
    async fn best_location(&self) -> AppResult<Recommendation>;

    async fn current_occupancies(&self) -> AppResult<Vec<OccupancyRecord>>;

    async fn upload_image(&self, image: &ImageUpload) -> AppResult<ImageOccupancy>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_base_url: String,
    /// `None` leaves requests unbounded.
    pub http_timeout: Option<StdDuration>,
    pub booking_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: None,
            booking_url: DEFAULT_BOOKING_URL.to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("JETT_API_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let booking_url = std::env::var("JETT_BOOKING_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BOOKING_URL.to_string());

        let http_timeout = match std::env::var("JETT_API_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(StdDuration::from_secs(secs)),
                Err(err) => {
                    warn!(
                        target: "app::api",
                        value = %raw,
                        error = %err,
                        "ignoring invalid JETT_API_TIMEOUT_SECS"
                    );
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            http_timeout,
            booking_url: booking_url.trim().to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }
}

/// reqwest-backed client for the occupancy service.
pub struct HttpOccupancyApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOccupancyApi {
    pub fn try_new(config: &ApiConfig) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)));
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|err| AppError::other(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, operation: ApiOperation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: ApiOperation) -> AppResult<T> {
        let correlation_id = Uuid::new_v4().to_string();
        debug!(
            target: "app::api",
            operation = %operation,
            correlation_id = %correlation_id,
            "requesting occupancy service"
        );

        let start = Instant::now();
        let response = self.client.get(self.endpoint(operation)).send().await;
        self.read_response(operation, &correlation_id, start, response)
            .await
    }

    async fn read_response<T: DeserializeOwned>(
        &self,
        operation: ApiOperation,
        correlation_id: &str,
        start: Instant,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> AppResult<T> {
        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                let error = Self::error_from_reqwest(err, operation, correlation_id);
                warn!(
                    target: "app::api",
                    operation = %operation,
                    correlation_id = %correlation_id,
                    "occupancy service request failed"
                );
                return Err(error);
            }
        };

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis();
        if !status.is_success() {
            warn!(
                target: "app::api",
                operation = %operation,
                correlation_id = %correlation_id,
                status = status.as_u16(),
                latency_ms,
                "occupancy service returned non-success status"
            );
            return Err(Self::map_http_error(status, operation, correlation_id));
        }

        let text = resp
            .text()
            .await
            .map_err(|err| Self::error_from_reqwest(err, operation, correlation_id))?;

        debug!(
            target: "app::api",
            operation = %operation,
            correlation_id = %correlation_id,
            latency_ms,
            content_length = text.len(),
            "occupancy service responded"
        );

        let body: JsonValue = serde_json::from_str(&text).map_err(|err| {
            AppError::api_with_details(
                ApiErrorCode::MalformedPayload,
                operation,
                format!("{operation} response is not valid JSON"),
                Some(status.as_u16()),
                Some(correlation_id),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;

        decode_response(operation, body, correlation_id)
    }

    fn map_http_error(status: StatusCode, operation: ApiOperation, correlation_id: &str) -> AppError {
        let message = match status {
            status if status.is_server_error() => format!(
                "occupancy service unavailable during {operation} (status {})",
                status.as_u16()
            ),
            StatusCode::NOT_FOUND => format!("{operation} endpoint not found"),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                format!("occupancy service rejected {operation} request")
            }
            status => format!(
                "occupancy service returned status {} for {operation}",
                status.as_u16()
            ),
        };

        AppError::api_with_details(
            ApiErrorCode::HttpStatus,
            operation,
            message,
            Some(status.as_u16()),
            Some(correlation_id),
            None,
        )
    }

    fn error_from_reqwest(
        err: reqwest::Error,
        operation: ApiOperation,
        correlation_id: &str,
    ) -> AppError {
        if err.is_timeout() {
            AppError::api_with_details(
                ApiErrorCode::HttpTimeout,
                operation,
                format!("{operation} request timed out"),
                None,
                Some(correlation_id),
                None,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, operation, correlation_id)
        } else if err.is_decode() {
            AppError::api_with_details(
                ApiErrorCode::MalformedPayload,
                operation,
                format!("{operation} response body could not be read: {err}"),
                None,
                Some(correlation_id),
                None,
            )
        } else {
            AppError::api_with_details(
                ApiErrorCode::NetworkFailure,
                operation,
                format!("{operation} request failed: {err}"),
                None,
                Some(correlation_id),
                Some(json!({ "connect": err.is_connect() })),
            )
        }
    }

    fn build_upload_form(image: &ImageUpload) -> AppResult<Form> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|err| {
                AppError::validation(format!(
                    "invalid image content type '{}': {err}",
                    image.mime_type
                ))
            })?;

        Ok(Form::new().part(IMAGE_FIELD, part))
    }
}

#[async_trait::async_trait]
impl OccupancyApi for HttpOccupancyApi {
    async fn best_location(&self) -> AppResult<Recommendation> {
        self.get_json(ApiOperation::BestLocation).await
    }

    async fn current_occupancies(&self) -> AppResult<Vec<OccupancyRecord>> {
        self.get_json(ApiOperation::CurrentOccupancies).await
    }

    async fn upload_image(&self, image: &ImageUpload) -> AppResult<ImageOccupancy> {
        let operation = ApiOperation::UploadImage;
        let correlation_id = Uuid::new_v4().to_string();
        let form = Self::build_upload_form(image)?;

        debug!(
            target: "app::api",
            operation = %operation,
            correlation_id = %correlation_id,
            file_name = %image.file_name,
            size = image.len(),
            "uploading image"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(operation))
            .multipart(form)
            .send()
            .await;
        self.read_response(operation, &correlation_id, start, response)
            .await
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the public API surface.
    pub fn map_http_error(status: StatusCode, operation: ApiOperation) -> AppError {
        HttpOccupancyApi::map_http_error(status, operation, "test-correlation-id")
    }
}
