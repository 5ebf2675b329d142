use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, error};

use crate::error::{ApiErrorCode, ApiOperation, AppError, AppResult};

static BEST_LOCATION_SCHEMA: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["best_building", "occupancy"],
        "properties": {
            "best_building": { "type": "string" },
            "occupancy": { "type": "number" }
        }
    })
});

static CURRENT_OCCUPANCIES_SCHEMA: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["building"],
            "properties": {
                "building": { "type": "string" },
                "percent_occupied": { "type": ["number", "null"] }
            }
        }
    })
});

static UPLOAD_IMAGE_SCHEMA: Lazy<JsonValue> = Lazy::new(|| {
    json!({
        "type": "object",
        "required": ["percent_occupied"],
        "properties": {
            "percent_occupied": { "type": "number" }
        }
    })
});

type CompiledSchema = Result<JSONSchema, String>;

static BEST_LOCATION_VALIDATOR: Lazy<CompiledSchema> =
    Lazy::new(|| compile(ApiOperation::BestLocation));
static CURRENT_OCCUPANCIES_VALIDATOR: Lazy<CompiledSchema> =
    Lazy::new(|| compile(ApiOperation::CurrentOccupancies));
static UPLOAD_IMAGE_VALIDATOR: Lazy<CompiledSchema> =
    Lazy::new(|| compile(ApiOperation::UploadImage));

fn compile(operation: ApiOperation) -> CompiledSchema {
    JSONSchema::compile(schema_for(operation)).map_err(|err| err.to_string())
}

pub fn schema_for(operation: ApiOperation) -> &'static JsonValue {
    match operation {
        ApiOperation::BestLocation => &*BEST_LOCATION_SCHEMA,
        ApiOperation::CurrentOccupancies => &*CURRENT_OCCUPANCIES_SCHEMA,
        ApiOperation::UploadImage => &*UPLOAD_IMAGE_SCHEMA,
    }
}

/// Compiled once per process on first use.
fn validator_for(operation: ApiOperation) -> &'static CompiledSchema {
    match operation {
        ApiOperation::BestLocation => &*BEST_LOCATION_VALIDATOR,
        ApiOperation::CurrentOccupancies => &*CURRENT_OCCUPANCIES_VALIDATOR,
        ApiOperation::UploadImage => &*UPLOAD_IMAGE_VALIDATOR,
    }
}

/// Checks a response body against the operation's schema, then deserializes it.
///
/// Any mismatch is reported as `MALFORMED_PAYLOAD`.
pub fn decode_response<T: DeserializeOwned>(
    operation: ApiOperation,
    body: JsonValue,
    correlation_id: &str,
) -> AppResult<T> {
    validate_response(operation, &body, correlation_id)?;

    serde_json::from_value(body).map_err(|err| {
        AppError::api_with_details(
            ApiErrorCode::MalformedPayload,
            operation,
            format!("{operation} response could not be decoded: {err}"),
            None,
            Some(correlation_id),
            None,
        )
    })
}

pub fn validate_response(
    operation: ApiOperation,
    body: &JsonValue,
    correlation_id: &str,
) -> AppResult<()> {
    let schema = match validator_for(operation) {
        Ok(schema) => schema,
        Err(e) => {
            error!(
                target: "app::api",
                operation = %operation,
                error = %e,
                "Failed to compile response schema"
            );
            return Err(AppError::other(format!(
                "invalid response schema for {operation}: {e}"
            )));
        }
    };

    if let Err(validation_errors) = schema.validate(body) {
        let error_messages: Vec<String> = validation_errors
            .map(|e| {
                let path = e.instance_path.to_string();
                let path_display = if path.is_empty() {
                    "root".to_string()
                } else {
                    path
                };
                format!("{}: {}", path_display, e)
            })
            .collect();

        return Err(AppError::api_with_details(
            ApiErrorCode::MalformedPayload,
            operation,
            format!("{operation} response does not match the expected shape"),
            None,
            Some(correlation_id),
            Some(json!({ "errors": error_messages })),
        ));
    }

    debug!(
        target: "app::api",
        operation = %operation,
        correlation_id = %correlation_id,
        "response matched schema"
    );

    Ok(())
}
