use axum::body::Bytes;
use axum::extract::{Path, State};
use livy_common::Configuration;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::response::{ApiError, ApiResponse};
use crate::state::SharedState;
use crate::validation::ConfigurationPayload;

type ApiResult<T> = std::result::Result<ApiResponse<T>, ApiError>;

/// `GET /api/configuration`
pub async fn list_configurations(
    State(state): State<SharedState>,
) -> ApiResult<Vec<Configuration>> {
    let entries = state.service.list().await?;
    Ok(ApiResponse::ok("", entries))
}

/// `GET /api/configuration/{configname}`
///
/// An unknown name answers 200 with an empty entry rather than 404.
pub async fn get_configuration(
    State(state): State<SharedState>,
    Path(configname): Path<String>,
) -> ApiResult<Configuration> {
    fetch_by_name(&state, &configname).await
}

/// `GET /api/configuration/create`
///
/// The static create path shadows `{configname}`, so reads of an entry
/// literally named `create` land here.
pub async fn get_named_create(State(state): State<SharedState>) -> ApiResult<Configuration> {
    fetch_by_name(&state, CREATE_SEGMENT).await
}

const CREATE_SEGMENT: &str = "create";

async fn fetch_by_name(state: &SharedState, name: &str) -> ApiResult<Configuration> {
    let entry = state.service.get(name).await?.unwrap_or_default();
    if entry.is_empty() {
        debug!(name, "no configuration matched");
    }
    Ok(ApiResponse::ok("", entry))
}

/// `POST /api/configuration/create`
pub async fn create_configuration(
    State(state): State<SharedState>,
    body: Bytes,
) -> ApiResult<Configuration> {
    let payload = decode_payload(&body)?;
    let created = state.service.create(&payload.name, &payload.value).await?;
    info!(id = %created.id, name = %created.name, "configuration created");
    Ok(ApiResponse::ok("Configuration Created Successfully", created))
}

/// `PUT /api/configuration/update/{id}`
pub async fn update_configuration(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let payload = decode_payload(&body)?;
    let updated = state
        .service
        .update(&id, &payload.name, &payload.value)
        .await?;
    info!(%id, updated, "configuration updated");
    Ok(ApiResponse::ok(
        "Configuration Updated Successfully",
        json!({ "updated": updated }),
    ))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

fn decode_payload(body: &[u8]) -> Result<ConfigurationPayload, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Invalid Body Request: body is empty"));
    }
    let payload: ConfigurationPayload = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON Format: {e}")))?;
    Ok(payload.validated()?)
}

#[cfg(test)]
mod tests {
    use super::decode_payload;
    use axum::http::StatusCode;

    #[test]
    fn decode_reports_bad_requests() {
        assert_eq!(decode_payload(b"").unwrap_err().status, StatusCode::BAD_REQUEST);

        let err = decode_payload(b"{not json").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Invalid JSON Format"));

        let err = decode_payload(br#"{"name": 5, "value": "x"}"#).unwrap_err();
        assert!(err.message.starts_with("Invalid JSON Format"));

        let err = decode_payload(br#"{"name": "", "value": "x"}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("name cannot be empty"));
    }

    #[test]
    fn decode_accepts_valid_payload() {
        let payload = decode_payload(br#"{"name": "x", "value": "1"}"#).unwrap();
        assert_eq!(payload.name, "x");
        assert_eq!(payload.value, "1");
    }
}
