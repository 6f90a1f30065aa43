//! REST API handlers.
//!
//! Each handler forwards to the controller or its signal coordinator and
//! returns JSON in the `{success, data, error}` envelope.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

fn not_running() -> Response {
    error_response("controller is not running", StatusCode::CONFLICT)
}

/// Body of `GET`/`PUT /api/v1/enabled`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct EnabledBody {
    pub enabled: bool,
}

/// Body returned by signal endpoints.
#[derive(Debug, serde::Serialize)]
pub struct SignalAck {
    /// Whether the signal scheduled a tick.
    pub scheduled: bool,
}

/// GET /api/v1/status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.status().await)
}

/// GET /api/v1/enabled
pub async fn get_enabled(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(EnabledBody {
        enabled: state.signals.is_enabled(),
    })
}

/// PUT /api/v1/enabled
pub async fn set_enabled(
    State(state): State<ApiState>,
    Json(body): Json<EnabledBody>,
) -> Response {
    if !state.signals.set_enabled(body.enabled).await {
        return not_running();
    }
    info!(enabled = body.enabled, "enable switch set via API");
    ApiResponse::ok(body).into_response()
}

/// POST /api/v1/suspend
pub async fn suspend(State(state): State<ApiState>) -> Response {
    if !state.signals.on_suspend().await {
        return not_running();
    }
    ApiResponse::ok(state.controller.status().await).into_response()
}

/// POST /api/v1/resume
pub async fn resume(State(state): State<ApiState>) -> Response {
    if !state.signals.on_resume().await {
        return not_running();
    }
    ApiResponse::ok(state.controller.status().await).into_response()
}

/// POST /api/v1/activity
pub async fn activity(State(state): State<ApiState>) -> Response {
    if !state.controller.is_running() {
        return not_running();
    }
    let scheduled = state.signals.on_activity_pulse();
    ApiResponse::ok(SignalAck { scheduled }).into_response()
}
