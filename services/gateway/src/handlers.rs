//! Axum Handlers for the HTTP surface
//!
//! Everything here is thin plumbing around the media-stream session: a
//! service banner, a health report, and the TwiML webhook Twilio calls when
//! a call comes in.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::{state::AppState, twiml};

pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ServiceBanner {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_calls: usize,
    pub agent: AgentHealth,
    pub twilio: TwilioHealth,
}

#[derive(Serialize)]
pub struct AgentHealth {
    pub agent_id: String,
    pub api_key_configured: bool,
}

#[derive(Serialize)]
pub struct TwilioHealth {
    pub account_sid: String,
}

/// Root endpoint for a quick liveness probe.
pub async fn root() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        status: "Server is running",
        message: "Twilio-ElevenLabs Voice Gateway",
    })
}

/// Health report: configuration presence and the active call count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(health_snapshot(&state))
}

fn health_snapshot(state: &AppState) -> HealthResponse {
    HealthResponse {
        status: "healthy",
        active_calls: state.active_calls.load(Ordering::Relaxed),
        agent: AgentHealth {
            agent_id: state.config.elevenlabs_agent_id.clone(),
            api_key_configured: state.config.elevenlabs_api_key.is_some(),
        },
        twilio: TwilioHealth {
            account_sid: state.config.twilio_account_sid.clone(),
        },
    }
}

/// Webhook Twilio calls for an incoming call. Answers with TwiML that
/// connects the call to this host's media-stream WebSocket endpoint.
pub async fn incoming_call(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Host header is required".to_string()))?;

    let document = twiml::connect_stream(host);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        document,
    ))
}
