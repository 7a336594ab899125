// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the lead intake service.
//!
//! Public surface: `POST /api/leads`. Admin surface: login/logout and the
//! lead list, gated by [`SessionGuard`].

use crate::config::Config;
use crate::error::{AuthError, ErrorResponse, SubmissionResponse};
use crate::intake::IntakeService;
use crate::metrics::Metrics;
use crate::models::{Lead, QuoteSubmission};
use crate::session::{self, AdminIdentity, SessionGuard};
use crate::store::{LeadStore, MAX_LIST_LIMIT};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Shared application state.
pub struct AppState {
    pub intake: IntakeService,
    pub store: Arc<dyn LeadStore>,
    pub sessions: Arc<SessionGuard>,
    pub metrics: Arc<Metrics>,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Admin login request.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/leads", post(submit_lead))
        .route("/api/admin/leads", get(list_leads))
        .route("/api/admin/leads/:id", get(get_lead))
        .route("/api/admin/auth/login", post(login))
        .route("/api/admin/auth/logout", post(logout));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "lead-intake",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept a quote request from the public form.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<QuoteSubmission>, JsonRejection>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let client_ip = client_ip(&headers, peer, state.config.trust_proxy_headers);
    let client_key = client_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let body = payload
        .map(|Json(submission)| submission)
        .map_err(|rejection| rejection.body_text());

    match state.intake.submit_body(&client_key, client_ip, body).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(SubmissionResponse {
                success: true,
                message: Some("Quote request submitted successfully!".to_string()),
                errors: None,
                lead_id: Some(receipt.lead_id),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Newest leads first.
///
/// Authorization comes before the query string; an unreadable `limit` falls
/// back to the cap.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Lead>>, AuthError> {
    let admin = authorize(&state, &headers)?;
    let limit = match params {
        Ok(Query(params)) => params.limit,
        Err(rejection) => {
            debug!(error = %rejection, "Ignoring unreadable list parameters");
            None
        }
    }
    .unwrap_or(MAX_LIST_LIMIT)
    .min(MAX_LIST_LIMIT);

    let leads = match tokio::time::timeout(
        state.config.intake.store_timeout(),
        state.store.list_recent(limit),
    )
    .await
    {
        Ok(leads) => leads,
        Err(_) => {
            error!("Listing leads timed out");
            Vec::new()
        }
    };

    debug!(admin = %admin.email, count = leads.len(), "Leads listed");
    Ok(Json(leads))
}

/// One lead by id.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AuthError> {
    authorize(&state, &headers)?;

    let found = tokio::time::timeout(state.config.intake.store_timeout(), state.store.find(&id)).await;
    let response = match found {
        Ok(Ok(Some(lead))) => (StatusCode::OK, Json(lead)).into_response(),
        Ok(Ok(None)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Lead not found".to_string(),
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!(lead_id = %id, error = %e, "Failed to load lead");
            internal_error()
        }
        Err(_) => {
            error!(lead_id = %id, "Loading lead timed out");
            internal_error()
        }
    };
    Ok(response)
}

/// Exchange admin credentials for a session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(request) = payload.map_err(|_| AuthError::MissingFields)?;

    let sessions = Arc::clone(&state.sessions);
    let token = tokio::task::spawn_blocking(move || sessions.login(&request.email, &request.password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))??;

    let cookie = state
        .sessions
        .cookie(&token, state.config.environment.is_production());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { success: true }),
    )
        .into_response())
}

/// Drop the session cookie.
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cookie = state
        .sessions
        .clear_cookie(state.config.environment.is_production());
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { success: true }),
    )
        .into_response()
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<AdminIdentity, AuthError> {
    if let Some(identity) = state.sessions.authenticate(session::session_token(headers)) {
        return Ok(identity);
    }

    if state.config.admin_open_access() {
        warn!("Serving admin request without a session (ADMIN_OPEN_ACCESS)");
        return Ok(AdminIdentity {
            email: "open-access".to_string(),
        });
    }

    Err(AuthError::Unauthorized)
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal error".to_string(),
        }),
    )
        .into_response()
}

/// Resolve the submitter's address.
///
/// `X-Forwarded-For` is only honored behind a trusted proxy; its first hop
/// is the original client.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    peer
}
