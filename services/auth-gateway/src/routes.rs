//! Sign-in, token, sign-out and backend forwarding handlers
//!
//! Endpoints:
//! - `GET /auth/login`: start an Okta authorization-code + PKCE sign-in
//! - `GET /auth/callback`: finish it, create a session, set the cookie
//! - `GET /auth/token`: current bearer token for the caller
//! - `POST /auth/signout`: end the caller's session
//! - `ANY /api/{*path}`: authenticated call to the backend

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::auth::{AuthBackend, clear_session_cookie, session_cookie};
use crate::error::ApiError;
use crate::metrics;

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// Record metrics for a finished request and pass the response through.
fn finish(route: &'static str, start: Instant, response: Response) -> Response {
    metrics::record_request(
        route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// GET /auth/login: redirect the browser to the provider's authorize page.
///
/// Clerk owns its sign-in UI, so the route does not exist for it.
pub async fn login(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let request_id = new_request_id();

    let response = match state.auth.backend() {
        AuthBackend::Okta { oidc, .. } => {
            let verifier = identity::generate_verifier();
            let challenge = identity::compute_challenge(&verifier);
            let csrf_state = identity::generate_state();
            match oidc.authorization_url(&csrf_state, &challenge) {
                Ok(url) => {
                    state.pending.insert(csrf_state, verifier).await;
                    info!(request_id, "sign-in started");
                    Redirect::to(&url).into_response()
                }
                Err(e) => ApiError::Internal(e.to_string()).into_response_with(&request_id),
            }
        }
        AuthBackend::Clerk { .. } => {
            ApiError::NotFound("sign-in is handled by clerk".into()).into_response_with(&request_id)
        }
    };
    finish("login", start, response)
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/callback: exchange the code and bind a new session to a cookie.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let start = Instant::now();
    let request_id = new_request_id();

    let response = match complete_sign_in(&state, params, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            warn!(request_id, error = %e, "sign-in callback rejected");
            e.into_response_with(&request_id)
        }
    };
    finish("callback", start, response)
}

async fn complete_sign_in(
    state: &AppState,
    params: CallbackParams,
    request_id: &str,
) -> Result<Response, ApiError> {
    let AuthBackend::Okta { oidc, store } = state.auth.backend() else {
        return Err(ApiError::NotFound("sign-in is handled by clerk".into()));
    };

    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or(error);
        return Err(ApiError::BadRequest(format!("sign-in failed: {detail}")));
    }

    let (Some(code), Some(csrf_state)) = (params.code, params.state) else {
        return Err(ApiError::BadRequest("missing code or state".into()));
    };

    let verifier = state
        .pending
        .take(&csrf_state)
        .await
        .ok_or_else(|| ApiError::BadRequest("unknown or expired sign-in state".into()))?;

    let tokens = oidc
        .exchange_code(&code, &verifier)
        .await
        .map_err(|e| match e {
            rejected @ identity::Error::InvalidGrant(_) => {
                ApiError::BadRequest(rejected.to_string())
            }
            other => ApiError::BadGateway(format!("code exchange failed: {other}")),
        })?;

    let session_id = store
        .create(tokens)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store session: {e}")))?;

    info!(request_id, session_id = %session_id, "session created");

    Ok((
        StatusCode::SEE_OTHER,
        [
            (LOCATION, "/".to_string()),
            (SET_COOKIE, session_cookie(&session_id, state.cookie_secure)),
        ],
    )
        .into_response())
}

/// GET /auth/token: the caller's bearer token, or 401.
pub async fn token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let start = Instant::now();
    let request_id = new_request_id();

    let adapter = state.auth.request_adapter(&headers);
    let token = adapter.get_token().await;
    metrics::record_token_lookup(token.is_some());

    let response = match token {
        Some(token) => Json(serde_json::json!({
            "token": token,
            "provider": adapter.provider,
        }))
        .into_response(),
        None => ApiError::Unauthenticated.into_response_with(&request_id),
    };
    finish("token", start, response)
}

/// POST /auth/signout: end the caller's session. Always succeeds.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let start = Instant::now();

    match state.auth.sign_out_adapter(&headers) {
        Some(adapter) => adapter.sign_out().await,
        None => debug!("sign-out without a session"),
    }

    let body = Json(serde_json::json!({ "signed_out": true }));
    let response = match state.auth.backend() {
        AuthBackend::Okta { .. } => (
            [(SET_COOKIE, clear_session_cookie(state.cookie_secure))],
            body,
        )
            .into_response(),
        AuthBackend::Clerk { .. } => body.into_response(),
    };
    finish("signout", start, response)
}

/// ANY /api/{*path}: forward to the backend with the caller's token.
///
/// Requests without a token are answered 401 before any backend call.
pub async fn api(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = new_request_id();

    let response = match forward(&state, method, &path, query, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            debug!(request_id, error = %e, "api request failed");
            e.into_response_with(&request_id)
        }
    };
    finish("api", start, response)
}

async fn forward(
    state: &AppState,
    method: Method,
    path: &str,
    query: Option<String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let payload = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<serde_json::Value>(body)
                .map_err(|e| ApiError::BadRequest(format!("request body must be JSON: {e}")))?,
        )
    };

    let mut target = format!("/{path}");
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(&query);
    }

    let adapter = state.auth.request_adapter(headers);
    let response = adapter.request(method, &target, payload).await?;
    Ok(Json(response).into_response())
}
