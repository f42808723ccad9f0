// handlers/public/token.rs - GET /api/token handler

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};

use crate::app::AppState;
use crate::auth::{Capability, Credentials, Principal};
use crate::error::ApiError;

/// Sign a token for an authenticated caller. The three capability claims are
/// checked concurrently; a failed check just leaves its claim false.
pub async fn issue_token(state: &AppState, principal: &Principal) -> Result<String, ApiError> {
    let (create, update, delete) = tokio::join!(
        state.gate.is_authorized(principal, Capability::Create),
        state.gate.is_authorized(principal, Capability::Update),
        state.gate.is_authorized(principal, Capability::Delete),
    );

    let claims = state.tokens.claims_for(principal, create, update, delete);
    Ok(state.tokens.generate(&claims)?)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// GET /api/token - exchange `login`/`password` headers for a Bearer token.
///
/// The token comes back as `text/plain`.
pub async fn token_get(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = match (header_value(&headers, "login"), header_value(&headers, "password")) {
        (Some(u), Some(p)) => (u.to_string(), p.to_string()),
        _ => return Err(ApiError::unauthorized("Missing login or password header")),
    };

    let principal = state
        .gate
        .authenticate(&Credentials { username, password })
        .await?;
    let token = issue_token(&state, &principal).await?;
    tracing::info!("Issued API token for '{}'", principal.username);

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], token))
}
