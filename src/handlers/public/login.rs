// handlers/public/login.rs - browser session: GET /login, POST /login-auth, GET /logout

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::token::issue_token;
use crate::app::AppState;
use crate::auth::{AuthError, Credentials};
use crate::handlers::html;
use crate::middleware::auth::{expired_session_cookie, session_cookie};

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// GET /login
pub async fn login_form(State(state): State<AppState>) -> Response {
    html(StatusCode::OK, state.views.login(None))
}

/// POST /login-auth - verify credentials and store a session token in a cookie
pub async fn login_auth(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let credentials = Credentials {
        username: form.username.unwrap_or_default(),
        password: form.password.unwrap_or_default(),
    };

    let principal = match state.gate.authenticate(&credentials).await {
        Ok(principal) => principal,
        Err(AuthError::Timeout) | Err(AuthError::Unavailable(_)) => {
            return html(
                StatusCode::SERVICE_UNAVAILABLE,
                state.views.login(Some("Login is temporarily unavailable")),
            );
        }
        Err(e) => {
            tracing::info!("Failed login for '{}': {}", credentials.username, e);
            return html(
                StatusCode::UNAUTHORIZED,
                state.views.login(Some("Invalid username or password")),
            );
        }
    };

    match issue_token(&state, &principal).await {
        Ok(token) => {
            tracing::info!("'{}' logged in", principal.username);
            (
                [(header::SET_COOKIE, session_cookie(&token))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(e) => html(e.status(), state.views.error(e.status_code(), e.message())),
    }
}

/// GET /logout
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/login"),
    )
}
