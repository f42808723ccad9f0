// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (session cookie for browser routes, Bearer
// token for /api/*). Authentication happens in middleware; every capability
// decision happens in the pipeline.
pub mod protected;
pub mod public;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::RenderError;

/// Send a rendered template with `status`; a render failure is a bare 500.
pub(crate) fn html(status: StatusCode, rendered: Result<String, RenderError>) -> Response {
    match rendered {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
