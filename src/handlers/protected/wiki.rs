// handlers/protected/wiki.rs - browser routes behind the session cookie

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::error::ApiError;
use crate::handlers::html;
use crate::pipeline::{DeleteForm, PipelineError, SaveForm};

#[derive(Debug, Default, Deserialize)]
pub struct CreateForm {
    pub name: Option<String>,
}

/// Failures on browser routes render an HTML error page with the API status
fn html_error(state: &AppState, err: PipelineError) -> Response {
    if matches!(err, PipelineError::Unauthenticated) {
        return Redirect::to("/login").into_response();
    }
    let err = ApiError::from(err);
    html(err.status(), state.views.error(err.status_code(), err.message()))
}

/// GET /
pub async fn index(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> Response {
    match state.pipeline.index(&principal).await {
        Ok(view) => html(StatusCode::OK, state.views.index(&view)),
        Err(e) => html_error(&state, e),
    }
}

/// GET /wiki/:page
pub async fn page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> Response {
    match state.pipeline.view_page(&principal, &name).await {
        Ok(view) => html(StatusCode::OK, state.views.page(&view)),
        Err(e) => html_error(&state, e),
    }
}

/// POST /action/save
pub async fn save(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<SaveForm>,
) -> Response {
    match state.pipeline.save_from_form(&principal, form).await {
        Ok(location) => Redirect::to(&location).into_response(),
        Err(e) => html_error(&state, e),
    }
}

/// POST /action/create - only computes where the editor for the new page lives
pub async fn create(State(state): State<AppState>, Form(form): Form<CreateForm>) -> Redirect {
    Redirect::to(&state.pipeline.create_redirect(form.name.as_deref()))
}

/// POST /action/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<DeleteForm>,
) -> Response {
    match state.pipeline.delete_from_form(&principal, form).await {
        Ok(location) => Redirect::to(&location).into_response(),
        Err(e) => html_error(&state, e),
    }
}

/// GET /action/backup - push the snapshot, then show the index with the link
pub async fn backup(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> Response {
    let receipt = match state.backup.backup(&principal).await {
        Ok(receipt) => receipt,
        Err(e) => return html_error(&state, e),
    };

    match state.pipeline.index(&principal).await {
        Ok(mut view) => {
            view.backup_url = Some(receipt.url);
            html(StatusCode::OK, state.views.index(&view))
        }
        Err(e) => html_error(&state, e),
    }
}
