use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthProvider, AuthorizationGate, TokenIssuer};
use crate::config::AppConfig;
use crate::database::{ConnectionSource, PageRepository, PageStore};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, session_auth_middleware};
use crate::pipeline::RequestPipeline;
use crate::services::{BackupCoordinator, CommonMarkRenderer};
use crate::views::Views;

/// Shared, immutable request context
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub backup: Arc<BackupCoordinator>,
    pub gate: AuthorizationGate,
    pub tokens: TokenIssuer,
    pub source: ConnectionSource,
    pub views: Arc<Views>,
}

impl AppState {
    /// Open the pool, make sure the schema exists and wire every collaborator.
    pub async fn build(config: &AppConfig, provider: Arc<dyn AuthProvider>) -> anyhow::Result<Self> {
        let source = ConnectionSource::connect(&config.database).await?;
        let repository = PageRepository::new(source.clone());
        repository.init().await?;

        let store: Arc<dyn PageStore> = Arc::new(repository);
        let gate = AuthorizationGate::new(provider, config.security.authorization_timeout());

        let pipeline = RequestPipeline::new(store.clone(), gate.clone(), Arc::new(CommonMarkRenderer));
        let backup = BackupCoordinator::new(
            store,
            gate.clone(),
            config.backup.clone(),
            &config.security.backup_role,
        )?;

        Ok(Self {
            pipeline: Arc::new(pipeline),
            backup: Arc::new(backup),
            gate,
            tokens: TokenIssuer::from_config(&config.security),
            source,
            views: Arc::new(Views::new()?),
        })
    }
}

pub fn app(state: AppState, enable_cors: bool) -> Router {
    let router: Router = Router::new()
        // Public
        .route("/health", get(public::health))
        .merge(session_routes())
        // Browser (session cookie)
        .merge(wiki_routes(state.clone()))
        // API (Bearer token)
        .merge(api_routes(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(public::login_form))
        .route("/login-auth", post(public::login_auth))
        .route("/logout", get(public::logout))
        .route("/api/token", get(public::token_get))
}

fn wiki_routes(state: AppState) -> Router<AppState> {
    use protected::wiki;

    Router::new()
        .route("/", get(wiki::index))
        .route("/wiki/:page", get(wiki::page))
        .route("/action/save", post(wiki::save))
        .route("/action/create", post(wiki::create))
        .route("/action/delete", post(wiki::delete))
        .route("/action/backup", get(wiki::backup))
        .route_layer(middleware::from_fn_with_state(state, session_auth_middleware))
}

fn api_routes(state: AppState) -> Router<AppState> {
    use protected::pages;

    Router::new()
        .route("/api/pages", get(pages::list).post(pages::create))
        .route(
            "/api/pages/:id",
            get(pages::get).put(pages::update).delete(pages::delete),
        )
        .route("/api/backup", post(pages::backup))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}
