//! HTTP routes module

mod containers;
mod health;

use crate::config::AgentConfig;
use crate::docker::ContainerEngine;
use crate::error::AgentError;
use crate::middleware::{auth_middleware, security_headers_middleware};
use crate::replace::{CommandHook, ReplaceGuards, Replacer};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AgentConfig,
    pub engine: Arc<dyn ContainerEngine>,
    pub replacer: Replacer,
    pub guards: ReplaceGuards,
}

impl AppState {
    /// Wire the replacer (and its configured hook) to `engine`
    pub fn new(config: AgentConfig, engine: Arc<dyn ContainerEngine>) -> Self {
        let guards = ReplaceGuards::new();
        let mut replacer =
            Replacer::new(engine.clone(), config.replace.clone()).with_guards(guards.clone());

        if let Some(hook) = config
            .post_replace_command
            .as_deref()
            .and_then(CommandHook::parse)
        {
            info!("Post-replace hook: {:?}", hook);
            replacer = replacer.with_hook(Arc::new(hook));
        }

        Self {
            config,
            engine,
            replacer,
            guards,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let secret: Arc<str> = Arc::from(state.config.secret.as_str());
    let max_body_size = state.config.max_body_size;

    // Public routes, no auth
    let public_routes = Router::new()
        .route("/v1/health", get(health::health_handler))
        .route("/v1/ping", get(health::ping_handler));

    let protected_routes = Router::new()
        .route("/v1/containers", get(containers::list_containers))
        .route("/v1/containers/prune", post(containers::prune))
        .route("/v1/containers/recreate", post(containers::recreate_many))
        .route(
            "/v1/containers/{container}",
            get(containers::get_container).delete(containers::remove_container),
        )
        .route(
            "/v1/containers/{container}/config",
            get(containers::get_config),
        )
        .route(
            "/v1/containers/{container}/start",
            post(containers::start_container),
        )
        .route(
            "/v1/containers/{container}/stop",
            post(containers::stop_container),
        )
        .route(
            "/v1/containers/{container}/restart",
            post(containers::restart_container),
        )
        .route("/v1/containers/{container}/logs", get(containers::logs))
        .route("/v1/containers/{container}/stats", get(containers::stats))
        .route(
            "/v1/containers/{container}/recreate",
            post(containers::recreate_container),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn_with_state(secret, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(fallback_handler)
        .with_state(state)
}

/// Fallback handler for unmatched routes
async fn fallback_handler() -> AgentError {
    AgentError::RouteNotFound
}
