pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observer;
pub mod services;
pub mod types;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::observer::ObserverPipeline;
use crate::services::{
    InboxDispatcher, NotificationDispatcher, ProjectWriteService, ReviewWorkflow, StorageGateway,
    WebhookDispatcher,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub projects: Arc<ProjectWriteService>,
    pub reviews: Arc<ReviewWorkflow>,
    /// Shared with both services; drained on shutdown
    pub observers: ObserverPipeline,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    /// Wire the services from configuration around an existing pool and store
    pub fn build(
        config: &AppConfig,
        pool: PgPool,
        storage: Arc<dyn StorageGateway>,
    ) -> anyhow::Result<Self> {
        let mut dispatchers: Vec<Arc<dyn NotificationDispatcher>> =
            vec![Arc::new(InboxDispatcher::new(pool.clone()))];
        let webhook = config.notifications.webhook_url.as_deref();
        if let Some(raw) = webhook.filter(|u| !u.trim().is_empty()) {
            let url = url::Url::parse(raw)
                .with_context(|| format!("invalid NOTIFY_WEBHOOK_URL '{}'", raw))?;
            tracing::info!(url = %url, "Webhook notifications enabled");
            dispatchers.push(Arc::new(WebhookDispatcher::new(url)));
        }

        let observers = observer::default_pipeline(
            pool.clone(),
            dispatchers,
            Duration::from_secs(config.notifications.observer_timeout_secs),
        );

        let projects = ProjectWriteService::new(
            pool.clone(),
            storage,
            observers.clone(),
            config.storage.max_file_size_bytes as u64,
        );
        let reviews = ReviewWorkflow::new(
            pool.clone(),
            config.review.retry_policy(),
            Duration::from_millis(config.database.lock_timeout_ms),
            observers.clone(),
        );

        Ok(Self {
            pool,
            projects: Arc::new(projects),
            reviews: Arc::new(reviews),
            observers,
            jwt_secret: Arc::from(config.security.jwt_secret.as_str()),
        })
    }
}

/// Full router: public, protected (JWT) and elevated (JWT + admin) tiers
pub fn app(state: AppState, config: &AppConfig) -> Router {
    use handlers::{elevated, protected, public};
    use middleware::{jwt_auth_middleware, require_admin};

    let protected_routes = Router::new()
        .route("/api/users/:owner_id/projects", post(protected::project_create))
        .route(
            "/api/projects/:id",
            get(protected::project_show)
                .put(protected::project_update)
                .delete(protected::project_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let elevated_routes = Router::new()
        .route("/api/admin/projects/:id/review", post(elevated::project_review))
        .route("/api/admin/projects/:id/reviews", get(elevated::project_reviews))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(protected_routes)
        .merge(elevated_routes)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(config));

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let security = &config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Install the global subscriber; `RUST_LOG` wins over the profile default
pub fn init_tracing() {
    let default = if crate::is_development!() {
        "info,showcase_api=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// CLI variant: quieter and on stderr so `--json` output stays parseable
pub fn init_cli_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
