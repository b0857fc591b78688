/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::{app::AppState, config::Config};
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::with_postgres(pool, config);
/// let app = taskdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::middleware::session::{require_page_session, require_session};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdesk_shared::repository::{MemoryRepository, PgRepository, TaskRepository, UserRepository};
use taskdesk_shared::services::{SessionService, TaskService, UserService};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub users: UserService,
    pub sessions: SessionService,

    /// Present when backed by PostgreSQL; used by the health check
    pub db: Option<PgPool>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires services over the given repositories
    pub fn new(
        config: Config,
        tasks: Arc<dyn TaskRepository>,
        users: Arc<dyn UserRepository>,
        db: Option<PgPool>,
    ) -> Self {
        let sessions = SessionService::new(
            users.clone(),
            config.session.secret.as_str(),
            config.session_ttl(),
        );

        Self {
            tasks: TaskService::new(tasks, users.clone()),
            users: UserService::new(users),
            sessions,
            db,
            config: Arc::new(config),
        }
    }

    /// State backed by a PostgreSQL pool
    pub fn with_postgres(pool: PgPool, config: Config) -> Self {
        let repo = Arc::new(PgRepository::new(pool.clone()));
        Self::new(config, repo.clone(), repo, Some(pool))
    }

    /// State backed by a process-local store
    pub fn in_memory(config: Config, repo: MemoryRepository) -> Self {
        let repo = Arc::new(repo);
        Self::new(config, repo.clone(), repo, None)
    }

    /// Gets the session token signing key
    pub fn jwt_secret(&self) -> &str {
        &self.config.session.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                  # public
/// ├── GET  /login                   # public, redirects to / when signed in
/// ├── GET  /, /tasks, /managements  # pages, 303 to /login without session
/// └── /api/
///     ├── /auth/
///     │   ├── POST /login           # public
///     │   ├── POST /logout          # public
///     │   └── GET  /session
///     ├── /tasks/
///     │   ├── GET    /              # ?status=&date=
///     │   ├── POST   /
///     │   ├── GET    /summary
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   └── PATCH  /:id/status
///     └── /users/
///         ├── GET  /
///         ├── POST /
///         └── PUT  /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Session gate (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let session_routes = Router::new()
        .route("/session", get(routes::auth::session))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route("/summary", get(routes::tasks::task_summary))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_task_status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route("/:id", axum::routing::put(routes::users::update_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .nest("/tasks", task_routes)
        .nest("/users", user_routes);

    let page_routes = Router::new()
        .route("/", get(routes::pages::home))
        .route("/tasks", get(routes::pages::tasks))
        .route("/managements", get(routes::pages::managements))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_page_session,
        ))
        .route("/login", get(routes::pages::login));

    Router::new()
        .merge(health_routes)
        .merge(page_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
