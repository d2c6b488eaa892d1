use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::PermissionAuthority;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::navigation::Navigation;
use crate::routes::{auth, health, navigation, permissions, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authority: Arc<PermissionAuthority>,
    pub navigation: Arc<Navigation>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        jwt: JwtConfig,
        authority: PermissionAuthority,
        navigation: Navigation,
    ) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            authority: Arc::new(authority),
            navigation: Arc::new(navigation),
        }
    }
}

/// Build the router from environment configuration.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let navigation = Navigation::from_env()?;

    create_app_with(pool, jwt_config, navigation)
}

pub fn create_app_with(
    pool: SqlitePool,
    jwt: JwtConfig,
    navigation: Navigation,
) -> Result<Router, AppError> {
    let authority = PermissionAuthority::new();
    authority.validate()?;

    let state = AppState::new(pool, jwt, authority, navigation);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let permission_routes = Router::new()
        .route("/roles", get(permissions::roles))
        .route("/check", post(permissions::check))
        .route("/highest", post(permissions::highest));

    let user_routes = Router::new().route("/:id/role", put(users::update_role));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/navigation", get(navigation::sidebar))
        .nest("/auth", auth_routes)
        .nest("/permissions", permission_routes)
        .nest("/users", user_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
