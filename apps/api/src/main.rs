//! Nutrack API composition root.

#![forbid(unsafe_code)]

mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nutrack_application::{
    AuthorizationGate, CredentialService, DEFAULT_CREDENTIAL_TTL_SECONDS, PermissionResolver,
    RoleAdminService, UserService,
};
use nutrack_core::AppError;
use nutrack_infrastructure::{
    Argon2PasswordHasher, JwtCredentialSigner, PostgresAuditRepository,
    PostgresRoleAssignmentRepository, PostgresRoleRepository, PostgresUserRepository,
};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let credential_secret = required_env("CREDENTIAL_SECRET")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

    let credential_ttl_seconds = env::var("CREDENTIAL_TTL_SECONDS")
        .ok()
        .map(|value| {
            value.parse::<i64>().map_err(|error| {
                AppError::Validation(format!("invalid CREDENTIAL_TTL_SECONDS: {error}"))
            })
        })
        .transpose()?
        .unwrap_or(DEFAULT_CREDENTIAL_TTL_SECONDS);

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let assignment_repository = Arc::new(PostgresRoleAssignmentRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let credential_signer = Arc::new(JwtCredentialSigner::new(&credential_secret)?);

    let permission_resolver = PermissionResolver::new(
        assignment_repository.clone(),
        role_repository.clone(),
        role_repository.clone(),
    );
    let authorization_gate =
        AuthorizationGate::new(credential_signer.clone(), permission_resolver.clone());
    let credential_service = CredentialService::new(
        user_repository.clone(),
        permission_resolver.clone(),
        credential_signer,
        audit_repository.clone(),
        credential_ttl_seconds,
    )?;
    let role_admin_service = RoleAdminService::new(
        authorization_gate.clone(),
        role_repository.clone(),
        assignment_repository.clone(),
        user_repository.clone(),
        permission_resolver,
        audit_repository,
    );
    let user_service = UserService::new(
        user_repository,
        role_repository,
        assignment_repository,
        password_hasher,
        credential_service.clone(),
    );

    let app_state = AppState {
        authorization_gate,
        credential_service,
        role_admin_service,
        user_service,
        frontend_url: frontend_url.clone(),
    };

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler),
        )
        .route(
            "/api/security/role-assignments",
            post(handlers::security::assign_role_handler),
        )
        .route(
            "/api/security/role-unassignments",
            post(handlers::security::unassign_role_handler),
        )
        .route(
            "/api/security/users/{user_id}/role",
            put(handlers::security::replace_role_handler),
        )
        .route(
            "/api/security/users/{user_id}/active",
            put(handlers::security::set_active_handler),
        )
        .route(
            "/api/security/users/{user_id}/permissions",
            get(handlers::security::effective_permissions_handler),
        )
        .route(
            "/api/security/users/{user_id}/roles",
            get(handlers::security::effective_roles_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "nutrack-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
