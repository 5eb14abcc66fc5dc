// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod logging_middleware;
mod services;
mod store;

use common::{AppState, AuthConfig};
use services::{
    CredentialService, IdentityService, OAuthService, SessionService, TrustedOrigins,
    VerificationTokenService,
};
use store::{AuthStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://identity_api.db".to_string());

    let config = AuthConfig::from_env();
    info!(
        trusted_origins = config.trusted_origins.len(),
        oauth_providers = config.oauth_providers.len(),
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let auth_store: Arc<dyn AuthStore> = Arc::new(SqliteStore::new(pool));
    info!("SqliteStore initialized");

    let tokens = VerificationTokenService::new(auth_store.clone());
    let credentials = CredentialService::new(
        auth_store.clone(),
        tokens.clone(),
        config.password_policy.clone(),
        config.verification_token_ttl,
    );
    let oauth = OAuthService::new(
        auth_store.clone(),
        http_client,
        config.oauth_providers.clone(),
        config.oauth_link_unverified,
    );
    let sessions = SessionService::new(
        auth_store.clone(),
        config.session_ttl,
        config.session_max_lifetime,
    );
    let identity = IdentityService::new(
        TrustedOrigins::new(config.trusted_origins.clone()),
        credentials,
        tokens,
        oauth,
        sessions,
        auth_store,
    );
    info!("IdentityService initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = Arc::new(AppState {
        identity: Arc::new(identity),
        config: config.clone(),
    });

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(app_state))
        .layer({
            let origins: Vec<axum::http::HeaderValue> = config
                .trusted_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
