//! OKR Tracker Backend
//!
//! REST backend for team objectives, key results and reviews, with SQLite
//! persistence and role-based authorization.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod guard;
mod models;
mod policy;
mod services;
mod validation;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::BcryptHasher;
use config::{Config, StorageKind};
use db::{MemoryStore, Repositories, SqliteStore};
use services::Services;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OKR Tracker Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if the API key is not configured
    if config.api_key.is_none() {
        tracing::warn!("No API key configured (OKR_API_KEY). Key check is disabled!");
    }

    let repos = match config.storage {
        StorageKind::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            let pool = db::init_database(&config.db_path).await?;
            Repositories::from_store(SqliteStore::new(pool))
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Repositories::from_store(MemoryStore::new())
        }
    };

    let services = Services::new(
        repos,
        Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        config.session_ttl_hours,
    );

    // Create application state
    let state = AppState {
        services: Arc::new(services),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the key for the auth layer
    let api_key = state.config.api_key.clone();

    // API routes
    let api_routes = Router::new()
        // Accounts
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        .route("/auth/session", get(api::current_session))
        .route("/auth/profile", put(api::update_profile))
        // Teams
        .route("/teams", get(api::list_teams).post(api::create_team))
        .route(
            "/teams/{id}",
            get(api::get_team)
                .put(api::update_team)
                .delete(api::delete_team),
        )
        .route(
            "/teams/{id}/review-frequency",
            put(api::update_review_frequency),
        )
        .route("/teams/{id}/okrs", get(api::list_team_okrs))
        // Members
        .route("/teams/{id}/members", get(api::list_members))
        .route(
            "/teams/{id}/members/{user_id}",
            put(api::update_member_role).delete(api::remove_member),
        )
        // Invitations
        .route(
            "/teams/{id}/invitations",
            get(api::list_team_invitations).post(api::create_invitation),
        )
        .route("/invitations", get(api::list_my_invitations))
        .route("/invitations/{id}", delete(api::cancel_invitation))
        .route("/invitations/{id}/accept", post(api::accept_invitation))
        .route("/invitations/{id}/reject", post(api::reject_invitation))
        // OKRs
        .route("/okrs", post(api::create_okr))
        .route(
            "/okrs/{id}",
            get(api::get_okr).put(api::update_okr).delete(api::delete_okr),
        )
        .route(
            "/okrs/{id}/key-results",
            get(api::list_key_results).post(api::create_key_result),
        )
        .route(
            "/okrs/{id}/reviews",
            get(api::list_reviews).post(api::create_review),
        )
        // Key results
        .route(
            "/key-results/{id}",
            put(api::update_key_result).delete(api::delete_key_result),
        )
        .route("/key-results/{id}/progress", put(api::update_progress))
        // Reviews
        .route(
            "/reviews/{id}",
            put(api::update_review).delete(api::delete_review),
        )
        // Apply API key middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::api_key_layer(api_key.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
