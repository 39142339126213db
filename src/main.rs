mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::Result;

use services::{PaystackClient, RedisCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting Forafix backend"
    );

    // Create database pool and apply migrations
    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // Create Redis cache
    let cache = RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds).await?;

    // Create payment gateway client
    let paystack = PaystackClient::new(
        &settings.paystack_base_url,
        &settings.paystack_secret_key,
        settings.paystack_timeout_seconds,
    )?;

    // Optionally check gateway reachability (non-blocking)
    tokio::spawn({
        let paystack = paystack.clone();
        async move {
            match paystack.health_check().await {
                Ok(()) => tracing::info!("Payment gateway is reachable"),
                Err(e) => tracing::warn!(error = %e, "Payment gateway health check failed - will retry on first request"),
            }
        }
    });

    // Create application state
    let state = app::AppState::new(pool, settings.clone(), cache, paystack);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
