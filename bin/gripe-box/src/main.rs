//! # Gripe Box Binary
//!
//! Assembles the stores, the Google login flow and the web layer, then serves.

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use gb_api::middleware::{security_headers, standard_middleware};
use gb_api::{configure_routes, AppState};
use gb_auth_google::{GoogleIdentityProvider, GoogleOAuthConfig};
use gb_config::AppConfig;
use gb_core::auth::{AuthManager, EmailPolicy};
use gb_state_memory::{MemorySessionStore, RateLimitConfig, SlidingWindowLimiter};
use gb_store_json::JsonComplaintStore;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cfg = AppConfig::load()?;

    // 1. Complaint storage
    let complaints = JsonComplaintStore::open(&cfg.data_file)?;
    log::info!(
        "complaint store at {} (next id {})",
        complaints.path().display(),
        complaints.next_id()
    );

    // 2. Rate limiting, swept in the background
    let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig {
        max_requests: cfg.rate_limit_max,
        window: cfg.rate_limit_window(),
        sweep_interval: cfg.rate_limit_sweep_interval(),
    }));
    let sweeper = limiter.spawn_sweeper();

    // 3. Google login
    let oauth = GoogleOAuthConfig::new(
        cfg.google_client_id.clone(),
        SecretString::from(cfg.google_client_secret.expose_secret().to_owned()),
        &cfg.base_url,
    );
    log::info!("OAuth redirect URI: {}", oauth.redirect_uri);
    let provider = GoogleIdentityProvider::new(oauth)?;

    let policy = cfg.email_policy();
    if policy == EmailPolicy::Any {
        log::warn!("ALLOWED_EMAIL_ANY is set, any Google account may sign in");
    }
    match &cfg.admin_email {
        Some(admin) => log::info!("admin account: {admin}"),
        None => log::warn!("no ADMIN_EMAIL set, the admin panel is unreachable"),
    }

    let auth = AuthManager::new(Box::new(provider), Box::new(MemorySessionStore::new()))
        .with_policy(policy)
        .with_admin(cfg.admin_email.clone())
        .with_secure_cookies(cfg.secure_cookies());

    let state = web::Data::new(AppState {
        complaints: Box::new(complaints),
        limiter,
        auth,
    });

    let static_dir = cfg.static_dir.clone();
    log::info!("gripe-box starting on http://{}:{}", cfg.bind_address, cfg.port);

    HttpServer::new(move || {
        App::new()
            .wrap(standard_middleware())
            .wrap(security_headers())
            .app_data(state.clone())
            .service(Files::new("/static", static_dir.clone()))
            .configure(configure_routes)
    })
    .bind((cfg.bind_address.as_str(), cfg.port))?
    .run()
    .await?;

    sweeper.shutdown().await;
    log::info!("gripe-box stopped");
    Ok(())
}
