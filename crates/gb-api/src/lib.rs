//! # gb-api
//!
//! The web routing and orchestration layer for Gripe Box.

pub mod client_ip;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use error::ApiError;
pub use handlers::AppState;

/// Configures the routes for the complaint box.
///
/// # Developer Note
/// Routes are registered directly rather than under a catch-all scope so the
/// binary can mount static files alongside them.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Submission form (also the landing page)
        .service(
            web::resource(["/", "/form"])
                .route(web::get().to(handlers::show_form))
                .route(web::post().to(handlers::submit_form)),
        )
        .route("/complaints", web::get().to(handlers::list_complaints))
        // OAuth round-trip
        .route("/login", web::get().to(handlers::login))
        .route("/auth/google/callback", web::get().to(handlers::callback))
        .route("/logout", web::post().to(handlers::logout))
        // Moderation
        .route("/admin", web::get().to(handlers::admin_panel))
        .route("/admin/toggle", web::post().to(handlers::toggle_hidden));
}
