//! gripe-box/crates/gb-api/src/middleware.rs Middleware
//!
//! Access logging and response hardening shared by every route.

use actix_web::middleware::{DefaultHeaders, Logger};

/// Returns the access logger for the Gripe Box API.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

/// Security headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("X-Frame-Options", "DENY"))
}
