//! Request extractors for authenticated routes.
//!
//! Taking `SessionUser` (or `AdminUser`) as a handler argument is what makes a
//! route require login (or admin rights).

use crate::error::ApiError;
use crate::handlers::AppState;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use gb_core::error::AppError;
use std::future::{ready, Ready};

pub const SESSION_COOKIE: &str = "session_token";

/// The logged-in user behind the request's session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
    pub is_admin: bool,
}

impl SessionUser {
    fn resolve(req: &HttpRequest) -> Result<Self, ApiError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::Internal("application state not configured".to_string()))?;
        let cookie = req.cookie(SESSION_COOKIE).ok_or(ApiError::LoginRequired)?;
        let email = state
            .auth
            .session(cookie.value())
            .ok_or(ApiError::LoginRequired)?;
        let is_admin = state.auth.is_admin(&email);
        Ok(SessionUser { email, is_admin })
    }
}

impl FromRequest for SessionUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(SessionUser::resolve(req))
    }
}

/// A logged-in user who is also the configured admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(SessionUser::resolve(req).and_then(|user| {
            if user.is_admin {
                Ok(AdminUser(user))
            } else {
                Err(AppError::Unauthorized("Admin privileges required.".to_string()).into())
            }
        }))
    }
}
