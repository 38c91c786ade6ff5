//! HTTP mapping of `AppError`.
//!
//! Messages shown to the browser are deliberately generic for anything that
//! could leak provider or filesystem details.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use gb_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    /// No valid session cookie; the browser is sent to `/login`.
    #[error("login required")]
    LoginRequired,
}

impl ApiError {
    fn public_message(&self) -> String {
        match self {
            ApiError::LoginRequired => "login required".to_string(),
            ApiError::App(err) => match err {
                AppError::ValidationError(msg) => msg.clone(),
                AppError::NotFound(..) => "not found".to_string(),
                AppError::Persistence(_) => "failed to save, please try again".to_string(),
                AppError::ExternalAuth(_) => "login failed".to_string(),
                AppError::InvalidState => "invalid state".to_string(),
                AppError::Unauthorized(msg) => format!("Access denied. {msg}"),
                AppError::Internal(_) => "internal error".to_string(),
                AppError::RateLimitExceeded(msg) => msg.clone(),
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::LoginRequired => StatusCode::SEE_OTHER,
            ApiError::App(err) => match err {
                AppError::ValidationError(_) | AppError::InvalidState => StatusCode::BAD_REQUEST,
                AppError::NotFound(..) => StatusCode::NOT_FOUND,
                AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
                AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                AppError::Persistence(_) | AppError::ExternalAuth(_) | AppError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::LoginRequired = self {
            return HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish();
        }

        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {self}");
        }
        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ValidationError("x".into()), 400),
            (AppError::InvalidState, 400),
            (AppError::complaint_not_found(3), 404),
            (AppError::Unauthorized("x".into()), 403),
            (AppError::RateLimitExceeded("x".into()), 429),
            (AppError::ExternalAuth("x".into()), 500),
            (AppError::Persistence(io::Error::other("disk full")), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status_code().as_u16(), code);
        }
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(AppError::ExternalAuth("invalid_grant: secret-abc".into()));
        assert_eq!(err.public_message(), "login failed");

        let err = ApiError::from(AppError::Persistence(io::Error::other("/srv/data: EROFS")));
        assert!(!err.public_message().contains("/srv"));
    }

    #[test]
    fn test_login_required_redirects() {
        let resp = ApiError::LoginRequired.error_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }
}
