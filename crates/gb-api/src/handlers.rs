//! # gb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.

use crate::client_ip::client_ip;
use crate::error::ApiError;
use crate::extract::{AdminUser, SessionUser, SESSION_COOKIE};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use gb_core::auth::AuthManager;
use gb_core::error::AppError;
use gb_core::models::NewComplaint;
use gb_core::traits::{ComplaintRepo, RateLimiter};
use gb_ui::{AdminTemplate, FormTemplate, ListTemplate};
use serde::Deserialize;
use std::sync::Arc;

/// State shared across all Actix-web workers. One instance per process.
pub struct AppState {
    pub complaints: Box<dyn ComplaintRepo>,
    pub limiter: Arc<dyn RateLimiter>,
    pub auth: AuthManager,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintForm {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub id: u64,
    /// "true" hides; anything else (or nothing) unhides
    pub hidden: Option<String>,
}

const FORM_TITLE: &str = "Submit Complaint";

/// Renders the submission form.
pub async fn show_form(user: SessionUser) -> Result<HttpResponse, ApiError> {
    render(FormTemplate {
        title: FORM_TITLE,
        email: &user.email,
        is_admin: user.is_admin,
        error: None,
        subject: "",
        description: "",
    })
}

/// Stores a complaint under the session's email. Invalid input re-renders the form.
pub async fn submit_form(
    user: SessionUser,
    data: web::Data<AppState>,
    form: web::Form<ComplaintForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let draft = NewComplaint::new(user.email.clone(), form.subject.clone(), form.description.clone());

    match data.complaints.add(draft) {
        Ok(stored) => {
            log::info!("complaint #{} submitted by {}", stored.id, user.email);
            Ok(see_other("/complaints"))
        }
        Err(AppError::ValidationError(msg)) => {
            let html = FormTemplate {
                title: FORM_TITLE,
                email: &user.email,
                is_admin: user.is_admin,
                error: Some(msg.as_str()),
                subject: &form.subject,
                description: &form.description,
            }
            .render()
            .map_err(render_error)?;
            Ok(HttpResponse::BadRequest()
                .content_type("text/html; charset=utf-8")
                .body(html))
        }
        Err(e) => Err(e.into()),
    }
}

/// Everyone's visible complaints, newest first.
pub async fn list_complaints(
    user: SessionUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let complaints = data.complaints.list()?;
    render(ListTemplate {
        title: "Complaints",
        email: &user.email,
        is_admin: user.is_admin,
        complaints: &complaints,
    })
}

/// Starts the OAuth round-trip.
pub async fn login(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    check_ip(&req, &data)?;
    let url = data.auth.begin_login()?;
    Ok(HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, url))
        .finish())
}

/// Provider redirect target: verifies state, resolves the email, opens a session.
pub async fn callback(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, ApiError> {
    check_ip(&req, &data)?;
    let email = data.auth.complete_login(&query.state, &query.code).await?;

    if !data.limiter.allow_email(&email) {
        log::warn!("rate limit exceeded for email: {email}");
        return Err(AppError::RateLimitExceeded(
            "Too many requests from this email. Please try again later.".to_string(),
        )
        .into());
    }

    let token = data.auth.create_session(&email)?;
    log::info!("{email} logged in");
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(session_cookie(token, data.auth.secure_cookies()))
        .finish())
}

/// Drops the server-side session (if any) and clears the cookie.
pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        data.auth.delete_session(cookie.value());
    }
    let mut removal = session_cookie(String::new(), data.auth.secure_cookies());
    removal.make_removal();
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(removal)
        .finish()
}

/// Every complaint, hidden ones included, with hide/unhide controls.
pub async fn admin_panel(
    AdminUser(admin): AdminUser,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let complaints = data.complaints.list_all()?;
    render(AdminTemplate {
        title: "Admin Panel",
        email: &admin.email,
        is_admin: true,
        complaints: &complaints,
    })
}

pub async fn toggle_hidden(
    AdminUser(admin): AdminUser,
    data: web::Data<AppState>,
    form: web::Form<ToggleForm>,
) -> Result<HttpResponse, ApiError> {
    let hidden = form.hidden.as_deref() == Some("true");
    data.complaints.set_hidden(form.id, hidden)?;
    log::info!(
        "{} set complaint #{} hidden={hidden}",
        admin.email,
        form.id
    );
    Ok(see_other("/admin"))
}

fn check_ip(req: &HttpRequest, data: &AppState) -> Result<(), ApiError> {
    let ip = client_ip(req);
    if data.limiter.allow_ip(&ip) {
        return Ok(());
    }
    log::warn!("rate limit exceeded for ip: {ip}");
    Err(AppError::RateLimitExceeded("Too many requests. Please try again later.".to_string()).into())
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()
}

fn see_other(location: &'static str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn render(page: impl Template) -> Result<HttpResponse, ApiError> {
    let html = page.render().map_err(render_error)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

fn render_error(err: askama::Error) -> ApiError {
    AppError::Internal(format!("template rendering failed: {err}")).into()
}
