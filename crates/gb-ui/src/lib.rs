//! # gb-ui
//!
//! Askama page templates. Every page extends `layout.html`, which needs
//! `title`, `email` and `is_admin` for the navigation bar.

use askama::Template;
use gb_core::models::Complaint;

#[derive(Template)]
#[template(path = "form.html")]
pub struct FormTemplate<'a> {
    pub title: &'a str,
    pub email: &'a str,
    pub is_admin: bool,
    /// Shown above the form after a rejected submission
    pub error: Option<&'a str>,
    /// Echoed back so a rejected submission does not lose the user's text
    pub subject: &'a str,
    pub description: &'a str,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate<'a> {
    pub title: &'a str,
    pub email: &'a str,
    pub is_admin: bool,
    pub complaints: &'a [Complaint],
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate<'a> {
    pub title: &'a str,
    pub email: &'a str,
    pub is_admin: bool,
    pub complaints: &'a [Complaint],
}
