//! # gb-auth-google
//!
//! Google OAuth 2.0 implementation of `IdentityProvider`.
//! Only the `userinfo.email` scope is requested; the verified address is the
//! user's identity everywhere else in the app.

use async_trait::async_trait;
use gb_core::error::{AppError, Result};
use gb_core::models::AccessToken;
use gb_core::traits::IdentityProvider;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";
/// Path the provider redirects back to, relative to the public base URL.
pub const CALLBACK_PATH: &str = "/auth/google/callback";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleOAuthConfig {
    /// Google endpoints with the callback mounted under `base_url`.
    pub fn new(client_id: impl Into<String>, client_secret: SecretString, base_url: &str) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: format!("{}{CALLBACK_PATH}", base_url.trim_end_matches('/')),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    verified_email: Option<bool>,
}

pub struct GoogleIdentityProvider {
    config: GoogleOAuthConfig,
    client: reqwest::Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GoogleOAuthConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AppError::Internal(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", EMAIL_SCOPE)
            .append_pair("access_type", "online")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange(&self, code: &str) -> Result<AccessToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        log::debug!("exchanging authorization code at {}", self.config.token_url);

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?;
        let token: TokenResponse = response.json().await.map_err(external)?;
        Ok(AccessToken::new(token.access_token))
    }

    async fn fetch_identity(&self, token: &AccessToken) -> Result<String> {
        let info: UserInfo = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        if info.verified_email == Some(false) {
            return Err(AppError::ExternalAuth("email is not verified".to_string()));
        }
        match info.email {
            Some(email) if !email.is_empty() => Ok(email),
            _ => Err(AppError::ExternalAuth("no email found".to_string())),
        }
    }
}

fn external(err: reqwest::Error) -> AppError {
    AppError::ExternalAuth(err.to_string())
}
