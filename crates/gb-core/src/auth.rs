//! # Auth Manager
//!
//! Orchestrates the OAuth login round-trip on top of the `IdentityProvider`
//! and `SessionStore` ports:
//!
//! 1. `begin_login` issues a one-time state and returns the provider URL.
//! 2. `complete_login` consumes that state, exchanges the code, fetches the
//!    email and checks it against the configured [`EmailPolicy`].
//! 3. `create_session` mints an opaque token for the verified email.

use crate::error::{AppError, Result};
use crate::models::AccessToken;
use crate::traits::{IdentityProvider, SessionStore};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Session tokens carry 256 bits of entropy.
const SESSION_TOKEN_BYTES: usize = 32;
const STATE_BYTES: usize = 16;
/// How long a login may sit at the provider before its state is discarded.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(600);

/// Which verified emails may sign in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EmailPolicy {
    /// Anyone the provider vouches for.
    #[default]
    Any,
    /// Exact match on the domain part, case-insensitive (`corp.example`).
    Domain(String),
    /// Case-insensitive substring anywhere in the address.
    Contains(String),
}

impl EmailPolicy {
    pub fn permits(&self, email: &str) -> bool {
        let email = email.trim().to_ascii_lowercase();
        match self {
            EmailPolicy::Any => !email.is_empty(),
            EmailPolicy::Domain(domain) => email
                .rsplit_once('@')
                .is_some_and(|(local, host)| {
                    let domain = domain.trim().trim_start_matches('@');
                    !local.is_empty() && !domain.is_empty() && host.eq_ignore_ascii_case(domain)
                }),
            EmailPolicy::Contains(fragment) => email.contains(&fragment.to_ascii_lowercase()),
        }
    }
}

/// One-time OAuth `state` values awaiting their callback.
pub struct PendingStates {
    issued: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl PendingStates {
    pub fn new(ttl: Duration) -> Self {
        Self {
            issued: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Generates and registers a fresh state. Expired entries are pruned first.
    pub fn issue(&self) -> Result<String> {
        let state = random_token(STATE_BYTES)?;
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        issued.retain(|_, at| at.elapsed() < ttl);
        issued.insert(state.clone(), Instant::now());
        Ok(state)
    }

    /// Succeeds exactly once per issued state.
    pub fn consume(&self, state: &str) -> Result<()> {
        if state.is_empty() {
            return Err(AppError::InvalidState);
        }
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        match issued.remove(state) {
            Some(at) if at.elapsed() < self.ttl => Ok(()),
            _ => Err(AppError::InvalidState),
        }
    }

    pub fn pending(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for PendingStates {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_TTL)
    }
}

pub struct AuthManager {
    provider: Box<dyn IdentityProvider>,
    sessions: Box<dyn SessionStore>,
    states: PendingStates,
    policy: EmailPolicy,
    admin_email: Option<String>,
    secure_cookies: bool,
}

impl AuthManager {
    pub fn new(provider: Box<dyn IdentityProvider>, sessions: Box<dyn SessionStore>) -> Self {
        Self {
            provider,
            sessions,
            states: PendingStates::default(),
            policy: EmailPolicy::Any,
            admin_email: None,
            secure_cookies: false,
        }
    }

    pub fn with_policy(mut self, policy: EmailPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_admin(mut self, admin_email: Option<String>) -> Self {
        self.admin_email = admin_email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Cookies get the `Secure` flag when the app is served over https.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.states = PendingStates::new(ttl);
        self
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }

    pub fn login_url(&self, state: &str) -> Result<String> {
        self.provider.authorize_url(state)
    }

    /// Issues a pending state and returns the provider URL bound to it.
    pub fn begin_login(&self) -> Result<String> {
        let state = self.states.issue()?;
        self.login_url(&state)
    }

    pub fn consume_state(&self, state: &str) -> Result<()> {
        self.states.consume(state)
    }

    pub async fn exchange(&self, code: &str) -> Result<AccessToken> {
        self.provider.exchange(code).await.map_err(as_external)
    }

    pub async fn fetch_identity(&self, token: &AccessToken) -> Result<String> {
        let email = self
            .provider
            .fetch_identity(token)
            .await
            .map_err(as_external)?;
        if email.trim().is_empty() {
            return Err(AppError::ExternalAuth("no email found".to_string()));
        }
        Ok(email)
    }

    /// Runs the callback half of the login and returns the verified email.
    pub async fn complete_login(&self, state: &str, code: &str) -> Result<String> {
        self.consume_state(state)?;
        if code.is_empty() {
            return Err(AppError::ValidationError("missing code".to_string()));
        }

        let token = self.exchange(code).await.inspect_err(|e| {
            log::warn!("token exchange failed: {e}");
        })?;
        let email = self.fetch_identity(&token).await.inspect_err(|e| {
            log::warn!("email fetch failed: {e}");
        })?;

        if !self.policy.permits(&email) {
            log::warn!("access denied for {email}: rejected by email policy");
            return Err(AppError::Unauthorized(
                "this email is not allowed to sign in".to_string(),
            ));
        }
        Ok(email)
    }

    /// Mints a session token for `email` and records it.
    pub fn create_session(&self, email: &str) -> Result<String> {
        let token = random_token(SESSION_TOKEN_BYTES)?;
        self.sessions.set(&token, email);
        Ok(token)
    }

    pub fn session(&self, token: &str) -> Option<String> {
        self.sessions.get(token)
    }

    pub fn delete_session(&self, token: &str) {
        self.sessions.delete(token);
    }
}

fn as_external(err: AppError) -> AppError {
    match err {
        AppError::ExternalAuth(_) => err,
        other => AppError::ExternalAuth(other.to_string()),
    }
}

/// URL-safe, unpadded base64 of `len` random bytes from the OS.
pub fn random_token(len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf)
        .map_err(|e| AppError::Internal(format!("entropy source failed: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}
