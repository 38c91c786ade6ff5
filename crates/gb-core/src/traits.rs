//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//!
//! Store calls are synchronous and must not be cancelled halfway through.

use crate::error::Result;
use crate::models::{AccessToken, Complaint, NewComplaint};
use async_trait::async_trait;

/// Durable complaint storage.
pub trait ComplaintRepo: Send + Sync {
    /// Validates, assigns the next ID and persists. Nothing is kept in memory
    /// unless the write succeeded.
    fn add(&self, draft: NewComplaint) -> Result<Complaint>;

    /// Visible complaints, newest first.
    fn list(&self) -> Result<Vec<Complaint>>;

    /// Every complaint including hidden ones, newest first.
    fn list_all(&self) -> Result<Vec<Complaint>>;

    fn get(&self, id: u64) -> Result<Complaint>;

    /// Flips visibility and persists; the old flag is restored if the write fails.
    fn set_hidden(&self, id: u64, hidden: bool) -> Result<()>;
}

/// Token -> identity mapping for logged-in users.
pub trait SessionStore: Send + Sync {
    fn set(&self, token: &str, identity: &str);
    fn get(&self, token: &str) -> Option<String>;
    fn delete(&self, token: &str);
}

/// Admission control keyed by an arbitrary string.
pub trait RateLimiter: Send + Sync {
    /// Records the attempt and returns whether it fits in the current window.
    /// Rejected attempts are not recorded.
    fn allow(&self, key: &str) -> bool;

    fn allow_ip(&self, ip: &str) -> bool {
        self.allow(&format!("ip:{ip}"))
    }

    fn allow_email(&self, email: &str) -> bool {
        self.allow(&format!("email:{email}"))
    }
}

/// External OAuth provider: authorization redirect, code exchange, identity lookup.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to; `state` must come back unchanged on the callback.
    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange(&self, code: &str) -> Result<AccessToken>;

    /// Returns the verified email address of the token owner.
    async fn fetch_identity(&self, token: &AccessToken) -> Result<String>;
}
