//! # Domain Models
//!
//! These structs represent the core entities of Gripe Box.
//! Complaint IDs are small sequential integers assigned by the store.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single complaint as stored and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: u64,
    /// Verified email of the submitter
    pub reporter: String,
    pub subject: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Hidden complaints only show up in the admin panel
    #[serde(default)]
    pub hidden: bool,
}

/// What a user submits; the store fills in id, timestamp and visibility.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComplaint {
    #[serde(default)]
    pub reporter: String,
    pub subject: String,
    pub description: String,
}

impl NewComplaint {
    pub fn new(
        reporter: impl Into<String>,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            reporter: reporter.into(),
            subject: subject.into(),
            description: description.into(),
        }
    }

    /// Subject and description are both required. Whitespace alone counts as empty.
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() || self.description.trim().is_empty() {
            return Err(AppError::ValidationError(
                "subject and description required".to_string(),
            ));
        }
        Ok(())
    }

    /// Promotes the draft to a stored record.
    pub fn into_complaint(self, id: u64, created_at: DateTime<Utc>) -> Complaint {
        Complaint {
            id,
            reporter: self.reporter,
            subject: self.subject,
            description: self.description,
            created_at,
            hidden: false,
        }
    }
}

/// Bearer token handed back by the OAuth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}
