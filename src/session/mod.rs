//! Per-browser session state.

mod memory_store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub use memory_store::MemorySessionStore;

/// Shared, serialized access to one session.
///
/// Holding the lock across a token refresh keeps concurrent requests of the
/// same session from redeeming the same rolling refresh token twice.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// State kept for one browser session.
///
/// `token_expires_at` is stored as RFC 3339 text and may be unreadable; the
/// freshness controller treats an unreadable value as expiring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub oauth_state: Option<String>,
    pub next_url: Option<String>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Store an access token together with its absolute expiry.
    pub fn set_access_token(&mut self, access_token: impl Into<String>, expires_at: OffsetDateTime) {
        self.access_token = Some(access_token.into());
        self.token_expires_at = expires_at.format(&Rfc3339).ok();
    }

    /// Parsed expiry. `None` when absent, `Some(Err)` when unreadable.
    pub fn expires_at(&self) -> Option<Result<OffsetDateTime, time::error::Parse>> {
        self.token_expires_at
            .as_deref()
            .map(|raw| OffsetDateTime::parse(raw, &Rfc3339))
    }

    /// Drop everything, including pending flashes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop everything except the post-login redirect target.
    pub fn clear_for_login(&mut self) {
        let next_url = self.next_url.take();
        self.clear();
        self.next_url = next_url;
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    /// Pending flashes; each is shown once.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}
