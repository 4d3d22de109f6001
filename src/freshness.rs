//! Access-token freshness: decide whether the session's token is usable and
//! refresh it ahead of expiry.
//!
//! Every failure path (no token, no refresh token, provider rejection,
//! transport error, timeout) collapses to `false` at the public boundary; the
//! reason is logged. Callers treat `false` as "unauthenticated".

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::error::Error;
use crate::oauth::{IdentityProvider, TokenResponse};
use crate::session::Session;

/// Default safety margin before expiry.
pub const DEFAULT_SKEW: Duration = Duration::seconds(300);

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3599);

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Why a refresh did not happen.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token in session")]
    MissingRefreshToken,

    #[error("provider rejected refresh: {error} - {description}")]
    Rejected { error: String, description: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

impl RefreshError {
    /// The refresh token is dead and the user has to sign in again.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            Self::MissingRefreshToken => true,
            Self::Rejected { error, .. } => {
                matches!(error.as_str(), "invalid_grant" | "interaction_required")
            }
            Self::Transport(_) | Self::Timeout(_) => false,
        }
    }
}

/// Whether the session's token expires within `skew` of `now`.
///
/// Absent or unreadable expiry counts as expiring. A remaining lifetime of
/// exactly `skew` does not.
#[must_use]
pub fn is_expiring_soon_at(session: &Session, skew: Duration, now: OffsetDateTime) -> bool {
    match session.expires_at() {
        None => {
            tracing::warn!("No token expiration time in session");
            true
        }
        Some(Err(e)) => {
            tracing::error!(error = %e, "Unreadable token expiration time");
            true
        }
        Some(Ok(expires_at)) => {
            let remaining = expires_at - now;
            tracing::debug!(
                remaining_secs = remaining.whole_seconds(),
                "Token lifetime remaining"
            );
            remaining < skew
        }
    }
}

/// Absolute expiry for a token issued at `now` with lifetime `expires_in`.
#[must_use]
pub fn expiry_after(now: OffsetDateTime, expires_in: Option<u64>) -> OffsetDateTime {
    let lifetime = expires_in
        .and_then(|secs| i64::try_from(secs).ok())
        .map_or(DEFAULT_EXPIRES_IN, Duration::seconds);
    now.checked_add(lifetime)
        .unwrap_or_else(|| now + DEFAULT_EXPIRES_IN)
}

/// Session token freshness controller.
pub struct TokenFreshness<P> {
    provider: Arc<P>,
    skew: Duration,
    timeout: std::time::Duration,
}

// Manual Clone: avoid derive adding a `P: Clone` bound.
impl<P> Clone for TokenFreshness<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            skew: self.skew,
            timeout: self.timeout,
        }
    }
}

impl<P: IdentityProvider> TokenFreshness<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            skew: DEFAULT_SKEW,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn skew(&self) -> Duration {
        self.skew
    }

    #[must_use]
    pub fn is_expiring_soon(&self, session: &Session) -> bool {
        is_expiring_soon_at(session, self.skew, OffsetDateTime::now_utc())
    }

    /// Redeem the stored refresh token. On failure the session is left untouched.
    pub async fn refresh(&self, session: &mut Session) -> bool {
        match self.try_refresh(session).await {
            Ok(()) => {
                tracing::info!("Access token refreshed successfully");
                true
            }
            Err(e) => {
                if e.requires_reauthentication() {
                    tracing::warn!(reason = %e, "Token refresh failed, re-authentication required");
                } else {
                    tracing::error!(reason = %e, "Token refresh failed");
                }
                false
            }
        }
    }

    /// [`refresh`](Self::refresh) with the failure reason kept.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] describing why no new token was stored.
    pub async fn try_refresh(&self, session: &mut Session) -> Result<(), RefreshError> {
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let call = self
            .provider
            .refresh_with(&refresh_token, self.provider.scopes());
        let response = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => return Err(RefreshError::Timeout(self.timeout)),
            Ok(Err(Error::Provider {
                error, description, ..
            })) => return Err(RefreshError::Rejected { error, description }),
            Ok(Err(e)) => return Err(RefreshError::Transport(e.to_string())),
            Ok(Ok(response)) => response,
        };

        apply_refresh(session, response, OffsetDateTime::now_utc())
    }

    /// Make sure the session holds a token valid for at least the skew window.
    pub async fn ensure_fresh(&self, session: &mut Session) -> bool {
        if session.access_token.is_none() {
            tracing::warn!("No access token in session");
            return false;
        }

        if self.is_expiring_soon(session) {
            tracing::info!("Token expiring soon, attempting refresh");
            return self.refresh(session).await;
        }

        true
    }
}

fn apply_refresh(
    session: &mut Session,
    response: TokenResponse,
    now: OffsetDateTime,
) -> Result<(), RefreshError> {
    if response.access_token.is_empty() {
        return Err(RefreshError::Rejected {
            error: "missing_access_token".into(),
            description: "token response carried no access token".into(),
        });
    }

    session.set_access_token(response.access_token, expiry_after(now, response.expires_in));
    // Rolling refresh: the provider may have invalidated the old one.
    if let Some(rotated) = response.refresh_token {
        session.refresh_token = Some(rotated);
    }
    Ok(())
}
