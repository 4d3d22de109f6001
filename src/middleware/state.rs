use std::future::Future;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AppSettings;
use super::traits::SessionStore;
use crate::error::Error;
use crate::freshness::TokenFreshness;
use crate::movie_store::MovieStore;
use crate::oauth::IdentityProvider;

/// Shared state for route handlers.
pub(crate) struct AppState<P, S> {
    pub(crate) provider: Arc<P>,
    pub(crate) freshness: TokenFreshness<P>,
    pub(crate) sessions: Arc<S>,
    pub(crate) movies: MovieStore,
    pub(crate) http: reqwest::Client,
    pub(crate) settings: AppSettings,
}

impl<P: IdentityProvider, S: SessionStore> AppState<P, S> {
    pub(crate) fn new(settings: AppSettings, provider: P, sessions: S) -> Self {
        let provider = Arc::new(provider);
        let freshness = TokenFreshness::new(provider.clone())
            .with_skew(settings.token_skew)
            .with_timeout(settings.provider_timeout);
        let http = crate::oauth::timed_client(settings.provider_timeout);

        Self {
            provider,
            freshness,
            sessions: Arc::new(sessions),
            movies: MovieStore::new(settings.movie_file.clone()),
            http,
            settings,
        }
    }
}

impl<P, S> AppState<P, S> {
    /// Run an outbound call made while a session lock is held, bounded by the provider timeout.
    pub(crate) async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        let after = self.settings.provider_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| Error::Timeout { operation, after })?
    }
}

// Manual Clone: avoid derive adding `P: Clone, S: Clone` bounds.
impl<P, S> Clone for AppState<P, S> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            freshness: self.freshness.clone(),
            sessions: self.sessions.clone(),
            movies: self.movies.clone(),
            http: self.http.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<P: IdentityProvider, S: SessionStore> FromRef<AppState<P, S>> for Key {
    fn from_ref(state: &AppState<P, S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
