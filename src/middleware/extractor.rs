use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::error::AuthError;
use super::state::AppState;
use super::traits::SessionStore;
use crate::freshness::TokenFreshness;
use crate::oauth::IdentityProvider;
use crate::session::SessionHandle;
use crate::types::SessionId;

/// The browser session attached to the current request.
#[derive(Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub handle: SessionHandle,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").field("id", &self.id).finish()
    }
}

/// Attach a session to every request, creating one (and its cookie) on first visit.
pub(crate) async fn session_layer<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Result<(PrivateCookieJar, Response), AuthError> {
    let existing = match jar.get(&state.settings.session_cookie_name) {
        Some(cookie) => {
            let id = SessionId(cookie.value().to_string());
            state
                .sessions
                .find(&id)
                .await?
                .map(|handle| SessionContext { id, handle })
        }
        None => None,
    };

    let (context, jar) = match existing {
        Some(context) => (context, jar),
        None => {
            let (id, handle) = state.sessions.create().await?;
            let cookie = cookies::session_cookie(
                &state.settings.session_cookie_name,
                id.as_str(),
                state.settings.secure_cookies,
            );
            (SessionContext { id, handle }, jar.add(cookie))
        }
    };

    request.extensions_mut().insert(context);
    Ok((jar, next.run(request).await))
}

/// Current session, for handlers that work with or without sign-in.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionContext);

impl<St: Send + Sync> FromRequestParts<St> for CurrentSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AuthError::Store("session layer not installed".into()))
    }
}

/// Signed-in user holding an access token valid for at least the skew window.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub session: SessionContext,
    pub access_token: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Guard for API handlers: rejects with `401` when the token cannot be made fresh.
///
/// ```rust,ignore
/// async fn data(ApiAuth(user): ApiAuth) -> impl IntoResponse {
///     call_graph(&user.access_token).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiAuth(pub AuthUser);

/// Guard for page handlers: redirects to the login route when the token
/// cannot be made fresh, remembering where the user was going.
#[derive(Debug, Clone)]
pub struct PageAuth(pub AuthUser);

impl<P: IdentityProvider, S: SessionStore> FromRequestParts<AppState<P, S>> for ApiAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<P, S>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(context) = CurrentSession::from_request_parts(parts, state).await?;
        authorize(&state.freshness, context)
            .await
            .map(Self)
            .map_err(|_| AuthError::Unauthenticated)
    }
}

impl<P: IdentityProvider, S: SessionStore> FromRequestParts<AppState<P, S>> for PageAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<P, S>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(context) = CurrentSession::from_request_parts(parts, state).await?;
        match authorize(&state.freshness, context).await {
            Ok(user) => Ok(Self(user)),
            Err(context) => {
                tracing::warn!(path = %parts.uri.path(), "Unauthenticated access attempt");
                let next = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
                context.handle.lock().await.next_url = Some(next);
                Err(AuthError::LoginRequired {
                    login_path: format!("{}/login", state.settings.auth_path),
                })
            }
        }
    }
}

/// Run the freshness check under the session lock.
///
/// The lock is held across the whole read-refresh-write sequence so two
/// requests of one session never redeem the same refresh token. On failure
/// the context is handed back.
pub(crate) async fn authorize<P: IdentityProvider>(
    freshness: &TokenFreshness<P>,
    context: SessionContext,
) -> Result<AuthUser, SessionContext> {
    let mut session = context.handle.lock().await;
    if !freshness.ensure_fresh(&mut session).await {
        drop(session);
        return Err(context);
    }
    let Some(access_token) = session.access_token.clone() else {
        drop(session);
        return Err(context);
    };
    let user_name = session.user_name.clone();
    let user_email = session.user_email.clone();
    drop(session);

    Ok(AuthUser {
        session: context,
        access_token,
        user_name,
        user_email,
    })
}
