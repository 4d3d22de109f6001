use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;

use super::config::AppSettings;
use super::cookies;
use super::error::AuthError;
use super::extractor::{CurrentSession, authorize, session_layer};
use super::state::AppState;
use super::traits::SessionStore;
use crate::csrf;
use crate::freshness::expiry_after;
use crate::oauth::IdentityProvider;
use crate::session::FlashLevel;
use crate::sharepoint::SharePointClient;

/// Build the full application router: pages, auth routes, and the session layer.
pub fn app_router<P, S>(settings: AppSettings, provider: P, sessions: S) -> Router
where
    P: IdentityProvider,
    S: SessionStore,
{
    let state = AppState::new(settings, provider, sessions);

    Router::new()
        .merge(crate::pages::page_routes::<P, S>())
        .merge(auth_routes::<P, S>(&state.settings.auth_path))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_layer::<P, S>,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Login, callback, logout, and keep-alive routes under `auth_path`.
pub(crate) fn auth_routes<P, S>(auth_path: &str) -> Router<AppState<P, S>>
where
    P: IdentityProvider,
    S: SessionStore,
{
    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<P, S>))
        .route(&format!("{auth_path}/redirect"), get(callback::<P, S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<P, S>).post(logout::<P, S>),
        )
        .route(&format!("{auth_path}/ping"), get(ping::<P, S>))
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    CurrentSession(context): CurrentSession,
) -> Redirect {
    let home = &state.settings.home_path;
    let mut session = context.handle.lock().await;

    if !state.provider.is_configured() {
        tracing::warn!("Login attempted but OAuth not configured");
        session.flash(
            FlashLevel::Error,
            "OAuth authentication is not configured. Set the Azure AD client credentials and try again.",
        );
        return Redirect::to(home);
    }

    session.clear_for_login();
    let csrf_state = csrf::generate_state();

    match state.provider.authorization_url(&csrf_state) {
        Ok(url) => {
            session.oauth_state = Some(csrf_state);
            tracing::info!("Redirecting to identity provider login");
            Redirect::to(&url)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initiate OAuth login");
            session.flash(
                FlashLevel::Error,
                "Authentication system is not properly configured. Please check your Azure AD settings.",
            );
            Redirect::to(home)
        }
    }
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    CurrentSession(context): CurrentSession,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let home = state.settings.home_path.clone();
    let mut session = context.handle.lock().await;

    let expected_state = session.oauth_state.take();
    let state_matches = matches!(
        (&params.state, &expected_state),
        (Some(received), Some(expected)) if received == expected
    );
    if !state_matches {
        tracing::error!("CSRF state mismatch");
        session.clear();
        session.flash(
            FlashLevel::Error,
            "Invalid state parameter. Please try logging in again.",
        );
        return Redirect::to(&home);
    }

    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("No description");
        tracing::error!(error = %error, description = %desc, "OAuth error from identity provider");
        session.flash(FlashLevel::Error, format!("Authentication error: {desc}"));
        return Redirect::to(&home);
    }

    let Some(code) = params.code else {
        tracing::error!("No authorization code received");
        session.flash(
            FlashLevel::Error,
            "No authorization code received. Please try again.",
        );
        return Redirect::to(&home);
    };

    let tokens = match state
        .bounded("token exchange", state.provider.exchange_code(&code))
        .await
    {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Token acquisition failed");
            session.flash(
                FlashLevel::Error,
                "Failed to acquire token. Please try again.",
            );
            return Redirect::to(&home);
        }
    };

    let expires_at = expiry_after(OffsetDateTime::now_utc(), tokens.expires_in);
    session.set_access_token(tokens.access_token.clone(), expires_at);
    session.refresh_token = tokens.refresh_token;

    match state
        .bounded("userinfo request", state.provider.user_profile(&tokens.access_token))
        .await
    {
        Ok(profile) => {
            session.user_email = profile.email().map(str::to_string);
            session.user_name = Some(profile.display_name.unwrap_or_else(|| "User".into()));
            tracing::info!(user = ?session.user_email, "User logged in");

            if let Some(target) = &state.settings.sharepoint {
                let mut client = SharePointClient::new(
                    state.http.clone(),
                    &target.site_url,
                    &tokens.access_token,
                );
                if let Some(graph_url) = &state.settings.graph_url {
                    client = client.with_graph_url(graph_url);
                }
                let email = session.user_email.clone().unwrap_or_default();
                let name = session.user_name.clone().unwrap_or_default();
                if client
                    .log_login_activity(&target.list_id, &email, &name, "User")
                    .await
                {
                    tracing::info!(user = %email, "Login activity logged");
                } else {
                    tracing::warn!(user = %email, "Failed to log login activity");
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch user info");
            session.user_name = Some("User".into());
        }
    }

    session.flash(FlashLevel::Success, "Successfully logged in!");
    let next = session.next_url.take().filter(|url| is_local_path(url));
    Redirect::to(next.as_deref().unwrap_or(&home))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    jar: PrivateCookieJar,
    CurrentSession(context): CurrentSession,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let user = {
        let mut session = context.handle.lock().await;
        let user = session.user_email.take();
        session.clear();
        user
    };
    state.sessions.delete(&context.id).await?;

    // Fresh session id so the signed-out browser never reuses the old one.
    let (id, handle) = state.sessions.create().await?;
    handle
        .lock()
        .await
        .flash(FlashLevel::Info, "Successfully logged out.");
    let cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        id.as_str(),
        state.settings.secure_cookies,
    );
    tracing::info!(user = user.as_deref().unwrap_or("Unknown user"), "User logged out");

    Ok((jar.add(cookie), Redirect::to(&state.settings.home_path)))
}

// ── Ping ───────────────────────────────────────────────────────────

/// Keep-alive polled by pages to refresh the token before it lapses.
async fn ping<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    CurrentSession(context): CurrentSession,
) -> Response {
    let signed_in = context.handle.lock().await.is_authenticated();
    if !signed_in {
        tracing::warn!("Ping received without active session");
        return unauthorized();
    }

    match authorize(&state.freshness, context).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(_) => {
            tracing::warn!("Token refresh failed in ping");
            unauthorized()
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": "unauthorized" })),
    )
        .into_response()
}

/// Only same-site absolute paths are followed after login.
fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/profile"));
        assert!(is_local_path("/calendar?year=2024"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path(""));
    }
}
