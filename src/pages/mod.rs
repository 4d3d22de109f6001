//! Calendar pages and the protected profile routes.

mod render;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::calendar::{month_name, month_weeks};
use crate::catalog::START_YEAR;
use crate::middleware::{ApiAuth, AppState, AuthError, CurrentSession, PageAuth, SessionStore};
use crate::oauth::{IdentityProvider, UserProfile};

use render::{CalendarView, Chrome};

pub(crate) fn page_routes<P, S>() -> Router<AppState<P, S>>
where
    P: IdentityProvider,
    S: SessionStore,
{
    Router::new()
        .route("/", get(select_year::<P, S>))
        .route("/select_month", post(select_month::<P, S>))
        .route("/calendar", post(calendar::<P, S>))
        .route("/profile", get(profile::<P, S>))
        .route("/api/me", get(api_me::<P, S>))
}

/// Flashes and the signed-in name for the page frame. Takes the flashes.
async fn chrome<P, S>(state: &AppState<P, S>, CurrentSession(context): CurrentSession) -> Chrome {
    let mut session = context.handle.lock().await;
    Chrome {
        user_name: session
            .is_authenticated()
            .then(|| session.user_name.clone().unwrap_or_else(|| "User".into())),
        flashes: session.take_flashes(),
        auth_path: state.settings.auth_path.clone(),
    }
}

async fn select_year<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    current: CurrentSession,
) -> Html<String> {
    let this_year = OffsetDateTime::now_utc().year();
    let years: Vec<i32> = (START_YEAR..=this_year).collect();
    Html(render::select_year(&chrome(&state, current).await, &years))
}

#[derive(Deserialize)]
struct YearForm {
    year: String,
}

async fn select_month<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    current: CurrentSession,
    Form(form): Form<YearForm>,
) -> Result<Html<String>, AuthError> {
    let year = parse_year(&form.year)?;
    Ok(Html(render::select_month(&chrome(&state, current).await, year)))
}

#[derive(Deserialize)]
struct CalendarForm {
    year: String,
    month: String,
}

async fn calendar<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    current: CurrentSession,
    Form(form): Form<CalendarForm>,
) -> Result<Html<String>, AuthError> {
    let year = parse_year(&form.year)?;
    let month: u8 = form
        .month
        .trim()
        .parse()
        .map_err(|_| AuthError::BadRequest(format!("invalid month: {}", form.month)))?;
    let name = month_name(month)
        .ok_or_else(|| AuthError::BadRequest(format!("invalid month: {month}")))?;
    let weeks = month_weeks(year, month).map_err(|e| AuthError::BadRequest(e.to_string()))?;
    let movies = state.movies.movies_for_month(year, month).await;
    tracing::debug!(year, month, count = movies.len(), "Rendering calendar");

    let view = CalendarView {
        year,
        month_name: &name,
        weeks: &weeks,
        movies: &movies,
    };
    Ok(Html(render::calendar(&chrome(&state, current).await, &view)))
}

async fn profile<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    PageAuth(user): PageAuth,
) -> Html<String> {
    let page = chrome(&state, CurrentSession(user.session.clone())).await;
    Html(render::profile(&page, &user))
}

/// Graph `/me` for the signed-in user, called with the fresh token.
async fn api_me<P: IdentityProvider, S: SessionStore>(
    State(state): State<AppState<P, S>>,
    ApiAuth(user): ApiAuth,
) -> Result<Json<UserProfile>, AuthError> {
    let profile = state
        .bounded("userinfo request", state.provider.user_profile(&user.access_token))
        .await?;
    Ok(Json(profile))
}

fn parse_year(raw: &str) -> Result<i32, AuthError> {
    raw.trim()
        .parse()
        .map_err(|_| AuthError::BadRequest(format!("invalid year: {raw}")))
}
