//! Session-backed Microsoft sign-in for the calendar's Axum routes.
//!
//! Every request gets a server-side session keyed by an encrypted cookie.
//! Protected handlers take [`ApiAuth`] or [`PageAuth`], which refresh the
//! access token when it is inside the skew window and reject otherwise.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use horror_calendar::middleware::{AppConfig, app_router};
//! use horror_calendar::{AuthClient, MemorySessionStore};
//!
//! let config = AppConfig::from_env()?;
//! let provider = AuthClient::new(config.oauth);
//! let app = app_router(config.settings, provider, MemorySessionStore::new());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod traits;

pub use config::{AppConfig, AppSettings, SharePointTarget};
pub use error::AuthError;
pub use extractor::{ApiAuth, AuthUser, CurrentSession, PageAuth, SessionContext};
pub use routes::app_router;
pub use traits::SessionStore;

pub(crate) use state::AppState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
