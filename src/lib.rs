#![doc = include_str!("../README.md")]

pub mod calendar;
pub mod catalog;
pub mod csrf;
pub mod error;
pub mod freshness;
pub mod middleware;
pub mod movie_store;
pub mod oauth;
pub mod omdb;
mod pages;
pub mod session;
pub mod sharepoint;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
pub use freshness::{RefreshError, TokenFreshness, is_expiring_soon_at};
pub use movie_store::{CalendarEntry, Movie, MovieStore};
pub use oauth::{AuthClient, IdentityProvider, OAuthConfig, TokenResponse, UserProfile};
pub use omdb::{OmdbClient, OmdbMovie};
pub use session::{Flash, FlashLevel, MemorySessionStore, Session, SessionHandle};
pub use sharepoint::SharePointClient;
pub use types::SessionId;
