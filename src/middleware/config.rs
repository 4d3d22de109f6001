use std::path::PathBuf;

use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::freshness::{DEFAULT_PROVIDER_TIMEOUT, DEFAULT_SKEW};
use crate::oauth::OAuthConfig;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/auth/redirect";
const DEFAULT_MOVIE_FILE: &str = "horror_movies_2020_today.txt";

/// SharePoint list that receives login activity rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePointTarget {
    pub site_url: String,
    pub list_id: String,
}

/// Runtime settings shared by all routes.
#[derive(Clone)]
pub struct AppSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) home_path: String,
    pub(crate) token_skew: time::Duration,
    pub(crate) provider_timeout: std::time::Duration,
    pub(crate) sharepoint: Option<SharePointTarget>,
    pub(crate) graph_url: Option<String>,
    pub(crate) movie_file: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__horror_session".into(),
            secure_cookies: true,
            auth_path: "/auth".into(),
            home_path: "/".into(),
            token_skew: DEFAULT_SKEW,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            sharepoint: None,
            graph_url: None,
            movie_file: DEFAULT_MOVIE_FILE.into(),
        }
    }
}

impl AppSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_skew(mut self, skew: time::Duration) -> Self {
        self.token_skew = skew;
        self
    }

    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_sharepoint(mut self, target: Option<SharePointTarget>) -> Self {
        self.sharepoint = target;
        self
    }

    /// Override the Microsoft Graph base URL used for SharePoint writes.
    #[must_use]
    pub fn with_graph_url(mut self, url: impl Into<String>) -> Self {
        self.graph_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_movie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.movie_file = path.into();
        self
    }

    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.session_cookie_name
    }

    #[must_use]
    pub fn provider_timeout(&self) -> std::time::Duration {
        self.provider_timeout
    }

    #[must_use]
    pub fn sharepoint(&self) -> Option<&SharePointTarget> {
        self.sharepoint.as_ref()
    }

    #[must_use]
    pub fn movie_file(&self) -> &std::path::Path {
        &self.movie_file
    }
}

/// Application configuration read from the environment.
pub struct AppConfig {
    pub oauth: OAuthConfig,
    pub settings: AppSettings,
    pub omdb_api_key: Option<String>,
}

impl AppConfig {
    /// Create config from environment variables.
    ///
    /// # OAuth
    /// - `CLIENT_ID` or `AZURE_CLIENT_ID`
    /// - `TENANT_ID` or `AZURE_TENANT_ID`
    /// - `O365_CLIENT_SECRET` or `AZURE_CLIENT_SECRET`
    /// - `REDIRECT_URI` (default `http://localhost:5000/auth/redirect`)
    /// - `OAUTH_SCOPES`: comma-separated scopes
    /// - `OAUTH_AUTHORITY`: override the authority URL
    ///
    /// Missing OAuth credentials are logged, not fatal: login then reports
    /// that sign-in is not configured.
    ///
    /// # Other
    /// - `SP_SITE_URL`, `SP_LOG_LIST_ID`: SharePoint activity log (both required to enable)
    /// - `OMDB_API_KEY`, `MOVIE_FILE`
    /// - `TOKEN_SKEW_SECS`, `PROVIDER_TIMEOUT_SECS`
    /// - `DEV_AUTH`: `"1"` or `"true"` disables secure cookies
    /// - `COOKIE_KEY`: cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a URL, number, or cookie key is malformed.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| var(k));

        let client_id = first(&["CLIENT_ID", "AZURE_CLIENT_ID"]);
        let tenant_id = first(&["TENANT_ID", "AZURE_TENANT_ID"]);
        let client_secret = first(&["O365_CLIENT_SECRET", "AZURE_CLIENT_SECRET"]);

        let mut missing = Vec::new();
        if client_id.is_none() {
            missing.push("CLIENT_ID or AZURE_CLIENT_ID");
        }
        if tenant_id.is_none() {
            missing.push("TENANT_ID or AZURE_TENANT_ID");
        }
        if client_secret.is_none() {
            missing.push("O365_CLIENT_SECRET or AZURE_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            tracing::warn!(missing = %missing.join(", "), "OAuth configuration incomplete");
        }

        let redirect_uri: Url = var("REDIRECT_URI")
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.into())
            .parse()
            .map_err(|e| AuthError::Config(format!("REDIRECT_URI: {e}")))?;

        let mut oauth = OAuthConfig::new(
            client_id.unwrap_or_default(),
            client_secret.unwrap_or_default(),
            tenant_id.unwrap_or_default(),
            redirect_uri,
        );
        if let Some(authority) = var("OAUTH_AUTHORITY") {
            oauth = oauth.with_authority(authority);
        }
        if let Some(scopes) = var("OAUTH_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let dev_auth = matches!(var("DEV_AUTH").as_deref(), Some("1" | "true"));

        let cookie_key = match var("COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            None => Key::generate(),
        };

        let sharepoint = match (var("SP_SITE_URL"), var("SP_LOG_LIST_ID")) {
            (Some(site_url), Some(list_id)) => Some(SharePointTarget { site_url, list_id }),
            _ => {
                tracing::warn!("SharePoint logging not configured (missing SP_SITE_URL or SP_LOG_LIST_ID)");
                None
            }
        };

        let mut settings = AppSettings::new()
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth)
            .with_sharepoint(sharepoint);

        if let Some(path) = var("MOVIE_FILE") {
            settings = settings.with_movie_file(path);
        }
        if let Some(secs) = var("TOKEN_SKEW_SECS") {
            let secs: i64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("TOKEN_SKEW_SECS: {e}")))?;
            settings = settings.with_token_skew(time::Duration::seconds(secs));
        }
        if let Some(secs) = var("PROVIDER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| AuthError::Config(format!("PROVIDER_TIMEOUT_SECS: {e}")))?;
            settings = settings.with_provider_timeout(std::time::Duration::from_secs(secs));
        }

        Ok(Self {
            oauth,
            settings,
            omdb_api_key: var("OMDB_API_KEY"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AuthError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = config_from(&[]).unwrap();

        assert!(!config.oauth.is_configured());
        assert_eq!(config.oauth.redirect_uri().as_str(), DEFAULT_REDIRECT_URI);
        assert!(config.settings.secure_cookies);
        assert_eq!(config.settings.token_skew, DEFAULT_SKEW);
        assert!(config.settings.sharepoint().is_none());
        assert_eq!(config.settings.movie_file().to_str(), Some(DEFAULT_MOVIE_FILE));
        assert!(config.omdb_api_key.is_none());
    }

    #[test]
    fn test_azure_fallback_names() {
        let config = config_from(&[
            ("AZURE_CLIENT_ID", "cid"),
            ("AZURE_TENANT_ID", "contoso"),
            ("AZURE_CLIENT_SECRET", "s3cret"),
        ])
        .unwrap();

        assert!(config.oauth.is_configured());
        assert_eq!(config.oauth.client_id(), "cid");
        assert_eq!(config.oauth.authority(), "https://login.microsoftonline.com/contoso");
    }

    #[test]
    fn test_primary_names_win() {
        let config = config_from(&[
            ("CLIENT_ID", "primary"),
            ("AZURE_CLIENT_ID", "fallback"),
        ])
        .unwrap();
        assert_eq!(config.oauth.client_id(), "primary");
    }

    #[test]
    fn test_scopes_sharepoint_and_tuning() {
        let config = config_from(&[
            ("OAUTH_SCOPES", "User.Read, Sites.ReadWrite.All,"),
            ("SP_SITE_URL", "https://contoso.sharepoint.com/sites/Apps"),
            ("SP_LOG_LIST_ID", "list-guid"),
            ("TOKEN_SKEW_SECS", "120"),
            ("PROVIDER_TIMEOUT_SECS", "3"),
            ("DEV_AUTH", "true"),
            ("MOVIE_FILE", "/tmp/movies.txt"),
        ])
        .unwrap();

        assert_eq!(config.oauth.scopes(), &["User.Read", "Sites.ReadWrite.All"]);
        assert_eq!(
            config.settings.sharepoint(),
            Some(&SharePointTarget {
                site_url: "https://contoso.sharepoint.com/sites/Apps".into(),
                list_id: "list-guid".into(),
            })
        );
        assert_eq!(config.settings.token_skew, time::Duration::seconds(120));
        assert_eq!(config.settings.provider_timeout, std::time::Duration::from_secs(3));
        assert!(!config.settings.secure_cookies);
        assert_eq!(config.settings.movie_file().to_str(), Some("/tmp/movies.txt"));
    }

    #[test]
    fn test_sharepoint_needs_both_values() {
        let config = config_from(&[("SP_SITE_URL", "https://contoso.sharepoint.com/sites/Apps")])
            .unwrap();
        assert!(config.settings.sharepoint().is_none());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(matches!(
            config_from(&[("REDIRECT_URI", "not a url")]),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("TOKEN_SKEW_SECS", "five")]),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("COOKIE_KEY", "short")]),
            Err(AuthError::Config(_))
        ));
    }
}
