use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::freshness::DEFAULT_PROVIDER_TIMEOUT;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Scopes the Microsoft identity platform always needs for a refreshable sign-in.
const RESERVED_SCOPES: [&str; 3] = ["offline_access", "openid", "profile"];

const PLACEHOLDER_VALUES: [&str; 3] = [
    "placeholder-client-id",
    "placeholder-tenant-id",
    "placeholder-client-secret",
];

/// Microsoft identity platform client configuration.
///
/// ```rust,ignore
/// use horror_calendar::OAuthConfig;
///
/// let config = OAuthConfig::new("client-id", "secret", "tenant", "http://localhost:5000/auth/redirect".parse()?)
///     .with_scopes(vec!["User.Read".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) tenant_id: String,
    pub(crate) authority: String,
    pub(crate) redirect_uri: Url,
    pub(crate) graph_url: String,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: format!("https://login.microsoftonline.com/{tenant_id}"),
            tenant_id,
            redirect_uri,
            graph_url: GRAPH_BASE_URL.into(),
            scopes: vec![
                "User.Read".into(),
                "Files.ReadWrite.All".into(),
                "Sites.ReadWrite.All".into(),
            ],
        }
    }

    /// Override the authority (default: `https://login.microsoftonline.com/{tenant}`).
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the Microsoft Graph base URL.
    #[must_use]
    pub fn with_graph_url(mut self, url: impl Into<String>) -> Self {
        self.graph_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether all credentials are present and none is a template placeholder.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        [&self.client_id, &self.tenant_id, &self.client_secret]
            .iter()
            .all(|v| !v.is_empty() && !PLACEHOLDER_VALUES.contains(&v.as_str()))
    }

    fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority)
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }
}

/// Space-separated scope parameter: the requested scopes plus the reserved ones.
pub(crate) fn scope_param(scopes: &[String]) -> String {
    let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
    for reserved in RESERVED_SCOPES {
        if !all.contains(&reserved) {
            all.push(reserved);
        }
    }
    all.join(" ")
}

/// Token response from the identity provider token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".into(),
            expires_in,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// OAuth error body (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Signed-in user's profile from Microsoft Graph `/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            mail: None,
            user_principal_name: None,
        }
    }

    #[must_use]
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = Some(mail.into());
        self
    }

    #[must_use]
    pub fn with_user_principal_name(mut self, upn: impl Into<String>) -> Self {
        self.user_principal_name = Some(upn.into());
        self
    }

    /// `mail`, falling back to the user principal name.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

/// Identity provider operations used by the login routes and the freshness controller.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Whether the provider has real credentials to sign users in with.
    fn is_configured(&self) -> bool;

    /// Scopes requested on code exchange and refresh.
    fn scopes(&self) -> &[String];

    /// Authorization endpoint URL carrying the CSRF `state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be built.
    fn authorization_url(&self, state: &str) -> Result<String, Error>;

    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    /// Redeem a refresh token. The response may carry a rotated refresh token.
    fn refresh_with(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    fn user_profile(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserProfile, Error>> + Send;
}

/// Confidential client for the Microsoft identity platform.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// Client whose requests give up after [`DEFAULT_PROVIDER_TIMEOUT`].
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: timed_client(DEFAULT_PROVIDER_TIMEOUT),
        }
    }

    /// Bound every identity provider and Graph request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = timed_client(timeout);
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(params)
            .send()
            .await?;

        let response = ensure_success(response, operation).await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }
}

impl IdentityProvider for AuthClient {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn scopes(&self) -> &[String] {
        &self.config.scopes
    }

    fn authorization_url(&self, state: &str) -> Result<String, Error> {
        let mut url: Url = self
            .config
            .authorize_endpoint()
            .parse()
            .map_err(|e| Error::Config(format!("authority: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("response_mode", "query")
            .append_pair("scope", &scope_param(&self.config.scopes))
            .append_pair("state", state)
            .append_pair("prompt", "select_account");

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let scope = scope_param(&self.config.scopes);
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        self.token_request(&params, "token exchange").await
    }

    async fn refresh_with(
        &self,
        refresh_token: &str,
        scopes: &[String],
    ) -> Result<TokenResponse, Error> {
        let scope = scope_param(scopes);
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        self.token_request(&params, "token refresh").await
    }

    async fn user_profile(&self, access_token: &str) -> Result<UserProfile, Error> {
        let response = self
            .http
            .get(format!("{}/me", self.config.graph_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = ensure_success(response, "userinfo request").await?;
        response.json::<UserProfile>().await.map_err(Into::into)
    }
}

pub(crate) fn timed_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Checks HTTP response status; returns the response on success or the decoded OAuth error.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(provider_error(operation, Some(status), &body))
}

pub(crate) fn provider_error(operation: &'static str, status: Option<u16>, body: &str) -> Error {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => Error::Provider {
            operation,
            status,
            error: parsed.error,
            description: parsed
                .error_description
                .unwrap_or_else(|| "No description".into()),
        },
        Err(_) => Error::Provider {
            operation,
            status,
            error: "unknown_error".into(),
            description: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test-client",
            "test-secret",
            "contoso",
            "http://localhost:5000/auth/redirect".parse().unwrap(),
        )
    }

    #[test]
    fn test_authorization_url_contains_state_and_prompt() {
        let client = AuthClient::new(test_config());
        let url = client.authorization_url("abc123").unwrap();

        assert!(url.starts_with("https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("prompt=select_account"));
        assert!(!url.contains("test-secret"));
    }

    #[tokio::test]
    async fn test_token_request_gives_up_on_silent_server() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = AuthClient::new(test_config().with_authority(format!("http://{addr}/tenant")))
            .with_timeout(Duration::from_millis(200));
        let result = tokio::time::timeout(Duration::from_secs(5), client.exchange_code("code"))
            .await
            .expect("client timeout did not fire");

        assert!(matches!(result, Err(Error::Http(ref e)) if e.is_timeout()));
    }

    #[test]
    fn test_scope_param_adds_reserved_scopes_once() {
        let scopes = vec!["User.Read".to_string(), "offline_access".to_string()];
        assert_eq!(
            scope_param(&scopes),
            "User.Read offline_access openid profile"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = test_config();

        assert_eq!(config.client_id(), "test-client");
        assert_eq!(config.authority(), "https://login.microsoftonline.com/contoso");
        assert_eq!(
            config.scopes(),
            &["User.Read", "Files.ReadWrite.All", "Sites.ReadWrite.All"]
        );
        assert!(config.is_configured());
    }

    #[test]
    fn test_config_with_overrides() {
        let config = test_config()
            .with_authority("https://login.example.com/tenant/")
            .with_scopes(vec!["User.Read".into()]);

        assert_eq!(config.authority(), "https://login.example.com/tenant");
        assert_eq!(
            config.token_endpoint(),
            "https://login.example.com/tenant/oauth2/v2.0/token"
        );
        assert_eq!(config.scopes(), &["User.Read"]);
    }

    #[test]
    fn test_placeholder_credentials_are_not_configured() {
        let config = OAuthConfig::new(
            "placeholder-client-id",
            "secret",
            "tenant",
            "http://localhost/cb".parse().unwrap(),
        );
        assert!(!config.is_configured());

        let config = OAuthConfig::new("id", "", "tenant", "http://localhost/cb".parse().unwrap());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_provider_error_decodes_oauth_body() {
        let err = provider_error(
            "token refresh",
            Some(400),
            r#"{"error":"invalid_grant","error_description":"AADSTS70008: expired"}"#,
        );
        match err {
            Error::Provider {
                error, description, status, ..
            } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description, "AADSTS70008: expired");
                assert_eq!(status, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_provider_error_falls_back_on_plain_body() {
        let err = provider_error("token exchange", Some(502), "Bad Gateway");
        assert!(matches!(
            err,
            Error::Provider { ref error, ref description, .. }
                if error == "unknown_error" && description == "Bad Gateway"
        ));
    }

    #[test]
    fn test_user_profile_email_fallback() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"displayName":"Ada","mail":null,"userPrincipalName":"ada@contoso.com"}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
        assert_eq!(profile.email(), Some("ada@contoso.com"));

        let profile = UserProfile::new("Ada").with_mail("ada@mail.com");
        assert_eq!(profile.email(), Some("ada@mail.com"));
    }

    #[test]
    fn test_token_response_optional_fields() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"T1","token_type":"Bearer"}"#).unwrap();
        assert_eq!(token.access_token, "T1");
        assert!(token.expires_in.is_none());
        assert!(token.refresh_token.is_none());
    }
}
