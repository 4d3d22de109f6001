//! SharePoint list writes through Microsoft Graph.

use serde_json::{Value as JsonValue, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::error::Error;

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Application name recorded on login rows.
pub const APPLICATION_NAME: &str = "Horror Movie Calendar";

/// Graph client for one SharePoint site, acting with the user's access token.
pub struct SharePointClient {
    site_url: String,
    access_token: String,
    graph_url: String,
    http: reqwest::Client,
}

impl SharePointClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        site_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            access_token: access_token.into(),
            graph_url: GRAPH_BASE_URL.into(),
            http,
        }
    }

    #[must_use]
    pub fn with_graph_url(mut self, url: impl Into<String>) -> Self {
        self.graph_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve the Graph site ID of the configured site URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparseable site URL, [`Error::Graph`]
    /// on a non-success answer, or [`Error::Http`] on network failure.
    pub async fn site_id(&self) -> Result<String, Error> {
        let locator = site_locator(&self.site_url)?;
        let response = self
            .http
            .get(format!("{}/sites/{locator}", self.graph_url))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let body = graph_json(response).await?;
        body.get("id")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Graph {
                status: 200,
                detail: "site response without id".into(),
            })
    }

    /// Add an item to a list. Returns the created item.
    ///
    /// # Errors
    ///
    /// Same as [`site_id`](Self::site_id).
    pub async fn add_list_item(&self, list_id: &str, fields: JsonValue) -> Result<JsonValue, Error> {
        let site_id = self.site_id().await?;
        let response = self
            .http
            .post(format!("{}/sites/{site_id}/lists/{list_id}/items", self.graph_url))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        let item = graph_json(response).await?;
        tracing::info!(list_id, "Added item to SharePoint list");
        Ok(item)
    }

    /// Write one activity row. Failures are logged and reported as `false`.
    pub async fn log_user_activity(&self, list_id: &str, activity: &Activity<'_>) -> bool {
        tracing::info!(
            activity = activity.activity_type,
            user = activity.user_email,
            "Logging activity"
        );
        let fields = activity.fields(OffsetDateTime::now_utc());
        match self.add_list_item(list_id, fields).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to add activity row");
                false
            }
        }
    }

    /// Record a login for `user_email`.
    pub async fn log_login_activity(
        &self,
        list_id: &str,
        user_email: &str,
        user_name: &str,
        user_role: &str,
    ) -> bool {
        let activity = Activity {
            user_email,
            user_name,
            activity_type: "Login",
            application: APPLICATION_NAME,
            user_role,
        };
        self.log_user_activity(list_id, &activity).await
    }
}

/// One row of the activity log list.
#[derive(Debug, Clone, Copy)]
pub struct Activity<'a> {
    pub user_email: &'a str,
    pub user_name: &'a str,
    pub activity_type: &'a str,
    pub application: &'a str,
    pub user_role: &'a str,
}

impl Activity<'_> {
    /// List item fields with `at` as the timestamp.
    #[must_use]
    pub fn fields(&self, at: OffsetDateTime) -> JsonValue {
        json!({
            "Title": format!("{} - {}", self.user_name, self.activity_type),
            "UserEmail": self.user_email,
            "UserName": self.user_name,
            "LoginTimestamp": at.format(&Rfc3339).unwrap_or_default(),
            "UserRole": self.user_role,
            "ActivityType": self.activity_type,
            "Application": self.application,
        })
    }
}

/// `https://tenant.sharepoint.com/sites/x` → `tenant.sharepoint.com:/sites/x`.
fn site_locator(site_url: &str) -> Result<String, Error> {
    let url: Url = site_url
        .parse()
        .map_err(|e| Error::Config(format!("SP_SITE_URL: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::Config("SP_SITE_URL has no host".into()))?;
    Ok(format!("{host}:{}", url.path().trim_end_matches('/')))
}

async fn graph_json(response: reqwest::Response) -> Result<JsonValue, Error> {
    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(Error::Graph {
            status: status.as_u16(),
            detail,
        });
    }
    response.json().await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_site_locator() {
        assert_eq!(
            site_locator("https://contoso.sharepoint.com/sites/BaseCampApps").unwrap(),
            "contoso.sharepoint.com:/sites/BaseCampApps"
        );
        assert_eq!(
            site_locator("https://contoso.sharepoint.com/sites/Apps/").unwrap(),
            "contoso.sharepoint.com:/sites/Apps"
        );
        assert!(site_locator("not a url").is_err());
    }

    #[test]
    fn test_activity_fields() {
        let activity = Activity {
            user_email: "ada@contoso.com",
            user_name: "Ada",
            activity_type: "Login",
            application: APPLICATION_NAME,
            user_role: "User",
        };
        let fields = activity.fields(datetime!(2026-10-15 12:00:00 UTC));

        assert_eq!(fields["Title"], "Ada - Login");
        assert_eq!(fields["UserEmail"], "ada@contoso.com");
        assert_eq!(fields["LoginTimestamp"], "2026-10-15T12:00:00Z");
        assert_eq!(fields["ActivityType"], "Login");
        assert_eq!(fields["Application"], "Horror Movie Calendar");
        assert_eq!(fields["UserRole"], "User");
    }

    #[tokio::test]
    async fn test_graph_error_status_is_reported() {
        let router = axum::Router::new().route(
            "/sites/{*rest}",
            axum::routing::get(|| async {
                (axum::http::StatusCode::NOT_FOUND, "itemNotFound")
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = SharePointClient::new(
            reqwest::Client::new(),
            "https://contoso.sharepoint.com/sites/Missing",
            "token",
        )
        .with_graph_url(format!("http://{addr}/"));

        let err = client.site_id().await.unwrap_err();
        assert!(matches!(err, Error::Graph { status: 404, ref detail } if detail == "itemNotFound"));
        assert!(!client.log_login_activity("list-1", "ada@contoso.com", "Ada", "User").await);
    }
}
