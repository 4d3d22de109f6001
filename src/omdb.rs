//! OMDb (Open Movie Database) client.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::Date;
use time::macros::format_description;
use url::Url;

use crate::error::Error;
use crate::freshness::DEFAULT_PROVIDER_TIMEOUT;
use crate::oauth::timed_client;

const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";

/// Full record returned by a title or IMDb-ID lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbMovie {
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
}

impl OmdbMovie {
    /// Lowercased, trimmed genre list.
    #[must_use]
    pub fn genres(&self) -> Vec<String> {
        genres(&self.genre)
    }

    #[must_use]
    pub fn has_genre(&self, genre: &str) -> bool {
        let wanted = genre.trim().to_lowercase();
        self.genres().iter().any(|g| *g == wanted)
    }

    #[must_use]
    pub fn release_date(&self) -> Option<Date> {
        self.released.as_deref().and_then(parse_release_date)
    }
}

/// One hit from a keyword search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(default, rename = "Type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(rename = "Search", default)]
    search: Vec<SearchHit>,
}

/// Split OMDb's comma-separated genre string.
#[must_use]
pub fn genres(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .collect()
}

/// Parse OMDb's `Released` value (`"16 Jul 2010"`). `"N/A"` and malformed values give `None`.
#[must_use]
pub fn parse_release_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "N/A" {
        return None;
    }
    let format = format_description!(
        "[day padding:none] [month repr:short case_sensitive:false] [year]"
    );
    Date::parse(raw, &format).ok()
}

/// OMDb API client.
pub struct OmdbClient {
    api_key: String,
    base_url: Url,
    http: reqwest::Client,
}

impl OmdbClient {
    /// # Panics
    ///
    /// Never: the default base URL is a valid constant.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OMDB_BASE_URL.parse().expect("valid default URL"),
            http: timed_client(DEFAULT_PROVIDER_TIMEOUT),
        }
    }

    /// Bound every OMDb request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = timed_client(timeout);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Look a movie up by exact title, optionally narrowed to a year.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or [`Error::Omdb`] when OMDb
    /// answers `"Response": "False"`.
    pub async fn get_movie_by_title(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<OmdbMovie, Error> {
        let year = year.map(|y| y.to_string());
        let mut params = vec![("t", title)];
        if let Some(year) = year.as_deref() {
            params.push(("y", year));
        }
        let body = self.query(&params).await?;
        serde_json::from_value(body).map_err(|e| Error::Omdb(e.to_string()))
    }

    /// Full details by IMDb ID.
    ///
    /// # Errors
    ///
    /// Same as [`get_movie_by_title`](Self::get_movie_by_title).
    pub async fn get_movie_details(&self, imdb_id: &str) -> Result<OmdbMovie, Error> {
        let body = self.query(&[("i", imdb_id), ("plot", "short")]).await?;
        serde_json::from_value(body).map_err(|e| Error::Omdb(e.to_string()))
    }

    /// Keyword search over movie titles.
    ///
    /// # Errors
    ///
    /// Same as [`get_movie_by_title`](Self::get_movie_by_title).
    pub async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, Error> {
        let body = self.query(&[("s", keyword), ("type", "movie")]).await?;
        let page: SearchPage =
            serde_json::from_value(body).map_err(|e| Error::Omdb(e.to_string()))?;
        Ok(page.search)
    }

    /// Search by keyword, then keep only results whose details list `genre`.
    ///
    /// Details lookups that fail are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial search fails.
    pub async fn filter_by_genre(&self, keyword: &str, genre: &str) -> Result<Vec<OmdbMovie>, Error> {
        tracing::info!(keyword, "Searching movies by keyword");
        let hits = self.search(keyword).await?;

        let mut matching = Vec::new();
        for hit in hits {
            match self.get_movie_details(&hit.imdb_id).await {
                Ok(details) if details.has_genre(genre) => matching.push(details),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(imdb_id = %hit.imdb_id, error = %e, "Details lookup failed");
                }
            }
        }
        Ok(matching)
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<JsonValue, Error> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?;

        let body: JsonValue = response.json().await?;
        check_response(body)
    }
}

/// OMDb signals failure in-band with `"Response": "False"`.
fn check_response(body: JsonValue) -> Result<JsonValue, Error> {
    if body.get("Response").and_then(JsonValue::as_str) == Some("True") {
        return Ok(body);
    }
    let message = body
        .get("Error")
        .and_then(JsonValue::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(Error::Omdb(message))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::Month;

    use super::*;

    #[test]
    fn test_parse_release_date() {
        assert_eq!(
            parse_release_date("16 Jul 2010"),
            Some(Date::from_calendar_date(2010, Month::July, 16).unwrap())
        );
        assert_eq!(
            parse_release_date("06 Jan 2023"),
            Some(Date::from_calendar_date(2023, Month::January, 6).unwrap())
        );
        assert_eq!(
            parse_release_date("6 Jan 2023"),
            Some(Date::from_calendar_date(2023, Month::January, 6).unwrap())
        );
    }

    #[test]
    fn test_parse_release_date_rejects_na_and_garbage() {
        assert_eq!(parse_release_date("N/A"), None);
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("2010-07-16"), None);
        assert_eq!(parse_release_date("31 Feb 2020"), None);
    }

    #[test]
    fn test_genre_matching_is_case_insensitive() {
        let movie: OmdbMovie = serde_json::from_value(json!({
            "Title": "Smile",
            "Year": "2022",
            "Released": "30 Sep 2022",
            "Genre": "Horror, Mystery, Thriller",
            "imdbID": "tt15474916",
            "Response": "True"
        }))
        .unwrap();

        assert!(movie.has_genre("horror"));
        assert!(movie.has_genre("Horror"));
        assert!(!movie.has_genre("comedy"));
        assert_eq!(movie.genres(), ["horror", "mystery", "thriller"]);
        assert_eq!(
            movie.release_date(),
            Some(Date::from_calendar_date(2022, Month::September, 30).unwrap())
        );
    }

    #[test]
    fn test_check_response() {
        assert!(check_response(json!({"Response": "True", "Title": "X"})).is_ok());

        let err = check_response(json!({"Response": "False", "Error": "Movie not found!"}))
            .unwrap_err();
        assert!(matches!(err, Error::Omdb(ref m) if m == "Movie not found!"));
    }

    #[test]
    fn test_search_page_decodes_hits() {
        let page: SearchPage = serde_json::from_value(json!({
            "Search": [
                {"Title": "Halloween", "Year": "2018", "imdbID": "tt1502407", "Type": "movie"}
            ],
            "totalResults": "1",
            "Response": "True"
        }))
        .unwrap();
        assert_eq!(page.search.len(), 1);
        assert_eq!(page.search[0].imdb_id, "tt1502407");
        assert_eq!(page.search[0].kind.as_deref(), Some("movie"));
    }

    /// Local stand-in for the OMDb API keyed on the query parameters.
    async fn fake_omdb(
        axum::extract::Query(params): axum::extract::Query<std::collections::HashMap<String, String>>,
    ) -> axum::Json<JsonValue> {
        let not_found = |msg: &str| json!({ "Response": "False", "Error": msg });
        if params.get("apikey").map(String::as_str) != Some("test-key") {
            return axum::Json(not_found("Invalid API key!"));
        }
        let body = if let Some(title) = params.get("t") {
            match title.as_str() {
                "Smile" => json!({
                    "Title": "Smile",
                    "Year": params.get("y").cloned().unwrap_or_default(),
                    "Released": "30 Sep 2022",
                    "Genre": "Horror, Mystery",
                    "imdbID": "tt15474916",
                    "Response": "True"
                }),
                _ => not_found("Movie not found!"),
            }
        } else if params.contains_key("s") {
            json!({
                "Search": [
                    {"Title": "Scream", "Year": "2022", "imdbID": "tt11245972", "Type": "movie"},
                    {"Title": "Scream Queens Musical", "Year": "2021", "imdbID": "tt0000001", "Type": "movie"},
                    {"Title": "Lost Record", "Year": "2020", "imdbID": "tt0000002", "Type": "movie"}
                ],
                "Response": "True"
            })
        } else {
            match params.get("i").map(String::as_str) {
                Some("tt11245972") => json!({
                    "Title": "Scream", "Genre": "Horror, Mystery, Thriller",
                    "imdbID": "tt11245972", "Response": "True"
                }),
                Some("tt0000001") => json!({
                    "Title": "Scream Queens Musical", "Genre": "Comedy, Musical",
                    "imdbID": "tt0000001", "Response": "True"
                }),
                _ => not_found("Incorrect IMDb ID."),
            }
        };
        axum::Json(body)
    }

    async fn spawn_fake_omdb() -> Url {
        let router = axum::Router::new().route("/", axum::routing::get(fake_omdb));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/").parse().unwrap()
    }

    #[tokio::test]
    async fn test_title_lookup_passes_year() {
        let client = OmdbClient::new("test-key").with_base_url(spawn_fake_omdb().await);

        let movie = client.get_movie_by_title("Smile", Some(2022)).await.unwrap();
        assert_eq!(movie.year, "2022");
        assert_eq!(movie.imdb_id, "tt15474916");
        assert!(movie.has_genre("horror"));
    }

    #[tokio::test]
    async fn test_response_false_is_an_error() {
        let client = OmdbClient::new("test-key").with_base_url(spawn_fake_omdb().await);

        let err = client.get_movie_by_title("Nothing Here", None).await.unwrap_err();
        assert!(matches!(err, Error::Omdb(ref m) if m == "Movie not found!"));

        let err = OmdbClient::new("wrong-key")
            .with_base_url(spawn_fake_omdb().await)
            .search("scream")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Omdb(ref m) if m == "Invalid API key!"));
    }

    #[tokio::test]
    async fn test_filter_by_genre_skips_other_genres_and_failed_lookups() {
        let client = OmdbClient::new("test-key").with_base_url(spawn_fake_omdb().await);

        let hits = client.search("scream").await.unwrap();
        assert_eq!(hits.len(), 3);

        let horror = client.filter_by_genre("scream", "Horror").await.unwrap();
        let titles: Vec<&str> = horror.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Scream"]);
    }
}
