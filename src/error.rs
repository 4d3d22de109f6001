#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider answered with an OAuth error body.
    #[error("{operation} rejected: {error} ({description})")]
    Provider {
        operation: &'static str,
        status: Option<u16>,
        error: String,
        description: String,
    },

    /// An outbound call did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
    },

    #[error("OMDb error: {0}")]
    Omdb(String),

    #[error("Graph API error: {status} {detail}")]
    Graph { status: u16, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Invalid date: {0}")]
    Date(String),
}
