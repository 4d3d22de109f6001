//! Builds the movie file from a list of known horror titles.

use time::{Date, Month};

use crate::error::Error;
use crate::movie_store::{Movie, MovieStore};
use crate::omdb::OmdbClient;

/// Earliest release year kept in the catalog.
pub const START_YEAR: i32 = 2020;

/// Horror titles released since 2020, looked up one by one.
pub const KNOWN_HORROR_TITLES: &[&str] = &[
    "The Invisible Man",
    "The Hunt",
    "Gretel & Hansel",
    "Brahms: The Boy II",
    "A Quiet Place Part II",
    "Candyman",
    "Last Night in Soho",
    "Halloween Kills",
    "Malignant",
    "Scream",
    "X",
    "The Black Phone",
    "Barbarian",
    "Smile",
    "Halloween Ends",
    "Nope",
    "M3GAN",
    "Scream VI",
    "Evil Dead Rise",
    "Insidious: The Red Door",
    "Talk to Me",
    "The Nun II",
    "Saw X",
    "Abigail",
    "A Quiet Place: Day One",
    "Longlegs",
    "Alien: Romulus",
    "Terrifier 3",
    "The Substance",
    "Nosferatu",
    "Wolf Man",
    "28 Years Later",
    "Final Destination: Bloodlines",
    "The Conjuring: Last Rites",
];

/// Whether a movie belongs in the catalog as of `today`.
#[must_use]
pub fn qualifies(movie: &Movie, today: Date) -> bool {
    let start = Date::from_calendar_date(START_YEAR, Month::January, 1).unwrap_or(Date::MIN);
    movie.released >= start
        && movie.released <= today
        && crate::omdb::genres(&movie.genre).iter().any(|g| g == "horror")
}

/// Keep qualifying movies and order them by release date.
#[must_use]
pub fn select(movies: Vec<Movie>, today: Date) -> Vec<Movie> {
    let mut kept: Vec<Movie> = movies.into_iter().filter(|m| qualifies(m, today)).collect();
    kept.sort_by_key(|m| m.released);
    kept
}

/// Look up `titles`, keep horror releases between 2020 and `today`, and write the report.
///
/// Titles OMDb does not know are logged and skipped. Returns the movies written.
///
/// # Errors
///
/// Returns [`Error::Io`] if the report cannot be written.
pub async fn build_catalog(
    client: &OmdbClient,
    store: &MovieStore,
    titles: &[&str],
    today: Date,
) -> Result<Vec<Movie>, Error> {
    tracing::info!(count = titles.len(), through = %today, "Building horror catalog");

    let mut found = Vec::new();
    for title in titles {
        match client.get_movie_by_title(title, None).await {
            Ok(record) => match Movie::from_omdb(record) {
                Some(movie) => found.push(movie),
                None => tracing::warn!(title, "No valid release date"),
            },
            Err(e) => tracing::warn!(title, error = %e, "Not found"),
        }
    }

    let movies = select(found, today);
    store.write_report(&movies, today).await?;
    tracing::info!(
        found = movies.len(),
        path = %store.path().display(),
        "Catalog written"
    );
    Ok(movies)
}
