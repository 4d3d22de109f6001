//! Flat text file of horror movies, one block per movie.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::Date;
use time::macros::format_description;

use crate::error::Error;
use crate::omdb::{OmdbMovie, parse_release_date};

const HEADER_TITLE: &str = "Horror Movies Released from 2020 to Current Date";
const RULE: &str = "============================================================";
const ENTRY_SEPARATOR: &str = "--------------------------------------------------";
const PLOT_LIMIT: usize = 200;

/// A movie with a known release date, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub title: String,
    pub year: String,
    pub released: Date,
    pub genre: String,
    pub director: String,
    pub imdb_rating: String,
    pub imdb_id: String,
    pub plot: String,
}

impl Movie {
    /// Keep only OMDb records with a readable release date.
    #[must_use]
    pub fn from_omdb(movie: OmdbMovie) -> Option<Self> {
        let released = movie.release_date()?;
        Some(Self {
            title: movie.title,
            year: movie.year,
            released,
            genre: movie.genre,
            director: movie.director.unwrap_or_default(),
            imdb_rating: movie.imdb_rating.unwrap_or_default(),
            imdb_id: movie.imdb_id,
            plot: movie.plot.unwrap_or_default(),
        })
    }
}

/// A movie placed on the calendar: its title and day of month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub title: String,
    pub day: u8,
}

/// Flat-file movie store.
#[derive(Debug, Clone)]
pub struct MovieStore {
    path: PathBuf,
}

impl MovieStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with a report of `movies`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub async fn write_report(&self, movies: &[Movie], generated_on: Date) -> Result<(), Error> {
        let report = render_report(movies, generated_on)?;
        tokio::fs::write(&self.path, report).await?;
        Ok(())
    }

    /// Movies released in `year`/`month`. A missing or unreadable file yields nothing.
    pub async fn movies_for_month(&self, year: i32, month: u8) -> Vec<CalendarEntry> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_month(&content, year, month),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(path = %self.path.display(), "Movie file not found");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Error reading movie file");
                Vec::new()
            }
        }
    }
}

/// Render the report text.
///
/// # Errors
///
/// Returns [`Error::Date`] if a date cannot be formatted.
pub fn render_report(movies: &[Movie], generated_on: Date) -> Result<String, Error> {
    let long_date = format_description!("[month repr:long] [day], [year]");
    let released_format = format_description!("[day] [month repr:short] [year]");
    let date_err = |e: time::error::Format| Error::Date(e.to_string());

    let mut out = String::new();
    // Writing to a String never fails.
    let _ = writeln!(out, "{HEADER_TITLE}");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Generated on: {}", generated_on.format(&long_date).map_err(date_err)?);
    let _ = writeln!(out, "Total movies found: {}", movies.len());
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    for movie in movies {
        let _ = writeln!(out, "Title: {}", movie.title);
        let _ = writeln!(out, "Year: {}", movie.year);
        let _ = writeln!(
            out,
            "Released: {}",
            movie.released.format(&released_format).map_err(date_err)?
        );
        let _ = writeln!(out, "Genre: {}", movie.genre);
        let _ = writeln!(out, "Director: {}", movie.director);
        let _ = writeln!(out, "IMDb Rating: {}", movie.imdb_rating);
        let _ = writeln!(out, "IMDb ID: {}", movie.imdb_id);
        let _ = writeln!(out, "Plot: {}", truncate_plot(&movie.plot));
        let _ = writeln!(out, "{ENTRY_SEPARATOR}");
    }
    Ok(out)
}

fn truncate_plot(plot: &str) -> String {
    if plot.chars().count() > PLOT_LIMIT {
        let head: String = plot.chars().take(PLOT_LIMIT).collect();
        format!("{head}...")
    } else {
        plot.to_string()
    }
}

/// Entries of the report released in `year`/`month`. Blocks without a title
/// or with an unreadable release date are skipped.
#[must_use]
pub fn parse_month(content: &str, year: i32, month: u8) -> Vec<CalendarEntry> {
    content
        .split(ENTRY_SEPARATOR)
        .filter_map(|block| {
            let mut title = None;
            let mut released = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("Title: ") {
                    title = Some(rest.trim());
                } else if let Some(rest) = line.strip_prefix("Released: ") {
                    released = Some(rest.trim());
                }
            }
            let title = title?;
            let date = parse_release_date(released?)?;
            (date.year() == year && u8::from(date.month()) == month).then(|| CalendarEntry {
                title: title.to_string(),
                day: date.day(),
            })
        })
        .collect()
}
