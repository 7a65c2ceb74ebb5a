//! # Catalog Lookup
//!
//! Resolves a catalog id into a [`MovieRecord`] through the TMDB v3 API.
//!
//! Lookup never fails the run: a missing API key, a non-numeric id, a network
//! error, a non-200 status or an unexpected body all degrade to an empty
//! record and a warning.

use crate::movie::MovieRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ACTORS: usize = 5;

/// Source of descriptive records keyed by catalog id
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Record for `catalog_id`, empty on any failure
    async fn lookup(&self, catalog_id: &str) -> MovieRecord;
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    name: String,
    order: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    name: String,
    job: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl TmdbMovieDetail {
    fn into_record(self, catalog_id: &str) -> MovieRecord {
        let year = self
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string);

        let genre = self
            .genres
            .into_iter()
            .map(|g| g.name)
            .collect::<Vec<_>>()
            .join(", ");

        let credits = self.credits.unwrap_or_default();
        let director = credits
            .crew
            .iter()
            .filter(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name.clone())
            .collect::<Vec<_>>()
            .join(", ");

        let mut cast = credits.cast;
        cast.sort_by_key(|c| c.order.unwrap_or(u32::MAX));
        let actors = cast
            .into_iter()
            .take(MAX_ACTORS)
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ");

        MovieRecord {
            title: non_empty(self.title),
            year,
            genre: non_empty(Some(genre)),
            director: non_empty(Some(director)),
            plot: non_empty(self.overview),
            actors: non_empty(Some(actors)),
            rating: self.vote_average,
            runtime: self.runtime.filter(|r| *r > 0),
            source: None,
            catalog_id: Some(catalog_id.to_string()),
        }
    }
}

/// TMDB-backed catalog
pub struct TmdbCatalog {
    client: reqwest::Client,
    api_key: Option<String>,
    language: String,
    base_url: String,
}

impl TmdbCatalog {
    pub fn new(api_key: Option<String>, language: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            language,
            base_url: TMDB_BASE_URL.to_string(),
        })
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, catalog_id: &str) -> Result<MovieRecord> {
        let api_key = self
            .api_key
            .as_deref()
            .context("TMDB_API_KEY not configured")?;
        let id: u64 = catalog_id
            .trim()
            .parse()
            .with_context(|| format!("invalid TMDB id: {catalog_id:?}"))?;

        let url = format!("{}/movie/{}", self.base_url, id);
        debug!("GET {}", url);

        let detail: TmdbMovieDetail = self
            .client
            .get(&url)
            .query(&[
                ("api_key", api_key),
                ("language", self.language.as_str()),
                ("append_to_response", "credits"),
            ])
            .send()
            .await
            .with_context(|| format!("TMDB request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("TMDB request returned error: {url}"))?
            .json()
            .await
            .context("failed to parse TMDB movie details")?;

        Ok(detail.into_record(catalog_id))
    }
}

#[async_trait]
impl CatalogSource for TmdbCatalog {
    async fn lookup(&self, catalog_id: &str) -> MovieRecord {
        match self.fetch(catalog_id).await {
            Ok(record) => {
                info!(
                    "📚 Catalog record for {}: {}",
                    catalog_id,
                    record.title.as_deref().unwrap_or("<untitled>")
                );
                record
            }
            Err(e) => {
                warn!("Catalog lookup for {} failed, continuing without metadata: {:#}", catalog_id, e);
                MovieRecord::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATRIX: &str = r#"{
        "id": 603,
        "title": "The Matrix",
        "overview": "Set in the 22nd century...",
        "release_date": "1999-03-30",
        "vote_average": 8.2,
        "runtime": 136,
        "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
        "credits": {
            "cast": [
                {"name": "Laurence Fishburne", "order": 1},
                {"name": "Keanu Reeves", "order": 0},
                {"name": "Carrie-Anne Moss", "order": 2},
                {"name": "Hugo Weaving", "order": 3},
                {"name": "Gloria Foster", "order": 4},
                {"name": "Joe Pantoliano", "order": 5}
            ],
            "crew": [
                {"name": "Lana Wachowski", "job": "Director"},
                {"name": "Lilly Wachowski", "job": "Director"},
                {"name": "Joel Silver", "job": "Producer"}
            ]
        }
    }"#;

    #[test]
    fn test_tmdb_mapping() {
        let detail: TmdbMovieDetail = serde_json::from_str(MATRIX).unwrap();
        let record = detail.into_record("603");

        assert_eq!(record.title.as_deref(), Some("The Matrix"));
        assert_eq!(record.year.as_deref(), Some("1999"));
        assert_eq!(record.genre.as_deref(), Some("Action, Science Fiction"));
        assert_eq!(record.director.as_deref(), Some("Lana Wachowski, Lilly Wachowski"));
        assert_eq!(
            record.actors.as_deref(),
            Some("Keanu Reeves, Laurence Fishburne, Carrie-Anne Moss, Hugo Weaving, Gloria Foster")
        );
        assert_eq!(record.runtime, Some(136));
        assert_eq!(record.rating, Some(8.2));
        assert_eq!(record.catalog_id.as_deref(), Some("603"));
    }

    #[test]
    fn test_sparse_detail_maps_to_empty_fields() {
        let detail: TmdbMovieDetail =
            serde_json::from_str(r#"{"title":"","release_date":"","runtime":0}"#).unwrap();
        let record = detail.into_record("1");
        assert!(!record.has_descriptive_fields());
        assert!(record.runtime.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_gives_empty_record() {
        let catalog = TmdbCatalog::new(None, "en-US".into()).unwrap();
        assert_eq!(catalog.lookup("603").await, MovieRecord::default());
    }

    #[tokio::test]
    async fn test_invalid_id_gives_empty_record() {
        let catalog = TmdbCatalog::new(Some("key".into()), "en-US".into())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert_eq!(catalog.lookup("tt0133093").await, MovieRecord::default());
    }

    #[tokio::test]
    async fn test_unreachable_server_gives_empty_record() {
        let catalog = TmdbCatalog::new(Some("key".into()), "en-US".into())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert_eq!(catalog.lookup("603").await, MovieRecord::default());
    }
}
