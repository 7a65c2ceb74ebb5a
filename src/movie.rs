//! # Movie Records
//!
//! Questo modulo definisce i dati descrittivi di un film.
//!
//! ## Strutture dati:
//! - `MovieInput`: Il record JSON passato dal chiamante (Electron / API)
//! - `MovieRecord`: Metadati descrittivi immutabili per una esecuzione
//! - `MetadataSource`: Da dove arrivano i metadati (nessuno, inline, catalogo)
//!
//! ## Esempio record di input:
//! ```json
//! {
//!   "customTitle": "matrix.mkv",
//!   "tmdbID": 603,
//!   "title": "The Matrix",
//!   "year": 1999,
//!   "actors": ["Keanu Reeves", "Carrie-Anne Moss"]
//! }
//! ```

use crate::config::MetadataSourceKind;
use crate::error::PipelineError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Invocation record as sent by the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieInput {
    /// File name inside the uploads directory
    #[serde(rename = "customTitle", default, deserialize_with = "loose_string")]
    pub custom_title: Option<String>,
    /// Explicit source path, wins over `customTitle`
    #[serde(default, deserialize_with = "loose_string")]
    pub video_path: Option<String>,
    #[serde(rename = "tmdbID", alias = "tmdb_id", default, deserialize_with = "loose_string")]
    pub catalog_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub director: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub actors: Option<String>,
}

/// Accepts strings, numbers, and arrays of strings (joined with ", ")
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => {
            return Err(serde::de::Error::custom("expected a string, number, or list"));
        }
    };
    Ok(text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

impl MovieInput {
    /// Parse the JSON invocation record
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidInput(format!("invalid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(PipelineError::InvalidInput("movie record must be a JSON object".into()));
        }
        serde_json::from_value(value)
            .map_err(|e| PipelineError::InvalidInput(format!("invalid movie record: {}", e)))
    }

    /// Path of the source video
    pub fn source_path(&self, uploads_dir: &Path) -> Result<PathBuf, PipelineError> {
        if let Some(ref path) = self.video_path {
            return Ok(PathBuf::from(path));
        }
        match self.custom_title {
            Some(ref name) => Ok(uploads_dir.join(name)),
            None => Err(PipelineError::InvalidInput(
                "movie record has neither customTitle nor video_path".into(),
            )),
        }
    }

    /// Descriptive fields supplied inline
    pub fn inline_record(&self, source: &Path) -> MovieRecord {
        MovieRecord {
            title: self.title.clone(),
            year: self.year.clone(),
            genre: self.genre.clone(),
            director: self.director.clone(),
            plot: self.plot.clone(),
            actors: self.actors.clone(),
            source: Some(source.to_path_buf()),
            catalog_id: self.catalog_id.clone(),
            ..Default::default()
        }
    }

    /// Pick the metadata source for this run
    pub fn metadata_source(
        &self,
        source: &Path,
        kind: MetadataSourceKind,
        lookup_available: bool,
    ) -> MetadataSource {
        let inline = self.inline_record(source);
        match kind {
            MetadataSourceKind::None => MetadataSource::None,
            MetadataSourceKind::Inline => MetadataSource::Inline(inline),
            MetadataSourceKind::Lookup => match self.catalog_id.clone() {
                Some(id) => MetadataSource::ExternalLookup(id),
                None => {
                    tracing::warn!("Catalog lookup requested but the record has no tmdbID");
                    MetadataSource::None
                }
            },
            MetadataSourceKind::Auto => {
                if inline.has_descriptive_fields() {
                    MetadataSource::Inline(inline)
                } else if let (Some(id), true) = (self.catalog_id.clone(), lookup_available) {
                    MetadataSource::ExternalLookup(id)
                } else {
                    MetadataSource::None
                }
            }
        }
    }
}

/// Descriptive metadata for one movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub plot: Option<String>,
    /// Flattened actor list
    pub actors: Option<String>,
    pub rating: Option<f64>,
    /// Runtime in minutes
    pub runtime: Option<u32>,
    pub source: Option<PathBuf>,
    pub catalog_id: Option<String>,
}

impl MovieRecord {
    /// Any taggable field set
    pub fn has_descriptive_fields(&self) -> bool {
        [
            &self.title,
            &self.year,
            &self.genre,
            &self.director,
            &self.plot,
            &self.actors,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Where a run takes its descriptive metadata from
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataSource {
    None,
    Inline(MovieRecord),
    ExternalLookup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let input = MovieInput::from_json(
            r#"{"customTitle":"matrix.mkv","tmdbID":603,"title":"The Matrix","year":1999,
                "genre":"Action","actors":["Keanu Reeves","Carrie-Anne Moss"],"extra":{"x":1}}"#,
        )
        .unwrap();

        assert_eq!(input.custom_title.as_deref(), Some("matrix.mkv"));
        assert_eq!(input.catalog_id.as_deref(), Some("603"));
        assert_eq!(input.year.as_deref(), Some("1999"));
        assert_eq!(input.actors.as_deref(), Some("Keanu Reeves, Carrie-Anne Moss"));
        assert!(input.plot.is_none());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let input = MovieInput::from_json(r#"{"video_path":"/tmp/a.mkv","title":"  ","plot":null}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.plot.is_none());
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(MovieInput::from_json("{not json"), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(MovieInput::from_json("[1,2]"), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(
            MovieInput::from_json(r#"{"title":{"nested":true}}"#),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_source_path_resolution() {
        let uploads = Path::new("uploads");
        let input = MovieInput::from_json(r#"{"customTitle":"a.mkv"}"#).unwrap();
        assert_eq!(input.source_path(uploads).unwrap(), PathBuf::from("uploads/a.mkv"));

        let input = MovieInput::from_json(r#"{"customTitle":"a.mkv","video_path":"/data/b.mkv"}"#).unwrap();
        assert_eq!(input.source_path(uploads).unwrap(), PathBuf::from("/data/b.mkv"));

        let input = MovieInput::from_json(r#"{"title":"x"}"#).unwrap();
        assert!(matches!(input.source_path(uploads), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_auto_source_selection() {
        let src = Path::new("a.mkv");

        let inline = MovieInput::from_json(r#"{"customTitle":"a.mkv","title":"Foo","tmdbID":"1"}"#).unwrap();
        assert!(matches!(
            inline.metadata_source(src, MetadataSourceKind::Auto, true),
            MetadataSource::Inline(_)
        ));

        let id_only = MovieInput::from_json(r#"{"customTitle":"a.mkv","tmdbID":"42"}"#).unwrap();
        assert_eq!(
            id_only.metadata_source(src, MetadataSourceKind::Auto, true),
            MetadataSource::ExternalLookup("42".into())
        );
        assert_eq!(
            id_only.metadata_source(src, MetadataSourceKind::Auto, false),
            MetadataSource::None
        );
        assert_eq!(
            id_only.metadata_source(src, MetadataSourceKind::None, true),
            MetadataSource::None
        );
    }

    #[test]
    fn test_forced_lookup_without_id() {
        let input = MovieInput::from_json(r#"{"customTitle":"a.mkv","title":"Foo"}"#).unwrap();
        assert_eq!(
            input.metadata_source(Path::new("a.mkv"), MetadataSourceKind::Lookup, true),
            MetadataSource::None
        );
    }

    #[test]
    fn test_has_descriptive_fields() {
        assert!(!MovieRecord::default().has_descriptive_fields());
        let record = MovieRecord {
            rating: Some(8.7),
            catalog_id: Some("603".into()),
            ..Default::default()
        };
        assert!(!record.has_descriptive_fields());
        let record = MovieRecord {
            director: Some("Wachowski".into()),
            ..Default::default()
        };
        assert!(record.has_descriptive_fields());
    }
}
