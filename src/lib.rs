//! # Movie Transformer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della pipeline di trasformazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tassonomia errori ed exit code
//! - `tool_resolver` / `tool_runner`: Ricerca ed esecuzione dei tool esterni
//! - `preflight`: Verifica dipendenze (HandBrakeCLI, ffmpeg, ffprobe)
//! - `movie`: Record di input e metadati del film
//! - `probe` / `preset`: Risoluzione del sorgente e preset HandBrake
//! - `transcoder`: Conversione con HandBrakeCLI
//! - `catalog`: Lookup dei metadati dal catalogo TMDB
//! - `metadata`: Remux ffmpeg con tag e sostituzione atomica
//! - `pipeline`: Orchestratore degli stage
//! - `json_output`: Risultato strutturato su stdout
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use movie_transformer::{Config, Pipeline, PipelineRequest, SystemToolRunner, ToolPathResolver};
//!
//! let config = Config::default();
//! let runner = SystemToolRunner::new(ToolPathResolver::new(None));
//! let outcome = Pipeline::new(&runner, &config).run(&request).await;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod json_output;
pub mod metadata;
pub mod movie;
pub mod path_resolver;
pub mod pipeline;
pub mod preflight;
pub mod preset;
pub mod probe;
pub mod progress;
pub mod tool_resolver;
pub mod tool_runner;
pub mod transcoder;

pub use catalog::{CatalogSource, TmdbCatalog};
pub use config::{Config, MetadataSourceKind, ProbeFailurePolicy};
pub use error::PipelineError;
pub use json_output::PipelineResult;
pub use movie::{MetadataSource, MovieInput, MovieRecord};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineRequest, PipelineStage};
pub use preflight::DependencyReport;
pub use probe::{ProbeResult, Prober};
pub use tool_resolver::ToolPathResolver;
pub use tool_runner::{SystemToolRunner, ToolOutput, ToolRunner};
