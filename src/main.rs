//! # Movie Transformer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (solo stderr)
//! - Caricamento configurazione (file JSON, variabili d'ambiente, flag CLI)
//! - Verifica dipendenze esterne prima di qualsiasi stage
//! - Esecuzione della pipeline e scrittura del risultato JSON su stdout
//!
//! ## Esempio di utilizzo:
//! ```bash
//! transform-movie '{"customTitle":"matrix.mkv","tmdbID":603}' --output-dir /srv/movies
//! transform-movie --check-deps
//! ```

use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use movie_transformer::config::{MetadataSourceKind, ProbeFailurePolicy};
use movie_transformer::{
    Config, DependencyReport, MetadataSource, MovieInput, Pipeline, PipelineError,
    PipelineRequest, PipelineResult, SystemToolRunner, TmdbCatalog, ToolPathResolver,
};

#[derive(Parser)]
#[command(name = "transform-movie")]
#[command(about = "Transform movie files to Apple-compatible format with metadata")]
struct Args {
    /// JSON string containing movie information
    #[arg(required_unless_present = "check_deps")]
    movie_json: Option<String>,

    /// Output directory for processed file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Check if required dependencies are installed and exit
    #[arg(long)]
    check_deps: bool,

    /// Directory `customTitle` is resolved against
    #[arg(long)]
    uploads_dir: Option<PathBuf>,

    /// Continue with a default 1080p resolution when probing fails
    #[arg(long)]
    probe_fallback: bool,

    /// Where descriptive metadata comes from
    #[arg(long, value_enum)]
    metadata_source: Option<MetadataSourceKind>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // stdout is reserved for the JSON result
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {}", e);
    }

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => return report_failure(&e),
    };

    // Pre-flight
    let resolver = ToolPathResolver::new(config.tools_dir.clone());
    let report = DependencyReport::check(&resolver);
    if args.check_deps {
        match serde_json::to_string(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => return report_failure(&internal_error("failed to encode dependency report", e)),
        }
        let code = report.into_result().map(|_| 0).unwrap_or_else(|e| e.exit_code());
        return exit_code(code);
    }
    if let Err(e) = report.into_result() {
        return report_failure(&e);
    }

    let request = match build_request(&args, &config) {
        Ok(request) => request,
        Err(e) => return report_failure(&e),
    };
    debug!("Metadata source: {:?}", request.metadata);

    let runner = SystemToolRunner::new(resolver);
    let catalog = match TmdbCatalog::new(config.tmdb_api_key.clone(), config.tmdb_language.clone()) {
        Ok(catalog) => catalog,
        Err(e) => {
            return report_failure(&internal_error("failed to build catalog client", e));
        }
    };
    let pipeline = Pipeline::new(&runner, &config)
        .with_catalog(&catalog)
        .with_progress(std::io::stderr().is_terminal());

    let outcome = pipeline.run(&request).await;
    let result = PipelineResult::from(&outcome);
    result.emit();

    if outcome.is_success() {
        info!("Final file: {}", result.output_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default());
    }
    exit_code(outcome.exit_code())
}

/// Config file (explicit or default location), then env, then CLI flags
async fn load_config(args: &Args) -> Result<Config, PipelineError> {
    let path = args.config.clone().or_else(Config::default_path);
    let mut config = match path {
        Some(ref path) => Config::from_file(path).await.map_err(|e| {
            PipelineError::InvalidInput(format!("invalid config {}: {:#}", path.display(), e))
        })?,
        None => Config::default(),
    }
    .with_env_overrides();

    if let Some(ref dir) = args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(ref dir) = args.uploads_dir {
        config.uploads_dir = dir.clone();
    }
    if args.probe_fallback {
        config.probe_failure = ProbeFailurePolicy::AssumeDefault;
    }
    if let Some(kind) = args.metadata_source {
        config.metadata_source = kind;
    }

    config.validate()?;
    Ok(config)
}

fn build_request(args: &Args, config: &Config) -> Result<PipelineRequest, PipelineError> {
    let json = args
        .movie_json
        .as_deref()
        .ok_or_else(|| PipelineError::InvalidInput("missing movie JSON".into()))?;
    let movie = MovieInput::from_json(json)?;
    let source = movie.source_path(&config.uploads_dir)?;
    let metadata = movie.metadata_source(&source, config.metadata_source, config.tmdb_api_key.is_some());

    if let MetadataSource::ExternalLookup(ref id) = metadata {
        info!("Metadata will be looked up in the catalog for tmdbID {}", id);
    }

    Ok(PipelineRequest { source, metadata })
}

fn report_failure(error: &PipelineError) -> ExitCode {
    tracing::error!("{}", error);
    PipelineResult::failure(error).emit();
    exit_code(error.exit_code())
}

/// Unexpected failure outside the pipeline stages (exit 1)
fn internal_error(context: &str, error: impl std::fmt::Display) -> PipelineError {
    PipelineError::Io(std::io::Error::other(format!("{}: {:#}", context, error)))
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
