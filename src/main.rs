//! jobvec: vectorize job postings and resumes and search them by similarity

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use jobvec::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use jobvec::config::{Config, OutputFormat, StoreCredentials};
use jobvec::error::{JobVecError, Result};
use jobvec::input::manager::InputManager;
use jobvec::input::postings::read_feed;
use jobvec::output::formatter::{save_report_to_file, ReportGenerator};
use jobvec::pipeline::{IngestSummary, Pipeline};
use jobvec::processing::embedding_manager::EmbeddingModelManager;
use jobvec::processing::embeddings::{Embedder, Model2VecEmbedder};
use jobvec::processing::extractor::SourceKind;
use jobvec::store::AtlasStore;
use log::{error, info, warn};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    match run_command(cli.command, config).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but some records failed.
async fn run_command(command: Commands, config: Config) -> Result<bool> {
    match command {
        Commands::Ingest { kind, paths, output } => {
            let format = output_format(output.as_deref(), &config)?;
            let kind = SourceKind::from(kind);
            let mut input_manager = InputManager::new().with_cache(false);
            let paths = input_manager.collect_paths(&paths)?;
            if paths.is_empty() {
                return Err(JobVecError::InvalidInput("No supported files to ingest".to_string()));
            }

            let pipeline = build_pipeline(&config).await?;
            let progress = progress_bar(paths.len() as u64);
            let mut summary = IngestSummary::default();

            for path in &paths {
                progress.set_message(display_name(path));
                let result = match input_manager.extract_text(path).await {
                    Ok(text) => pipeline.ingest(&text, kind, None).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(outcome) => summary.record_success(outcome.upsert),
                    Err(e) if is_batch_recoverable(&e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        summary.record_failure(path.display().to_string(), &e);
                    }
                    Err(e) => {
                        progress.abandon();
                        return Err(e);
                    }
                }
                progress.inc(1);
            }
            progress.finish_and_clear();

            print_summary(&summary, &format, &config)?;
            Ok(!summary.has_failures())
        }

        Commands::IngestPostings { file, output } => {
            let format = output_format(output.as_deref(), &config)?;
            let feed = read_feed(&file).await?;
            info!("Read {} postings from {}", feed.len(), file.display());

            let pipeline = build_pipeline(&config).await?;
            let progress = progress_bar(feed.len() as u64);
            let mut summary = IngestSummary::default();

            for line in feed {
                let source = format!("feed:{}", line.line_number);
                progress.set_message(source.clone());
                let result = match line.posting {
                    Ok(posting) => {
                        let metadata = posting.metadata();
                        pipeline
                            .ingest(&posting.description, SourceKind::JobPosting, Some(&metadata))
                            .await
                    }
                    Err(e) => Err(e),
                };
                match result {
                    Ok(outcome) => summary.record_success(outcome.upsert),
                    Err(e) if e.is_per_record() => {
                        warn!("Skipping {}: {}", source, e);
                        summary.record_failure(source, &e);
                    }
                    Err(e) => {
                        progress.abandon();
                        return Err(e);
                    }
                }
                progress.inc(1);
            }
            progress.finish_and_clear();

            print_summary(&summary, &format, &config)?;
            Ok(!summary.has_failures())
        }

        Commands::Search {
            resume,
            text,
            kind,
            target,
            threshold,
            limit,
            detailed,
            output,
            save,
        } => {
            let format = output_format(output.as_deref(), &config)?;
            let query_text = match (resume, text) {
                (Some(path), _) => InputManager::new().extract_text(&path).await?,
                (None, Some(text)) => text,
                (None, None) => {
                    return Err(JobVecError::InvalidInput(
                        "Provide --resume or --text".to_string(),
                    ))
                }
            };
            if query_text.trim().is_empty() {
                return Err(JobVecError::InvalidInput("Query text is empty".to_string()));
            }

            let mut pipeline = build_pipeline(&config).await?;
            if let Some(limit) = limit {
                pipeline = pipeline.with_limit(limit);
            }
            if let Some(target) = target {
                pipeline = pipeline.with_target(target.into());
            }
            let threshold = threshold.unwrap_or(config.search.similarity_threshold);

            let report = pipeline.search(&query_text, kind.into(), threshold).await?;

            let generator = ReportGenerator::with_options(config.output.color_output, detailed, true);
            let rendered = generator.search_report(&report, &format)?;
            println!("{}", rendered);

            if let Some(path) = save {
                let plain = ReportGenerator::with_options(false, detailed, true);
                save_report_to_file(&plain.search_report(&report, &format)?, &path)?;
                println!("Saved to {}", path.display());
            }
            Ok(true)
        }

        Commands::Check => {
            println!("Checking store connection and vector index...");
            let credentials = StoreCredentials::from_env()?;
            let store = AtlasStore::connect(&config, &credentials).await?;
            store.verify_index(&config.index.name).await?;
            println!(
                "✅ Store reachable, index '{}' has {} dimensions on '{}'",
                config.index.name, config.index.dimensions, config.index.vector_path
            );

            println!("Checking embedding model...");
            let embedder = Model2VecEmbedder::from_config(&config).await?;
            println!(
                "✅ Model '{}' produces {}-dimensional vectors",
                embedder.model_name(),
                embedder.dimensions()
            );
            Ok(true)
        }

        Commands::Models { action } => {
            let mut manager = EmbeddingModelManager::new(config.models_dir().clone()).await?;
            match action {
                ModelAction::List => {
                    println!("📚 Embedding Models\n");
                    for (id, model) in manager.list_available_models() {
                        let status = if manager.is_model_downloaded(id) {
                            "✅ Downloaded"
                        } else {
                            "⬇️  Available"
                        };
                        let marker = if *id == config.models.embedding_model { " (configured)" } else { "" };
                        println!(
                            "  • {}{} ({}) - {} MB, {} dims [{}]",
                            id, marker, model.repo_id, model.size_mb, model.dimensions, status
                        );
                        println!("    {}", model.description);
                    }
                }

                ModelAction::Download { model, force } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or_else(|| JobVecError::ModelNotFound(model.clone()))?;

                    if !force && manager.is_model_downloaded(&model_id) {
                        println!("✅ Model '{}' is already downloaded!", model_id);
                        println!("💡 Use --force to re-download");
                        return Ok(true);
                    }

                    let model_path = manager.download_model(&model_id).await?;
                    println!("✅ Model '{}' downloaded successfully!", model_id);
                    println!("📁 Location: {}", model_path.display());
                }

                ModelAction::Remove { model } => {
                    let model_id = manager.resolve_model_id(&model).unwrap_or(model);
                    let removed = manager.remove_model(&model_id).await?;
                    println!("✅ Model '{}' removed ({})", model_id, removed.display());
                }

                ModelAction::Info { model } => {
                    let model_id = manager
                        .resolve_model_id(&model)
                        .ok_or_else(|| JobVecError::ModelNotFound(model.clone()))?;
                    let info = manager
                        .get_model_info(&model_id)
                        .ok_or_else(|| JobVecError::ModelNotFound(model.clone()))?;

                    println!("📋 Model Information for '{}'\n", model_id);
                    println!("Name: {}", info.name);
                    println!("Repository: {}", info.repo_id);
                    println!("Size: {} MB", info.size_mb);
                    println!("Dimensions: {}", info.dimensions);
                    println!("Description: {}", info.description);

                    match manager.get_model_path(&model_id) {
                        Some(path) => println!("Status: ✅ Downloaded ({})", path.display()),
                        None => {
                            println!("Status: ⬇️  Available for download");
                            println!("\n💡 To download this model, run:");
                            println!("   jobvec models download {}", model_id);
                        }
                    }
                }
            }
            Ok(true)
        }

        Commands::Config { action } => {
            match action {
                Some(ConfigAction::Show) | None => {
                    println!("⚙️  Current Configuration\n");
                    println!("Models Directory: {}", config.models_dir().display());
                    println!("Embedding Model: {}", config.models.embedding_model);
                    println!("\nStore:");
                    println!("  Database: {}", config.store.database);
                    println!("  Collection: {}", config.store.collection);
                    println!("\nVector Index:");
                    println!("  Name: {}", config.index.name);
                    println!("  Path: {}", config.index.vector_path);
                    println!("  Dimensions: {}", config.index.dimensions);
                    println!("\nSearch:");
                    println!("  Limit: {}", config.search.limit);
                    println!("  Oversampling: {}x", config.search.oversampling);
                    println!("  Threshold: {}", config.search.similarity_threshold);
                }

                Some(ConfigAction::Path) => {
                    println!("{}", Config::config_path().display());
                }

                Some(ConfigAction::Reset) => {
                    println!("🔄 Resetting configuration to defaults...");
                    Config::default().save()?;
                    println!("✅ Configuration reset successfully!");
                }
            }
            Ok(true)
        }
    }
}

/// Open the store and load the embedder once for the whole command.
async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let credentials = StoreCredentials::from_env()?;
    let store = AtlasStore::connect(config, &credentials).await?;
    let embedder = Model2VecEmbedder::from_config(config).await?;

    Ok(Pipeline::new(config, Box::new(embedder), Box::new(store)))
}

fn output_format(requested: Option<&str>, config: &Config) -> Result<OutputFormat> {
    match requested {
        Some(format) => cli::parse_output_format(format).map_err(JobVecError::InvalidInput),
        None => Ok(config.output.format),
    }
}

/// Unreadable or unsupported files only skip that file.
fn is_batch_recoverable(error: &JobVecError) -> bool {
    error.is_per_record()
        || matches!(
            error,
            JobVecError::PdfExtraction(_) | JobVecError::UnsupportedFormat(_) | JobVecError::Io(_)
        )
}

fn print_summary(summary: &IngestSummary, format: &OutputFormat, config: &Config) -> Result<()> {
    let generator = ReportGenerator::with_options(config.output.color_output, false, true);
    println!("{}", generator.ingest_summary(summary, format)?);
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        progress.set_style(style.progress_chars("=> "));
    }
    progress
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
