//! quizshelf - command-line front end for a quiz library
//!
//! Import runs unattended: the confirmation is accepted and every error
//! decision is answered from `--on-error`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quizshelf_common::config::{
    default_config_path, resolve_root_folder, LibraryPaths, TomlConfig, ROOT_FOLDER_ENV,
};
use quizshelf_library::import::{Gate, SessionEnd};
use quizshelf_library::{ImportState, Library, PackSource};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for quizshelf
#[derive(Parser, Debug)]
#[command(name = "quizshelf")]
#[command(about = "Quiz library: import, export and housekeeping")]
#[command(version)]
struct Args {
    /// Library root folder (falls back to QUIZSHELF_ROOT, then config)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Config file
    #[arg(short, long, env = "QUIZSHELF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every quiz of a package
    Import {
        file: PathBuf,
        /// Answer to missing or unwritable resources and store failures
        #[arg(long, value_enum, default_value = "skip")]
        on_error: OnError,
    },
    /// Write quizzes and their resources to a package
    Export {
        #[arg(required = true)]
        quiz_ids: Vec<i64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List quizzes and dimensions
    List,
    RemoveQuiz { quiz_id: i64 },
    RemoveDimension {
        dimension_id: i64,
        /// Also remove every quiz tagged with the dimension
        #[arg(long)]
        with_quizzes: bool,
    },
    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OnError {
    Skip,
    Ignore,
    Cancel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => TomlConfig::load(path)?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = resolve_root_folder(args.root.as_deref(), ROOT_FOLDER_ENV, &config);
    if let Command::Config = args.command {
        config.root_folder = Some(root);
        print!("{}", toml::to_string_pretty(&config).context("Failed to render config")?);
        return Ok(());
    }

    let paths = LibraryPaths::new(root);
    info!("Library root: {}", paths.root.display());
    let library = Library::open(&paths, &config.library)
        .await
        .context("Failed to open library")?;

    let outcome = run(&library, args.command).await;
    library.shutdown().await;
    outcome
}

async fn run(library: &Library, command: Command) -> Result<()> {
    match command {
        Command::Import { file, on_error } => {
            let source = PackSource::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let responder = tokio::spawn(answer_decisions(library.watch_state(), on_error));
            let summary = library.import(source).await?.await;
            responder.abort();
            let summary = summary.context("Import session ended without a summary")?;

            println!(
                "imported {} quiz(zes), skipped {}",
                summary.imported.len(),
                summary.skipped
            );
            match summary.end {
                SessionEnd::Completed => {}
                SessionEnd::Cancelled => println!("import cancelled"),
                SessionEnd::Dismissed => println!("import dismissed"),
                SessionEnd::Unreadable => bail!("{} is not a valid quiz package", file.display()),
            }
        }
        Command::Export { quiz_ids, output } => {
            let bytes = library.export(&quiz_ids).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("exported {} quiz(zes) to {}", quiz_ids.len(), output.display());
        }
        Command::List => {
            for quiz in library.list_quizzes().await? {
                println!(
                    "{:>5}  {:<40} {:>3} frames  {}",
                    quiz.id,
                    quiz.name.as_deref().unwrap_or("(untitled)"),
                    quiz.frame_count,
                    quiz.creation_time.format("%Y-%m-%d")
                );
            }
            for dimension in library.list_dimensions().await? {
                println!(
                    "  dim {:>3}  {} ({} quizzes)",
                    dimension.id, dimension.name, dimension.quiz_count
                );
            }
        }
        Command::RemoveQuiz { quiz_id } => {
            if !library.remove_quiz(quiz_id).await? {
                bail!("no quiz with id {}", quiz_id);
            }
        }
        Command::RemoveDimension {
            dimension_id,
            with_quizzes,
        } => {
            if !library.remove_dimension(dimension_id, with_quizzes).await? {
                bail!("no dimension with id {}", dimension_id);
            }
        }
        Command::Config => {}
    }
    Ok(())
}

/// Accept the confirmation and answer every error state from `policy`
///
/// Falls back to cancel when the chosen gate is not offered.
async fn answer_decisions(mut states: watch::Receiver<ImportState>, policy: OnError) {
    loop {
        let state = states.borrow_and_update().clone();
        match state {
            ImportState::Confirmation { total, ok, .. } => {
                info!(total, "Confirming import");
                ok.fire();
            }
            ImportState::Error {
                model,
                cancel,
                skip,
                ignore,
                ..
            } => {
                warn!("{}", model.message);
                let chosen: Option<Gate> = match policy {
                    OnError::Skip => skip,
                    OnError::Ignore => ignore,
                    OnError::Cancel => None,
                };
                chosen.unwrap_or(cancel).fire();
            }
            _ => {}
        }
        if states.changed().await.is_err() {
            return;
        }
    }
}
