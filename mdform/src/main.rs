use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::debug;
use mdform::{
    commands::{DocumentHandler, Target, present_error},
    ctx::AppContext,
};

/// Edit markdown front-matter and section files through field schemas.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative paths are resolved against it
    #[arg(short, long, value_name = "DIR")]
    workspace: Option<PathBuf>,

    /// Configuration file [default: <workspace>/.mdform.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct DocumentArgs {
    /// Markdown document or section data file
    document: PathBuf,

    /// Schema file [default: <name>-schema.yaml next to the document]
    #[arg(short, long, value_name = "FILE")]
    schema: Option<PathBuf>,
}

impl From<DocumentArgs> for Target {
    fn from(args: DocumentArgs) -> Self {
        Target {
            document: args.document,
            schema: args.schema,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the form of a document
    Show(DocumentArgs),
    /// Validate a document without changing it
    Check(DocumentArgs),
    /// Set a field value
    Set {
        #[command(flatten)]
        doc: DocumentArgs,
        /// Field path, e.g. `author.name` or `sections.#2.heading`
        field: String,
        /// New value, read as YAML
        value: String,
        /// Store the value as a string without reading it as YAML
        #[arg(long)]
        string: bool,
    },
    /// Append an item to an array field
    Add {
        #[command(flatten)]
        doc: DocumentArgs,
        /// Path of the array field
        field: String,
    },
    /// Remove an item from an array field
    Remove {
        #[command(flatten)]
        doc: DocumentArgs,
        /// Path of the array field
        field: String,
        /// Item identity as printed by `show`, e.g. `#2`
        item: String,
    },
    /// Move an array item to a new position
    Move {
        #[command(flatten)]
        doc: DocumentArgs,
        /// Path of the array field
        field: String,
        /// Item identity as printed by `show`, e.g. `#2`
        item: String,
        /// New 1-based position
        to: usize,
    },
    /// List the templates offered to select fields
    Templates {
        /// Template directory [default: templates.dir from the configuration]
        dir: Option<PathBuf>,
    },
    /// Print the JSON Schema of the configuration file
    ConfigSchema,
}

async fn run(cli: Cli) -> Result<()> {
    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    debug!("Workspace: {}", workspace.display());
    let ctx = AppContext::new(workspace, cli.config).await?;

    match cli.command {
        Commands::Show(doc) => DocumentHandler::show(&ctx, &doc.into()).await,
        Commands::Check(doc) => DocumentHandler::check(&ctx, &doc.into()).await,
        Commands::Set {
            doc,
            field,
            value,
            string,
        } => DocumentHandler::set(&ctx, &doc.into(), &field, &value, string).await,
        Commands::Add { doc, field } => DocumentHandler::add(&ctx, &doc.into(), &field).await,
        Commands::Remove { doc, field, item } => {
            DocumentHandler::remove(&ctx, &doc.into(), &field, &item).await
        }
        Commands::Move {
            doc,
            field,
            item,
            to,
        } => DocumentHandler::move_item(&ctx, &doc.into(), &field, &item, to).await,
        Commands::Templates { dir } => DocumentHandler::templates(&ctx, dir.as_deref()),
        Commands::ConfigSchema => DocumentHandler::config_schema(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            present_error(&e);
            ExitCode::FAILURE
        }
    }
}
