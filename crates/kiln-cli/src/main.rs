//! Kiln CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;

mod commands;
mod compiler;
mod config;
mod handlers;

use commands::{BlobCommands, Commands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about = "Inspect kiln blob stores and module resolution", long_about = None)]
struct Cli {
    /// Blob store directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Project root for resolution and config lookup
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load()
        .unwrap_or_default()
        .merge_flags(cli.cache_dir, cli.project_root, cli.json_logs);
    kiln_trace::init_tracing(&config.tracing)?;

    match cli.command {
        Commands::Blob { command } => match command {
            BlobCommands::Put { file } => handlers::blob_put(&config, &file).await?,
            BlobCommands::Get { key } => handlers::blob_get(&config, &key).await?,
        },
        Commands::Code {
            content_key,
            ast_key,
            file_path,
        } => handlers::code(&config, content_key, ast_key, file_path).await?,
        Commands::Map { map_key, ast_key } => handlers::map(&config, map_key, ast_key).await?,
        Commands::Resolve { specifier, from } => handlers::resolve(&config, &specifier, &from).await?,
        Commands::Builtins => handlers::list_builtins()?,
        Commands::Config => handlers::show_config(&config)?,
    }

    Ok(())
}
