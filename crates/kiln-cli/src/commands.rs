//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Read and write raw blobs
    Blob {
        #[command(subcommand)]
        command: BlobCommands,
    },

    /// Print an asset's content
    Code {
        /// Key of the committed content
        #[arg(long)]
        content_key: Option<String>,

        /// Key of the serialized AST
        #[arg(long)]
        ast_key: Option<String>,

        /// Source path recorded on the asset
        #[arg(long)]
        file_path: Option<PathBuf>,
    },

    /// Print an asset's decoded source map as JSON
    Map {
        /// Key of the serialized source map
        #[arg(long)]
        map_key: String,

        /// Key of the serialized AST, used when the map blob is missing
        #[arg(long)]
        ast_key: Option<String>,
    },

    /// Resolve a module specifier
    Resolve {
        /// Specifier as written in the importing file
        specifier: String,

        /// Importing file
        #[arg(long)]
        from: PathBuf,
    },

    /// List built-in plugins
    Builtins,

    /// Show configuration
    Config,
}

#[derive(Subcommand)]
pub enum BlobCommands {
    /// Store a file under its content hash and print the key
    Put {
        /// File to store
        file: PathBuf,
    },

    /// Write a blob to stdout
    Get {
        /// Blob key
        key: String,
    },
}
