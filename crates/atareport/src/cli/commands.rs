//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind, overriding `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overriding `server.port`
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Commands operating on stored forms.
#[derive(Debug, Subcommand)]
pub enum FormsCommand {
    /// List forms in index order
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print a form's normalized document as JSON
    Show {
        /// Form identifier
        id: String,
    },

    /// Create a new form and print its identifier
    Create,

    /// Delete a form and its index entry
    Delete {
        /// Form identifier
        id: String,
    },
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Form identifier
    pub id: String,

    /// Write the HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// File to validate; defaults to the configuration path
        file: Option<PathBuf>,
    },
}
