//! Command-line interface
//!
//! - `serve`: activate modules and run the HTTP server (default)
//! - `modules`: print the activation order
//! - `catalog`: print the permission catalog as JSON
//! - `check`: discover and activate modules without serving

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "modgate-core",
    version,
    about = "Module host and authorization engine",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// Print modules in activation order
    Modules {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the permission catalog
    Catalog {
        /// Only the keys granted to this role by default
        #[arg(long)]
        role: Option<String>,
    },

    /// Validate module registration and contributions
    Check,
}

impl Cli {
    /// Subcommand, defaulting to `serve`
    pub fn command_or_serve(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
