use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tracko", version, about = "Track your commits across git repositories")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import new commits from every tracked repository
    Import {
        /// Hide the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show tracked repositories and what has been imported
    Status,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Create a new configuration file
    Init {
        /// Author name as it appears in commits
        #[arg(long)]
        name: String,

        /// Author email, repeat for every address you commit with
        #[arg(long = "email", required = true)]
        emails: Vec<String>,

        /// Location of the state database
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Repository commits are exported to
        #[arg(long)]
        target_repo: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Print a configuration value
    Get {
        key: String,
    },

    /// Change a configuration value
    Set {
        key: String,
        value: String,
    },

    /// Manage tracked repositories
    #[command(subcommand)]
    Repo(RepoCommand),
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Start tracking a repository
    Add { path: PathBuf },

    /// Stop tracking a repository
    Remove { path: PathBuf },

    /// List tracked repositories
    List,
}
