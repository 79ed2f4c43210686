//! batchlaunch CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// batchlaunch - submit batches of Kubernetes Jobs from one YAML file
#[derive(Parser, Debug)]
#[command(name = "batchlaunch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show full error diagnostics and info-level logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile and submit the jobs of a batch configuration
    Launch(commands::launch::LaunchArgs),
    /// List the pods in a namespace
    Pods(commands::pods::PodsArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Launch(args) => commands::launch::run(args, self.verbose).await,
            Commands::Pods(args) => commands::pods::run(args).await,
        }
    }
}
