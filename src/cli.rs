use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Setup wizard - brings a project's package manifest into the required shape
#[derive(Parser, Debug)]
#[command(name = "setup-wizard")]
#[command(about = "Checks the host version, registers the scoped registry and installs the SDK package")]
#[command(version)]
pub struct Cli {
    /// Project root containing Packages/manifest.json
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Wizard configuration file (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host editor version; read from ProjectSettings/ProjectVersion.txt when omitted
    #[arg(long, global = true, env = "SETUP_WIZARD_HOST_VERSION")]
    pub host_version: Option<String>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report every step; exits non-zero if any step is not ready
    Status,
    /// Walk the wizard non-interactively, fixing each step in order
    Setup {
        /// Also apply the settings bundle and request a host restart
        #[arg(long)]
        apply_settings: bool,
    },
    /// Run the wizard as an interactive line-based session on stdin
    Run,
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
