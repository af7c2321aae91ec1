//! Setup wizard - main entry point
//!
//! Parses the command line, initializes logging to stderr and hands off to the
//! library's session drivers. Reports go to stdout.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use setup_wizard::app::{App, resolve_host_version};
use setup_wizard::cli::{Cli, Commands};
use setup_wizard::config_file::WizardConfig;
use setup_wizard::session::WizardSession;
use setup_wizard::settings::PendingSettingsFile;

/// Initialize tracing with RUST_LOG taking precedence over the default level
fn init_logging(verbose: bool) {
    let default = if verbose {
        "setup_wizard=debug"
    } else {
        "setup_wizard=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<WizardConfig> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            WizardConfig::load_from_file(path)?
        }
        None => WizardConfig::default(),
    };
    config.validate().context("Invalid wizard configuration")?;
    Ok(config)
}

fn build_app(cli: &Cli) -> Result<App> {
    let config = load_config(cli)?;
    let host_version = resolve_host_version(cli.host_version.clone(), &cli.project);
    let restarter = config.restarter();
    let session = WizardSession::open(&cli.project, config, host_version);
    let settings = PendingSettingsFile::open(&cli.project);
    Ok(App::new(session, Box::new(settings), Box::new(restarter)))
}

fn run(cli: Cli) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            let loaded = WizardConfig::load_from_file(config)?;
            loaded.validate()?;
            writeln!(out, "✓ Configuration file is valid: {}", config.display())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            WizardConfig::default().save_to_file(path)?;
            writeln!(out, "✓ Default configuration written to {}", path.display())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            let app = build_app(&cli)?;
            let ready = app.status(&mut out)?;
            Ok(if ready { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Setup { apply_settings } => {
            let mut app = build_app(&cli)?;
            let summary = app.run_setup(*apply_settings, &mut out)?;
            debug!(?summary, "setup finished");
            writeln!(out, "✓ Setup finished")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run => {
            let mut app = build_app(&cli)?;
            let stdin = io::stdin();
            app.run_interactive(stdin.lock(), &mut out)?;
            Ok(if app.session().load_error().is_some() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);
    debug!(?cli, "CLI arguments parsed");

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
