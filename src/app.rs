//! Application drivers
//!
//! Three ways to drive a [`WizardSession`]:
//!
//! - **status**: report every step without changing anything
//! - **setup**: walk the wizard headlessly, performing each fix in order
//! - **interactive**: a line-based session reading commands from any reader
//!
//! Output goes to a caller-supplied writer so the drivers can be exercised
//! with in-memory buffers.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::environment;
use crate::manifest::RegistryChange;
use crate::session::{DependencyChange, StepReport, WizardSession};
use crate::settings::{ApplyReport, ProjectSettings, RestartRequester};
use crate::wizard::{AdvanceOutcome, WizardStep};

/// Pick the host version: explicit value first, then the project's recorded
/// editor version.
pub fn resolve_host_version(explicit: Option<String>, project_root: &Path) -> Option<String> {
    if let Some(version) = explicit.filter(|v| !v.trim().is_empty()) {
        debug!(%version, "host version supplied explicitly");
        return Some(version);
    }
    match environment::read_project_version(project_root) {
        Ok(version) => {
            debug!(%version, "host version read from project");
            Some(version)
        }
        Err(e) => {
            info!(error = %e, "host version unknown");
            None
        }
    }
}

/// Commands understood by the interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Next,
    Back,
    AddRegistry,
    Install,
    Apply,
    Save,
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "next" | "n" | "advance" => Some(Self::Next),
            "back" | "b" | "retreat" => Some(Self::Back),
            "add-registry" | "registry" => Some(Self::AddRegistry),
            "install" | "update" => Some(Self::Install),
            "apply" | "apply-and-restart" => Some(Self::Apply),
            "save" | "retry" => Some(Self::Save),
            "status" | "s" => Some(Self::Status),
            "help" | "h" | "?" => Some(Self::Help),
            "quit" | "q" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const HELP_TEXT: &str =
    "commands: next, back, add-registry, install, apply, save, status, help, quit";

/// How the headless setup ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSummary {
    pub registry: Option<RegistryChange>,
    pub dependency: Option<DependencyChange>,
    pub apply: Option<ApplyReport>,
}

/// Main application: a session plus the host-side collaborators.
pub struct App {
    session: WizardSession,
    settings: Box<dyn ProjectSettings>,
    restarter: Box<dyn RestartRequester>,
}

impl App {
    pub fn new(
        session: WizardSession,
        settings: Box<dyn ProjectSettings>,
        restarter: Box<dyn RestartRequester>,
    ) -> Self {
        Self {
            session,
            settings,
            restarter,
        }
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    /// Reports for every step. Returns true when all steps are ready.
    pub fn status<W: Write>(&self, out: &mut W) -> Result<bool> {
        let reports: Vec<StepReport> = WizardStep::all_steps()
            .map(|step| self.session.report(step))
            .collect();
        for report in &reports {
            writeln!(out, "{report}")?;
        }
        Ok(reports.iter().all(|r| r.ready))
    }

    /// Walk every step, fixing what can be fixed, until the wizard closes.
    pub fn run_setup<W: Write>(
        &mut self,
        apply_settings: bool,
        out: &mut W,
    ) -> Result<SetupSummary> {
        if let Some(reason) = self.session.load_error() {
            bail!("cannot run setup: {reason}");
        }

        let mut summary = SetupSummary {
            registry: None,
            dependency: None,
            apply: None,
        };

        loop {
            let report = self.session.evaluate();
            writeln!(out, "{report}")?;

            match report.step {
                WizardStep::VersionCheck if !report.ready => {
                    bail!(
                        "host version {} is not supported (required: {})",
                        self.session.host_version().unwrap_or("(unknown)"),
                        self.session.config().host.display
                    );
                }
                WizardStep::Registry if !report.ready => {
                    let change = self.session.add_registry().context("adding scoped registry")?;
                    match change {
                        RegistryChange::Added => writeln!(out, "  -> scoped registry added")?,
                        RegistryChange::AlreadyPresent => writeln!(out, "  -> manifest saved")?,
                    }
                    summary.registry = Some(change);
                }
                WizardStep::Package if !report.ready => {
                    let change = self
                        .session
                        .install_or_update_dependency()
                        .context("installing package")?;
                    writeln!(out, "  -> {}", describe_dependency_change(&change))?;
                    summary.dependency = Some(change);
                }
                WizardStep::Finish if apply_settings && summary.apply.is_none() => {
                    let report = self
                        .session
                        .apply_and_restart(self.settings.as_mut(), self.restarter.as_mut())?;
                    writeln!(out, "  -> {report}")?;
                    summary.apply = Some(report);
                }
                _ => {}
            }

            match self.session.advance().context("advancing wizard")? {
                AdvanceOutcome::Close => break,
                AdvanceOutcome::Completed => writeln!(out, "All setup steps are complete.")?,
                AdvanceOutcome::Moved => {}
            }
        }

        Ok(summary)
    }

    /// Line-driven wizard session. Returns when the wizard closes, the user
    /// quits or input ends.
    pub fn run_interactive<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        let report = self.session.evaluate();
        writeln!(out, "{report}")?;
        if self.session.load_error().is_some() {
            writeln!(out, "Only `quit` is available.")?;
        }
        writeln!(out, "{HELP_TEXT}")?;

        for line in input.lines() {
            let line = line.context("reading command")?;
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = SessionCommand::parse(&line) else {
                writeln!(out, "unknown command {:?}; {HELP_TEXT}", line.trim())?;
                continue;
            };
            debug!(?command, "interactive command");

            match command {
                SessionCommand::Quit => break,
                SessionCommand::Help => writeln!(out, "{HELP_TEXT}")?,
                SessionCommand::Status => {}
                SessionCommand::Next => match self.session.advance() {
                    Ok(AdvanceOutcome::Close) => {
                        writeln!(out, "Closing setup wizard.")?;
                        return Ok(());
                    }
                    Ok(AdvanceOutcome::Completed) => {
                        writeln!(out, "All setup steps are complete.")?
                    }
                    Ok(AdvanceOutcome::Moved) => {}
                    Err(e) => writeln!(out, "cannot continue: {e}")?,
                },
                SessionCommand::Back => {
                    if let Err(e) = self.session.retreat() {
                        writeln!(out, "cannot go back: {e}")?;
                    }
                }
                SessionCommand::AddRegistry => match self.session.add_registry() {
                    Ok(RegistryChange::Added) => writeln!(out, "Scoped registry added.")?,
                    Ok(RegistryChange::AlreadyPresent) => {
                        writeln!(out, "Scoped registry is already registered.")?
                    }
                    Err(e) => writeln!(out, "error: {e}")?,
                },
                SessionCommand::Install => match self.session.install_or_update_dependency() {
                    Ok(change) => writeln!(out, "{}", describe_dependency_change(&change))?,
                    Err(e) => writeln!(out, "error: {e}")?,
                },
                SessionCommand::Save => match self.session.retry_persist() {
                    Ok(true) => writeln!(out, "Manifest saved.")?,
                    Ok(false) => writeln!(out, "No unsaved manifest changes.")?,
                    Err(e) => writeln!(out, "error: {e}")?,
                },
                SessionCommand::Apply => match self
                    .session
                    .apply_and_restart(self.settings.as_mut(), self.restarter.as_mut())
                {
                    Ok(report) => writeln!(out, "{report}")?,
                    Err(e) => writeln!(out, "error: {e}")?,
                },
            }

            let report = self.session.evaluate();
            writeln!(out, "{report}")?;
        }

        Ok(())
    }
}

fn describe_dependency_change(change: &DependencyChange) -> String {
    match change {
        DependencyChange::AlreadySatisfied => "package already up to date".to_string(),
        DependencyChange::Installed => "package installed".to_string(),
        DependencyChange::Updated { from } => format!("package updated from {from}"),
    }
}
