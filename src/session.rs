//! Wizard session
//!
//! Binds a [`WizardState`] to the loaded manifest, the host version gate and
//! the configured requirements. Readiness flags are recomputed from the
//! current manifest every time a step is evaluated, so edits made between
//! steps are picked up. All mutations go through the step gate. A step whose
//! fix is only in memory because the write failed is not ready until a later
//! write succeeds.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config_file::WizardConfig;
use crate::environment::EnvironmentGate;
use crate::error::{Result, SetupError};
use crate::manifest::{ManifestStore, RegistryChange};
use crate::settings::{ApplyReport, ProjectSettings, RestartRequester, apply_bundle_and_restart};
use crate::wizard::{AdvanceOutcome, WizardAction, WizardState, WizardStep};

/// What [`WizardSession::install_or_update_dependency`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyChange {
    /// Installed version already satisfied the requirement; nothing written
    AlreadySatisfied,
    Installed,
    Updated { from: String },
}

/// Step-specific facts shown alongside a readiness flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepDetail {
    HostVersion {
        current: Option<String>,
        required: String,
    },
    Registry {
        name: String,
        url: String,
        scopes: Vec<String>,
        present: bool,
        saved: bool,
    },
    Package {
        name: String,
        required: String,
        installed: Option<String>,
        has_dependencies_section: bool,
        saved: bool,
    },
    Finish,
    ManifestUnavailable {
        reason: String,
    },
}

/// Freshly computed view of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: WizardStep,
    pub ready: bool,
    pub detail: StepDetail,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Step {} / {} : {}",
            self.step.number(),
            WizardStep::total(),
            self.step
        )?;
        match &self.detail {
            StepDetail::HostVersion { current, required } => {
                let current = current.as_deref().unwrap_or("(unknown)");
                writeln!(f, "  current host version : {current}")?;
                writeln!(f, "  required             : {required}")?;
                if self.ready {
                    write!(f, "  OK: host version is supported")
                } else {
                    write!(f, "  NG: this host version is not supported")
                }
            }
            StepDetail::Registry {
                name,
                url,
                scopes,
                present,
                saved,
            } => {
                writeln!(f, "  name  : {name}")?;
                writeln!(f, "  url   : {url}")?;
                writeln!(f, "  scope : {}", scopes.join(", "))?;
                if *present && !saved {
                    write!(f, "  NG: manifest has unsaved changes (run `save`)")
                } else if *present {
                    write!(f, "  OK: scoped registry is registered")
                } else {
                    write!(f, "  NG: scoped registry missing (run `add-registry`)")
                }
            }
            StepDetail::Package {
                name,
                required,
                installed,
                has_dependencies_section,
                saved,
            } => {
                writeln!(f, "  package   : {name}")?;
                writeln!(f, "  required  : {required}")?;
                let installed_text = installed.as_deref().unwrap_or("(not installed)");
                writeln!(f, "  installed : {installed_text}")?;
                if !has_dependencies_section {
                    write!(f, "  NG: manifest has no dependencies section")
                } else if !saved {
                    write!(f, "  NG: manifest has unsaved changes (run `save`)")
                } else if self.ready {
                    write!(f, "  OK: package is up to date")
                } else if installed.is_some() {
                    write!(f, "  NG: package is outdated (run `install`)")
                } else {
                    write!(f, "  NG: package not installed (run `install`)")
                }
            }
            StepDetail::Finish => write!(
                f,
                "  Setup complete. `apply` applies the settings bundle and restarts the host."
            ),
            StepDetail::ManifestUnavailable { reason } => {
                writeln!(f, "  ERROR: the manifest could not be loaded, setup cannot continue")?;
                write!(f, "  {reason}")
            }
        }
    }
}

/// One run of the setup wizard over a project.
#[derive(Debug)]
pub struct WizardSession {
    project_root: PathBuf,
    config: WizardConfig,
    gate: EnvironmentGate,
    host_version: Option<String>,
    store: Option<ManifestStore>,
    load_error: Option<String>,
    state: WizardState,
}

impl WizardSession {
    /// Open a session. A manifest that fails to load freezes the session; the
    /// cause is available from [`WizardSession::load_error`].
    pub fn open(
        project_root: impl Into<PathBuf>,
        config: WizardConfig,
        host_version: Option<String>,
    ) -> Self {
        let project_root = project_root.into();
        let manifest_path = config.manifest_location(&project_root);
        let (store, load_error) = match ManifestStore::load(&manifest_path) {
            Ok(store) => (Some(store), None),
            Err(e) => {
                error!(error = %e, "manifest unavailable, wizard frozen");
                (None, Some(e.to_string()))
            }
        };

        let gate = config.environment_gate();
        if !gate.accepts(host_version.as_deref()) {
            warn!(
                host_version = host_version.as_deref().unwrap_or("(unknown)"),
                required = %config.host.display,
                "host version is not supported by this wizard"
            );
        }

        let state = WizardState::new(store.is_some());
        let mut session = Self {
            project_root,
            config,
            gate,
            host_version,
            store,
            load_error,
            state,
        };
        session.evaluate();
        session
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step()
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn host_version(&self) -> Option<&str> {
        self.host_version.as_deref()
    }

    pub fn store(&self) -> Option<&ManifestStore> {
        self.store.as_ref()
    }

    /// Why the manifest could not be loaded, if it couldn't
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Build a report for `step` from the current manifest and host version.
    pub fn report(&self, step: WizardStep) -> StepReport {
        if let Some(reason) = &self.load_error {
            return StepReport {
                step,
                ready: false,
                detail: StepDetail::ManifestUnavailable {
                    reason: reason.clone(),
                },
            };
        }

        let saved = !self.store.as_ref().is_some_and(ManifestStore::has_unsaved_changes);
        match step {
            WizardStep::VersionCheck => StepReport {
                step,
                ready: self.gate.accepts(self.host_version.as_deref()),
                detail: StepDetail::HostVersion {
                    current: self.host_version.clone(),
                    required: self.config.host.display.clone(),
                },
            },
            WizardStep::Registry => {
                let registry = &self.config.registry;
                let present = self
                    .store
                    .as_ref()
                    .is_some_and(|s| s.has_registry(&registry.name));
                StepReport {
                    step,
                    ready: present && saved,
                    detail: StepDetail::Registry {
                        name: registry.name.clone(),
                        url: registry.url.clone(),
                        scopes: registry.scopes.clone(),
                        present,
                        saved,
                    },
                }
            }
            WizardStep::Package => {
                let package = &self.config.package;
                let store = self.store.as_ref();
                StepReport {
                    step,
                    ready: saved
                        && store.is_some_and(|s| {
                            s.is_dependency_satisfied(&package.name, &package.required_version)
                        }),
                    detail: StepDetail::Package {
                        name: package.name.clone(),
                        required: package.required_version.clone(),
                        installed: store.and_then(|s| s.installed_version(&package.name)),
                        has_dependencies_section: store
                            .is_some_and(|s| s.manifest().has_dependencies_section()),
                        saved,
                    },
                }
            }
            WizardStep::Finish => StepReport {
                step,
                ready: true,
                detail: StepDetail::Finish,
            },
        }
    }

    /// Recompute the current step's readiness flag and return its report.
    pub fn evaluate(&mut self) -> StepReport {
        let report = self.report(self.state.step());
        self.state = self.state.with_readiness(report.step, report.ready);
        report
    }

    /// Advance past the current step once its (freshly evaluated) gate holds.
    pub fn advance(&mut self) -> Result<AdvanceOutcome> {
        self.evaluate();
        let (next, outcome) = self.state.advance()?;
        self.state = next;
        match outcome {
            AdvanceOutcome::Moved => info!(step = %next.step(), "wizard advanced"),
            AdvanceOutcome::Completed => info!("all setup steps complete"),
            AdvanceOutcome::Close => info!("wizard closing"),
        }
        if outcome != AdvanceOutcome::Close {
            self.evaluate();
        }
        Ok(outcome)
    }

    /// Go back one step; the new step is re-evaluated but not required to pass.
    pub fn retreat(&mut self) -> Result<WizardStep> {
        self.state = self.state.retreat()?;
        info!(step = %self.state.step(), "wizard went back");
        self.evaluate();
        Ok(self.state.step())
    }

    fn store_for(&mut self, action: WizardAction) -> Result<&mut ManifestStore> {
        self.state.permits(action)?;
        self.store.as_mut().ok_or_else(manifest_unavailable)
    }

    /// Write manifest changes left in memory by an earlier failed write.
    /// Returns whether anything was written.
    pub fn retry_persist(&mut self) -> Result<bool> {
        let store = self.store.as_mut().ok_or_else(manifest_unavailable)?;
        let written = store.persist_if_dirty();
        if let Ok(true) = written {
            info!(path = %store.path().display(), "pending manifest changes saved");
        }
        self.evaluate();
        written
    }

    /// Register the configured scoped registry unless it is already present.
    pub fn add_registry(&mut self) -> Result<RegistryChange> {
        let entry = self.config.registry.clone();
        let change = self.store_for(WizardAction::AddRegistry)?.ensure_registry(&entry);
        self.evaluate();
        change
    }

    /// Install the configured package, or update it if below the required
    /// version. Does nothing when the installed version already satisfies it.
    pub fn install_or_update_dependency(&mut self) -> Result<DependencyChange> {
        let name = self.config.package.name.clone();
        let required = self.config.package.required_version.clone();
        let store = self.store_for(WizardAction::InstallOrUpdateDependency)?;

        let change = if store.is_dependency_satisfied(&name, &required) {
            store
                .persist_if_dirty()
                .map(|_| DependencyChange::AlreadySatisfied)
        } else {
            let previous = store.installed_version(&name);
            store.upsert_dependency(&name, &required).map(|()| match previous {
                Some(from) => DependencyChange::Updated { from },
                None => DependencyChange::Installed,
            })
        };
        self.evaluate();
        change
    }

    /// Apply the configured settings bundle and request a restart. Only
    /// gating errors are returned; apply/restart failures are in the report.
    pub fn apply_and_restart(
        &mut self,
        settings: &mut dyn ProjectSettings,
        restarter: &mut dyn RestartRequester,
    ) -> Result<ApplyReport> {
        self.state.permits(WizardAction::ApplyAndRestart)?;
        let report = apply_bundle_and_restart(
            &self.config.settings,
            &self.project_root,
            settings,
            restarter,
        );
        info!(%report, "settings bundle processed");
        Ok(report)
    }
}

fn manifest_unavailable() -> SetupError {
    SetupError::Transition("manifest could not be loaded; the wizard cannot continue".into())
}
