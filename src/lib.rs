//! Setup Wizard Library
//!
//! Core engine of a project onboarding wizard: a host version gate, a package
//! manifest store that is safe to re-run, a dotted version comparator and a
//! step-gated state machine, plus a best-effort settings/restart phase.

pub mod app;
pub mod cli;
pub mod config_file;
pub mod environment;
pub mod error;
pub mod manifest;
pub mod session;
pub mod settings;
pub mod types;
pub mod version;
pub mod wizard;

// Re-export main types for convenience
pub use config_file::WizardConfig;
pub use environment::EnvironmentGate;
pub use error::{Result, SetupError};
pub use manifest::{Manifest, ManifestStore, RegistryChange, RegistrySource};
pub use session::{DependencyChange, StepReport, WizardSession};
pub use settings::{
    ApplyReport, CommandRestarter, PendingSettingsFile, ProjectSettings, RestartRequester,
    apply_bundle_and_restart,
};
pub use types::{ProjectSetting, SettingsBundle};
pub use version::{VersionTriple, compare, compare_versions};
pub use wizard::{AdvanceOutcome, WizardAction, WizardState, WizardStep, WizardTransitionError};
