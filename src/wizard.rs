//! Wizard State Machine
//!
//! Progress through the setup wizard is an explicit [`WizardState`] value.
//! Transition functions take a state and return a new one, or a typed
//! rejection that leaves the caller's value untouched.
//!
//! # Step Flow
//!
//! ```text
//! VersionCheck  (host version acceptable?)
//!     ↓ ↑
//! Registry      (scoped registry present?)
//!     ↓ ↑
//! Package       (dependency installed at the required version?)
//!     ↓ ↑
//! Finish        (advance closes the session)
//! ```
//!
//! Forward moves require the current step's readiness flag. Backward moves
//! need no re-validation. If the manifest failed to load the machine is
//! frozen: neither direction is permitted and the session can only be closed.

use std::fmt;
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;

/// Wizard steps in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
#[repr(u8)]
pub enum WizardStep {
    /// Host version precondition
    VersionCheck = 0,
    /// Scoped registry registration
    Registry = 1,
    /// Dependency install/update
    Package = 2,
    /// Terminal step; optional settings bundle and restart
    Finish = 3,
}

impl WizardStep {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// 1-based position for "Step n / 4" headers
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    pub const fn total() -> u8 {
        4
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finish)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::VersionCheck => Some(Self::Registry),
            Self::Registry => Some(Self::Package),
            Self::Package => Some(Self::Finish),
            Self::Finish => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::VersionCheck => None,
            Self::Registry => Some(Self::VersionCheck),
            Self::Package => Some(Self::Registry),
            Self::Finish => Some(Self::Package),
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::VersionCheck => "Host Version Check",
            Self::Registry => "Scoped Registry",
            Self::Package => "SDK Package",
            Self::Finish => "Finish",
        }
    }

    pub fn all_steps() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Mutating actions the wizard gates by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardAction {
    AddRegistry,
    InstallOrUpdateDependency,
    ApplyAndRestart,
}

impl WizardAction {
    /// The only step at which this action may run
    pub const fn step(self) -> WizardStep {
        match self {
            Self::AddRegistry => WizardStep::Registry,
            Self::InstallOrUpdateDependency => WizardStep::Package,
            Self::ApplyAndRestart => WizardStep::Finish,
        }
    }
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddRegistry => "add registry",
            Self::InstallOrUpdateDependency => "install or update dependency",
            Self::ApplyAndRestart => "apply settings and restart",
        })
    }
}

/// Errors for rejected transitions and actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardTransitionError {
    /// The manifest failed to load; the wizard is frozen
    #[error("manifest could not be loaded; the wizard cannot continue")]
    ManifestUnavailable,

    /// The current step's readiness flag is false
    #[error("step {step} is not complete yet")]
    StepNotReady { step: WizardStep },

    /// Retreat requested at the first step
    #[error("already at the first step")]
    AtFirstStep,

    /// Action requested outside the step that owns it
    #[error("{action} is only available at step {}, current step is {current}", .action.step())]
    ActionUnavailable {
        action: WizardAction,
        current: WizardStep,
    },
}

/// What a successful [`WizardState::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next non-terminal step
    Moved,
    /// Crossed into Finish. Fires on every entry, not while staying there.
    Completed,
    /// Advance at Finish: the host should close the session
    Close,
}

/// Explicit wizard progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardState {
    step: WizardStep,
    manifest_loaded: bool,
    version_ok: bool,
    registry_ok: bool,
    package_ok: bool,
}

impl WizardState {
    /// Fresh state at `VersionCheck` with every readiness flag false.
    pub const fn new(manifest_loaded: bool) -> Self {
        Self {
            step: WizardStep::VersionCheck,
            manifest_loaded,
            version_ok: false,
            registry_ok: false,
            package_ok: false,
        }
    }

    #[inline]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    #[inline]
    pub fn manifest_loaded(&self) -> bool {
        self.manifest_loaded
    }

    /// True when the manifest failed to load and no transition is possible
    #[inline]
    pub fn is_frozen(&self) -> bool {
        !self.manifest_loaded
    }

    /// Readiness flag of `step` (`Finish` is always ready).
    pub fn is_ready(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::VersionCheck => self.version_ok,
            WizardStep::Registry => self.registry_ok,
            WizardStep::Package => self.package_ok,
            WizardStep::Finish => true,
        }
    }

    /// Return a copy with the readiness flag of `step` replaced.
    #[must_use]
    pub fn with_readiness(mut self, step: WizardStep, ok: bool) -> Self {
        match step {
            WizardStep::VersionCheck => self.version_ok = ok,
            WizardStep::Registry => self.registry_ok = ok,
            WizardStep::Package => self.package_ok = ok,
            WizardStep::Finish => {}
        }
        self
    }

    pub fn can_advance(&self) -> bool {
        self.manifest_loaded && self.is_ready(self.step)
    }

    pub fn can_retreat(&self) -> bool {
        self.manifest_loaded && self.step.previous().is_some()
    }

    /// Move forward one step.
    ///
    /// # Errors
    ///
    /// - `ManifestUnavailable` if the manifest failed to load
    /// - `StepNotReady` if the current step's flag is false
    pub fn advance(self) -> Result<(Self, AdvanceOutcome), WizardTransitionError> {
        if !self.manifest_loaded {
            return Err(WizardTransitionError::ManifestUnavailable);
        }
        if !self.is_ready(self.step) {
            return Err(WizardTransitionError::StepNotReady { step: self.step });
        }

        match self.step.next() {
            None => Ok((self, AdvanceOutcome::Close)),
            Some(next) => {
                let moved = Self { step: next, ..self };
                let outcome = if next.is_terminal() {
                    AdvanceOutcome::Completed
                } else {
                    AdvanceOutcome::Moved
                };
                Ok((moved, outcome))
            }
        }
    }

    /// Move back one step without re-validating anything.
    ///
    /// # Errors
    ///
    /// - `ManifestUnavailable` if the manifest failed to load
    /// - `AtFirstStep` at `VersionCheck`
    pub fn retreat(self) -> Result<Self, WizardTransitionError> {
        if !self.manifest_loaded {
            return Err(WizardTransitionError::ManifestUnavailable);
        }
        let previous = self
            .step
            .previous()
            .ok_or(WizardTransitionError::AtFirstStep)?;
        Ok(Self {
            step: previous,
            ..self
        })
    }

    /// Check that `action` may run in this state.
    pub fn permits(&self, action: WizardAction) -> Result<(), WizardTransitionError> {
        if !self.manifest_loaded {
            return Err(WizardTransitionError::ManifestUnavailable);
        }
        if self.step != action.step() {
            return Err(WizardTransitionError::ActionUnavailable {
                action,
                current: self.step,
            });
        }
        Ok(())
    }
}

impl From<WizardTransitionError> for crate::error::SetupError {
    fn from(err: WizardTransitionError) -> Self {
        crate::error::SetupError::Transition(err.to_string())
    }
}
