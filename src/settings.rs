//! Settings bundle application and restart orchestration
//!
//! Runs after the manifest work is done, when the wizard reaches its final
//! step.
//!
//! # Failure Policy
//!
//! Everything here is **non-fatal**. Each setting is applied independently; a
//! failure is logged and recorded in the [`ApplyReport`] and the remaining
//! settings still run. The pending state is saved and a restart is requested
//! regardless. The restart request is fire-and-forget: the child process is
//! spawned and never waited on.

use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::error::{Result, SetupError};
use crate::types::{ProjectSetting, REFLECTION_RESOLUTION_RANGE, SettingsBundle};

/// File, relative to the project root, that collects settings for the host
/// editor to pick up on its next start
pub const PENDING_SETTINGS_FILE: &str = "ProjectSettings/SetupWizardPending.json";

/// Placeholder in restart arguments replaced by the project path
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Project-settings surface of the host editor.
pub trait ProjectSettings {
    /// Apply a single setting.
    fn apply(&mut self, setting: &ProjectSetting) -> Result<()>;

    /// Flush whatever `apply` recorded.
    fn save_pending(&mut self) -> Result<()>;
}

/// Process-restart capability of the host environment.
pub trait RestartRequester {
    /// Ask the environment to restart on `project_path`. Must not block on the
    /// restarted process.
    fn request_restart(&mut self, project_path: &Path) -> Result<()>;
}

/// A setting that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingFailure {
    pub setting: ProjectSetting,
    pub reason: String,
}

/// Outcome of [`apply_bundle_and_restart`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: Vec<ProjectSetting>,
    pub failures: Vec<SettingFailure>,
    /// Error text if saving the pending state failed
    pub save_error: Option<String>,
    /// Error text if the restart could not be requested
    pub restart_error: Option<String>,
}

impl ApplyReport {
    pub fn restart_requested(&self) -> bool {
        self.restart_error.is_none()
    }

    /// True when every step succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.save_error.is_none() && self.restart_error.is_none()
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} setting(s) applied, {} failed",
            self.applied.len(),
            self.failures.len()
        )?;
        if let Some(err) = &self.save_error {
            write!(f, "; saving failed: {err}")?;
        }
        match &self.restart_error {
            None => write!(f, "; restart requested"),
            Some(err) => write!(f, "; restart not requested: {err}"),
        }
    }
}

/// Apply every setting in `bundle`, save, then request a restart on
/// `project_path`. Never fails; see [`ApplyReport`].
pub fn apply_bundle_and_restart(
    bundle: &SettingsBundle,
    project_path: &Path,
    settings: &mut dyn ProjectSettings,
    restarter: &mut dyn RestartRequester,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for setting in &bundle.settings {
        match settings.apply(setting) {
            Ok(()) => {
                debug!(%setting, "setting applied");
                report.applied.push(*setting);
            }
            Err(e) => {
                warn!(%setting, error = %e, "setting not applied, continuing");
                report.failures.push(SettingFailure {
                    setting: *setting,
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Err(e) = settings.save_pending() {
        warn!(error = %e, "failed to save pending settings");
        report.save_error = Some(e.to_string());
    }

    match restarter.request_restart(project_path) {
        Ok(()) => info!(project = %project_path.display(), "restart requested"),
        Err(e) => {
            warn!(error = %e, "restart request failed");
            report.restart_error = Some(e.to_string());
        }
    }

    report
}

/// Records settings into [`PENDING_SETTINGS_FILE`] inside the project.
#[derive(Debug, Clone)]
pub struct PendingSettingsFile {
    path: PathBuf,
    pending: Map<String, Value>,
}

impl PendingSettingsFile {
    /// Open the pending file for `project_root`, keeping entries already in it.
    pub fn open(project_root: &Path) -> Self {
        let path = project_root.join(PENDING_SETTINGS_FILE);
        let pending = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                _ => {
                    warn!(path = %path.display(), "ignoring unreadable pending settings file");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self { path, pending }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pending(&self) -> &Map<String, Value> {
        &self.pending
    }
}

impl ProjectSettings for PendingSettingsFile {
    fn apply(&mut self, setting: &ProjectSetting) -> Result<()> {
        if let ProjectSetting::ReflectionProbes { resolution, .. } = setting {
            let (min, max) = REFLECTION_RESOLUTION_RANGE;
            if !resolution.is_power_of_two() || *resolution < min || *resolution > max {
                return Err(SetupError::settings_apply(
                    setting,
                    format!("resolution must be a power of two between {min} and {max}"),
                ));
            }
        }
        let mut value = serde_json::to_value(setting)?;
        if let Value::Object(map) = &mut value {
            map.remove("setting");
        }
        self.pending.insert(setting.key().to_string(), value);
        Ok(())
    }

    fn save_pending(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.pending)?;
        fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), entries = self.pending.len(), "pending settings saved");
        Ok(())
    }
}

/// Restarts the host by spawning a configured command.
#[derive(Debug, Clone, Default)]
pub struct CommandRestarter {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandRestarter {
    /// `args` may contain [`PROJECT_PLACEHOLDER`]; if none does, the project
    /// path is appended as the last argument.
    pub fn new(program: Option<String>, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Argument list for `project_path`
    pub fn resolved_args(&self, project_path: &Path) -> Vec<String> {
        let project = project_path.display().to_string();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PROJECT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PROJECT_PLACEHOLDER, &project)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(project);
        }
        args
    }
}

impl RestartRequester for CommandRestarter {
    fn request_restart(&mut self, project_path: &Path) -> Result<()> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| SetupError::restart_request("no restart command configured"))?;
        let args = self.resolved_args(project_path);
        info!(program, ?args, "spawning host restart");

        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| SetupError::restart_request(format!("{program}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorSpace, ReflectionProbeMode, ShaderTier};

    /// Fails on the setting whose key matches `fail_on`
    struct FlakySettings {
        fail_on: &'static str,
        seen: Vec<&'static str>,
        saved: bool,
    }

    impl ProjectSettings for FlakySettings {
        fn apply(&mut self, setting: &ProjectSetting) -> Result<()> {
            self.seen.push(setting.key());
            if setting.key() == self.fail_on {
                return Err(SetupError::settings_apply(setting, "locked"));
            }
            Ok(())
        }

        fn save_pending(&mut self) -> Result<()> {
            self.saved = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingRestarter {
        requested: Vec<PathBuf>,
    }

    impl RestartRequester for RecordingRestarter {
        fn request_restart(&mut self, project_path: &Path) -> Result<()> {
            self.requested.push(project_path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_one_failure_does_not_abort_batch() {
        let mut settings = FlakySettings {
            fail_on: "shader_tier",
            seen: Vec::new(),
            saved: false,
        };
        let mut restarter = RecordingRestarter::default();
        let report = apply_bundle_and_restart(
            &SettingsBundle::default(),
            Path::new("/projects/demo"),
            &mut settings,
            &mut restarter,
        );

        assert_eq!(
            settings.seen,
            vec!["color_space", "shader_tier", "lighting_mode", "reflection_probes"]
        );
        assert_eq!(report.applied.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].setting,
            ProjectSetting::ShaderTier {
                value: ShaderTier::High
            }
        );
        assert!(settings.saved);
        assert_eq!(restarter.requested, vec![PathBuf::from("/projects/demo")]);
        assert!(report.restart_requested());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_missing_restart_command_is_reported_not_raised() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let mut settings = PendingSettingsFile::open(dir.path());
        let mut restarter = CommandRestarter::default();
        let report = apply_bundle_and_restart(
            &SettingsBundle::default(),
            dir.path(),
            &mut settings,
            &mut restarter,
        );
        assert!(report.failures.is_empty());
        assert!(report.save_error.is_none());
        assert!(!report.restart_requested());
        assert!(report.to_string().contains("restart not requested"));
        assert!(dir.path().join(PENDING_SETTINGS_FILE).exists());
    }

    #[test]
    fn test_pending_file_rejects_bad_resolution() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let mut settings = PendingSettingsFile::open(dir.path());
        let bad = ProjectSetting::ReflectionProbes {
            mode: ReflectionProbeMode::Realtime,
            resolution: 100,
        };
        assert!(matches!(
            settings.apply(&bad),
            Err(SetupError::SettingsApply { .. })
        ));
        settings
            .apply(&ProjectSetting::ColorSpace {
                value: ColorSpace::Linear,
            })
            .expect("apply");
        assert_eq!(
            settings.pending().get("color_space"),
            Some(&serde_json::json!({"value": "linear"}))
        );
        assert!(settings.pending().get("reflection_probes").is_none());
    }

    #[test]
    fn test_pending_file_keeps_existing_entries() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("ProjectSettings")).expect("mkdir");
        fs::write(
            dir.path().join(PENDING_SETTINGS_FILE),
            r#"{"custom": {"value": 1}}"#,
        )
        .expect("write");
        let settings = PendingSettingsFile::open(dir.path());
        assert!(settings.pending().contains_key("custom"));
    }

    #[test]
    fn test_restart_args_substitute_project() {
        let restarter = CommandRestarter::new(
            Some("editor".into()),
            vec!["-projectPath".into(), "{project}".into()],
        );
        assert_eq!(
            restarter.resolved_args(Path::new("/p")),
            vec!["-projectPath".to_string(), "/p".to_string()]
        );

        let restarter = CommandRestarter::new(Some("editor".into()), vec!["--reopen".into()]);
        assert_eq!(
            restarter.resolved_args(Path::new("/p")),
            vec!["--reopen".to_string(), "/p".to_string()]
        );
    }

    #[test]
    fn test_restart_spawn_failure_is_an_error() {
        let mut restarter = CommandRestarter::new(
            Some("/definitely/not/a/real/editor-binary".into()),
            Vec::new(),
        );
        let err = restarter.request_restart(Path::new("/p")).unwrap_err();
        assert!(matches!(err, SetupError::RestartRequest(_)));
    }
}
