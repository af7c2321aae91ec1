//! Host environment version gate
//!
//! The gate is a prefix allow-list, not a semantic comparison: a host version
//! is accepted only if it starts with one of the configured release prefixes.
//! Anything else, including an unknown or empty version, is rejected.

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SetupError};

/// Release prefixes accepted by default (Unity 6 reports either form)
pub const DEFAULT_ACCEPTED_PREFIXES: &[&str] = &["6000.", "6.0."];

/// Project file that records which editor version last opened the project
pub const PROJECT_VERSION_FILE: &str = "ProjectSettings/ProjectVersion.txt";

const EDITOR_VERSION_KEY: &str = "m_EditorVersion:";

/// Decides whether a host version string is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentGate {
    accepted_prefixes: Vec<String>,
}

impl Default for EnvironmentGate {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTED_PREFIXES.iter().copied())
    }
}

impl EnvironmentGate {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_prefixes: prefixes
                .into_iter()
                .map(|p| -> String { p.into() })
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn accepted_prefixes(&self) -> &[String] {
        &self.accepted_prefixes
    }

    /// True iff `version` starts with an accepted prefix.
    pub fn is_host_version_acceptable(&self, version: &str) -> bool {
        let accepted = self
            .accepted_prefixes
            .iter()
            .any(|prefix| version.starts_with(prefix.as_str()));
        debug!(version, accepted, "host version evaluated");
        accepted
    }

    /// Same as [`EnvironmentGate::is_host_version_acceptable`]; an unknown
    /// host version is rejected.
    pub fn accepts(&self, version: Option<&str>) -> bool {
        version.is_some_and(|v| self.is_host_version_acceptable(v))
    }
}

/// Read the editor version recorded in `<project>/ProjectSettings/ProjectVersion.txt`.
pub fn read_project_version(project_root: &Path) -> Result<String> {
    let path = project_root.join(PROJECT_VERSION_FILE);
    let text = fs::read_to_string(&path)
        .map_err(|e| SetupError::HostVersion(format!("{}: {e}", path.display())))?;
    parse_project_version(&text).ok_or_else(|| {
        SetupError::HostVersion(format!(
            "{} has no {EDITOR_VERSION_KEY} line",
            path.display()
        ))
    })
}

fn parse_project_version(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix(EDITOR_VERSION_KEY))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefixes() {
        let gate = EnvironmentGate::default();
        assert!(gate.is_host_version_acceptable("6000.0.1f1"));
        assert!(gate.is_host_version_acceptable("6000.1.0b3"));
        assert!(gate.is_host_version_acceptable("6.0.0f1"));
        assert!(!gate.is_host_version_acceptable("2022.3.10f1"));
        assert!(!gate.is_host_version_acceptable("6.1.0f1"));
        assert!(!gate.is_host_version_acceptable("60000.0.0"));
        assert!(!gate.is_host_version_acceptable(""));
        assert!(!gate.is_host_version_acceptable("garbage"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        assert!(!EnvironmentGate::default().accepts(None));
        assert!(EnvironmentGate::default().accepts(Some("6000.2.0f1")));
    }

    #[test]
    fn test_custom_prefixes_drop_empty() {
        let gate = EnvironmentGate::new(["", "7000."]);
        assert_eq!(gate.accepted_prefixes(), &["7000.".to_string()]);
        assert!(!gate.is_host_version_acceptable("6000.0.1f1"));
        assert!(gate.is_host_version_acceptable("7000.0.0a1"));
    }

    #[test]
    fn test_parse_project_version() {
        let text = "m_EditorVersion: 6000.0.23f1\nm_EditorVersionWithRevision: 6000.0.23f1 (1c4764c07fb4)\n";
        assert_eq!(parse_project_version(text).as_deref(), Some("6000.0.23f1"));
        assert_eq!(parse_project_version("something: else\n"), None);
        assert_eq!(parse_project_version("m_EditorVersion:   \n"), None);
    }

    #[test]
    fn test_read_project_version_from_disk() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert!(matches!(
            read_project_version(dir.path()),
            Err(SetupError::HostVersion(_))
        ));

        fs::create_dir_all(dir.path().join("ProjectSettings")).expect("mkdir");
        fs::write(
            dir.path().join(PROJECT_VERSION_FILE),
            "m_EditorVersion: 6.0.0f1\n",
        )
        .expect("write");
        assert_eq!(read_project_version(dir.path()).expect("read"), "6.0.0f1");
    }
}
