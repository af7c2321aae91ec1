//! Configuration file handling for the setup wizard.
//!
//! The config names what the wizard brings the project to: which registry to
//! register, which package at which minimum version, which host versions are
//! accepted, which settings bundle to apply and how to restart the host.
//! Defaults reproduce the stock Vket Cloud SDK setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::{DEFAULT_ACCEPTED_PREFIXES, EnvironmentGate};
use crate::manifest::RegistrySource;
use crate::settings::{CommandRestarter, PROJECT_PLACEHOLDER};
use crate::types::SettingsBundle;
use crate::version::VersionTriple;

/// Manifest location relative to the project root
pub const DEFAULT_MANIFEST_PATH: &str = "Packages/manifest.json";

/// Package the wizard installs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequirement {
    pub name: String,
    pub required_version: String,
}

/// Accepted host versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequirement {
    pub accepted_prefixes: Vec<String>,
    /// Shown to the user next to the detected version
    pub display: String,
}

/// How to restart the host after applying settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Editor executable; no restart is possible without one
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec!["-projectPath".to_string(), PROJECT_PLACEHOLDER.to_string()],
        }
    }
}

/// Wizard configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Manifest path relative to the project root
    pub manifest_path: PathBuf,
    pub registry: RegistrySource,
    pub package: PackageRequirement,
    pub host: HostRequirement,
    pub settings: SettingsBundle,
    pub restart: RestartConfig,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            registry: RegistrySource::new(
                "Vket Cloud SDK Install Wizard",
                "https://registry.npmjs.com",
                ["com.hikky.vketcloudsdk-install-wizard"],
            ),
            package: PackageRequirement {
                name: "com.hikky.vketcloudsdk-install-wizard".to_string(),
                required_version: "1.0.0".to_string(),
            },
            host: HostRequirement {
                accepted_prefixes: DEFAULT_ACCEPTED_PREFIXES
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
                display: "Unity 6.0.0f1 or newer".to_string(),
            },
            settings: SettingsBundle::default(),
            restart: RestartConfig::default(),
        }
    }
}

impl WizardConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.manifest_path.as_os_str().is_empty() {
            anyhow::bail!("Manifest path must be specified");
        }
        if self.manifest_path.is_absolute() {
            anyhow::bail!("Manifest path must be relative to the project root");
        }

        let registry = &self.registry;
        if registry.name.trim().is_empty() {
            anyhow::bail!("Registry name must be specified");
        }
        if !registry.url.starts_with("https://") && !registry.url.starts_with("http://") {
            anyhow::bail!("Registry URL must start with http:// or https://");
        }
        if registry.scopes.is_empty() {
            anyhow::bail!("Registry must declare at least one scope");
        }
        if registry.scopes.iter().any(|s| s.trim().is_empty()) {
            anyhow::bail!("Registry scopes cannot be empty");
        }

        if self.package.name.trim().is_empty() {
            anyhow::bail!("Package name must be specified");
        }
        self.package
            .required_version
            .parse::<VersionTriple>()
            .with_context(|| {
                format!(
                    "Required version of {} is not a dotted numeric version",
                    self.package.name
                )
            })?;

        if !self.host.accepted_prefixes.iter().any(|p| !p.is_empty()) {
            anyhow::bail!("At least one accepted host version prefix is required");
        }

        if let Some(command) = &self.restart.command {
            if command.trim().is_empty() {
                anyhow::bail!("Restart command cannot be blank");
            }
        }

        Ok(())
    }

    /// Absolute manifest location for `project_root`
    pub fn manifest_location(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.manifest_path)
    }

    pub fn environment_gate(&self) -> EnvironmentGate {
        EnvironmentGate::new(self.host.accepted_prefixes.iter().cloned())
    }

    pub fn restarter(&self) -> CommandRestarter {
        CommandRestarter::new(self.restart.command.clone(), self.restart.args.clone())
    }
}
