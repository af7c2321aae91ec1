//! Type-safe project setting values
//!
//! The settings bundle is expressed with enums rather than strings so config
//! files are validated at load time and the orchestrator can match
//! exhaustively. Storage of these values is up to the host editor.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Rendering color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColorSpace {
    Gamma,
    #[default]
    Linear,
}

/// Graphics shader quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShaderTier {
    Low,
    Medium,
    #[default]
    High,
}

/// Mixed lighting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LightingMode {
    #[default]
    BakedIndirect,
    Subtractive,
    Shadowmask,
}

/// Reflection probe update mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReflectionProbeMode {
    #[default]
    Baked,
    Realtime,
    Custom,
}

/// Smallest and largest reflection probe resolution the host accepts
pub const REFLECTION_RESOLUTION_RANGE: (u32, u32) = (16, 2048);

/// One entry of a settings bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "setting", rename_all = "snake_case")]
pub enum ProjectSetting {
    ColorSpace { value: ColorSpace },
    ShaderTier { value: ShaderTier },
    LightingMode { value: LightingMode },
    ReflectionProbes {
        mode: ReflectionProbeMode,
        resolution: u32,
    },
}

impl ProjectSetting {
    /// Stable key used when recording the setting
    pub const fn key(&self) -> &'static str {
        match self {
            Self::ColorSpace { .. } => "color_space",
            Self::ShaderTier { .. } => "shader_tier",
            Self::LightingMode { .. } => "lighting_mode",
            Self::ReflectionProbes { .. } => "reflection_probes",
        }
    }
}

impl fmt::Display for ProjectSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorSpace { value } => write!(f, "color space = {value}"),
            Self::ShaderTier { value } => write!(f, "shader tier = {value}"),
            Self::LightingMode { value } => write!(f, "lighting mode = {value}"),
            Self::ReflectionProbes { mode, resolution } => {
                write!(f, "reflection probes = {mode} @ {resolution}px")
            }
        }
    }
}

/// Ordered list of settings applied together at the end of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsBundle {
    pub settings: Vec<ProjectSetting>,
}

impl Default for SettingsBundle {
    fn default() -> Self {
        Self {
            settings: vec![
                ProjectSetting::ColorSpace {
                    value: ColorSpace::Linear,
                },
                ProjectSetting::ShaderTier {
                    value: ShaderTier::High,
                },
                ProjectSetting::LightingMode {
                    value: LightingMode::BakedIndirect,
                },
                ProjectSetting::ReflectionProbes {
                    mode: ReflectionProbeMode::Baked,
                    resolution: 128,
                },
            ],
        }
    }
}

impl SettingsBundle {
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }
}
