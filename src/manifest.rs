//! Package manifest handling.
//!
//! The manifest is a JSON object with a `scopedRegistries` array and a
//! `dependencies` map. Only those two keys are interpreted; every other key
//! (and every unknown field inside a registry entry) is carried through a
//! rewrite untouched and in its original order.
//!
//! A `scopedRegistries` value that is not an array reads as no registries and
//! is replaced by the first added entry. A `dependencies` value that is not an
//! object reads as a missing section.
//!
//! # Persistence
//!
//! Every mutation through [`ManifestStore`] is followed by exactly one
//! full-document write. The write goes to a sibling temporary file which is
//! then renamed over the manifest, so a failed write never leaves a truncated
//! manifest behind. There is no locking: the session owns the file.
//!
//! A failed write leaves the mutation in memory and marks the store as having
//! unsaved changes until a later write succeeds.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, SetupError};
use crate::version;

/// Key of the registry array in the manifest
pub const SCOPED_REGISTRIES_KEY: &str = "scopedRegistries";
/// Key of the dependency map in the manifest
pub const DEPENDENCIES_KEY: &str = "dependencies";

/// A named, URL-addressed package source restricted to a set of scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub name: String,
    pub url: String,
    #[serde(deserialize_with = "deserialize_unique_scopes")]
    pub scopes: Vec<String>,
}

fn unique_scopes<I, S>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for scope in scopes {
        let scope = scope.into();
        if !unique.contains(&scope) {
            unique.push(scope);
        }
    }
    unique
}

fn deserialize_unique_scopes<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer).map(unique_scopes)
}

impl RegistrySource {
    /// Build a registry entry. Duplicate scopes are dropped, first one wins.
    pub fn new<I, S>(name: impl Into<String>, url: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            url: url.into(),
            scopes: unique_scopes(scopes),
        }
    }
}

/// Result of [`ManifestStore::ensure_registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// An entry with the same name already existed; nothing was written
    AlreadyPresent,
    /// The entry was appended and the manifest persisted
    Added,
}

/// In-memory manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: Map<String, Value>,
}

impl Manifest {
    /// Parse a manifest document. Only the top level must be an object.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let parse_error = |reason: String| SetupError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        };

        let value: Value = serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        let Value::Object(root) = value else {
            return Err(parse_error("top level is not a JSON object".into()));
        };

        if root.get(SCOPED_REGISTRIES_KEY).is_some_and(|v| !v.is_array()) {
            debug!("`{SCOPED_REGISTRIES_KEY}` is not an array, treating it as empty");
        }
        if root.get(DEPENDENCIES_KEY).is_some_and(|v| !v.is_object()) {
            debug!("`{DEPENDENCIES_KEY}` is not an object, treating it as missing");
        }

        Ok(Self { root })
    }

    /// Serialize with two-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        Ok(text)
    }

    /// The raw top-level object
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.root
    }

    /// True iff a registry entry's `name` equals `name` exactly.
    pub fn has_registry(&self, name: &str) -> bool {
        self.root
            .get(SCOPED_REGISTRIES_KEY)
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries
                    .iter()
                    .any(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
            })
    }

    /// Registry entries that have the expected shape. Entries that don't are
    /// kept in the document but skipped here.
    pub fn registries(&self) -> Vec<RegistrySource> {
        self.root
            .get(SCOPED_REGISTRIES_KEY)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a registry entry unconditionally. A missing or non-array
    /// registries value is replaced by a fresh array.
    pub fn push_registry(&mut self, entry: &RegistrySource) -> Result<()> {
        let value = serde_json::to_value(entry)?;
        let registries = self
            .root
            .entry(SCOPED_REGISTRIES_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(entries) = registries {
            entries.push(value);
        } else {
            *registries = Value::Array(vec![value]);
        }
        Ok(())
    }

    pub fn has_dependencies_section(&self) -> bool {
        self.root
            .get(DEPENDENCIES_KEY)
            .is_some_and(Value::is_object)
    }

    /// Installed version of `name`. Non-string values are returned as their
    /// JSON text so they show up in reports; they never satisfy a requirement.
    pub fn dependency_version(&self, name: &str) -> Option<String> {
        let value = self
            .root
            .get(DEPENDENCIES_KEY)
            .and_then(Value::as_object)?
            .get(name)?;
        Some(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Set `dependencies[name] = version`. Fails if there is no dependency map.
    pub fn set_dependency(&mut self, name: &str, version: &str) -> Result<()> {
        let deps = self
            .root
            .get_mut(DEPENDENCIES_KEY)
            .and_then(Value::as_object_mut)
            .ok_or(SetupError::MissingSection {
                section: DEPENDENCIES_KEY,
            })?;
        deps.insert(name.to_string(), Value::String(version.to_string()));
        Ok(())
    }

    /// True iff `name` is present as a version string that is at least `required`.
    pub fn is_dependency_satisfied(&self, name: &str, required: &str) -> bool {
        self.root
            .get(DEPENDENCIES_KEY)
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
            .is_some_and(|installed| version::satisfies(installed, required))
    }
}

/// Owns a loaded manifest and the path it is persisted to.
///
/// A store only exists for a manifest that loaded successfully; a session
/// whose load failed has no store and therefore cannot mutate anything.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: Manifest,
    dirty: bool,
}

impl ManifestStore {
    /// Read and parse the manifest at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "manifest not found");
                return Err(SetupError::ManifestNotFound { path });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "manifest could not be read");
                return Err(SetupError::ManifestParse {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let manifest = Manifest::parse(&text, &path)?;
        debug!(path = %path.display(), keys = manifest.root.len(), "manifest loaded");
        Ok(Self {
            path,
            manifest,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// True while an in-memory mutation has not reached the file
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn has_registry(&self, name: &str) -> bool {
        self.manifest.has_registry(name)
    }

    pub fn installed_version(&self, name: &str) -> Option<String> {
        self.manifest.dependency_version(name)
    }

    pub fn is_dependency_satisfied(&self, name: &str, required: &str) -> bool {
        self.manifest.is_dependency_satisfied(name, required)
    }

    /// Append `entry` and persist. Does not check for an existing entry with
    /// the same name; see [`ManifestStore::ensure_registry`].
    ///
    /// # Errors
    ///
    /// `Persist` if the write fails. The entry stays appended in memory and
    /// [`ManifestStore::persist`] may be retried.
    pub fn add_registry(&mut self, entry: &RegistrySource) -> Result<()> {
        self.manifest.push_registry(entry)?;
        self.dirty = true;
        info!(name = %entry.name, url = %entry.url, "scoped registry added");
        self.persist()
    }

    /// Append `entry` unless an entry with the same name exists, in one call.
    /// An existing entry that never reached the file is written again.
    pub fn ensure_registry(&mut self, entry: &RegistrySource) -> Result<RegistryChange> {
        if self.manifest.has_registry(&entry.name) {
            debug!(name = %entry.name, "scoped registry already present");
            self.persist_if_dirty()?;
            return Ok(RegistryChange::AlreadyPresent);
        }
        self.add_registry(entry)?;
        Ok(RegistryChange::Added)
    }

    /// Set the dependency version (install or update) and persist.
    ///
    /// # Errors
    ///
    /// - `MissingSection` if the manifest has no `dependencies` map (nothing is written)
    /// - `Persist` if the write fails (the new version stays in memory)
    pub fn upsert_dependency(&mut self, name: &str, version: &str) -> Result<()> {
        let previous = self.manifest.dependency_version(name);
        self.manifest.set_dependency(name, version)?;
        self.dirty = true;
        match previous {
            Some(old) => info!(package = name, from = %old, to = version, "dependency updated"),
            None => info!(package = name, version, "dependency installed"),
        }
        self.persist()
    }

    /// Write the whole document back, replacing the file atomically.
    pub fn persist(&mut self) -> Result<()> {
        let text = self.manifest.to_json_string()?;
        write_atomically(&self.path, text.as_bytes()).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "manifest write failed");
            SetupError::Persist {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(path = %self.path.display(), bytes = text.len(), "manifest persisted");
        self.dirty = false;
        Ok(())
    }

    /// Retry a failed write. Returns whether anything was written.
    pub fn persist_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
