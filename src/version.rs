//! Dotted numeric version comparison.
//!
//! Versions are plain `major[.minor[.patch]]` triples. There is no pre-release
//! or build-metadata handling. Malformed input fails closed: a version that
//! cannot be parsed is always reported as older than what it is compared to,
//! so a corrupt string never satisfies a minimum-version check.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parsed `(major, minor, patch)` triple. Missing components are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Reason a version string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedVersion(pub String);

impl fmt::Display for MalformedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed version string {:?}", self.0)
    }
}

impl std::error::Error for MalformedVersion {}

impl VersionTriple {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for VersionTriple {
    type Err = MalformedVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedVersion(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(malformed());
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for component in trimmed.split('.') {
            if count == parts.len() {
                return Err(malformed());
            }
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            parts[count] = component.parse().map_err(|_| malformed())?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compare an installed version against a required one.
///
/// Returns `Less` when either side is malformed.
pub fn compare_versions(installed: &str, required: &str) -> Ordering {
    match (installed.parse::<VersionTriple>(), required.parse::<VersionTriple>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (a, b) => {
            tracing::debug!(
                installed,
                required,
                installed_ok = a.is_ok(),
                required_ok = b.is_ok(),
                "version comparison failed closed"
            );
            Ordering::Less
        }
    }
}

/// Integer form of [`compare_versions`]: -1, 0 or 1.
pub fn compare(installed: &str, required: &str) -> i8 {
    match compare_versions(installed, required) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// True iff `installed` is at least `required`.
pub fn satisfies(installed: &str, required: &str) -> bool {
    compare_versions(installed, required) != Ordering::Less
}
