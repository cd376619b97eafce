//! Version validation and comparison.

use std::cmp::Ordering;

use semver::Version;

/// Longest version string accepted.
const MAX_VERSION_LENGTH: usize = 256;

/// Result of comparing two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// Current is older than target
    Older,
    /// Current equals target
    Equal,
    /// Current is newer than target
    Newer,
}

impl From<Ordering> for VersionComparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Older,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Newer,
        }
    }
}

/// Parse a semver string.
///
/// Surrounding whitespace and a single leading `v` are tolerated. Returns
/// `None` for anything else that is not a valid semantic version.
pub fn parse_version(version: &str) -> Option<Version> {
    if version.len() > MAX_VERSION_LENGTH {
        return None;
    }

    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    Version::parse(version).ok()
}

/// Check whether a string is a valid semantic version.
pub fn is_valid(version: &str) -> bool {
    parse_version(version).is_some()
}

/// Compare two parsed versions by semver precedence.
///
/// Build metadata is ignored, so `1.0.0+a` and `1.0.0+b` are equal.
pub fn compare_parsed(current: &Version, target: &Version) -> VersionComparison {
    let current_key = (current.major, current.minor, current.patch, &current.pre);
    let target_key = (target.major, target.minor, target.patch, &target.pre);
    current_key.cmp(&target_key).into()
}

/// Compare two semver version strings.
///
/// Returns `None` if either side is not a valid version.
pub fn compare_versions(current: &str, target: &str) -> Option<VersionComparison> {
    let current = parse_version(current)?;
    let target = parse_version(target)?;
    Some(compare_parsed(&current, &target))
}
