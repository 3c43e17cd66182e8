//! Version policy for release preparation.
//!
//! The engine only needs to answer a few questions about a version string:
//! is it a snapshot, what is its release form, and what development version
//! follows a release. Full semantic versions go through `semver`; shorter
//! forms such as `1.0-SNAPSHOT` fall back to bumping the last numeric
//! component.

mod updater;

pub use updater::{CargoManifestTransformer, ManifestRewrite, ManifestTransformer, ScmTagUpdate};

use std::sync::LazyLock;

/// Suffix marking an unreleased version
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

static TIMESTAMPED_SNAPSHOT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(?P<base>.+)-(?P<stamp>\d{8}\.\d{6})-(?P<build>\d+)$")
        .unwrap_or_else(|e| panic!("invalid timestamped snapshot pattern: {e}"))
});

static LAST_NUMBER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(\d+)(\D*)$").unwrap_or_else(|e| panic!("invalid version pattern: {e}"))
});

/// Whether `version` is a `-SNAPSHOT` version
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// Whether `version` is a resolved, timestamped snapshot (`1.0-20240101.120000-3`)
pub fn is_timestamped_snapshot(version: &str) -> bool {
    TIMESTAMPED_SNAPSHOT.is_match(version)
}

/// Whether a dependency on `version` blocks a release
pub fn is_unreleased(version: &str, allow_timestamped: bool) -> bool {
    is_snapshot(version) || (!allow_timestamped && is_timestamped_snapshot(version))
}

/// Release form of a version: the snapshot marker is removed
pub fn release_version(version: &str) -> String {
    if let Some(base) = version.strip_suffix(SNAPSHOT_SUFFIX) {
        return base.to_string();
    }
    if let Some(caps) = TIMESTAMPED_SNAPSHOT.captures(version) {
        return caps["base"].to_string();
    }
    version.to_string()
}

/// Development version following `version`
///
/// Returns `None` when the version has no numeric component to increment.
pub fn next_development_version(version: &str) -> Option<String> {
    let base = release_version(version);

    if let Ok(parsed) = semver::Version::parse(&base) {
        let mut next = semver::Version::new(parsed.major, parsed.minor, parsed.patch + 1);
        next.pre = semver::Prerelease::new("SNAPSHOT").ok()?;
        return Some(next.to_string());
    }

    let caps = LAST_NUMBER.captures(&base)?;
    let digits = caps.get(1)?;
    let incremented = digits.as_str().parse::<u64>().ok()?.checked_add(1)?;
    Some(format!(
        "{}{}{}{}",
        &base[..digits.start()],
        incremented,
        &caps[2],
        SNAPSHOT_SUFFIX
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_detection() {
        assert!(is_snapshot("1.0-SNAPSHOT"));
        assert!(!is_snapshot("1.0"));
        assert!(is_timestamped_snapshot("1.0-20240102.030405-7"));
        assert!(!is_timestamped_snapshot("1.0-SNAPSHOT"));

        assert!(is_unreleased("2.1.0-SNAPSHOT", true));
        assert!(is_unreleased("1.0-20240102.030405-7", false));
        assert!(!is_unreleased("1.0-20240102.030405-7", true));
    }

    #[test]
    fn release_versions() {
        assert_eq!(release_version("1.0-SNAPSHOT"), "1.0");
        assert_eq!(release_version("2.3.4-SNAPSHOT"), "2.3.4");
        assert_eq!(release_version("1.0-20240102.030405-7"), "1.0");
        assert_eq!(release_version("1.0"), "1.0");
    }

    #[test]
    fn development_versions() {
        assert_eq!(next_development_version("1.0").as_deref(), Some("1.1-SNAPSHOT"));
        assert_eq!(
            next_development_version("1.2.3").as_deref(),
            Some("1.2.4-SNAPSHOT")
        );
        assert_eq!(
            next_development_version("1.2.3-SNAPSHOT").as_deref(),
            Some("1.2.4-SNAPSHOT")
        );
        assert_eq!(
            next_development_version("1.0-beta-2").as_deref(),
            Some("1.0-beta-3-SNAPSHOT")
        );
        assert_eq!(next_development_version("final"), None);
    }
}
