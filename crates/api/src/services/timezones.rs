//! Host time zone catalog.
//!
//! Built once at start-up by scanning the host's compiled zone database
//! (`/usr/share/zoneinfo` by default). Registration validates `timeZoneId`
//! against it and `GET /timezones` lists it.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Every compiled zone file starts with this magic.
const TZIF_MAGIC: &[u8; 4] = b"TZif";

const FALLBACK_ZONE: &str = "UTC";

/// Region reported for zones without an `Area/` prefix.
const UNGROUPED_REGION: &str = "Etc";

/// Errors from scanning the zone database.
#[derive(Debug, Error)]
pub enum TimeZoneError {
    #[error("failed to read time zone database: {0}")]
    Io(#[from] std::io::Error),

    #[error("time zone database at {0} contains no zones")]
    Empty(String),
}

/// Descriptive fields for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeZoneInfo {
    pub id: String,
    pub display_name: String,
    pub region: String,
}

/// One row of the `GET /timezones` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeZoneEntry {
    pub iana_name: String,
    pub time_zone_info: TimeZoneInfo,
}

impl TimeZoneEntry {
    fn from_name(name: &str) -> Self {
        let (region, display_name) = match name.split_once('/') {
            Some((area, rest)) => (area.to_string(), rest.replace('/', " / ").replace('_', " ")),
            None => (UNGROUPED_REGION.to_string(), name.replace('_', " ")),
        };

        Self {
            iana_name: name.to_string(),
            time_zone_info: TimeZoneInfo {
                id: name.to_string(),
                display_name,
                region,
            },
        }
    }
}

/// Sorted, de-duplicated set of IANA zone names.
#[derive(Debug, Clone)]
pub struct TimeZoneCatalog {
    entries: Vec<TimeZoneEntry>,
}

impl TimeZoneCatalog {
    /// Scan `dir`, falling back to a UTC-only catalog if it cannot be read.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        match scan(dir) {
            Ok(names) => {
                tracing::info!(zones = names.len(), dir = %dir.display(), "Loaded time zones");
                Self::from_names(names)
            }
            Err(e) => {
                tracing::warn!(error = %e, dir = %dir.display(), "Falling back to UTC-only time zones");
                Self::from_names([FALLBACK_ZONE])
            }
        }
    }

    /// Build a catalog from explicit names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        names.sort_unstable();
        names.dedup();

        Self {
            entries: names.iter().map(|n| TimeZoneEntry::from_name(n)).collect(),
        }
    }

    /// Whether `name` is a known zone (exact, case-sensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .binary_search_by(|e| e.iana_name.as_str().cmp(name))
            .is_ok()
    }

    #[must_use]
    pub fn entries(&self) -> &[TimeZoneEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect zone names under `dir`.
///
/// Only path components starting with an ASCII uppercase letter are
/// considered, which leaves out `posix/`, `right/`, `posixrules`,
/// `localtime` and the `*.tab` tables. Each candidate must carry the TZif
/// magic.
fn scan(dir: &Path) -> Result<Vec<String>, TimeZoneError> {
    let mut names = Vec::new();
    walk(dir, "", &mut names)?;
    if names.is_empty() {
        return Err(TimeZoneError::Empty(dir.display().to_string()));
    }
    Ok(names)
}

/// Unreadable entries and dangling links are skipped; only failing to list
/// `dir` itself is an error.
fn walk(dir: &Path, prefix: &str, names: &mut Vec<String>) -> Result<(), TimeZoneError> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, dir = %dir.display(), "Skipping unreadable zone entry");
                continue;
            }
        };
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }

        let name = if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        };

        let path = entry.path();
        // Follows symlinks: several distributions link aliases to canonical zones
        let (metadata, file_type) = match (fs::metadata(&path), entry.file_type()) {
            (Ok(metadata), Ok(file_type)) => (metadata, file_type),
            (Err(e), _) | (_, Err(e)) => {
                tracing::debug!(error = %e, zone = %name, "Skipping unreadable zone entry");
                continue;
            }
        };
        if metadata.is_dir() {
            if !file_type.is_symlink() && let Err(e) = walk(&path, &name, names) {
                tracing::debug!(error = %e, zone = %name, "Skipping unreadable zone directory");
            }
        } else if metadata.is_file() && has_tzif_magic(&path) {
            names.push(name);
        }
    }
    Ok(())
}

fn has_tzif_magic(path: &Path) -> bool {
    let mut magic = [0_u8; 4];
    fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .is_ok_and(|()| &magic == TZIF_MAGIC)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rockland-tz-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_zone(root: &Path, name: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"TZif2\0\0\0").unwrap();
    }

    #[test]
    fn test_scan_filters_non_zones() {
        let root = scratch_dir();
        write_zone(&root, "America/New_York");
        write_zone(&root, "America/Argentina/Buenos_Aires");
        write_zone(&root, "UTC");
        write_zone(&root, "posix/America/New_York");
        write_zone(&root, "posixrules");
        fs::write(root.join("SECURITY"), b"not a zone").unwrap();
        fs::write(root.join("zone.tab"), b"# table").unwrap();

        let catalog = TimeZoneCatalog::load(&root);
        let names: Vec<&str> = catalog.entries().iter().map(|e| e.iana_name.as_str()).collect();
        assert_eq!(
            names,
            ["America/Argentina/Buenos_Aires", "America/New_York", "UTC"]
        );

        fs::remove_dir_all(root).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_does_not_abort_scan() {
        let root = scratch_dir();
        write_zone(&root, "America/New_York");
        write_zone(&root, "UTC");
        std::os::unix::fs::symlink(root.join("America/Nowhere"), root.join("America/Broken"))
            .unwrap();

        let catalog = TimeZoneCatalog::load(&root);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("America/New_York"));
        assert!(!catalog.contains("America/Broken"));

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_missing_dir_falls_back_to_utc() {
        let catalog = TimeZoneCatalog::load(Path::new("/nonexistent/zoneinfo"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("UTC"));
    }

    #[test]
    fn test_contains_is_exact() {
        let catalog = TimeZoneCatalog::from_names(["Europe/Paris", "America/New_York"]);
        assert!(catalog.contains("America/New_York"));
        assert!(!catalog.contains("america/new_york"));
        assert!(!catalog.contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_entry_shape() {
        let catalog = TimeZoneCatalog::from_names(["America/Argentina/Buenos_Aires", "UTC"]);
        let json = serde_json::to_value(catalog.entries()).unwrap();

        assert_eq!(json[0]["ianaName"], "America/Argentina/Buenos_Aires");
        assert_eq!(json[0]["timeZoneInfo"]["region"], "America");
        assert_eq!(json[0]["timeZoneInfo"]["displayName"], "Argentina / Buenos Aires");
        assert_eq!(json[1]["timeZoneInfo"]["region"], "Etc");
    }
}
