//! Candidate directories
//!
//! The tries directory is scanned once per invocation and kept in an explicit
//! cache. Scores are recomputed and the ranking rebuilt on every render pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::core::fuzzy;

/// One workspace directory eligible for selection
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Directory name (no path)
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Status change time
    pub ctime: SystemTime,
    /// Modification time
    pub mtime: SystemTime,
    /// Relevance from the latest ranking pass
    pub score: f64,
}

impl Candidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, ctime: SystemTime, mtime: SystemTime) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ctime,
            mtime,
            score: 0.0,
        }
    }

    fn from_entry(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        if name.starts_with('.') {
            return None;
        }

        // Follows symlinks, like `cd` will
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };
        if !meta.is_dir() {
            return None;
        }

        let mtime = match meta.modified() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: no modification time: {}", path.display(), e);
                return None;
            }
        };

        Some(Self::new(name, path, change_time(&meta).unwrap_or(mtime), mtime))
    }
}

#[cfg(unix)]
fn change_time(meta: &fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn change_time(meta: &fs::Metadata) -> Option<SystemTime> {
    meta.created().ok()
}

/// List the candidate directories under `base`, sorted by name.
///
/// Hidden entries and non-directories are skipped, as is any entry whose
/// metadata cannot be read. An unreadable base yields an empty list.
pub fn scan(base: &Path) -> Vec<Candidate> {
    let entries = match fs::read_dir(base) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot list {}: {}", base.display(), e);
            return Vec::new();
        }
    };

    let mut candidates: Vec<Candidate> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Candidate::from_entry(entry.path()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", base.display(), e);
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Scanned {} candidates in {}", candidates.len(), base.display());
    candidates
}

/// Lazily loaded candidate list with explicit invalidation
#[derive(Debug)]
pub struct CandidateCache {
    base: PathBuf,
    entries: Option<Vec<Candidate>>,
}

impl CandidateCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            entries: None,
        }
    }

    /// A cache pre-filled by an external scanner
    #[allow(dead_code)]
    pub fn with_entries(base: impl Into<PathBuf>, entries: Vec<Candidate>) -> Self {
        Self {
            base: base.into(),
            entries: Some(entries),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The candidate list, scanning the directory if not loaded
    pub fn entries(&mut self) -> &mut Vec<Candidate> {
        let base = &self.base;
        self.entries.get_or_insert_with(|| scan(base))
    }

    /// Drop the cached list; the next access rescans
    pub fn invalidate(&mut self) {
        self.entries = None;
    }

    #[allow(dead_code)]
    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }
}

/// Score every candidate against `query` and return indices in display order.
///
/// With a non-empty query, candidates scoring 0 are left out. Equal scores
/// keep listing order (name order, see [`scan`]).
pub fn rank(candidates: &mut [Candidate], query: &str, now: SystemTime) -> Vec<usize> {
    for c in candidates.iter_mut() {
        c.score = fuzzy::score(&c.name, query, Some(c.mtime), now);
    }

    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|&i| query.is_empty() || candidates[i].score > 0.0)
        .collect();
    order.sort_by(|&a, &b| candidates[b].score.total_cmp(&candidates[a].score));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_scan_skips_hidden_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2025-11-01-alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let names: Vec<String> = scan(dir.path()).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["2025-11-01-alpha", "beta"]);
    }

    #[test]
    fn test_scan_missing_base() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(&dir.path().join("absent")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken")).unwrap();

        let names: Vec<String> = scan(dir.path()).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn test_cache_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("one")).unwrap();

        let mut cache = CandidateCache::new(dir.path());
        assert!(!cache.is_loaded());
        assert_eq!(cache.entries().len(), 1);

        fs::create_dir(dir.path().join("two")).unwrap();
        // Still the cached listing
        assert_eq!(cache.entries().len(), 1);

        cache.invalidate();
        assert_eq!(cache.entries().len(), 2);
    }

    #[test]
    fn test_rank_filters_and_sorts() {
        let now = at(1_000_000);
        let mut list = vec![
            Candidate::new("2025-11-01-alpha", "/t/2025-11-01-alpha", now, now),
            Candidate::new("2025-11-25-beta", "/t/2025-11-25-beta", now, now),
            Candidate::new("bet", "/t/bet", now, now),
        ];

        let order = rank(&mut list, "beta", now);
        assert_eq!(order, vec![1]);
        assert!(list[1].score > 0.0);
        assert_eq!(list[0].score, 0.0);

        // Empty query keeps everything, most recent first
        list[0].mtime = at(1_000_000 - 7200);
        let order = rank(&mut list, "", now);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_rank_ties_keep_listing_order() {
        let now = at(5_000);
        let mut list = vec![
            Candidate::new("aa", "/t/aa", now, now),
            Candidate::new("ab", "/t/ab", now, now),
        ];
        assert_eq!(rank(&mut list, "a", now), vec![0, 1]);
    }
}
