//! On-disk snapshot of every package name on the registry
//!
//! The cache has no TTL: it is refreshed only on request, and read only
//! when the caller asks for it. Writes go through a temporary file in the
//! same directory and an atomic rename, so an interrupted refresh never
//! leaves a truncated cache behind.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Cached package list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPackageList {
    /// When the list was fetched
    pub cached_at: DateTime<Utc>,

    /// Package names as the registry spells them
    pub packages: Vec<String>,
}

impl CachedPackageList {
    /// Registry spelling of `name`, matched case-insensitively
    pub fn find(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.packages
            .iter()
            .find(|p| p.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct PackageListCache {
    path: PathBuf,
}

impl PackageListCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached list, `None` when no cache has been written yet
    pub fn load(&self) -> Result<Option<CachedPackageList>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache: {}", self.path.display()))?;

        let cached: CachedPackageList = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache: {}", self.path.display()))?;

        tracing::debug!(
            "Loaded {} cached package names from {}",
            cached.packages.len(),
            self.path.display()
        );
        Ok(Some(cached))
    }

    /// Replace the cache with `packages`
    pub fn store(&self, packages: &[String]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create cache directory: {}", parent.display())
        })?;

        let cached = CachedPackageList {
            cached_at: Utc::now(),
            packages: packages.to_vec(),
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent).with_context(|| {
            format!("Failed to create temporary cache file in {}", parent.display())
        })?;
        serde_json::to_writer(&mut temp, &cached).context("Failed to serialize cache")?;
        temp.flush().context("Failed to write cache")?;
        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write cache: {}", self.path.display()))?;

        tracing::debug!(
            "Saved {} package names to cache: {}",
            packages.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cache_miss_on_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageListCache::new(temp_dir.path().join("pkglist.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_store_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageListCache::new(temp_dir.path().join("nested/dir/pkglist.json"));
        let before = Utc::now();

        cache.store(&names(&["BeautifulSoup", "kid"])).unwrap();

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.packages, names(&["BeautifulSoup", "kid"]));
        assert!(loaded.cached_at >= before);
        assert_eq!(loaded.find("beautifulsoup"), Some("BeautifulSoup"));
        assert_eq!(loaded.find("soup"), None);
    }

    #[test]
    fn test_store_overwrites_and_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageListCache::new(temp_dir.path().join("pkglist.json"));

        cache.store(&names(&["old"])).unwrap();
        cache.store(&names(&["new"])).unwrap();

        assert_eq!(cache.load().unwrap().unwrap().packages, names(&["new"]));
        let files: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pkglist.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = PackageListCache::new(path).load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse cache"));
    }

    #[test]
    fn test_store_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let cache = PackageListCache::new(blocker.join("pkglist.json"));
        assert!(cache.store(&names(&["kid"])).is_err());
    }
}
