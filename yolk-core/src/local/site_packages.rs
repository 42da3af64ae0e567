//! Installed distributions discovered on the interpreter's import path
//!
//! Every entry of the lookup path is scanned for metadata directories:
//!
//! ```text
//! site-packages/
//! ├── requests-2.31.0.dist-info/METADATA   ← active
//! ├── kid-0.9.6.egg-info/PKG-INFO          ← active
//! ├── six-1.16.0.egg-info                  ← active (file is PKG-INFO)
//! └── TurboGears-1.0-py2.7.egg/EGG-INFO/   ← active only if the egg
//!                                            itself is on the path
//! ```
//!
//! Eggs sitting in a site directory without being on the path are
//! multi-version installs: present, but not importable until activated.

use async_trait::async_trait;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::provider::{DistributionFilter, DistributionProvider};
use super::record::{DependencySpec, DistributionRecord};
use crate::config::LocalConfig;
use crate::error::{Result, YolkError};
use crate::metadata::MetadataHeaders;

/// Prints the interpreter's `sys.path` as a JSON array
const SYS_PATH_SCRIPT: &str = "import sys, json; print(json.dumps(sys.path))";

/// Where the lookup path comes from
#[derive(Debug, Clone)]
enum LookupPath {
    Explicit(Vec<PathBuf>),
    Interpreter(String),
}

/// Kinds of metadata entries found in a site directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    DistInfo,
    EggInfoDir,
    EggInfoFile,
    Egg,
}

impl EntryKind {
    fn classify(file_name: &str, is_dir: bool) -> Option<Self> {
        match (file_name, is_dir) {
            (n, true) if n.ends_with(".dist-info") => Some(EntryKind::DistInfo),
            (n, true) if n.ends_with(".egg-info") => Some(EntryKind::EggInfoDir),
            (n, false) if n.ends_with(".egg-info") => Some(EntryKind::EggInfoFile),
            (n, true) if n.ends_with(".egg") => Some(EntryKind::Egg),
            _ => None,
        }
    }
}

pub struct SitePackagesProvider {
    lookup_path: LookupPath,
}

impl SitePackagesProvider {
    /// Explicit paths from config win; otherwise ask the interpreter
    pub fn from_config(config: &LocalConfig) -> Self {
        if config.paths.is_empty() {
            Self::with_interpreter(&config.python)
        } else {
            Self::with_paths(config.paths.clone())
        }
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            lookup_path: LookupPath::Explicit(paths),
        }
    }

    pub fn with_interpreter(python: &str) -> Self {
        Self {
            lookup_path: LookupPath::Interpreter(python.to_string()),
        }
    }

    async fn lookup_path(&self) -> Result<Vec<PathBuf>> {
        match &self.lookup_path {
            LookupPath::Explicit(paths) => Ok(paths.clone()),
            LookupPath::Interpreter(python) => interpreter_sys_path(python).await,
        }
    }

    async fn scan(&self, filter: &DistributionFilter) -> Result<Vec<DistributionRecord>> {
        let lookup_path = self.lookup_path().await?;
        debug!("Scanning {} lookup path entries", lookup_path.len());

        // Canonical form of every existing path entry, in order, deduplicated
        let mut entries: Vec<PathBuf> = Vec::new();
        for entry in &lookup_path {
            match tokio::fs::canonicalize(entry).await {
                Ok(canonical) if !entries.contains(&canonical) => entries.push(canonical),
                Ok(_) => {}
                Err(e) => debug!("Skipping lookup path entry {:?}: {}", entry, e),
            }
        }
        let on_path: HashSet<PathBuf> = entries.iter().cloned().collect();

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut records = Vec::new();

        for entry in &entries {
            if !tokio::fs::metadata(entry)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                debug!("Skipping non-directory path entry {:?}", entry);
                continue;
            }

            let file_name = entry
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if EntryKind::classify(&file_name, true) == Some(EntryKind::Egg) {
                if visited.insert(entry.clone()) && stem_may_match(&file_name, filter) {
                    if let Some(record) = read_entry(entry, EntryKind::Egg, true).await {
                        records.push(record);
                    }
                }
                continue;
            }

            for (child, kind) in list_metadata_entries(entry).await {
                let child_name = child
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if !stem_may_match(&child_name, filter) {
                    continue;
                }

                let canonical = tokio::fs::canonicalize(&child)
                    .await
                    .unwrap_or_else(|_| child.clone());
                if !visited.insert(canonical.clone()) {
                    continue;
                }

                let active = kind != EntryKind::Egg || on_path.contains(&canonical);
                if let Some(record) = read_entry(&child, kind, active).await {
                    records.push(record);
                }
            }
        }

        shadow_duplicates(&mut records);
        debug!("Found {} installed distributions", records.len());
        Ok(records)
    }
}

#[async_trait]
impl DistributionProvider for SitePackagesProvider {
    async fn list_distributions(
        &self,
        filter: &DistributionFilter,
    ) -> Result<Vec<DistributionRecord>> {
        self.scan(filter).await
    }

    fn name(&self) -> &'static str {
        "site-packages"
    }
}

/// Ask the interpreter for its import path
async fn interpreter_sys_path(python: &str) -> Result<Vec<PathBuf>> {
    debug!("Querying sys.path from {}", python);

    let output = tokio::process::Command::new(python)
        .arg("-c")
        .arg(SYS_PATH_SCRIPT)
        .output()
        .await
        .map_err(|e| YolkError::introspection(format!("failed to run '{python}'"), e))?;

    if !output.status.success() {
        return Err(YolkError::Introspection {
            message: format!(
                "'{}' exited with {}: {}",
                python,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            source: None,
        });
    }

    let entries: Vec<String> =
        serde_json::from_slice(&output.stdout).map_err(|e| YolkError::Introspection {
            message: format!("unexpected sys.path output from '{python}': {e}"),
            source: None,
        })?;

    Ok(entries
        .into_iter()
        .filter(|e| !e.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Metadata entries of one site directory, sorted by file name
async fn list_metadata_entries(dir: &Path) -> Vec<(PathBuf, EntryKind)> {
    let mut found = Vec::new();

    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            return found;
        }
    };

    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error while reading {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        let file_name = entry.file_name().to_string_lossy().to_string();

        if let Some(kind) = EntryKind::classify(&file_name, is_dir) {
            found.push((path, kind));
        }
    }

    found.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    found
}

/// Read one metadata entry; unreadable or nameless entries are skipped
async fn read_entry(path: &Path, kind: EntryKind, active: bool) -> Option<DistributionRecord> {
    let (stem_name, stem_version) = split_stem(path);

    let (pkg_info, dependencies) = match kind {
        EntryKind::DistInfo => {
            let content = read_required(&path.join("METADATA")).await?;
            let headers = MetadataHeaders::parse(&content);
            let deps = headers.contains("Requires-Dist").then(|| {
                headers
                    .all("Requires-Dist")
                    .map(DependencySpec::from)
                    .collect::<Vec<_>>()
            });
            (headers, deps)
        }
        EntryKind::EggInfoDir => read_egg_info(path).await?,
        EntryKind::Egg => read_egg_info(&path.join("EGG-INFO")).await?,
        EntryKind::EggInfoFile => {
            let content = read_required(path).await?;
            (MetadataHeaders::parse(&content), None)
        }
    };

    let Some(metadata) = pkg_info.into_metadata(stem_name.as_deref(), stem_version.as_deref())
    else {
        warn!("Skipping {}: no name or version in metadata", path.display());
        return None;
    };

    let mut record = DistributionRecord::new(metadata, active, path);
    if let Some(deps) = dependencies {
        record = record.with_dependencies(deps);
    }
    Some(record)
}

async fn read_egg_info(dir: &Path) -> Option<(MetadataHeaders, Option<Vec<DependencySpec>>)> {
    let content = read_required(&dir.join("PKG-INFO")).await?;

    let requires = match tokio::fs::read_to_string(dir.join("requires.txt")).await {
        Ok(requires) => Some(parse_requires_txt(&requires)),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Cannot read requires.txt in {}: {}", dir.display(), e);
            None
        }
    };

    Some((MetadataHeaders::parse(&content), requires))
}

async fn read_required(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

/// Unconditional requirements of a `requires.txt`
///
/// Sections (`[extra]`, `[:python_version < "3"]`) are conditional and end
/// the unconditional block.
fn parse_requires_txt(content: &str) -> Vec<DependencySpec> {
    content
        .lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with('['))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(DependencySpec::from)
        .collect()
}

/// `name-version[-pyX.Y[-platform]].ext` → (name, version)
fn split_stem(path: &Path) -> (Option<String>, Option<String>) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(".dist-info")
        .or_else(|| file_name.strip_suffix(".egg-info"))
        .or_else(|| file_name.strip_suffix(".egg"))
        .unwrap_or(&file_name);

    let mut parts = stem.splitn(3, '-');
    let name = parts.next().filter(|n| !n.is_empty()).map(str::to_string);
    let version = parts.next().filter(|v| !v.is_empty()).map(str::to_string);
    (name, version)
}

/// Cheap pre-check of an entry's file name against the requested package
///
/// Metadata directory names escape `-` and `.` as `_`, so both sides are
/// compared in that escaped form.
fn stem_may_match(file_name: &str, filter: &DistributionFilter) -> bool {
    let Some(wanted) = &filter.name else {
        return true;
    };
    let stem_name = file_name.split('-').next().unwrap_or(file_name);
    let stem_name = stem_name
        .strip_suffix(".dist-info")
        .or_else(|| stem_name.strip_suffix(".egg-info"))
        .or_else(|| stem_name.strip_suffix(".egg"))
        .unwrap_or(stem_name);
    escape_name(stem_name) == escape_name(wanted)
}

fn escape_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}

/// Only the first active record of a name is importable
fn shadow_duplicates(records: &mut [DistributionRecord]) {
    let mut active_names = HashSet::new();
    for record in records.iter_mut() {
        if record.is_active() && !active_names.insert(record.name().to_lowercase()) {
            debug!(
                "{} {} at {} is shadowed by an earlier path entry",
                record.name(),
                record.version(),
                record.location().display()
            );
            record.set_active(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn pkg_info(name: &str, version: &str) -> String {
        format!("Metadata-Version: 1.0\nName: {name}\nVersion: {version}\nSummary: {name} summary\n")
    }

    /// A site directory with one of every metadata layout
    fn site_fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let site = temp_dir.path();

        write(
            &site.join("requests-2.31.0.dist-info/METADATA"),
            "Metadata-Version: 2.1\nName: requests\nVersion: 2.31.0\nSummary: HTTP\n\
             Requires-Dist: idna<4,>=2.5\nRequires-Dist: urllib3<3,>=1.21.1\n\
             Requires-Dist: PySocks!=1.5.7,>=1.5.6; extra == \"socks\"\n",
        );
        write(
            &site.join("idna-3.4.dist-info/METADATA"),
            "Metadata-Version: 2.1\nName: idna\nVersion: 3.4\nSummary: IDNA\n",
        );
        write(&site.join("kid-0.9.6.egg-info/PKG-INFO"), &pkg_info("kid", "0.9.6"));
        write(
            &site.join("kid-0.9.6.egg-info/requires.txt"),
            "elementtree\n\n[cheetah]\nCheetah>=1.0\n",
        );
        write(&site.join("six-1.16.0.egg-info"), &pkg_info("six", "1.16.0"));
        write(
            &site.join("kid-0.9.5-py2.7.egg/EGG-INFO/PKG-INFO"),
            &pkg_info("kid", "0.9.5"),
        );
        write(&site.join("kid-0.9.5-py2.7.egg/EGG-INFO/requires.txt"), "");
        write(&site.join("not_a_package.py"), "");

        temp_dir
    }

    fn summary(records: &[DistributionRecord]) -> Vec<(String, String, bool)> {
        records
            .iter()
            .map(|r| (r.name().to_string(), r.version().to_string(), r.is_active()))
            .collect()
    }

    #[tokio::test]
    async fn test_scan_all_layouts() {
        let site = site_fixture();
        let provider = SitePackagesProvider::with_paths(vec![site.path().to_path_buf()]);

        let records = provider
            .list_distributions(&DistributionFilter::default())
            .await
            .unwrap();

        assert_eq!(
            summary(&records),
            vec![
                ("idna".to_string(), "3.4".to_string(), true),
                ("kid".to_string(), "0.9.5".to_string(), false),
                ("kid".to_string(), "0.9.6".to_string(), true),
                ("requests".to_string(), "2.31.0".to_string(), true),
                ("six".to_string(), "1.16.0".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_dependency_sources() {
        let site = site_fixture();
        let provider = SitePackagesProvider::with_paths(vec![site.path().to_path_buf()]);
        let records = provider
            .list_distributions(&DistributionFilter::default())
            .await
            .unwrap();
        let find = |name: &str, version: &str| {
            records
                .iter()
                .find(|r| r.name() == name && r.version() == version)
                .unwrap()
        };

        let requests: Vec<&str> = find("requests", "2.31.0")
            .dependencies()
            .unwrap()
            .iter()
            .map(DependencySpec::as_str)
            .collect();
        assert_eq!(
            requests,
            vec![
                "idna<4,>=2.5",
                "urllib3<3,>=1.21.1",
                "PySocks!=1.5.7,>=1.5.6; extra == \"socks\"",
            ]
        );

        // No Requires-Dist headers: nothing is known
        assert!(find("idna", "3.4").dependencies().is_none());
        // requires.txt stops at the first conditional section
        assert_eq!(
            find("kid", "0.9.6").dependencies(),
            Some(&[DependencySpec::new("elementtree")][..])
        );
        // Empty requires.txt explicitly declares nothing
        assert_eq!(find("kid", "0.9.5").dependencies(), Some(&[][..]));
        // A bare PKG-INFO file carries no dependency data
        assert!(find("six", "1.16.0").dependencies().is_none());
    }

    #[tokio::test]
    async fn test_egg_on_path_is_active_once() {
        let site = site_fixture();
        let egg = site.path().join("kid-0.9.5-py2.7.egg");
        // Egg first on the path: it wins and the plain egg-info is shadowed
        let provider =
            SitePackagesProvider::with_paths(vec![egg.clone(), site.path().to_path_buf()]);

        let records = provider
            .list_distributions(&DistributionFilter::named("kid"))
            .await
            .unwrap();

        assert_eq!(
            summary(&records),
            vec![
                ("kid".to_string(), "0.9.5".to_string(), true),
                ("kid".to_string(), "0.9.6".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_later_path_entries_are_shadowed() {
        let first = site_fixture();
        let second = TempDir::new().unwrap();
        write(
            &second.path().join("six-1.15.0.egg-info"),
            &pkg_info("six", "1.15.0"),
        );

        let provider = SitePackagesProvider::with_paths(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
            first.path().to_path_buf(),
        ]);
        let records = provider
            .list_distributions(&DistributionFilter::named("SIX"))
            .await
            .unwrap();

        assert_eq!(
            summary(&records),
            vec![
                ("six".to_string(), "1.16.0".to_string(), true),
                ("six".to_string(), "1.15.0".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_path_entries_are_skipped() {
        let provider =
            SitePackagesProvider::with_paths(vec![PathBuf::from("/definitely/not/here")]);
        let records = provider
            .list_distributions(&DistributionFilter::default())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_zipped_eggs_are_not_read() {
        let site = site_fixture();
        let zipped = site.path().join("zipped-1.0-py3.egg");
        write(&zipped, "PK\u{3}\u{4}");

        let provider =
            SitePackagesProvider::with_paths(vec![zipped, site.path().to_path_buf()]);
        let records = provider
            .list_distributions(&DistributionFilter::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.name() != "zipped"));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_introspection_error() {
        let provider = SitePackagesProvider::with_interpreter("yolk-no-such-python");
        let err = provider
            .list_distributions(&DistributionFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, YolkError::Introspection { .. }));
    }

    #[test]
    fn test_split_stem() {
        assert_eq!(
            split_stem(Path::new("/s/TurboGears-1.0-py2.7.egg")),
            (Some("TurboGears".to_string()), Some("1.0".to_string()))
        );
        assert_eq!(
            split_stem(Path::new("/s/mypkg.egg-info")),
            (Some("mypkg".to_string()), None)
        );
    }

    #[test]
    fn test_stem_filter_uses_escaped_names() {
        let filter = DistributionFilter::named("zope.interface");
        assert!(stem_may_match("zope_interface-6.0.dist-info", &filter));
        assert!(!stem_may_match("zope_component-6.0.dist-info", &filter));
        assert!(stem_may_match("anything", &DistributionFilter::default()));
    }
}
