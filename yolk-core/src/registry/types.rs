//! Registry data returned by clients and resolvers

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All versions the registry lists for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReleases {
    /// Registry's own spelling of the package name
    pub canonical_name: String,

    /// Registry-reported order, newest first
    pub versions: Vec<String>,
}

/// One file uploaded for a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFile {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    /// `sdist`, `bdist_wheel`, `bdist_egg`, ...
    #[serde(default)]
    pub packagetype: String,
}

/// Where a download link came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkSource {
    /// The release metadata's own `download_url`
    Metadata,
    /// A file uploaded to the registry
    ReleaseFile(ReleaseFile),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub version: String,
    pub url: String,
    pub source: LinkSource,
}

/// A single-field search: `field` matched against the space-joined terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSpec {
    pub field: String,
    pub terms: Vec<String>,
}

impl SearchSpec {
    pub fn new(field: impl Into<String>, terms: Vec<String>) -> Self {
        Self {
            field: field.into(),
            terms,
        }
    }

    /// First argument is the field, the rest are terms
    pub fn from_args(args: &[String]) -> Option<Self> {
        let (field, terms) = args.split_first()?;
        Some(Self::new(field.clone(), terms.to_vec()))
    }

    pub fn query(&self) -> String {
        self.terms.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub version: String,
    pub summary: String,
}

/// An item of the registry's recent-updates feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Item title, `name version`
    pub name: String,
    pub summary: String,
}

/// Result of a forced package list refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub packages: Vec<String>,
    pub cache_path: Option<PathBuf>,
    /// Why the fetched list could not be written, if it could not
    pub persist_error: Option<String>,
}
