//! Installed distribution records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::metadata::Metadata;

/// A declared requirement string, kept exactly as the package wrote it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencySpec(String);

impl DependencySpec {
    pub fn new(spec: impl Into<String>) -> Self {
        Self(spec.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DependencySpec {
    fn from(spec: &str) -> Self {
        Self::new(spec)
    }
}

/// One installed build of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    metadata: Metadata,
    is_active: bool,
    dependencies: Option<Vec<DependencySpec>>,
    location: PathBuf,
}

impl DistributionRecord {
    pub fn new(metadata: Metadata, is_active: bool, location: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            is_active,
            dependencies: None,
            location: location.into(),
        }
    }

    /// Attach the declared requirements (an empty list means "declares none")
    pub fn with_dependencies(mut self, dependencies: Vec<DependencySpec>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Importable without explicit activation
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Declared requirements in declared order
    ///
    /// `None` when the installed metadata carries no dependency information
    /// at all; `Some(&[])` when it explicitly declares zero dependencies.
    pub fn dependencies(&self) -> Option<&[DependencySpec]> {
        self.dependencies.as_deref()
    }

    /// Metadata directory (or file) the record was read from
    pub fn location(&self) -> &std::path::Path {
        &self.location
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name().to_lowercase() == name.to_lowercase()
    }
}

/// Which installed distributions a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Active,
    #[serde(rename = "nonactive")]
    NonActive,
}

impl Scope {
    pub fn admits(self, is_active: bool) -> bool {
        match self {
            Scope::All => true,
            Scope::Active => is_active,
            Scope::NonActive => !is_active,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Scope::All => "all",
            Scope::Active => "active",
            Scope::NonActive => "nonactive",
        };
        f.write_str(label)
    }
}
