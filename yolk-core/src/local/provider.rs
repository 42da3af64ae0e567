//! Distribution provider trait - abstraction over local package introspection
//!
//! Implementations enumerate installed distributions:
//! - `SitePackagesProvider` (metadata directories on the interpreter's path)
//! - in-memory providers (testing)

use async_trait::async_trait;

use super::DistributionRecord;
use crate::error::Result;

/// Narrows what a provider needs to enumerate
#[derive(Debug, Clone, Default)]
pub struct DistributionFilter {
    /// Case-insensitive package name; providers may use it to skip work
    pub name: Option<String>,
}

impl DistributionFilter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

#[async_trait]
pub trait DistributionProvider: Send + Sync {
    /// Enumerate installed distributions in the provider's natural order
    ///
    /// The order must be stable within one process run. Providers may
    /// return more than the filter asks for; callers filter again.
    async fn list_distributions(&self, filter: &DistributionFilter)
        -> Result<Vec<DistributionRecord>>;

    /// Provider identifier for logging
    fn name(&self) -> &'static str;
}

/// Fixed list of records, for tests and for callers that already hold them
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    pub records: Vec<DistributionRecord>,
}

impl StaticProvider {
    pub fn new(records: Vec<DistributionRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl DistributionProvider for StaticProvider {
    async fn list_distributions(
        &self,
        _filter: &DistributionFilter,
    ) -> Result<Vec<DistributionRecord>> {
        Ok(self.records.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
