//! Local resolver - filtered listings and dependency lookups over installed
//! distributions

use serde::Serialize;
use tracing::debug;

use super::provider::{DistributionFilter, DistributionProvider};
use super::record::{DependencySpec, DistributionRecord, Scope};
use crate::error::{Result, YolkError};

/// Declared dependencies of one installed version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGroup {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<DependencySpec>,
}

pub struct LocalResolver {
    provider: Box<dyn DistributionProvider>,
}

impl LocalResolver {
    pub fn new(provider: Box<dyn DistributionProvider>) -> Self {
        Self { provider }
    }

    /// Installed distributions in `scope`, optionally narrowed by name and
    /// exact version
    ///
    /// A named query that matches nothing fails with `NotFound`; an unnamed
    /// query that matches nothing returns an empty list. Provider order is
    /// kept as is.
    pub async fn resolve(
        &self,
        scope: Scope,
        name: Option<&str>,
        version: Option<&str>,
    ) -> Result<Vec<DistributionRecord>> {
        let filter = DistributionFilter {
            name: name.map(str::to_string),
        };
        let records = self.provider.list_distributions(&filter).await?;
        debug!(
            "{} provider returned {} records (scope: {}, name: {:?}, version: {:?})",
            self.provider.name(),
            records.len(),
            scope,
            name,
            version
        );

        let matched: Vec<DistributionRecord> = records
            .into_iter()
            .filter(|r| name.map_or(true, |n| r.matches_name(n)))
            .filter(|r| version.map_or(true, |v| r.version() == v))
            .filter(|r| scope.admits(r.is_active()))
            .collect();

        if let (Some(name), true) = (name, matched.is_empty()) {
            let what = match version {
                Some(version) => format!("{name} {version}"),
                None => name.to_string(),
            };
            return Err(YolkError::not_found(format!(
                "No {scope} installed package found for {what}"
            )));
        }

        Ok(matched)
    }

    /// Declared dependencies of an installed package
    ///
    /// Without a version, every installed version of `name` is reported,
    /// one group per record. Fails with `NoDependencyData` as soon as a
    /// matched record has no dependency metadata.
    pub async fn dependencies_of(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<DependencyGroup>> {
        let records = self
            .provider
            .list_distributions(&DistributionFilter::named(name))
            .await?;

        let installed: Vec<DistributionRecord> =
            records.into_iter().filter(|r| r.matches_name(name)).collect();
        if installed.is_empty() {
            return Err(YolkError::not_found(format!(
                "Can't find package for {name}"
            )));
        }

        let matched: Vec<DistributionRecord> = installed
            .into_iter()
            .filter(|r| version.map_or(true, |v| r.version() == v))
            .collect();
        if matched.is_empty() {
            return Err(YolkError::not_found(format!(
                "Can't find version {} of {}",
                version.unwrap_or_default(),
                name
            )));
        }

        matched
            .into_iter()
            .map(|record| match record.dependencies() {
                Some(deps) => Ok(DependencyGroup {
                    name: record.name().to_string(),
                    version: record.version().to_string(),
                    dependencies: deps.to_vec(),
                }),
                None => Err(YolkError::NoDependencyData {
                    name: record.name().to_string(),
                    version: record.version().to_string(),
                }),
            })
            .collect()
    }
}
