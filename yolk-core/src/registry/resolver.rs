//! Registry resolver - version listings, release metadata, download links,
//! search and the recent-updates feed

use tracing::{debug, warn};

use super::cache::PackageListCache;
use super::client::RegistryClient;
use super::types::{
    DownloadLink, FeedEntry, LinkSource, PackageReleases, RefreshOutcome, SearchResult,
    SearchSpec,
};
use crate::error::{Result, YolkError};
use crate::metadata::Metadata;

/// Number of feed entries `recent_updates` returns at most
pub const RECENT_UPDATES_LIMIT: usize = 20;

pub struct RegistryResolver {
    client: Box<dyn RegistryClient>,
    cache: Option<PackageListCache>,
}

impl RegistryResolver {
    pub fn new(client: Box<dyn RegistryClient>, cache: Option<PackageListCache>) -> Self {
        Self { client, cache }
    }

    /// Cached registry spelling of `name`
    ///
    /// An unreadable cache is logged and treated like a miss.
    fn cached_name(&self, name: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.load() {
            Ok(Some(list)) => {
                let found = list.find(name).map(str::to_string);
                debug!(
                    "package list cache {} for {}",
                    if found.is_some() { "hit" } else { "miss" },
                    name
                );
                found
            }
            Ok(None) => {
                debug!("no package list cache at {}", cache.path().display());
                None
            }
            Err(e) => {
                warn!("ignoring package list cache: {:#}", e);
                None
            }
        }
    }

    /// Canonical name and versions of a package, newest first
    ///
    /// With `use_cache`, a cached spelling is used for the query and
    /// reported as the canonical name.
    pub async fn list_versions(&self, name: &str, use_cache: bool) -> Result<PackageReleases> {
        let cached = if use_cache {
            self.cached_name(name)
        } else {
            None
        };
        let query = cached.as_deref().unwrap_or(name);

        let releases = self
            .client
            .package_releases(query)
            .await?
            .filter(|r| !r.versions.is_empty())
            .ok_or_else(|| YolkError::not_found(format!("Nothing found on PyPI for {name}")))?;

        Ok(match cached {
            Some(canonical_name) => PackageReleases {
                canonical_name,
                versions: releases.versions,
            },
            None => releases,
        })
    }

    pub async fn release_metadata(&self, name: &str, version: &str) -> Result<Metadata> {
        self.client
            .release_data(name, version)
            .await?
            .ok_or_else(|| {
                YolkError::not_found(format!("No metadata found on PyPI for {name} {version}"))
            })
    }

    /// Metadata of every listed version, in listing order
    pub async fn release_metadata_all(&self, name: &str, use_cache: bool) -> Result<Vec<Metadata>> {
        let releases = self.list_versions(name, use_cache).await?;

        let mut all = Vec::with_capacity(releases.versions.len());
        for version in &releases.versions {
            all.push(
                self.release_metadata(&releases.canonical_name, version)
                    .await?,
            );
        }
        Ok(all)
    }

    /// Download URLs of one version, or of every listed version
    ///
    /// Per version the metadata's own `download_url` comes first, followed
    /// by the uploaded files. Duplicates are kept. An explicit version the
    /// registry does not know is `NotFound`.
    pub async fn download_links(
        &self,
        name: &str,
        version: Option<&str>,
        use_cache: bool,
    ) -> Result<Vec<DownloadLink>> {
        let (query, versions) = match version {
            Some(version) => (name.to_string(), vec![version.to_string()]),
            None => {
                let releases = self.list_versions(name, use_cache).await?;
                (releases.canonical_name, releases.versions)
            }
        };

        let explicit = version.is_some();
        let mut links = Vec::new();
        for version in versions {
            match self.client.release_data(&query, &version).await? {
                Some(metadata) => {
                    if let Some(url) = metadata.download_url() {
                        links.push(DownloadLink {
                            version: version.clone(),
                            url: url.to_string(),
                            source: LinkSource::Metadata,
                        });
                    }
                }
                None if explicit => {
                    return Err(YolkError::not_found(format!(
                        "No release found on PyPI for {name} {version}"
                    )));
                }
                None => debug!("no release data for {} {}", query, version),
            }

            for file in self.client.release_urls(&query, &version).await? {
                links.push(DownloadLink {
                    version: version.clone(),
                    url: file.url.clone(),
                    source: LinkSource::ReleaseFile(file),
                });
            }
        }

        debug!("{} download links for {}", links.len(), query);
        Ok(links)
    }

    pub async fn search(&self, spec: &SearchSpec) -> Result<Vec<SearchResult>> {
        debug!(
            "searching {} for {}={:?}",
            self.client.name(),
            spec.field,
            spec.query()
        );
        self.client.search(spec).await
    }

    /// Recent-updates feed in feed order, at most `RECENT_UPDATES_LIMIT`
    pub async fn recent_updates(&self) -> Result<Vec<FeedEntry>> {
        let mut entries = self.client.recent_updates().await?;
        entries.truncate(RECENT_UPDATES_LIMIT);
        Ok(entries)
    }

    /// Fetch every package name and overwrite the cache
    ///
    /// A failed write does not fail the refresh: the fetched list is
    /// returned with `persist_error` set.
    pub async fn refresh_package_list_cache(&self) -> Result<RefreshOutcome> {
        let packages = self.client.list_packages().await?;
        debug!("fetched {} package names", packages.len());

        let Some(cache) = &self.cache else {
            return Ok(RefreshOutcome {
                packages,
                cache_path: None,
                persist_error: Some("no package list cache configured".to_string()),
            });
        };

        let persist_error = match cache.store(&packages) {
            Ok(()) => None,
            Err(e) => {
                warn!("failed to write package list cache: {:#}", e);
                Some(format!("{e:#}"))
            }
        };

        Ok(RefreshOutcome {
            packages,
            cache_path: Some(cache.path().to_path_buf()),
            persist_error,
        })
    }

    /// Home page declared by the newest listed version
    pub async fn homepage(&self, name: &str, use_cache: bool) -> Result<Option<String>> {
        let releases = self.list_versions(name, use_cache).await?;
        let Some(newest) = releases.versions.first() else {
            return Ok(None);
        };

        let metadata = self
            .release_metadata(&releases.canonical_name, newest)
            .await?;
        Ok(metadata.home_page().map(str::to_string))
    }
}
