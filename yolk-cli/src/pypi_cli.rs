//! Registry commands (`-V`, `-M`, `-D`, `-S`, `-L`, `-F`, `-H`)

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::warn;

use yolk_core::metadata::Metadata;
use yolk_core::registry::{
    DownloadLink, FeedEntry, PackageReleases, RegistryResolver, SearchResult, SearchSpec,
};
use yolk_core::YolkError;

pub async fn versions(
    resolver: &RegistryResolver,
    name: &str,
    use_cache: bool,
    out: &mut impl Write,
) -> Result<()> {
    let releases = resolver.list_versions(name, use_cache).await?;
    render_versions(&releases, out)?;
    Ok(())
}

pub async fn metadata(
    resolver: &RegistryResolver,
    name: &str,
    version: Option<&str>,
    use_cache: bool,
    out: &mut impl Write,
) -> Result<()> {
    let all = match version {
        Some(version) => vec![resolver.release_metadata(name, version).await?],
        None => resolver.release_metadata_all(name, use_cache).await?,
    };
    render_metadata(&all, out)?;
    Ok(())
}

pub async fn download_links(
    resolver: &RegistryResolver,
    name: &str,
    version: Option<&str>,
    use_cache: bool,
    out: &mut impl Write,
) -> Result<()> {
    let links = resolver.download_links(name, version, use_cache).await?;
    render_links(&links, out)?;
    Ok(())
}

pub async fn search(
    resolver: &RegistryResolver,
    spec: &SearchSpec,
    out: &mut impl Write,
) -> Result<()> {
    let results = resolver.search(spec).await?;
    render_search(&results, out)?;
    Ok(())
}

pub async fn latest(resolver: &RegistryResolver, out: &mut impl Write) -> Result<()> {
    let entries = resolver.recent_updates().await?;
    render_feed(&entries, out)?;
    Ok(())
}

pub async fn fetch_package_list(resolver: &RegistryResolver, out: &mut impl Write) -> Result<()> {
    let outcome = resolver.refresh_package_list_cache().await?;

    match (&outcome.cache_path, &outcome.persist_error) {
        (Some(path), None) => writeln!(
            out,
            "Package list updated: {} packages cached in {}",
            outcome.packages.len(),
            path.display()
        )?,
        (_, Some(err)) => {
            warn!("package list not cached: {}", err);
            writeln!(
                out,
                "Fetched {} packages, but the package list could not be cached: {}",
                outcome.packages.len(),
                err
            )?;
        }
        (None, None) => writeln!(out, "Fetched {} packages", outcome.packages.len())?,
    }
    Ok(())
}

/// Open the newest release's home page with `launch`
pub async fn browse_homepage(
    resolver: &RegistryResolver,
    name: &str,
    use_cache: bool,
    launch: impl FnOnce(&str) -> io::Result<()>,
    out: &mut impl Write,
) -> Result<()> {
    let url = resolver
        .homepage(name, use_cache)
        .await?
        .ok_or_else(|| YolkError::not_found(format!("No home page URL found for {name}")))?;

    writeln!(out, "Opening {url}")?;
    launch(&url).with_context(|| format!("Failed to open browser for {url}"))?;
    Ok(())
}

pub fn render_versions(releases: &PackageReleases, out: &mut impl Write) -> io::Result<()> {
    for version in &releases.versions {
        writeln!(out, "{} {}", releases.canonical_name, version)?;
    }
    Ok(())
}

/// `key: value` per field, a blank line between releases
pub fn render_metadata(all: &[Metadata], out: &mut impl Write) -> io::Result<()> {
    for (i, metadata) in all.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        for (key, value) in metadata.fields() {
            writeln!(out, "{key}: {value}")?;
        }
    }
    Ok(())
}

pub fn render_links(links: &[DownloadLink], out: &mut impl Write) -> io::Result<()> {
    for link in links {
        writeln!(out, "{}", link.url)?;
    }
    Ok(())
}

pub fn render_search(results: &[SearchResult], out: &mut impl Write) -> io::Result<()> {
    for result in results {
        writeln!(out, "{} ({}):\n    {}", result.name, result.version, result.summary)?;
    }
    Ok(())
}

pub fn render_feed(entries: &[FeedEntry], out: &mut impl Write) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}\n    {}", entry.name, entry.summary)?;
    }
    Ok(())
}
