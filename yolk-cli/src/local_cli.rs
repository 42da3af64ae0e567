//! Installed package commands (`-l`, `-a`, `-n`, `-d`)

use anyhow::Result;
use std::io::{self, Write};

use yolk_core::local::{DependencyGroup, DistributionRecord, LocalResolver, Scope};

/// What a listing prints under each `Name (Version)` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Show {
    /// The one-line summary (default)
    Summary,
    /// Every field except Name and Summary (`-m`)
    AllFields,
    /// Only the named fields (`-f`)
    Fields(Vec<String>),
}

pub async fn list(
    resolver: &LocalResolver,
    scope: Scope,
    name: Option<&str>,
    version: Option<&str>,
    show: &Show,
    out: &mut impl Write,
) -> Result<()> {
    let records = resolver.resolve(scope, name, version).await?;
    render_listing(&records, scope, show, out)?;
    Ok(())
}

pub async fn depends(
    resolver: &LocalResolver,
    name: &str,
    version: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let groups = resolver.dependencies_of(name, version).await?;
    render_dependencies(&groups, out)?;
    Ok(())
}

pub fn render_listing(
    records: &[DistributionRecord],
    scope: Scope,
    show: &Show,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut any_marked = false;

    for record in records {
        let marked = scope == Scope::All && !record.is_active();
        any_marked |= marked;
        writeln!(
            out,
            "{} ({}){}",
            record.name(),
            record.version(),
            if marked { " *" } else { "" }
        )?;

        let metadata = record.metadata();
        match show {
            Show::Summary => writeln!(out, "    {}", metadata.summary)?,
            Show::AllFields => {
                for (key, value) in metadata.fields() {
                    if key == "Name" || key == "Summary" {
                        continue;
                    }
                    writeln!(out, "    {key}: {value}")?;
                }
            }
            Show::Fields(fields) => {
                // Stored spelling, metadata order
                for (key, value) in metadata.fields() {
                    if fields.iter().any(|f| f.eq_ignore_ascii_case(key)) {
                        writeln!(out, "    {key}: {value}")?;
                    }
                }
            }
        }
        writeln!(out)?;
    }

    if any_marked {
        writeln!(out, "Versions with '*' are non-active.")?;
    }
    Ok(())
}

pub fn render_dependencies(groups: &[DependencyGroup], out: &mut impl Write) -> io::Result<()> {
    for group in groups {
        writeln!(out, "{} {}", group.name, group.version)?;
        for dependency in &group.dependencies {
            writeln!(out, "  {dependency}")?;
        }
    }
    Ok(())
}
