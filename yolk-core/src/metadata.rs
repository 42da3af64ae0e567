//! Package metadata shared by installed distributions and registry releases
//!
//! `Name`, `Version` and `Summary` are always present. Every other field is
//! optional and kept in source order; lookups of missing fields return
//! `None`.

use serde::{Deserialize, Serialize};

/// Placeholder distutils writes for fields that were never filled in
const UNKNOWN: &str = "UNKNOWN";

/// One optional metadata field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub key: String,
    pub value: String,
}

/// Metadata for one package version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Package name as the source spells it
    pub name: String,

    /// Version string, opaque
    pub version: String,

    /// One-line summary, empty when the source has none
    pub summary: String,

    /// Optional fields in source order (keys may repeat)
    #[serde(default)]
    pub optional: Vec<MetadataField>,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            summary: summary.into(),
            optional: Vec::new(),
        }
    }

    /// Append an optional field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.optional.push(MetadataField {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Look up a field by key, case-insensitively
    ///
    /// Required fields answer to `Name`, `Version` and `Summary`. For
    /// repeated optional keys the first occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("name") {
            return Some(&self.name);
        }
        if key.eq_ignore_ascii_case("version") {
            return Some(&self.version);
        }
        if key.eq_ignore_ascii_case("summary") {
            return Some(&self.summary);
        }
        self.optional
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(key))
            .map(|f| f.value.as_str())
    }

    /// Every field, required ones first
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("Name", self.name.as_str()),
            ("Version", self.version.as_str()),
            ("Summary", self.summary.as_str()),
        ]
        .into_iter()
        .chain(
            self.optional
                .iter()
                .map(|f| (f.key.as_str(), f.value.as_str())),
        )
    }

    /// Project home page (`Home-page` locally, `home_page` on the registry)
    pub fn home_page(&self) -> Option<&str> {
        self.known("Home-page").or_else(|| self.known("home_page"))
    }

    /// Download URL declared in the metadata itself
    pub fn download_url(&self) -> Option<&str> {
        self.known("download_url")
            .or_else(|| self.known("Download-URL"))
    }

    fn known(&self, key: &str) -> Option<&str> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != UNKNOWN)
    }
}

/// Headers of a `PKG-INFO` / `METADATA` file
///
/// The format is RFC 822 style: `Key: value` lines, continuation lines
/// start with whitespace, and the first blank line ends the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataHeaders {
    pub headers: Vec<(String, String)>,
}

impl MetadataHeaders {
    pub fn parse(content: &str) -> Self {
        let mut headers: Vec<(String, String)> = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                // Continuation of the previous header
                if let Some((_, value)) = headers.last_mut() {
                    value.push('\n');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        Self { headers }
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.first(key).is_some()
    }

    /// Build `Metadata`, using the fallbacks when `Name`/`Version` are absent
    ///
    /// Returns `None` when neither the headers nor the fallbacks supply a
    /// name and a version.
    pub fn into_metadata(
        self,
        fallback_name: Option<&str>,
        fallback_version: Option<&str>,
    ) -> Option<Metadata> {
        let name = self
            .first("Name")
            .filter(|n| !n.is_empty())
            .or(fallback_name)?
            .to_string();
        let version = self
            .first("Version")
            .filter(|v| !v.is_empty())
            .or(fallback_version)?
            .to_string();
        let summary = self.first("Summary").unwrap_or_default().to_string();

        let mut metadata = Metadata::new(name, version, summary);
        for (key, value) in self.headers {
            if ["Name", "Version", "Summary"]
                .iter()
                .any(|k| k.eq_ignore_ascii_case(&key))
            {
                continue;
            }
            metadata.push(key, value);
        }
        Some(metadata)
    }
}
