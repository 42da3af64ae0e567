//! PyPI client
//!
//! Implements `RegistryClient` over the index's public endpoints:
//!
//! | operation        | endpoint                                   |
//! |------------------|--------------------------------------------|
//! | package_releases | `GET /pypi/{name}/json`                    |
//! | release_data     | `GET /pypi/{name}/{version}/json` (`info`) |
//! | release_urls     | `GET /pypi/{name}/{version}/json` (`urls`) |
//! | list_packages    | `GET /simple/` (PEP 691 JSON)              |
//! | search           | `POST /pypi` XML-RPC `search`              |
//! | recent_updates   | `GET /rss/updates.xml`                     |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::client::RegistryClient;
use super::feed::parse_feed;
use super::types::{FeedEntry, PackageReleases, ReleaseFile, SearchResult, SearchSpec};
use super::xmlrpc::{self, Value};
use crate::config::RegistryConfig;
use crate::error::{Result, YolkError};
use crate::metadata::Metadata;

/// Accept header selecting the JSON form of the simple index
const SIMPLE_JSON: &str = "application/vnd.pypi.simple.v1+json";

/// `GET /pypi/{name}/json` and `GET /pypi/{name}/{version}/json`
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    info: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    releases: BTreeMap<String, Vec<JsonFile>>,
    #[serde(default)]
    urls: Vec<JsonFile>,
}

#[derive(Debug, Deserialize)]
struct JsonFile {
    url: String,
    filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    packagetype: String,
    #[serde(default)]
    upload_time_iso_8601: Option<String>,
}

/// `GET /simple/` with the JSON accept header
#[derive(Debug, Deserialize)]
struct SimpleIndex {
    projects: Vec<SimpleProject>,
}

#[derive(Debug, Deserialize)]
struct SimpleProject {
    name: String,
}

pub struct PypiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl PypiClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            YolkError::registry(format!("invalid registry URL '{}': {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(YolkError::registry(format!(
                "invalid registry URL '{}'",
                config.url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("yolk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| YolkError::registry_with("failed to create HTTP client", e))?;

        Ok(Self { client, base_url })
    }

    /// Base URL plus escaped path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a JSON document; 404 means "no such thing"
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(YolkError::registry(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| YolkError::registry_with(format!("malformed JSON from {url}"), e))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(YolkError::registry(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        Ok(response.text().await?)
    }

    async fn release(&self, name: &str, version: &str) -> Result<Option<ProjectResponse>> {
        self.get_json(self.endpoint(&["pypi", name, version, "json"]))
            .await
    }
}

#[async_trait]
impl RegistryClient for PypiClient {
    async fn package_releases(&self, name: &str) -> Result<Option<PackageReleases>> {
        let Some(project) = self
            .get_json::<ProjectResponse>(self.endpoint(&["pypi", name, "json"]))
            .await?
        else {
            return Ok(None);
        };

        let canonical_name = info_text(&project.info, "name").unwrap_or_else(|| name.to_string());
        let versions = newest_first(project.releases);
        debug!("{} has {} releases", canonical_name, versions.len());

        Ok(Some(PackageReleases {
            canonical_name,
            versions,
        }))
    }

    async fn release_data(&self, name: &str, version: &str) -> Result<Option<Metadata>> {
        match self.release(name, version).await? {
            Some(project) => info_to_metadata(project.info).map(Some),
            None => Ok(None),
        }
    }

    async fn release_urls(&self, name: &str, version: &str) -> Result<Vec<ReleaseFile>> {
        Ok(self
            .release(name, version)
            .await?
            .map(|project| {
                project
                    .urls
                    .into_iter()
                    .map(|file| ReleaseFile {
                        url: file.url,
                        filename: file.filename,
                        size: file.size,
                        packagetype: file.packagetype,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_packages(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["simple", ""]);
        debug!("GET {} ({})", url, SIMPLE_JSON);

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, SIMPLE_JSON)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(YolkError::registry(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response.bytes().await?;
        let index: SimpleIndex = serde_json::from_slice(&body)
            .map_err(|e| YolkError::registry_with(format!("malformed JSON from {url}"), e))?;
        Ok(index.projects.into_iter().map(|p| p.name).collect())
    }

    async fn search(&self, spec: &SearchSpec) -> Result<Vec<SearchResult>> {
        let url = self.endpoint(&["pypi"]);
        let body = xmlrpc::encode_call(
            "search",
            &[
                Value::Struct(vec![(spec.field.clone(), Value::Str(spec.query()))]),
                Value::Str("and".to_string()),
            ],
        );
        debug!("POST {} search {}={:?}", url, spec.field, spec.query());

        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(YolkError::registry(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let params = xmlrpc::decode_response(&response.text().await?)?;
        match params.into_iter().next() {
            Some(Value::Array(items)) => Ok(items
                .iter()
                .map(|item| SearchResult {
                    name: item.member_text("name"),
                    version: item.member_text("version"),
                    summary: item.member_text("summary"),
                })
                .collect()),
            other => Err(YolkError::registry(format!(
                "unexpected search response: {other:?}"
            ))),
        }
    }

    async fn recent_updates(&self) -> Result<Vec<FeedEntry>> {
        let body = self.get_text(self.endpoint(&["rss", "updates.xml"])).await?;
        parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        "pypi"
    }
}

fn info_text(info: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    info.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

/// Registry `info` object → `Metadata`
///
/// Null and empty values are dropped; lists are joined with ", ".
fn info_to_metadata(info: serde_json::Map<String, serde_json::Value>) -> Result<Metadata> {
    let name = info_text(&info, "name")
        .ok_or_else(|| YolkError::registry("release info without a name"))?;
    let version = info_text(&info, "version")
        .ok_or_else(|| YolkError::registry("release info without a version"))?;
    let summary = info_text(&info, "summary").unwrap_or_default();

    let mut metadata = Metadata::new(name, version, summary);
    for (key, value) in info {
        if matches!(key.as_str(), "name" | "version" | "summary") {
            continue;
        }
        if let Some(text) = json_text(&value) {
            metadata.push(key, text);
        }
    }
    Ok(metadata)
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value as Json;

    let text = match value {
        Json::Null => return None,
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::Array(items) => items
            .iter()
            .filter_map(json_text)
            .collect::<Vec<_>>()
            .join(", "),
        Json::Object(map) => map
            .iter()
            .filter_map(|(k, v)| json_text(v).map(|v| format!("{k}: {v}")))
            .collect::<Vec<_>>()
            .join(", "),
    };
    (!text.is_empty()).then_some(text)
}

/// Versions ordered by their first upload, newest first
///
/// Releases without files have no upload time and keep their relative
/// order after the dated ones.
fn newest_first(releases: BTreeMap<String, Vec<JsonFile>>) -> Vec<String> {
    let mut dated: Vec<(String, Option<DateTime<Utc>>)> = releases
        .into_iter()
        .map(|(version, files)| {
            let first_upload = files
                .iter()
                .filter_map(|f| f.upload_time_iso_8601.as_deref())
                .filter_map(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
                .min();
            (version, first_upload)
        })
        .collect();

    dated.sort_by(|a, b| match (a.1, b.1) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    dated.into_iter().map(|(version, _)| version).collect()
}
