//! PypiClient against a mocked registry

use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yolk_core::config::RegistryConfig;
use yolk_core::registry::{PypiClient, RegistryClient, RegistryResolver, SearchSpec};
use yolk_core::YolkError;

fn client_for(server: &MockServer) -> PypiClient {
    PypiClient::new(&RegistryConfig {
        url: server.uri(),
        timeout_seconds: 5,
    })
    .unwrap()
}

const SOUP_PROJECT: &str = r#"{
  "info": {
    "name": "BeautifulSoup",
    "version": "3.2.2",
    "summary": "Screen-scraping library",
    "home_page": "http://www.crummy.com/software/BeautifulSoup/",
    "download_url": null
  },
  "releases": {
    "3.0.0": [],
    "3.2.0": [{"url": "https://files.example/BeautifulSoup-3.2.0.tar.gz", "filename": "BeautifulSoup-3.2.0.tar.gz", "size": 10, "packagetype": "sdist", "upload_time_iso_8601": "2010-11-21T13:35:28Z"}],
    "3.2.1": [{"url": "https://files.example/BeautifulSoup-3.2.1.tar.gz", "filename": "BeautifulSoup-3.2.1.tar.gz", "size": 10, "packagetype": "sdist", "upload_time_iso_8601": "2012-02-16T16:45:13.123456Z"}],
    "3.2.2": [{"url": "https://files.example/BeautifulSoup-3.2.2.tar.gz", "filename": "BeautifulSoup-3.2.2.tar.gz", "size": 10, "packagetype": "sdist", "upload_time_iso_8601": "2019-10-06T15:25:49Z"}]
  },
  "urls": []
}"#;

const SOUP_RELEASE: &str = r#"{
  "info": {
    "name": "BeautifulSoup",
    "version": "3.2.2",
    "summary": "Screen-scraping library",
    "home_page": "http://www.crummy.com/software/BeautifulSoup/",
    "download_url": "http://www.crummy.com/software/BeautifulSoup/download/3.x/BeautifulSoup-3.2.2.tar.gz",
    "classifiers": ["Development Status :: 5 - Production/Stable", "Programming Language :: Python :: 2"]
  },
  "urls": [
    {"url": "https://files.example/BeautifulSoup-3.2.2-py2-none-any.whl", "filename": "BeautifulSoup-3.2.2-py2-none-any.whl", "size": 32, "packagetype": "bdist_wheel"},
    {"url": "https://files.example/BeautifulSoup-3.2.2.tar.gz", "filename": "BeautifulSoup-3.2.2.tar.gz", "size": 10, "packagetype": "sdist"}
  ]
}"#;

#[tokio::test]
async fn test_package_releases_canonical_name_and_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/beautifulsoup/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SOUP_PROJECT))
        .mount(&server)
        .await;

    let releases = client_for(&server)
        .package_releases("beautifulsoup")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(releases.canonical_name, "BeautifulSoup");
    assert_eq!(releases.versions, vec!["3.2.2", "3.2.1", "3.2.0", "3.0.0"]);
}

#[tokio::test]
async fn test_missing_package_is_none_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/nosuchpkg/json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pypi/nosuchpkg/1.0/json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.package_releases("nosuchpkg").await.unwrap().is_none());
    assert!(client.release_data("nosuchpkg", "1.0").await.unwrap().is_none());
    assert!(client.release_urls("nosuchpkg", "1.0").await.unwrap().is_empty());

    let resolver = RegistryResolver::new(Box::new(client), None);
    let err = resolver.list_versions("nosuchpkg", false).await.unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err:?}");
}

#[tokio::test]
async fn test_release_data_and_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/BeautifulSoup/3.2.2/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SOUP_RELEASE))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let metadata = client
        .release_data("BeautifulSoup", "3.2.2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.name, "BeautifulSoup");
    assert_eq!(metadata.version, "3.2.2");
    assert_eq!(
        metadata.get("classifiers"),
        Some("Development Status :: 5 - Production/Stable, Programming Language :: Python :: 2")
    );

    let files = client.release_urls("BeautifulSoup", "3.2.2").await.unwrap();
    let kinds: Vec<&str> = files.iter().map(|f| f.packagetype.as_str()).collect();
    assert_eq!(kinds, vec!["bdist_wheel", "sdist"]);

    let resolver = RegistryResolver::new(Box::new(client), None);
    let links = resolver
        .download_links("BeautifulSoup", Some("3.2.2"), false)
        .await
        .unwrap();
    assert_eq!(links.len(), 3);
    assert!(links[0].url.starts_with("http://www.crummy.com/"));
}

#[tokio::test]
async fn test_list_packages_uses_json_simple_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/"))
        .and(header("accept", "application/vnd.pypi.simple.v1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"meta": {"api-version": "1.1"}, "projects": [{"name": "BeautifulSoup"}, {"name": "kid"}]}"#,
        ))
        .mount(&server)
        .await;

    let packages = client_for(&server).list_packages().await.unwrap();
    assert_eq!(packages, vec!["BeautifulSoup", "kid"]);
}

#[tokio::test]
async fn test_search_over_xmlrpc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pypi"))
        .and(body_string_contains("<methodName>search</methodName>"))
        .and(body_string_contains(
            "<name>summary</name><value><string>xml template</string></value>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version='1.0'?>
<methodResponse><params><param><value><array><data>
<value><struct>
<member><name>name</name><value><string>kid</string></value></member>
<member><name>version</name><value><string>0.9.6</string></value></member>
<member><name>summary</name><value><string>A simple and pythonic XML template language</string></value></member>
</struct></value>
</data></array></value></param></params></methodResponse>"#,
        ))
        .mount(&server)
        .await;

    let spec = SearchSpec::new("summary", vec!["xml".to_string(), "template".to_string()]);
    let results = client_for(&server).search(&spec).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "kid");
    assert_eq!(results[0].version, "0.9.6");
}

#[tokio::test]
async fn test_search_fault_is_registry_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pypi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version='1.0'?>
<methodResponse><fault><value><struct>
<member><name>faultCode</name><value><int>-32500</int></value></member>
<member><name>faultString</name><value><string>RuntimeError: PyPI no longer supports 'pip search'</string></value></member>
</struct></value></fault></methodResponse>"#,
        ))
        .mount(&server)
        .await;

    let spec = SearchSpec::new("name", vec!["kid".to_string()]);
    let err = client_for(&server).search(&spec).await.unwrap_err();
    assert!(matches!(err, YolkError::RegistryUnavailable { .. }));
    assert!(err.to_string().contains("no longer supports"));
}

#[tokio::test]
async fn test_recent_updates_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/updates.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>PyPI recent updates</title>
<item><title>kid 0.9.6</title><description>Pythonic XML templates</description></item>
<item><title>yolk 0.4.3</title><description>Command-line tool for querying PyPI</description></item>
</channel></rss>"#,
        ))
        .mount(&server)
        .await;

    let entries = client_for(&server).recent_updates().await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["kid 0.9.6", "yolk 0.4.3"]);
}

#[tokio::test]
async fn test_server_error_is_registry_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.package_releases("kid").await.unwrap_err();
    assert!(matches!(err, YolkError::RegistryUnavailable { .. }));
    assert!(err.to_string().contains("500"));

    let resolver = RegistryResolver::new(Box::new(client), None);
    let err = resolver.list_versions("kid", false).await.unwrap_err();
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_malformed_json_is_registry_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pypi/kid/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).package_releases("kid").await.unwrap_err();
    assert!(matches!(err, YolkError::RegistryUnavailable { .. }));
}

#[tokio::test]
async fn test_download_links_for_unknown_release_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = RegistryResolver::new(Box::new(client_for(&server)), None);
    let err = resolver
        .download_links("nosuchpkg", Some("9.9"), false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SOUP_PROJECT)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = PypiClient::new(&RegistryConfig {
        url: server.uri(),
        timeout_seconds: 1,
    })
    .unwrap();
    let err = client.package_releases("BeautifulSoup").await.unwrap_err();
    assert!(matches!(err, YolkError::RegistryUnavailable { .. }));
    assert!(err.to_string().contains("request timed out"));
}
