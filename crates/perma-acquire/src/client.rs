use anyhow::{Context, Result};
use perma_model::{Page, Record};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use std::fmt;

pub const DEFAULT_API_ROOT: &str = "http://api.perma.dev:8000";
pub const DEFAULT_MEDIA_ROOT: &str = "http://perma.dev:8000/media";
pub const DEFAULT_USER_AGENT: &str =
    concat!("perma-export/", env!("CARGO_PKG_VERSION"), " (archive export tool)");
pub const DEFAULT_PAGE_LIMIT: u32 = 3;

/// Where and how to talk to the archiving service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub api_root: String,
    pub media_root: String,
    /// Sent on every request. The media server rejects agentless requests.
    pub user_agent: String,
    /// Page size requested on the first call to each list endpoint.
    pub page_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            media_root: DEFAULT_MEDIA_ROOT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ApiConfig {
    /// Resolve an API path or a server-supplied link to a full URL.
    ///
    /// Absolute links are returned unchanged; paths are appended to the API root.
    pub fn api_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }
        let root = self.api_root.trim_end_matches('/');
        if link.starts_with('/') {
            format!("{root}{link}")
        } else {
            format!("{root}/{link}")
        }
    }

    /// URL of the first page of a list endpoint, with the page limit applied.
    pub fn first_page_url(&self, endpoint: &str) -> String {
        let sep = if endpoint.contains('?') { '&' } else { '?' };
        self.api_url(&format!("{endpoint}{sep}limit={}", self.page_limit))
    }

    /// URL of a capture file on the media server.
    pub fn media_url(&self, storage_path: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.media_root.trim_end_matches('/'),
            storage_path.trim_matches('/'),
            filename.trim_start_matches('/'),
        )
    }
}

/// API key for the `Authorization: ApiKey <key>` header.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    fn header_value(&self) -> String {
        format!("ApiKey {}", self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Authenticated client for the JSON API plus agent-only media fetches.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    key: ApiKey,
}

impl ApiClient {
    pub fn new(config: ApiConfig, key: ApiKey) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config, key })
    }

    /// GET a single JSON document from the API.
    pub async fn get_json<T: DeserializeOwned>(&self, link: &str) -> Result<T> {
        let url = self.config.api_url(link);
        tracing::debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.key.header_value())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;
        serde_json::from_str(&body).with_context(|| format!("Malformed JSON from {url}"))
    }

    /// Fetch a single unpaginated object, such as the user profile.
    pub async fn fetch_record(&self, endpoint: &str) -> Result<Record> {
        self.get_json(endpoint).await
    }

    /// Start walking a paginated list endpoint from its first page.
    pub fn paginate(&self, endpoint: &str) -> Paginator<'_> {
        Paginator {
            client: self,
            next: Some(self.config.first_page_url(endpoint)),
            pages: 0,
        }
    }

    /// Download one capture file from the media server.
    ///
    /// Media is served without authentication, so only the user agent is sent.
    pub async fn fetch_media(&self, storage_path: &str, filename: &str) -> Result<Vec<u8>> {
        let url = self.config.media_url(storage_path, filename);
        tracing::debug!(url = %url, "GET media");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read media body from {url}"))?;
        Ok(body.to_vec())
    }
}

/// Forward-only cursor over the pages of a list endpoint.
///
/// Each call to [`Paginator::next_page`] issues one request. The cursor is
/// exhausted after the page whose metadata carries no `next` link; it cannot
/// be rewound, so start a new one with [`ApiClient::paginate`].
#[derive(Debug)]
pub struct Paginator<'a> {
    client: &'a ApiClient,
    next: Option<String>,
    pages: usize,
}

impl Paginator<'_> {
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(link) = self.next.take() else {
            return Ok(None);
        };
        let page: Page = self.client.get_json(&link).await?;
        self.pages += 1;
        self.next = page.meta.next_link().map(str::to_string);
        Ok(Some(page))
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            api_root: server.uri(),
            media_root: format!("{}/media", server.uri()),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_api_url() {
        let config = ApiConfig {
            api_root: "http://api.example.test/".into(),
            ..ApiConfig::default()
        };
        assert_eq!(config.api_url("/v1/user"), "http://api.example.test/v1/user");
        assert_eq!(config.api_url("v1/user"), "http://api.example.test/v1/user");
        assert_eq!(
            config.api_url("https://other.test/v1/user/folders/?offset=3"),
            "https://other.test/v1/user/folders/?offset=3"
        );
    }

    #[test]
    fn test_first_page_url() {
        let config = ApiConfig {
            api_root: "http://api.example.test".into(),
            page_limit: 50,
            ..ApiConfig::default()
        };
        assert_eq!(
            config.first_page_url("/v1/user/archives/"),
            "http://api.example.test/v1/user/archives/?limit=50"
        );
        assert_eq!(
            config.first_page_url("/v1/user/archives/?order=asc"),
            "http://api.example.test/v1/user/archives/?order=asc&limit=50"
        );
    }

    #[test]
    fn test_media_url() {
        let config = ApiConfig {
            media_root: "http://media.example.test/media/".into(),
            ..ApiConfig::default()
        };
        assert_eq!(
            config.media_url("2014/6/10/ABCD/", "cap.png"),
            "http://media.example.test/media/2014/6/10/ABCD/cap.png"
        );
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("secret-key");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert_eq!(key.header_value(), "ApiKey secret-key");
    }

    #[tokio::test]
    async fn test_fetch_record_sends_auth_and_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .and(header("Authorization", "ApiKey k123"))
            .and(header("User-Agent", DEFAULT_USER_AGENT))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "first_name": "Ada"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(config_for(&server), ApiKey::new("k123")).unwrap();
        let user = client.fetch_record("/v1/user").await.unwrap();
        assert_eq!(user["first_name"], "Ada");
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ApiClient::new(config_for(&server), ApiKey::new("bad")).unwrap();
        let err = client.fetch_record("/v1/user").await.unwrap_err();
        assert!(err.to_string().contains("401"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_malformed_json_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(config_for(&server), ApiKey::new("k")).unwrap();
        let err = client.fetch_record("/v1/user").await.unwrap_err();
        assert!(err.to_string().contains("Malformed JSON"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_pagination_follows_next_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/user/folders/"))
            .and(query_param_is_missing("offset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"offset": 0, "total_count": 5,
                         "next": "/v1/user/folders/?limit=2&offset=2"},
                "objects": [{"id": 1}, {"id": 2}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/user/folders/"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"offset": 2, "total_count": 5,
                         "next": format!("{}/v1/user/folders/?limit=2&offset=4", server.uri())},
                "objects": [{"id": 3}, {"id": 4}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/user/folders/"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"offset": 4, "total_count": 5, "next": null},
                "objects": [{"id": 5}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiConfig {
            page_limit: 2,
            ..config_for(&server)
        };
        let client = ApiClient::new(config, ApiKey::new("k")).unwrap();
        let mut pages = client.paginate("/v1/user/folders/");

        let mut ids = Vec::new();
        while let Some(page) = pages.next_page().await.unwrap() {
            ids.extend(page.objects.iter().map(|o| o["id"].as_i64().unwrap()));
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(pages.pages_fetched(), 3);

        // Exhausted cursors stay exhausted without further requests.
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_media_omits_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/a/b/s.png"))
            .and(header("User-Agent", DEFAULT_USER_AGENT))
            .and(|req: &wiremock::Request| !req.headers.contains_key("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(config_for(&server), ApiKey::new("k")).unwrap();
        let bytes = client.fetch_media("a/b", "s.png").await.unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }
}
