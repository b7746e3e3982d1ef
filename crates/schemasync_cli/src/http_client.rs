//! Blocking `reqwest` transport for the engine's [`HttpClient`] trait.

use schemasync_engine::{HttpClient, HttpRemote, HttpResponse, Method};
use std::time::Duration;
use url::Url;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "SCHEMASYNC_API_KEY";
/// Service URL used when none is configured.
pub const DEFAULT_URL: &str = "https://api.schemasync.io";

/// Connection settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Service URL; workspace endpoints live on sibling hosts.
    pub base_url: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    /// Sets the service URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Endpoint of `workspace`: the first host label of the service URL is
    /// replaced by the workspace id.
    pub fn workspace_url(&self, workspace: &str) -> Result<String, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid service URL `{}`: {}", self.base_url, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| format!("service URL `{}` has no host", self.base_url))?;
        let domain = match host.split_once('.') {
            Some((_, domain)) if domain.contains('.') => domain.to_string(),
            _ => host.to_string(),
        };
        url.set_host(Some(&format!("{}.{}", workspace, domain)))
            .map_err(|e| format!("invalid workspace `{}`: {}", workspace, e))?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

/// [`HttpClient`] backed by a blocking `reqwest` client with bearer auth.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl ReqwestClient {
    /// Builds a client; fails without an API key.
    pub fn new(config: &HttpConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| format!("no API key configured, set {}", API_KEY_ENV))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("schemasync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api_key })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> Result<HttpResponse, String> {
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        };
        let mut request = self.client.request(method, url).bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Remote service for a workspace.
pub fn connect_workspace(
    config: &HttpConfig,
    workspace: &str,
) -> Result<HttpRemote<ReqwestClient>, Box<dyn std::error::Error>> {
    let base_url = config.workspace_url(workspace)?;
    Ok(HttpRemote::new(base_url, ReqwestClient::new(config)?))
}

/// Remote service for an explicit endpoint, as found in a branch URL.
pub fn connect_url(
    config: &HttpConfig,
    base_url: &str,
) -> Result<HttpRemote<ReqwestClient>, Box<dyn std::error::Error>> {
    Ok(HttpRemote::new(base_url, ReqwestClient::new(config)?))
}
