//! HTTP client for the application API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::common::config::join_url;
use crate::common::{Error, Result};
use crate::scenario::Session;
use crate::wait::Observable;

/// Per-request timeout unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// API client holding the session token once authenticated
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`; absolute inputs pass through
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    pub async fn set_token(&self, token: String) {
        *self.token.lock().await = Some(token);
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(path));
        match self.token.lock().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Status of a GET of `path` sent without the session token
    pub async fn anonymous_status(&self, path: &str) -> Result<u16> {
        let url = self.endpoint(path);
        tracing::debug!("GET {} (anonymous)", url);
        status_of(&self.http, &url).await
    }

    /// GET `path`, returning the JSON body of a 2xx response
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);
        let response = self.request(Method::GET, path).await.send().await?;
        read_json("GET", &url, response).await
    }

    /// POST a JSON body to `path`, returning the JSON body of a 2xx response
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);
        let response = self
            .request(Method::POST, path)
            .await
            .json(body)
            .send()
            .await?;
        read_json("POST", &url, response).await
    }
}

/// Body of a successful response as JSON; any other status is an error
async fn read_json(method: &str, url: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(Error::http_status(method, url, status.as_u16(), text.trim()));
    }
    Ok(serde_json::from_str(&text)?)
}

/// Holds when a GET of `url` answers with `expected`
///
/// Relative URLs resolve against the API base when probed through an
/// [`ApiClient`].
#[derive(Debug, Clone)]
pub struct StatusEquals {
    pub url: String,
    pub expected: u16,
}

impl StatusEquals {
    pub fn new(url: impl Into<String>, expected: u16) -> Self {
        Self {
            url: url.into(),
            expected,
        }
    }
}

async fn status_of(http: &reqwest::Client, url: &str) -> Result<u16> {
    let response = http.get(url).send().await?;
    Ok(response.status().as_u16())
}

#[async_trait]
impl Observable<ApiClient> for StatusEquals {
    fn describe(&self) -> String {
        format!("GET {} to return {}", self.url, self.expected)
    }

    async fn probe(&self, client: &ApiClient) -> Result<bool> {
        let status = status_of(client.http(), &client.endpoint(&self.url)).await?;
        Ok(status == self.expected)
    }
}

#[async_trait]
impl Observable<reqwest::Client> for StatusEquals {
    fn describe(&self) -> String {
        format!("GET {} to return {}", self.url, self.expected)
    }

    async fn probe(&self, http: &reqwest::Client) -> Result<bool> {
        Ok(status_of(http, &self.url).await? == self.expected)
    }
}

/// A scenario session over the HTTP API
pub struct ApiSession {
    client: ApiClient,
}

impl ApiSession {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Session for ApiSession {
    type Target = ApiClient;

    fn target(&self) -> &ApiClient {
        &self.client
    }

    async fn evidence(&self) -> Vec<String> {
        let authenticated = self.client.token().await.is_some();
        vec![
            format!("api: {}", self.client.base_url()),
            format!("authenticated: {}", authenticated),
        ]
    }

    async fn release(self) -> Result<()> {
        if self.client.token().await.is_some() {
            tracing::debug!("Discarding API session token");
        }
        Ok(())
    }
}
