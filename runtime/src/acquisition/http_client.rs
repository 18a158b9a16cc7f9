//! Plain GET requests with a fixed user agent, no browser involved.
//! Retry and caching live one layer up, in [`super::fetch`].

use anyhow::{Context, Result};
use reqwest::header::{HeaderName, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use std::time::Duration;

const MAX_REDIRECTS: usize = 5;

/// One completed GET, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The URL as requested.
    pub url: String,
    /// Where redirects ended up.
    pub final_url: String,
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client shared by every network-touching stage.
///
/// Keeps a second, HTTP/1.1-only client for servers that break on HTTP/2.
#[derive(Clone)]
pub struct HttpClient {
    primary: reqwest::Client,
    http1: reqwest::Client,
    user_agent: String,
}

fn build_client(user_agent: &str, timeout: Duration, http1_only: bool) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
    let builder = if http1_only { builder.http1_only() } else { builder };
    builder.build().context("failed to build HTTP client")
}

/// Transport errors worth one more try over HTTP/1.1.
fn is_protocol_error(e: &reqwest::Error) -> bool {
    let msg = e.to_string();
    ["http2", "protocol", "connection closed"]
        .iter()
        .any(|needle| msg.contains(needle))
}

impl HttpClient {
    /// Create a client sending `user_agent` with every request.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            primary: build_client(user_agent, timeout, false)?,
            http1: build_client(user_agent, timeout, true)?,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` with extra request headers.
    ///
    /// Non-2xx statuses come back as responses, only transport failures
    /// are errors.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(HeaderName, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        match send(&self.primary, url, headers).await {
            Err(e) if is_protocol_error(&e) => {
                tracing::debug!("{url}: {e}, retrying over HTTP/1.1");
                send(&self.http1, url, headers).await
            }
            other => other,
        }
    }
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    headers: &[(HeaderName, String)],
) -> Result<HttpResponse, reqwest::Error> {
    let request = headers
        .iter()
        .fold(client.get(url), |req, (name, value)| {
            req.header(name.clone(), value.as_str())
        });
    let response = request.send().await?;

    let read = |name: HeaderName| -> Option<String> {
        let value = response.headers().get(name)?;
        value.to_str().ok().map(str::to_owned)
    };
    let etag = read(ETAG);
    let last_modified = read(LAST_MODIFIED);
    let content_type = read(CONTENT_TYPE);
    let status = response.status().as_u16();
    let final_url = response.url().to_string();

    Ok(HttpResponse {
        url: url.to_string(),
        final_url,
        status,
        etag,
        last_modified,
        content_type,
        body: response.bytes().await?.to_vec(),
    })
}
