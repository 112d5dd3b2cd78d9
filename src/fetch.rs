use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Path of the `mod_status` handler on the target server.
pub const STATUS_PATH: &str = "/server-status";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid status URL '{0}'")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },
}

#[async_trait]
pub trait StatusFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Builds `http://<host>/server-status`, refusing hosts that carry their own
/// scheme or path.
pub fn status_url(host: &str) -> Result<String, FetchError> {
    let host = host.trim();
    if host.is_empty() || host.contains("://") || host.contains('/') {
        return Err(FetchError::InvalidUrl(host.to_string()));
    }

    let url = format!("http://{}{}", host, STATUS_PATH);
    Url::parse(&url).map_err(|_| FetchError::InvalidUrl(url.clone()))?;
    Ok(url)
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        debug!("GET {}", parsed);
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
