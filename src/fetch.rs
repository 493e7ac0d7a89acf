use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::settings::InstanceConfig;
use crate::status::StatusDocument;
use crate::xpath::TagScanner;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Other(e.to_string())
        }
    }
}

/// Result of polling one instance.
#[derive(Debug)]
pub struct Fetched {
    pub document: StatusDocument,
    pub error: Option<FetchError>,
    pub elapsed: Duration,
}

impl Fetched {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    scanner: TagScanner,
}

impl StatusClient {
    pub fn new(timeout: Duration, scanner: TagScanner) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kannel-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, scanner })
    }

    async fn get_status(&self, instance: &InstanceConfig) -> Result<String, FetchError> {
        let url = format!("{}/status.xml", instance.base());
        let response = self
            .http
            .get(&url)
            .query(&[("password", instance.status_password.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch one instance. Failures become an empty document.
    pub async fn fetch(&self, instance: &InstanceConfig) -> Fetched {
        let start = Instant::now();
        match self.get_status(instance).await {
            Ok(body) => {
                debug!(
                    instance = %instance.name,
                    bytes = body.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Fetched status"
                );
                Fetched {
                    document: StatusDocument::new(body, self.scanner),
                    error: None,
                    elapsed: start.elapsed(),
                }
            }
            Err(e) => {
                warn!(instance = %instance.name, url = %instance.display_url(), "Status fetch failed: {}", e);
                Fetched {
                    document: StatusDocument::empty(self.scanner),
                    error: Some(e),
                    elapsed: start.elapsed(),
                }
            }
        }
    }

    /// Fetch every instance concurrently; results come back in configured order.
    pub async fn fetch_all(&self, instances: &[InstanceConfig]) -> Vec<Fetched> {
        let mut tasks = JoinSet::new();
        for (index, instance) in instances.iter().cloned().enumerate() {
            let client = self.clone();
            tasks.spawn(async move { (index, client.fetch(&instance).await) });
        }

        let mut slots: Vec<Option<Fetched>> = instances.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, fetched)) => slots[index] = Some(fetched),
                Err(e) => warn!("Status fetch task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Fetched {
                    document: StatusDocument::empty(self.scanner),
                    error: Some(FetchError::Other("fetch task aborted".to_string())),
                    elapsed: Duration::ZERO,
                })
            })
            .collect()
    }
}
