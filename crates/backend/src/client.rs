use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use common::{Error, Result};

use crate::{BacktestRequest, BacktestResult, OptimizationResult};

/// Abstraction over the remote backtest/optimization service.
///
/// `HttpBackend` implements this against the real service; tests substitute
/// an in-process double.
#[async_trait]
pub trait StrategyBackend: Send + Sync {
    /// Simulate the strategy over the requested range.
    async fn backtest(&self, request: &BacktestRequest) -> Result<BacktestResult>;

    /// Search the strategy's parameter space for the best result.
    async fn optimize(&self, request: &BacktestRequest) -> Result<OptimizationResult>;
}

/// JSON-over-HTTP client for the backend.
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "POST to backend");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Backend(format!("HTTP {status}: {text}")));
        }
        if text.trim().is_empty() {
            return Err(Error::Backend(format!("empty response from {path}")));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl StrategyBackend for HttpBackend {
    async fn backtest(&self, request: &BacktestRequest) -> Result<BacktestResult> {
        self.post_json("/api/backtest", request).await
    }

    async fn optimize(&self, request: &BacktestRequest) -> Result<OptimizationResult> {
        self.post_json("/api/optimize", request).await
    }
}
