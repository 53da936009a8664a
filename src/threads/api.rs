//! Agent server thread API
//!
//! `ThreadApi` is the seam between the client state and the network; the
//! store and poller are generic over it so tests can drive them with an
//! in-memory fake. `HttpThreadApi` talks to a real server with reqwest.

use super::{ThreadFilter, ThreadMetadata, ThreadRecord, ThreadState};
use crate::config::ApiConfig;
use crate::errors::{AgentdeckError, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

/// Remote thread operations the client depends on
pub trait ThreadApi {
    fn list_threads(
        &self,
        filter: &ThreadFilter,
    ) -> impl Future<Output = Result<Vec<ThreadRecord>>> + Send;

    fn create_thread(
        &self,
        metadata: &ThreadMetadata,
    ) -> impl Future<Output = Result<ThreadRecord>> + Send;

    fn delete_thread(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Merge `patch` into the thread's metadata
    fn update_thread(
        &self,
        id: &str,
        patch: &Value,
    ) -> impl Future<Output = Result<ThreadRecord>> + Send;

    fn get_thread_state(&self, id: &str) -> impl Future<Output = Result<ThreadState>> + Send;

    /// Cancel whatever run is in flight on the thread
    fn cancel_thread(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// HTTP implementation against an agent server
pub struct HttpThreadApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpThreadApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }
}

/// Turn a response into `T`, mapping non-success statuses to `Api` errors
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check_status(resp).await?;
    Ok(resp.json::<T>().await?)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AgentdeckError::Api {
        status: status.as_u16(),
        body,
    })
}

impl ThreadApi for HttpThreadApi {
    async fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<ThreadRecord>> {
        let resp = self
            .request(reqwest::Method::POST, "/threads/search")
            .json(filter)
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn create_thread(&self, metadata: &ThreadMetadata) -> Result<ThreadRecord> {
        let resp = self
            .request(reqwest::Method::POST, "/threads")
            .json(&json!({ "metadata": metadata }))
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/threads/{id}"))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn update_thread(&self, id: &str, patch: &Value) -> Result<ThreadRecord> {
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/threads/{id}"))
            .json(&json!({ "metadata": patch }))
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn get_thread_state(&self, id: &str) -> Result<ThreadState> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/threads/{id}/state"))
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn cancel_thread(&self, id: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::POST, &format!("/threads/{id}/runs/cancel"))
            .json(&json!({ "action": "interrupt" }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
