use async_trait::async_trait;
use tracing::debug;

use super::{IndexError, VectorIndex};
use crate::models::image::IndexEntry;

/// Pinecone index client over the data-plane HTTP API.
pub struct PineconeIndex {
    api_key: String,
    base_url: String,
    namespace: String,
    http_client: reqwest::Client,
}

impl PineconeIndex {
    /// Fails fast when the index host or API key is missing, before any
    /// network traffic.
    pub fn new(api_key: &str, index_host: &str, namespace: &str) -> Result<Self, IndexError> {
        if api_key.is_empty() {
            return Err(IndexError::Config("PINECONE_API_KEY is not set".to_string()));
        }
        if index_host.is_empty() {
            return Err(IndexError::Config(
                "PINECONE_INDEX_HOST is not set".to_string(),
            ));
        }

        let base_url = if index_host.starts_with("http") {
            index_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", index_host.trim_end_matches('/'))
        };

        Ok(Self {
            api_key: api_key.to_string(),
            base_url,
            namespace: namespace.to_string(),
            http_client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize, IndexError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let body = serde_json::json!({
            "vectors": entries,
            "namespace": self.namespace,
        });

        let resp = self
            .http_client
            .post(format!("{}/vectors/upsert", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Remote { status, body });
        }

        let result: serde_json::Value = resp.json().await?;
        let upserted = result
            .get("upsertedCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(entries.len() as u64) as usize;

        debug!("Upserted {upserted} vectors into namespace '{}'", self.namespace);
        Ok(upserted)
    }
}
