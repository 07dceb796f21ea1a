//! Bridge to the external workflow engine's embedding activity.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use trellis_core::context::EmbeddingWorkflow;
use trellis_core::{DomainError, DomainResult};

/// HTTP client for the embedding workflow, used to rewrite semantic query
/// filters before they reach the Graph API.
#[derive(Clone)]
pub struct EmbeddingServiceClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl EmbeddingServiceClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[async_trait]
impl EmbeddingWorkflow for EmbeddingServiceClient {
    async fn embed_text(&self, text: &str) -> DomainResult<Vec<f32>> {
        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .json(&json!({ "input": text }))
            .send()
            .await
            .map_err(|err| DomainError::Workflow(format!("embedding request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(DomainError::Workflow(format!(
                "embedding service returned {}",
                response.status()
            )));
        }

        let embedding: EmbeddingResponse = response.json().await.map_err(|err| {
            DomainError::Workflow(format!("malformed embedding response: {err}"))
        })?;
        Ok(embedding.embedding)
    }
}
