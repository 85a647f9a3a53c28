use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::{CapabilityError, TextScorer};

/// OpenAI-style embeddings client
///
/// Embeddings are cached by input text, so identical texts within (or
/// across) requests hit the provider once.
pub struct EmbeddingClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
    cache: moka::future::Cache<String, Vec<f32>>,
}

impl EmbeddingClient {
    pub fn new(endpoint: String, api_key: String, model: String, cache_size: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let cache = moka::future::CacheBuilder::new(cache_size)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            endpoint,
            api_key,
            model,
            client,
            cache,
        }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        let body = json!({
            "input": [text],
            "model": self.model,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CapabilityError::Api(format!(
                "embedding provider returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let vector = json
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .and_then(|e| e.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| CapabilityError::InvalidResponse("missing embedding vector".into()))?;

        vector
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| CapabilityError::InvalidResponse("non-numeric component".into()))
            })
            .collect()
    }
}

#[async_trait]
impl TextScorer for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        if let Some(cached) = self.cache.get(text).await {
            tracing::debug!("Embedding cache hit ({} chars)", text.len());
            return Ok(cached);
        }

        let vector = self.request_embedding(text).await?;
        self.cache.insert(text.to_string(), vector.clone()).await;
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding_body() -> String {
        r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#.to_string()
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(embedding_body())
            .create_async()
            .await;

        let client = EmbeddingClient::new(
            format!("{}/embeddings", server.url()),
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            100,
        );

        let vector = client.embed("chronic asthma").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_caches_identical_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(embedding_body())
            .expect(1)
            .create_async()
            .await;

        let client = EmbeddingClient::new(
            format!("{}/embeddings", server.url()),
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            100,
        );

        let first = client.embed("same text").await.unwrap();
        let second = client.embed("same text").await.unwrap();

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_surfaces_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(500)
            .create_async()
            .await;

        let client = EmbeddingClient::new(
            format!("{}/embeddings", server.url()),
            "test-key".to_string(),
            "text-embedding-3-small".to_string(),
            100,
        );

        assert!(matches!(
            client.embed("text").await,
            Err(CapabilityError::Api(_))
        ));
    }
}
