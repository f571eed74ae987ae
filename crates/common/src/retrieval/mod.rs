//! Vector retrieval gateway
//!
//! Wraps the external Weaviate instance holding the commercial-district
//! document index. The index is populated out of band; this module only
//! queries it. Passages come back in gateway order and are never
//! re-ranked here.

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A unit of text content returned by the retrieval gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
}

/// Trait for passage retrieval
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve the top-k passages for a query, in gateway order
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>>;
}

/// Weaviate-backed retriever
///
/// Embeds the query, then runs a GraphQL `Get` with `nearVector` over the
/// configured class.
pub struct WeaviateRetriever {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    class_name: String,
    text_key: String,
    embedder: Arc<dyn Embedder>,
}

impl WeaviateRetriever {
    /// Create a new retriever from configuration
    pub fn new(config: &RetrievalConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            class_name: config.class_name.clone(),
            text_key: config.text_key.clone(),
            embedder,
        })
    }

    fn build_query(&self, embedding: &[f32], top_k: usize) -> String {
        let vector = format!(
            "[{}]",
            embedding
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        format!(
            "{{ Get {{ {class}(nearVector: {{vector: {vector}}}, limit: {limit}) {{ {text} }} }} }}",
            class = self.class_name,
            vector = vector,
            limit = top_k,
            text = self.text_key,
        )
    }
}

#[derive(Serialize)]
struct GraphQlRequest {
    query: String,
}

#[async_trait]
impl Retriever for WeaviateRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let embedding = self.embedder.embed(query).await?;

        let url = format!("{}/v1/graphql", self.base_url);
        let body = GraphQlRequest {
            query: self.build_query(&embedding, top_k),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| AppError::Retrieval {
            message: format!("Request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval {
                message: format!("API error {}: {}", status, body),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| AppError::Retrieval {
                message: format!("Failed to parse response: {}", e),
            })?;

        if let Some(errors) = payload.get("errors") {
            return Err(AppError::Retrieval {
                message: format!("GraphQL errors: {}", errors),
            });
        }

        let items = payload
            .pointer(&format!("/data/Get/{}", self.class_name))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        // Gateway order is the only ordering guarantee; preserve it.
        let passages = items
            .iter()
            .filter_map(|item| item.get(&self.text_key).and_then(|v| v.as_str()))
            .map(|content| Passage {
                content: content.to_string(),
            })
            .collect();

        Ok(passages)
    }
}

/// Retriever returning a fixed passage list, for testing
pub struct StaticRetriever {
    passages: Vec<Passage>,
}

impl StaticRetriever {
    pub fn new<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: contents
                .into_iter()
                .map(|c| Passage { content: c.into() })
                .collect(),
        }
    }

    /// A retriever that finds nothing
    pub fn empty() -> Self {
        Self { passages: vec![] }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<Passage>> {
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Retriever that always fails, for testing degradation paths
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>> {
        Err(AppError::Retrieval {
            message: "connection refused".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::config::RetrievalConfig;

    fn test_config() -> RetrievalConfig {
        RetrievalConfig {
            url: "http://localhost:8090/".to_string(),
            api_key: None,
            class_name: "BusinessAPI".to_string(),
            text_key: "content".to_string(),
            top_k: 5,
            timeout_secs: 10,
        }
    }

    #[test]
    fn test_graphql_query_shape() {
        let retriever =
            WeaviateRetriever::new(&test_config(), Arc::new(MockEmbedder::new(3))).unwrap();
        let query = retriever.build_query(&[0.1, 0.2, 0.3], 5);
        assert!(query.contains("Get"));
        assert!(query.contains("BusinessAPI(nearVector: {vector: [0.1,0.2,0.3]}, limit: 5)"));
        assert!(query.contains("content"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let retriever =
            WeaviateRetriever::new(&test_config(), Arc::new(MockEmbedder::new(3))).unwrap();
        assert_eq!(retriever.base_url, "http://localhost:8090");
    }

    #[tokio::test]
    async fn test_static_retriever_respects_top_k() {
        let retriever = StaticRetriever::new(["a", "b", "c"]);
        let passages = retriever.retrieve("질문", 2).await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "a");
    }

    #[tokio::test]
    async fn test_failing_retriever() {
        let retriever = FailingRetriever;
        assert!(retriever.retrieve("질문", 5).await.is_err());
    }
}
