//! Sangkwon Common Library
//!
//! Shared code for the Sangkwon advisory service including:
//! - Configuration management
//! - Error types and handling
//! - Embedding and chat-model client abstractions
//! - Vector retrieval gateway
//! - Query resolution engine (RAG with fallback)
//! - Suitability scoring
//! - External data gateways (real estate, pedestrian traffic, place search)
//! - Analysis orchestration and chat sessions

pub mod analysis;
pub mod chat;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod gateways;
pub mod llm;
pub mod metrics;
pub mod rag;
pub mod retrieval;
pub mod scoring;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::ChatModel;
pub use rag::{AnswerEnvelope, AnswerSource, QueryEngine};
pub use retrieval::Retriever;
pub use scoring::{SuitabilityBand, SuitabilityVerdict};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

/// Default retrieval depth
pub const DEFAULT_TOP_K: usize = 5;
