//! Resolution engine: retrieved-document grounding with fallback
//!
//! Per question, exactly one of three context paths is taken:
//! document-grounded (joined passages), fallback-grounded (caller-supplied
//! block), or unconstrained inference. Retrieval failure degrades to the
//! empty-passage branch and is never propagated; chat-model failure always
//! propagates.

use crate::errors::Result;
use crate::llm::ChatModel;
use crate::metrics;
use crate::rag::postprocess::normalize_time_ranges;
use crate::rag::preprocess::rewrite_for_search;
use crate::retrieval::Retriever;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Prompt template for the grounded branches. Two named slots; the
/// question slot always receives the original question, never the
/// rewritten retrieval query.
const GROUNDED_PROMPT: &str = "
당신은 유능한 AI 어시스턴트입니다. 아래는 검색된 문서 내용과 질문입니다.

[문서 컨텍스트]
{context}

[질문]
{question}

위 내용을 바탕으로 구체적이고 신뢰도 높은 답변을 작성하세요:
";

/// Which context path produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerSource {
    DocumentGrounded,
    FallbackGrounded,
    UnconstrainedInference,
}

impl AnswerSource {
    /// Human-readable label prepended to the answer text
    pub fn label(&self) -> &'static str {
        match self {
            AnswerSource::DocumentGrounded => "🔍 문서 기반 응답 (RAG)",
            AnswerSource::FallbackGrounded => "💡 GPT 추론 응답 (Fallback Context)",
            AnswerSource::UnconstrainedInference => "💡 GPT 단독 추론 응답",
        }
    }

    /// Stable identifier used in metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::DocumentGrounded => "document-grounded",
            AnswerSource::FallbackGrounded => "fallback-grounded",
            AnswerSource::UnconstrainedInference => "unconstrained-inference",
        }
    }
}

/// Final engine output: source tag plus the model's text
#[derive(Debug, Clone, Serialize)]
pub struct AnswerEnvelope {
    pub source: AnswerSource,
    pub text: String,
}

impl AnswerEnvelope {
    fn new(source: AnswerSource, text: String) -> Self {
        Self { source, text }
    }

    /// Render as the user-facing answer string
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.source.label(), self.text)
    }
}

/// The query resolution engine
pub struct QueryEngine {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(retriever: Arc<dyn Retriever>, llm: Arc<dyn ChatModel>, top_k: usize) -> Self {
        Self {
            retriever,
            llm,
            top_k,
        }
    }

    fn grounded_prompt(context: &str, question: &str) -> String {
        GROUNDED_PROMPT
            .replace("{context}", context)
            .replace("{question}", question)
    }

    /// Resolve a question into an answer envelope
    ///
    /// `fallback_context` is used only when retrieval yields nothing
    /// usable. `force_unconstrained` skips retrieval entirely.
    pub async fn ask(
        &self,
        question: &str,
        fallback_context: &str,
        force_unconstrained: bool,
    ) -> Result<AnswerEnvelope> {
        if force_unconstrained {
            let text = self.llm.complete(question).await?;
            metrics::record_rag_query(AnswerSource::UnconstrainedInference.as_str(), 0.0, 0);
            return Ok(AnswerEnvelope::new(
                AnswerSource::UnconstrainedInference,
                normalize_time_ranges(&text),
            ));
        }

        let rewritten = rewrite_for_search(question);

        let start = Instant::now();
        let passages = match self.retriever.retrieve(&rewritten, self.top_k).await {
            Ok(passages) => passages,
            // Retrieval failure degrades to the empty-passage branch.
            Err(e) => {
                warn!(error = %e, "Retrieval failed, continuing without passages");
                Vec::new()
            }
        };
        let retrieval_secs = start.elapsed().as_secs_f64();

        let usable: Vec<&str> = passages
            .iter()
            .map(|p| p.content.as_str())
            .filter(|content| !content.trim().is_empty())
            .collect();

        let (source, context) = if !usable.is_empty() {
            (AnswerSource::DocumentGrounded, usable.join("\n"))
        } else if !fallback_context.trim().is_empty() {
            (AnswerSource::FallbackGrounded, fallback_context.to_string())
        } else {
            // No passages, no fallback: the rewritten question goes to the
            // model directly, without the grounded prompt template.
            let text = self.llm.complete(&rewritten).await?;
            metrics::record_rag_query(
                AnswerSource::UnconstrainedInference.as_str(),
                retrieval_secs,
                0,
            );
            return Ok(AnswerEnvelope::new(
                AnswerSource::UnconstrainedInference,
                normalize_time_ranges(&text),
            ));
        };

        let prompt = Self::grounded_prompt(&context, question);
        let text = self.llm.complete(&prompt).await?;
        metrics::record_rag_query(source.as_str(), retrieval_secs, usable.len());

        Ok(AnswerEnvelope::new(source, normalize_time_ranges(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::llm::{FailingChat, ScriptedChat};
    use crate::retrieval::{FailingRetriever, Passage, StaticRetriever};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts retrieval calls on top of a fixed passage list
    struct CountingRetriever {
        calls: AtomicUsize,
        passages: Vec<Passage>,
    }

    impl CountingRetriever {
        fn new(contents: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                passages: contents
                    .iter()
                    .map(|c| Passage {
                        content: c.to_string(),
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Retriever for CountingRetriever {
        async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.passages.clone())
        }
    }

    fn engine(retriever: Arc<dyn Retriever>, llm: Arc<dyn ChatModel>) -> QueryEngine {
        QueryEngine::new(retriever, llm, 5)
    }

    #[tokio::test]
    async fn test_force_unconstrained_skips_retrieval() {
        let retriever = Arc::new(CountingRetriever::new(&["문서"]));
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever.clone(), llm.clone());

        let envelope = engine.ask("한남동 카페?", "", true).await.unwrap();

        assert_eq!(envelope.source, AnswerSource::UnconstrainedInference);
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
        // The raw question is sent, not the rewritten form.
        assert_eq!(llm.seen(), vec!["한남동 카페?".to_string()]);
    }

    #[tokio::test]
    async fn test_passages_are_joined_in_gateway_order() {
        let retriever = Arc::new(StaticRetriever::new(["A", "B"]));
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm.clone());

        let envelope = engine.ask("질문입니다", "C", false).await.unwrap();

        assert_eq!(envelope.source, AnswerSource::DocumentGrounded);
        let prompt = &llm.seen()[0];
        assert!(prompt.contains("A\nB"));
        assert!(prompt.contains("[문서 컨텍스트]"));
        assert!(prompt.contains("질문입니다"));
        // Fallback must not leak into the grounded context.
        assert!(!prompt.contains("C"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_uses_fallback() {
        let retriever = Arc::new(StaticRetriever::empty());
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm.clone());

        let envelope = engine.ask("질문입니다", "C", false).await.unwrap();

        assert_eq!(envelope.source, AnswerSource::FallbackGrounded);
        let prompt = &llm.seen()[0];
        assert!(prompt.contains("C"));
        assert!(prompt.contains("[문서 컨텍스트]"));
    }

    #[tokio::test]
    async fn test_whitespace_passages_fall_through() {
        let retriever = Arc::new(StaticRetriever::new(["", "   ", "\n\t"]));
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm.clone());

        let envelope = engine.ask("질문입니다", "C", false).await.unwrap();
        assert_eq!(envelope.source, AnswerSource::FallbackGrounded);
    }

    #[tokio::test]
    async fn test_no_passages_no_fallback_is_unconstrained() {
        let retriever = Arc::new(StaticRetriever::empty());
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm.clone());

        let envelope = engine.ask("상권 질문", "", false).await.unwrap();

        assert_eq!(envelope.source, AnswerSource::UnconstrainedInference);
        let prompt = &llm.seen()[0];
        // The rewritten question goes out, without the grounded template.
        assert!(prompt.contains("원 질문: 상권 질문"));
        assert!(!prompt.contains("[문서 컨텍스트]"));
    }

    #[tokio::test]
    async fn test_retrieval_error_degrades_to_fallback() {
        let retriever = Arc::new(FailingRetriever);
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm.clone());

        let envelope = engine.ask("질문입니다", "C", false).await.unwrap();
        assert_eq!(envelope.source, AnswerSource::FallbackGrounded);
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let retriever = Arc::new(StaticRetriever::new(["문서"]));
        let engine = engine(retriever, Arc::new(FailingChat));

        let err = engine.ask("질문입니다", "", false).await.unwrap_err();
        assert!(matches!(err, AppError::ChatModel { .. }));
    }

    #[tokio::test]
    async fn test_answer_text_is_postprocessed() {
        let retriever = Arc::new(StaticRetriever::new(["문서"]));
        let llm = Arc::new(ScriptedChat::new("피크는 1415시입니다"));
        let engine = engine(retriever, llm);

        let envelope = engine.ask("질문입니다", "", false).await.unwrap();
        assert_eq!(envelope.text, "피크는 14~15시입니다");
    }

    #[tokio::test]
    async fn test_render_prepends_source_label() {
        let retriever = Arc::new(StaticRetriever::new(["문서"]));
        let llm = Arc::new(ScriptedChat::new("답변"));
        let engine = engine(retriever, llm);

        let envelope = engine.ask("질문입니다", "", false).await.unwrap();
        let rendered = envelope.render();
        assert!(rendered.starts_with(AnswerSource::DocumentGrounded.label()));
        assert!(rendered.ends_with("답변"));
    }
}
