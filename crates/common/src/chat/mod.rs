//! Chat sessions and analysis-grounded follow-up questions
//!
//! A session owns an append-only sequence of role-tagged messages seeded
//! with the consultant system prompt. History is bounded: once the cap is
//! reached the oldest non-system messages are dropped.

use crate::gateways::places::SimilarBusiness;
use crate::gateways::population::PassengerRecord;
use crate::llm::ChatMessage;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// System prompt seeding every session
pub const SYSTEM_PROMPT: &str =
    "너는 유동인구, 부동산, 업종 데이터를 바탕으로 창업을 상담해주는 전문가야.";

/// Analysis summary attached to a follow-up question
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedContext {
    pub gu: Option<String>,
    pub dong: Option<String>,
    pub item: Option<String>,
    pub population: Option<PassengerRecord>,
    pub similar: Option<SimilarBusiness>,
    pub score: Option<String>,
    pub recommendation: Option<String>,
    pub location_analysis: Option<String>,
}

impl AnalyzedContext {
    fn field(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("정보 없음")
    }

    /// True when no analysis field is populated; an empty context is
    /// treated the same as an absent one
    pub fn is_empty(&self) -> bool {
        self.gu.is_none()
            && self.dong.is_none()
            && self.item.is_none()
            && self.population.is_none()
            && self.similar.is_none()
            && self.score.is_none()
            && self.recommendation.is_none()
            && self.location_analysis.is_none()
    }

    /// Render the analysis summary block prepended to the user question
    pub fn summary_block(&self) -> String {
        let gu = self.gu.as_deref().unwrap_or("");
        let dong = self.dong.as_deref().unwrap_or("");
        let item = self.item.as_deref().unwrap_or("");
        let population = self
            .population
            .as_ref()
            .map(|record| record.total_display())
            .unwrap_or("정보 없음");
        let similar = self
            .similar
            .as_ref()
            .map(|s| s.description.as_str())
            .unwrap_or("정보 없음");

        format!(
            "\n[분석 요약]\n- 지역: {gu} {dong}\n- 업종: {item}\n- 유동인구: {population}\n- 유사 업종: {similar}\n- 창업 평가: {score}\n- 추천 업종: {recommendation}\n- 입지 분석: {location_analysis}\n",
            score = Self::field(&self.score),
            recommendation = Self::field(&self.recommendation),
            location_analysis = Self::field(&self.location_analysis),
        )
    }
}

/// Compose the question sent to the resolution engine
///
/// The summary block (empty when no analysis is attached) is always
/// separated from the user input by a blank line.
pub fn compose_question(analyzed: Option<&AnalyzedContext>, user_input: &str) -> String {
    let block = analyzed
        .filter(|context| !context.is_empty())
        .map(|context| context.summary_block())
        .unwrap_or_default();
    format!("{}\n\n{}", block, user_input)
}

/// An append-only chat session
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    messages: Vec<ChatMessage>,
    max_messages: usize,
}

impl ChatSession {
    /// Create a session seeded with the system prompt
    pub fn new(max_messages: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT)],
            max_messages,
        }
    }

    /// Append a message, evicting the oldest non-system messages past
    /// the cap
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        while self.messages.len() > self.max_messages && self.messages.len() > 1 {
            self.messages.remove(1);
        }
    }

    /// The full history, system message first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// In-memory session store
///
/// Sessions live for the process lifetime only; nothing is persisted.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, ChatSession>>,
    max_messages: usize,
}

impl SessionStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
        }
    }

    /// Create a fresh session and return its id
    pub async fn create(&self) -> Uuid {
        let session = ChatSession::new(self.max_messages);
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Snapshot a session's history, if it exists
    pub async fn history(&self, id: Uuid) -> Option<Vec<ChatMessage>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|session| session.messages().to_vec())
    }

    /// Append a user/assistant exchange to a session
    ///
    /// Returns false when the session is unknown.
    pub async fn record_exchange(&self, id: Uuid, user: ChatMessage, assistant: ChatMessage) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) => {
                session.push(user);
                session.push(assistant);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_block_defaults() {
        let context = AnalyzedContext::default();
        let block = context.summary_block();
        assert!(block.contains("- 지역:  \n"));
        assert!(block.contains("- 유동인구: 정보 없음"));
        assert!(block.contains("- 입지 분석: 정보 없음"));
    }

    #[test]
    fn test_summary_block_with_fields() {
        let context = AnalyzedContext {
            gu: Some("용산구".to_string()),
            dong: Some("한남동".to_string()),
            item: Some("카페".to_string()),
            score: Some("✅ 매우 적합한 입지예요! 👍".to_string()),
            ..Default::default()
        };
        let block = context.summary_block();
        assert!(block.contains("- 지역: 용산구 한남동"));
        assert!(block.contains("- 업종: 카페"));
        assert!(block.contains("- 창업 평가: ✅ 매우 적합한 입지예요! 👍"));
    }

    #[test]
    fn test_compose_question_without_analysis() {
        assert_eq!(compose_question(None, "임대료는요?"), "\n\n임대료는요?");
    }

    #[test]
    fn test_compose_question_with_empty_analysis() {
        let context = AnalyzedContext::default();
        assert_eq!(
            compose_question(Some(&context), "임대료는요?"),
            "\n\n임대료는요?"
        );
    }

    #[test]
    fn test_compose_question_with_analysis() {
        let context = AnalyzedContext {
            gu: Some("용산구".to_string()),
            ..Default::default()
        };
        let composed = compose_question(Some(&context), "임대료는요?");
        assert!(composed.starts_with("\n[분석 요약]"));
        assert!(composed.ends_with("\n\n임대료는요?"));
    }

    #[test]
    fn test_session_seeded_with_system_prompt() {
        let session = ChatSession::new(10);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, "system");
        assert_eq!(session.messages()[0].content, SYSTEM_PROMPT);
    }

    #[test]
    fn test_session_truncation_pins_system_message() {
        let mut session = ChatSession::new(4);
        for i in 0..6 {
            session.push(ChatMessage::user(format!("질문 {i}")));
        }
        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        // Oldest user turns were evicted.
        assert_eq!(messages[1].content, "질문 3");
        assert_eq!(messages[3].content, "질문 5");
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let store = SessionStore::new(10);
        let id = store.create().await;

        let ok = store
            .record_exchange(
                id,
                ChatMessage::user("카페 어때요?"),
                ChatMessage::assistant("좋습니다"),
            )
            .await;
        assert!(ok);

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].content, "좋습니다");
    }

    #[tokio::test]
    async fn test_store_unknown_session() {
        let store = SessionStore::new(10);
        assert!(store.history(Uuid::new_v4()).await.is_none());
        let ok = store
            .record_exchange(
                Uuid::new_v4(),
                ChatMessage::user("질문"),
                ChatMessage::assistant("답변"),
            )
            .await;
        assert!(!ok);
    }
}
