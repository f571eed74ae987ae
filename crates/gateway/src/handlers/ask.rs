//! Free-form question handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use sangkwon_common::{
    chat::{compose_question, AnalyzedContext},
    errors::{AppError, Result},
    llm::ChatMessage,
    metrics::RequestMetrics,
};

/// Free-form question request
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, message = "질문이 비어 있습니다."))]
    #[serde(default)]
    pub question: String,

    /// Optional analysis summary grounding the question
    pub analyzed: Option<AnalyzedContext>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Answer a free-form question, grounded in a prior analysis when one
/// is attached
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let tracker = RequestMetrics::start("POST", "/ask");

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("question".to_string()),
    })?;

    let question = compose_question(request.analyzed.as_ref(), &request.question);
    let envelope = state.engine.ask(&question, "", false).await?;

    tracing::info!(
        source = envelope.source.as_str(),
        has_analysis = request.analyzed.is_some(),
        "Question answered"
    );
    tracker.finish(200);

    Ok(Json(AskResponse {
        answer: envelope.render(),
    }))
}

/// Multi-turn consultation request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "질문이 비어 있습니다."))]
    #[serde(default)]
    pub message: String,

    /// Session to continue; omitted on the first turn
    pub session_id: Option<Uuid>,

    /// Optional analysis summary grounding the conversation
    pub analyzed: Option<AnalyzedContext>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: String,
}

/// Continue (or start) a consultation session
///
/// The full role-tagged history goes to the chat model; the exchange is
/// appended to the session afterwards.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("message".to_string()),
    })?;

    let session_id = match request.session_id {
        Some(id) => {
            if state.sessions.history(id).await.is_some() {
                id
            } else {
                state.sessions.create().await
            }
        }
        None => state.sessions.create().await,
    };

    let content = match request.analyzed.as_ref() {
        Some(analyzed) => compose_question(Some(analyzed), &request.message),
        None => request.message.clone(),
    };

    let mut messages = state
        .sessions
        .history(session_id)
        .await
        .unwrap_or_default();
    messages.push(ChatMessage::user(content.clone()));

    let reply = state.llm.chat(&messages).await?;

    state
        .sessions
        .record_exchange(
            session_id,
            ChatMessage::user(content),
            ChatMessage::assistant(reply.clone()),
        )
        .await;

    Ok(Json(ChatResponse { session_id, reply }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_question_fails_validation() {
        let request = AskRequest {
            question: String::new(),
            analyzed: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_question_passes_validation() {
        let request = AskRequest {
            question: "한남동 카페 창업 어때요?".to_string(),
            analyzed: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_deserializes_without_analyzed() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "임대료는요?"}"#).unwrap();
        assert!(request.analyzed.is_none());
    }

    #[test]
    fn test_request_deserializes_with_analyzed() {
        let request: AskRequest = serde_json::from_str(
            r#"{"question": "임대료는요?", "analyzed": {"gu": "용산구", "dong": "한남동"}}"#,
        )
        .unwrap();
        let analyzed = request.analyzed.unwrap();
        assert_eq!(analyzed.gu.as_deref(), Some("용산구"));
    }
}
