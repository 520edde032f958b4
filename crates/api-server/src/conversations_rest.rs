//! REST handlers for conversations.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mediaplan_conversations::{Conversation, MessageRole};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::actor_from_headers;
use crate::rest::{error_response, ApiError, AppState};
use mediaplan_core::HubError;

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    pub title: Option<String>,
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateConversationBody>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let actor = actor_from_headers(&headers)?;
    let conversation = state
        .conversations
        .create(actor.user_id, actor.hub_id, body.title);
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    Ok(Json(
        state
            .conversations
            .list_for_user(actor.user_id, actor.hub_id),
    ))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Conversation>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .conversations
        .get(id)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("conversation {id}"))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendMessageBody {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// POST /api/conversations/:id/messages
pub async fn append_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AppendMessageBody>,
) -> Result<Json<Conversation>, ApiError> {
    actor_from_headers(&headers)?;
    if body.content.trim().is_empty() {
        return Err(error_response(HubError::Validation(
            "message content must not be empty".into(),
        )));
    }
    state
        .conversations
        .append_message(
            id,
            body.role,
            body.content,
            body.prompt_tokens,
            body.completion_tokens,
        )
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("conversation {id}"))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBody {
    pub file_name: String,
    pub storage_key: String,
    #[serde(default)]
    pub size: usize,
}

/// POST /api/conversations/:id/attachments
pub async fn add_attachment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<AttachmentBody>,
) -> Result<Json<Conversation>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .conversations
        .add_attachment(id, body.file_name, body.storage_key, body.size)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("conversation {id}"))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFileBody {
    pub file_name: String,
    pub storage_key: String,
}

/// POST /api/conversations/:id/generated-files
pub async fn add_generated_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<GeneratedFileBody>,
) -> Result<Json<Conversation>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .conversations
        .add_generated_file(id, body.file_name, body.storage_key)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("conversation {id}"))))
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    pub key: String,
}

/// PUT /api/conversations/:id/context?key=...
pub async fn set_context(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<ContextQuery>,
    Json(value): Json<serde_json::Value>,
) -> Result<Json<Conversation>, ApiError> {
    actor_from_headers(&headers)?;
    state
        .conversations
        .set_context(id, query.key, value)
        .map(Json)
        .ok_or_else(|| error_response(HubError::NotFound(format!("conversation {id}"))))
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor_from_headers(&headers)?;
    if state.conversations.delete(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(HubError::NotFound(format!(
            "conversation {id}"
        ))))
    }
}
