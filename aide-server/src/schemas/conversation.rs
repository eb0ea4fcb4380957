use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ConversationRecord, MessageRecord};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateTitleRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    /// Stored with the user message; defaults to `{}`.
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: i64,
    pub title: String,
    pub message_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationDetail {
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExchangeResponse {
    pub user_message: MessageResponse,
    pub assistant_message: MessageResponse,
}

impl ConversationRecord {
    pub fn to_response(&self) -> ConversationResponse {
        ConversationResponse {
            id: self.id,
            title: self.title.clone(),
            message_count: self.message_count,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl MessageRecord {
    pub fn to_response(&self) -> MessageResponse {
        MessageResponse {
            id: self.id,
            conversation_id: self.conversation_id,
            role: self.role.to_string(),
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
