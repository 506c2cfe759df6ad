use crate::domain::conversation::ConversationSummary;
use crate::domain::message::{Message, MessageDraft, MessageKind};
use crate::services::conversation_service::{SendTarget, SentMessage};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Payment,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Payment => "payment",
        }
    }
}

impl From<MessageKind> for MessageType {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => Self::Text,
            MessageKind::Payment { .. } => Self::Payment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub read: bool,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            message_type: message.kind.into(),
            amount: message.kind.amount(),
            created_at: message.created_at,
            read: message.read,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub traveler_id: Uuid,
    pub host_id: Uuid,
    pub counterpart_id: Uuid,
    pub counterpart_name: String,
    #[serde(default)]
    pub counterpart_avatar: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    pub unread_count: i32,
}

impl From<ConversationSummary> for ConversationView {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            traveler_id: summary.traveler_id,
            host_id: summary.host_id,
            counterpart_id: summary.counterpart_id,
            counterpart_name: summary.counterpart_name,
            counterpart_avatar: summary.counterpart_avatar,
            last_message: summary.last_message,
            last_message_at: summary.last_message_at,
            unread_count: summary.unread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: ConversationView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversation {
    pub participant_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

impl SendMessageRequest {
    #[must_use]
    pub fn to_conversation(conversation_id: Uuid, draft: &MessageDraft) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            recipient_id: None,
            content: draft.content.clone(),
            message_type: draft.kind.into(),
            amount: draft.kind.amount(),
        }
    }

    /// Splits the wire request into a target and a draft.
    ///
    /// # Errors
    /// Returns a description of the problem when the target is ambiguous or the type and amount disagree.
    pub fn into_parts(self) -> Result<(SendTarget, MessageDraft), String> {
        let target = match (self.conversation_id, self.recipient_id) {
            (Some(id), None) => SendTarget::Conversation(id),
            (None, Some(id)) => SendTarget::Recipient(id),
            (Some(_), Some(_)) => return Err("Provide either conversationId or recipientId, not both".into()),
            (None, None) => return Err("conversationId or recipientId is required".into()),
        };
        let kind = MessageKind::from_parts(self.message_type.as_str(), self.amount).map_err(|e| e.to_string())?;
        Ok((target, MessageDraft { content: self.content, kind }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: MessageView,
    pub conversation: ConversationView,
}

impl From<SentMessage> for SendMessageResponse {
    fn from(sent: SentMessage) -> Self {
        Self { success: true, message: sent.message.into(), conversation: sent.conversation.into() }
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}
