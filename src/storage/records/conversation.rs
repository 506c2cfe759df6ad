use crate::domain::conversation::Conversation;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ConversationRecord {
    pub(crate) id: Uuid,
    pub(crate) traveler_id: Uuid,
    pub(crate) host_id: Uuid,
    pub(crate) last_message: Option<String>,
    pub(crate) last_message_at: Option<OffsetDateTime>,
    pub(crate) traveler_unread: i32,
    pub(crate) host_unread: i32,
    pub(crate) created_at: OffsetDateTime,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            traveler_id: record.traveler_id,
            host_id: record.host_id,
            last_message: record.last_message,
            last_message_at: record.last_message_at,
            traveler_unread: record.traveler_unread,
            host_unread: record.host_unread,
            created_at: record.created_at,
        }
    }
}
