use crate::domain::message::{Message, MessageKind};
use crate::error::AppError;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) conversation_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) content: String,
    pub(crate) message_type: String,
    pub(crate) amount: Option<i64>,
    pub(crate) is_read: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = AppError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let kind = MessageKind::from_parts(&record.message_type, record.amount).map_err(|e| {
            tracing::error!(message_id = %record.id, error = %e, "Stored message has an invalid type");
            AppError::Internal
        })?;

        Ok(Self {
            id: record.id,
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            content: record.content,
            kind,
            created_at: record.created_at,
            read: record.is_read,
        })
    }
}
