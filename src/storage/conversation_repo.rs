use crate::domain::conversation::{Conversation, Participants};
use crate::domain::message::Message;
use crate::error::{AppError, Result};
use crate::storage::records::{ConversationRecord, MessageRecord};
use crate::storage::{ConversationStore, DbPool};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str =
    "id, traveler_id, host_id, last_message, last_message_at, traveler_unread, host_unread, created_at";

#[derive(Clone, Debug)]
pub struct PgConversationRepository {
    pool: DbPool,
}

impl PgConversationRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationRepository {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_or_create(&self, pair: Participants) -> Result<(Conversation, bool)> {
        let fresh = Conversation::new(pair, OffsetDateTime::now_utc());

        let inserted = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            INSERT INTO conversations (id, traveler_id, host_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (traveler_id, host_id) DO NOTHING
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(fresh.id)
        .bind(fresh.traveler_id)
        .bind(fresh.host_id)
        .bind(fresh.created_at)
        .fetch_optional(&self.pool)
        .await;

        match inserted {
            Ok(Some(record)) => Ok((record.into(), true)),
            Ok(None) => {
                let record = sqlx::query_as::<_, ConversationRecord>(&format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE traveler_id = $1 AND host_id = $2"
                ))
                .bind(pair.traveler_id)
                .bind(pair.host_id)
                .fetch_one(&self.pool)
                .await?;
                Ok((record.into(), false))
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => {
                // Foreign key violation: one of the participants does not exist
                Err(AppError::NotFound)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let records = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations
            WHERE traveler_id = $1 OR host_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, message), fields(conversation_id = %message.conversation_id))]
    async fn append_message(&self, message: &Message) -> Result<Conversation> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, message_type, amount, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.kind.type_tag())
        .bind(message.kind.amount())
        .bind(message.read)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => return Err(AppError::NotFound),
            Err(e) => return Err(AppError::Database(e)),
        }

        // SET expressions all see the pre-update row, so both CASEs compare against the old timestamp.
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            r#"
            UPDATE conversations SET
                last_message = CASE
                    WHEN last_message_at IS NULL OR last_message_at <= $3 THEN $2
                    ELSE last_message
                END,
                last_message_at = CASE
                    WHEN last_message_at IS NULL OR last_message_at <= $3 THEN $3
                    ELSE last_message_at
                END,
                traveler_unread = traveler_unread + CASE WHEN traveler_id = $4 THEN 0 ELSE 1 END,
                host_unread = host_unread + CASE WHEN traveler_id = $4 THEN 1 ELSE 0 END
            WHERE id = $1
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(message.conversation_id)
        .bind(&message.content)
        .bind(message.created_at)
        .bind(message.sender_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

        tx.commit().await?;
        Ok(record.into())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, sender_id, content, message_type, amount, is_read, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(TryInto::try_into).collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations SET
                traveler_unread = CASE WHEN traveler_id = $2 THEN 0 ELSE traveler_unread END,
                host_unread = CASE WHEN host_id = $2 THEN 0 ELSE host_unread END
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
