use crate::config::MessagingConfig;
use crate::domain::conversation::{Conversation, ConversationSummary, Participants};
use crate::domain::message::{Message, MessageDraft};
use crate::error::{AppError, Result};
use crate::storage::{ConversationStore, UserStore};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) sent_total: Counter<u64>,
    pub(crate) conversations_started_total: Counter<u64>,
    pub(crate) read_receipts_total: Counter<u64>,
    pub(crate) fetch_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("bhromon-messaging");
        Self {
            sent_total: meter
                .u64_counter("bhromon_messages_sent_total")
                .with_description("Messages accepted or rejected by the send path")
                .build(),
            conversations_started_total: meter
                .u64_counter("bhromon_conversations_started_total")
                .with_description("Conversations created between a traveler and a host")
                .build(),
            read_receipts_total: meter
                .u64_counter("bhromon_messages_marked_read_total")
                .with_description("Messages flipped from unread to read")
                .build(),
            fetch_size: meter
                .u64_histogram("bhromon_conversation_fetch_size")
                .with_description("Number of messages returned by a single conversation fetch")
                .build(),
        }
    }
}

/// Where a new message should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    Conversation(Uuid),
    /// Opens the traveler/host conversation on first contact.
    Recipient(Uuid),
}

/// The stored message plus the conversation summary it produced, as seen by the sender.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub conversation: ConversationSummary,
}

#[derive(Clone, Debug)]
pub struct ConversationService {
    users: Arc<dyn UserStore>,
    conversations: Arc<dyn ConversationStore>,
    config: MessagingConfig,
    metrics: Metrics,
}

impl ConversationService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, conversations: Arc<dyn ConversationStore>, config: MessagingConfig) -> Self {
        Self { users, conversations, config, metrics: Metrics::new() }
    }

    /// Lists the viewer's conversations, newest activity first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the store cannot be read.
    #[tracing::instrument(err(level = "warn"), skip(self), fields(viewer_id = %viewer_id))]
    pub async fn list_conversations(&self, viewer_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let conversations = self.conversations.list_for_participant(viewer_id).await?;

        let counterpart_ids: Vec<Uuid> = conversations.iter().filter_map(|c| c.counterpart_of(viewer_id)).collect();
        let counterparts: HashMap<Uuid, _> =
            self.users.find_many(&counterpart_ids).await?.into_iter().map(|u| (u.id, u)).collect();

        Ok(conversations
            .iter()
            .map(|c| {
                let counterpart = c.counterpart_of(viewer_id).and_then(|id| counterparts.get(&id));
                ConversationSummary::for_viewer(c, viewer_id, counterpart)
            })
            .collect())
    }

    /// Returns the messages of a conversation oldest first and marks the counterpart's messages read.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist or the viewer is not part of it.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self),
        fields(conversation_id = %conversation_id, viewer_id = %viewer_id)
    )]
    pub async fn get_messages(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<Vec<Message>> {
        self.participant_conversation(conversation_id, viewer_id).await?;

        let flipped = self.conversations.mark_read(conversation_id, viewer_id).await?;
        if flipped > 0 {
            tracing::debug!(count = flipped, "Marked messages read");
            self.metrics.read_receipts_total.add(flipped, &[]);
        }

        let messages = self.conversations.list_messages(conversation_id).await?;
        self.metrics.fetch_size.record(messages.len() as u64, &[]);
        Ok(messages)
    }

    /// Gets or creates the conversation between the viewer and another user.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if either user does not exist.
    /// Returns `AppError::BadRequest` for a self-conversation or two users with the same role.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self),
        fields(viewer_id = %viewer_id, participant_id = %participant_id)
    )]
    pub async fn start_conversation(&self, viewer_id: Uuid, participant_id: Uuid) -> Result<ConversationSummary> {
        let conversation = self.open_conversation(viewer_id, participant_id).await?;
        self.summarize(&conversation, viewer_id).await
    }

    /// Validates and stores a message, then returns it with the updated summary.
    ///
    /// Validation happens before any store access.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the draft is invalid.
    /// Returns `AppError::NotFound` if the target conversation or recipient does not exist,
    /// or the viewer is not a participant.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, draft),
        fields(viewer_id = %viewer_id, target = ?target, kind = draft.kind.type_tag())
    )]
    pub async fn send_message(&self, viewer_id: Uuid, target: SendTarget, draft: MessageDraft) -> Result<SentMessage> {
        if let Err(e) = draft.validate_with_limit(self.config.max_message_length) {
            self.metrics
                .sent_total
                .add(1, &[KeyValue::new("status", "rejected"), KeyValue::new("kind", draft.kind.type_tag())]);
            return Err(e.into());
        }

        let conversation = match target {
            SendTarget::Conversation(id) => self.participant_conversation(id, viewer_id).await?,
            SendTarget::Recipient(recipient_id) => self.open_conversation(viewer_id, recipient_id).await?,
        };

        let kind = draft.kind.type_tag();
        let message = draft.into_message(conversation.id, viewer_id, OffsetDateTime::now_utc());

        match self.conversations.append_message(&message).await {
            Ok(updated) => {
                tracing::debug!(message_id = %message.id, "Message stored");
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "success"), KeyValue::new("kind", kind)]);
                let conversation = self.summarize(&updated, viewer_id).await?;
                Ok(SentMessage { message, conversation })
            }
            Err(e) => {
                self.metrics.sent_total.add(1, &[KeyValue::new("status", "failure"), KeyValue::new("kind", kind)]);
                Err(e)
            }
        }
    }

    /// Non-participants get the same answer as a missing conversation.
    async fn participant_conversation(&self, conversation_id: Uuid, viewer_id: Uuid) -> Result<Conversation> {
        match self.conversations.find(conversation_id).await? {
            Some(c) if c.is_participant(viewer_id) => Ok(c),
            Some(_) => {
                tracing::debug!("Viewer is not a participant");
                Err(AppError::NotFound)
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn open_conversation(&self, viewer_id: Uuid, participant_id: Uuid) -> Result<Conversation> {
        let viewer = self.users.find_by_id(viewer_id).await?.ok_or(AppError::AuthError)?;
        let participant = self.users.find_by_id(participant_id).await?.ok_or(AppError::NotFound)?;
        let pair = Participants::pair(&viewer, &participant)?;

        let (conversation, created) = self.conversations.get_or_create(pair).await?;
        if created {
            tracing::info!(conversation_id = %conversation.id, "Conversation started");
            self.metrics.conversations_started_total.add(1, &[]);
        }
        Ok(conversation)
    }

    async fn summarize(&self, conversation: &Conversation, viewer_id: Uuid) -> Result<ConversationSummary> {
        let counterpart = match conversation.counterpart_of(viewer_id) {
            Some(id) => self.users.find_by_id(id).await?,
            None => None,
        };
        Ok(ConversationSummary::for_viewer(conversation, viewer_id, counterpart.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{NewUser, Role, User};
    use crate::storage::memory::MemoryStore;

    struct Fixture {
        service: ConversationService,
        traveler: User,
        host: User,
        other_host: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let mut users = Vec::new();
        for (username, name, role) in [
            ("karim", "Karim Ahmed", Role::Traveler),
            ("riya", "Riya Rahman", Role::Host),
            ("tanvir", "Tanvir Hossain", Role::Host),
        ] {
            let user = store
                .create(NewUser {
                    username: username.to_string(),
                    password_hash: "hash".to_string(),
                    display_name: name.to_string(),
                    avatar_url: None,
                    role,
                })
                .await
                .unwrap();
            users.push(user);
        }
        let other_host = users.pop().unwrap();
        let host = users.pop().unwrap();
        let traveler = users.pop().unwrap();

        let service = ConversationService::new(
            Arc::clone(&store) as Arc<dyn UserStore>,
            store,
            MessagingConfig { max_message_length: 50 },
        );
        Fixture { service, traveler, host, other_host }
    }

    #[tokio::test]
    async fn test_first_message_opens_conversation() {
        let f = fixture().await;
        let sent = f
            .service
            .send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::text("hi"))
            .await
            .unwrap();

        assert_eq!(sent.conversation.counterpart_name, "Riya Rahman");
        assert_eq!(sent.conversation.last_message.as_deref(), Some("hi"));

        let listed = f.service.list_conversations(f.traveler.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, sent.conversation.id);
        assert_eq!(listed[0].last_message.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_blank_and_oversized_messages_rejected() {
        let f = fixture().await;
        let blank =
            f.service.send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::text("   ")).await;
        assert!(matches!(blank, Err(AppError::BadRequest(_))));

        let long = "x".repeat(51);
        let oversized =
            f.service.send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::text(long)).await;
        assert!(matches!(oversized, Err(AppError::BadRequest(_))));

        // Nothing reached the store.
        assert!(f.service.list_conversations(f.traveler.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payment_rejected() {
        let f = fixture().await;
        for amount in [0, -500] {
            let rejected = f
                .service
                .send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::payment("deposit", amount))
                .await;
            assert!(matches!(rejected, Err(AppError::BadRequest(_))));
        }
        assert!(f.service.list_conversations(f.traveler.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outsider_cannot_read_or_write() {
        let f = fixture().await;
        let sent = f
            .service
            .send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::text("hello"))
            .await
            .unwrap();
        let conversation_id = sent.conversation.id;

        assert!(matches!(f.service.get_messages(conversation_id, f.other_host.id).await, Err(AppError::NotFound)));
        let write = f
            .service
            .send_message(f.other_host.id, SendTarget::Conversation(conversation_id), MessageDraft::text("hey"))
            .await;
        assert!(matches!(write, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_messages_clears_unread() {
        let f = fixture().await;
        let sent = f
            .service
            .send_message(f.traveler.id, SendTarget::Recipient(f.host.id), MessageDraft::text("hello"))
            .await
            .unwrap();

        let host_view = f.service.list_conversations(f.host.id).await.unwrap();
        assert_eq!(host_view[0].unread_count, 1);

        let messages = f.service.get_messages(sent.conversation.id, f.host.id).await.unwrap();
        assert!(messages.iter().all(|m| m.read));

        let host_view = f.service.list_conversations(f.host.id).await.unwrap();
        assert_eq!(host_view[0].unread_count, 0);
    }

    #[tokio::test]
    async fn test_same_role_conversation_rejected() {
        let f = fixture().await;
        let result = f.service.start_conversation(f.host.id, f.other_host.id).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_not_found() {
        let f = fixture().await;
        let result =
            f.service.send_message(f.traveler.id, SendTarget::Recipient(Uuid::new_v4()), MessageDraft::text("hi")).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
