use crate::domain::conversation::{Conversation, Participants};
use crate::domain::message::Message;
use crate::domain::user::{NewUser, User};
use crate::error::{AppError, Result};
use crate::storage::{ConversationStore, UserStore};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

/// Process-local store for development and tests. Nothing survives a restart.
///
/// Each map is its own shard-locked table; a send touches `messages` and then
/// `conversations`, with no lock held across both.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
    conversations: DashMap<Uuid, Conversation>,
    pairs: DashMap<Participants, Uuid>,
    messages: DashMap<Uuid, Vec<Message>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("Username already taken".into())),
            Entry::Vacant(slot) => {
                let user = user.into_user(OffsetDateTime::now_utc());
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(ids.iter().filter_map(|id| self.users.get(id).map(|u| u.value().clone())).collect())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.conversations.get(&id).map(|c| c.value().clone()))
    }

    async fn get_or_create(&self, pair: Participants) -> Result<(Conversation, bool)> {
        if !self.users.contains_key(&pair.traveler_id) || !self.users.contains_key(&pair.host_id) {
            return Err(AppError::NotFound);
        }

        let (id, created) = match self.pairs.entry(pair) {
            Entry::Occupied(existing) => (*existing.get(), false),
            Entry::Vacant(slot) => {
                let conversation = Conversation::new(pair, OffsetDateTime::now_utc());
                let id = conversation.id;
                self.conversations.insert(id, conversation);
                slot.insert(id);
                (id, true)
            }
        };

        let conversation = self.conversations.get(&id).map(|c| c.value().clone()).ok_or(AppError::Internal)?;
        Ok((conversation, created))
    }

    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| c.is_participant(user_id))
            .map(|c| c.value().clone())
            .collect();
        conversations.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()).then_with(|| b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn append_message(&self, message: &Message) -> Result<Conversation> {
        if !self.conversations.contains_key(&message.conversation_id) {
            return Err(AppError::NotFound);
        }

        self.messages.entry(message.conversation_id).or_default().push(message.clone());

        let mut conversation = self.conversations.get_mut(&message.conversation_id).ok_or(AppError::NotFound)?;
        conversation.record_message(message);
        Ok(conversation.value().clone())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut messages = self.messages.get(&conversation_id).map(|m| m.value().clone()).unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let mut flipped = 0;
        if let Some(mut messages) = self.messages.get_mut(&conversation_id) {
            for message in messages.iter_mut().filter(|m| m.sender_id != reader_id && !m.read) {
                message.read = true;
                flipped += 1;
            }
        }

        if let Some(mut conversation) = self.conversations.get_mut(&conversation_id) {
            conversation.clear_unread(reader_id);
        }

        Ok(flipped)
    }
}
