use crate::api::schemas::messaging::{ConversationView, MessageView};
use crate::client::error::{ClientError, SubmitError};
use crate::client::http::MessagingClient;
use crate::domain::message::{MessageDraft, MessageKind};
use time::OffsetDateTime;
use uuid::Uuid;

/// Where an entry the local user wrote stands with the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Sent,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    /// Stable across the optimistic and confirmed versions of the entry.
    pub local_id: u64,
    pub message: MessageView,
    pub delivery: Delivery,
}

impl InboxEntry {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed { .. })
    }
}

/// Case-insensitive substring match on the counterpart name and the last message.
/// A blank query matches everything.
#[must_use]
pub fn filter_conversations<'a>(conversations: &'a [ConversationView], query: &str) -> Vec<&'a ConversationView> {
    if query.trim().is_empty() {
        return conversations.iter().collect();
    }
    let needle = query.to_lowercase();

    conversations
        .iter()
        .filter(|c| {
            c.counterpart_name.to_lowercase().contains(&needle)
                || c.last_message.as_deref().is_some_and(|m| m.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Headless inbox: the state a conversation list and thread view render from.
///
/// Every fetch is triggered explicitly. A failed fetch leaves its error string set
/// until the matching `retry_*` call succeeds.
#[derive(Debug)]
pub struct Inbox {
    client: MessagingClient,
    conversations: Vec<ConversationView>,
    selected: Option<Uuid>,
    entries: Vec<InboxEntry>,
    draft: String,
    search: String,
    loading_conversations: bool,
    loading_messages: bool,
    sending: bool,
    conversations_error: Option<String>,
    messages_error: Option<String>,
    send_error: Option<String>,
    next_local_id: u64,
}

impl Inbox {
    #[must_use]
    pub const fn new(client: MessagingClient) -> Self {
        Self {
            client,
            conversations: Vec::new(),
            selected: None,
            entries: Vec::new(),
            draft: String::new(),
            search: String::new(),
            loading_conversations: false,
            loading_messages: false,
            sending: false,
            conversations_error: None,
            messages_error: None,
            send_error: None,
            next_local_id: 0,
        }
    }

    #[must_use]
    pub const fn client(&self) -> &MessagingClient {
        &self.client
    }

    pub const fn client_mut(&mut self) -> &mut MessagingClient {
        &mut self.client
    }

    #[must_use]
    pub fn conversations(&self) -> &[ConversationView] {
        &self.conversations
    }

    #[must_use]
    pub const fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    #[must_use]
    pub fn entries(&self) -> &[InboxEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, local_id: u64) -> Option<&InboxEntry> {
        self.entries.iter().find(|e| e.local_id == local_id)
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn is_loading_conversations(&self) -> bool {
        self.loading_conversations
    }

    #[must_use]
    pub const fn is_loading_messages(&self) -> bool {
        self.loading_messages
    }

    #[must_use]
    pub const fn is_sending(&self) -> bool {
        self.sending
    }

    #[must_use]
    pub fn conversations_error(&self) -> Option<&str> {
        self.conversations_error.as_deref()
    }

    #[must_use]
    pub fn messages_error(&self) -> Option<&str> {
        self.messages_error.as_deref()
    }

    #[must_use]
    pub fn send_error(&self) -> Option<&str> {
        self.send_error.as_deref()
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    #[must_use]
    pub fn visible_conversations(&self) -> Vec<&ConversationView> {
        filter_conversations(&self.conversations, &self.search)
    }

    /// Loads the conversation list and, if nothing is selected yet, opens the first one.
    ///
    /// # Errors
    /// Returns the first fetch error; it is also kept in the matching error slot.
    pub async fn mount(&mut self) -> Result<(), ClientError> {
        self.refresh_conversations().await
    }

    /// Selects `conversation_id` and replaces the thread with its messages.
    ///
    /// # Errors
    /// Returns the fetch error, which is also stored as the messages error.
    pub async fn select(&mut self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.selected = Some(conversation_id);
        self.entries.clear();
        self.send_error = None;
        self.load_messages(conversation_id).await
    }

    /// Re-runs the list fetch, ending in the same state a successful [`Inbox::mount`] would.
    ///
    /// # Errors
    /// Returns the fetch error, which is also stored as the conversations error.
    pub async fn retry_conversations(&mut self) -> Result<(), ClientError> {
        self.refresh_conversations().await
    }

    /// Re-fetches the selected thread. Does nothing when no conversation is selected.
    /// Entries of that thread still `Pending` or `Failed` are kept after the server's list.
    ///
    /// # Errors
    /// Returns the fetch error, which is also stored as the messages error.
    pub async fn retry_messages(&mut self) -> Result<(), ClientError> {
        match self.selected {
            Some(id) => self.load_messages(id).await,
            None => Ok(()),
        }
    }

    /// Sends the draft buffer to the selected conversation.
    ///
    /// Blank input is rejected locally and leaves the state untouched. Otherwise a
    /// `Pending` entry is appended and the draft cleared before the request goes out;
    /// a failed send leaves that entry `Failed` for [`Inbox::retry_send`] or [`Inbox::discard`].
    ///
    /// # Errors
    /// `SubmitError::Rejected` with `Validation` for blank input or no selection.
    /// `SubmitError::Undelivered` carries the failed entry's id and the send error.
    pub async fn submit(&mut self) -> Result<u64, SubmitError> {
        if self.draft.trim().is_empty() {
            return Err(SubmitError::Rejected(ClientError::Validation("Message content cannot be empty".to_string())));
        }
        let conversation_id = self.selected.ok_or_else(|| {
            SubmitError::Rejected(ClientError::Validation("Select a conversation first".to_string()))
        })?;

        let draft = MessageDraft::text(std::mem::take(&mut self.draft));
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        let optimistic = MessageView {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: self.client.session().user_id,
            content: draft.content.clone(),
            message_type: draft.kind.into(),
            amount: draft.kind.amount(),
            created_at: OffsetDateTime::now_utc(),
            read: false,
        };
        self.entries.push(InboxEntry { local_id, message: optimistic, delivery: Delivery::Pending });

        self.deliver(local_id, conversation_id, &draft)
            .await
            .map_err(|error| SubmitError::Undelivered { local_id, error })?;
        Ok(local_id)
    }

    /// Re-sends a `Failed` entry in place.
    ///
    /// # Errors
    /// `NotFound` if no failed entry has `local_id`, otherwise the send error.
    pub async fn retry_send(&mut self, local_id: u64) -> Result<(), ClientError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.local_id == local_id && e.is_failed())
            .ok_or(ClientError::NotFound)?;

        let kind = MessageKind::from_parts(entry.message.message_type.as_str(), entry.message.amount)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let draft = MessageDraft { content: entry.message.content.clone(), kind };
        let conversation_id = entry.message.conversation_id;
        entry.delivery = Delivery::Pending;

        self.deliver(local_id, conversation_id, &draft).await
    }

    /// Drops a `Failed` entry. Returns whether anything was removed.
    pub fn discard(&mut self, local_id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !(e.local_id == local_id && e.is_failed()));
        let removed = self.entries.len() != before;
        if removed && !self.entries.iter().any(InboxEntry::is_failed) {
            self.send_error = None;
        }
        removed
    }

    async fn deliver(&mut self, local_id: u64, conversation_id: Uuid, draft: &MessageDraft) -> Result<(), ClientError> {
        self.sending = true;
        let result = self.client.send_message(conversation_id, draft).await;
        self.sending = false;

        match result {
            Ok(sent) => {
                if let Some(entry) = self.entries.iter_mut().find(|e| e.local_id == local_id) {
                    entry.message = sent.message;
                    entry.delivery = Delivery::Sent;
                }
                self.conversations.retain(|c| c.id != sent.conversation.id);
                self.conversations.insert(0, sent.conversation);
                self.send_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, %conversation_id, local_id, "Message delivery failed");
                if let Some(entry) = self.entries.iter_mut().find(|e| e.local_id == local_id) {
                    entry.delivery = Delivery::Failed { error: e.to_string() };
                }
                self.send_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn refresh_conversations(&mut self) -> Result<(), ClientError> {
        self.load_conversations().await?;
        if self.selected.is_none()
            && let Some(first) = self.conversations.first().map(|c| c.id)
        {
            self.select(first).await?;
        }
        Ok(())
    }

    async fn load_conversations(&mut self) -> Result<(), ClientError> {
        self.loading_conversations = true;
        let result = self.client.list_conversations().await;
        self.loading_conversations = false;

        match result {
            Ok(conversations) => {
                self.conversations = conversations;
                self.conversations_error = None;
                Ok(())
            }
            Err(e) => {
                self.conversations_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn load_messages(&mut self, conversation_id: Uuid) -> Result<(), ClientError> {
        self.loading_messages = true;
        let result = self.client.get_messages(conversation_id).await;
        self.loading_messages = false;

        match result {
            Ok(messages) => {
                let unsent: Vec<InboxEntry> = std::mem::take(&mut self.entries)
                    .into_iter()
                    .filter(|e| e.delivery != Delivery::Sent && e.message.conversation_id == conversation_id)
                    .collect();
                self.entries = messages
                    .into_iter()
                    .map(|message| {
                        let local_id = self.next_local_id;
                        self.next_local_id += 1;
                        InboxEntry { local_id, message, delivery: Delivery::Sent }
                    })
                    .collect();
                self.entries.extend(unsent);
                self.messages_error = None;
                // Opening a thread marks it read on the server
                if let Some(summary) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
                    summary.unread_count = 0;
                }
                Ok(())
            }
            Err(e) => {
                self.messages_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
