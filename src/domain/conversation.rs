use crate::domain::message::Message;
use crate::domain::user::{Role, User};
use crate::error::AppError;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub traveler_id: Uuid,
    pub host_id: Uuid,
    pub last_message: Option<String>,
    pub last_message_at: Option<OffsetDateTime>,
    pub traveler_unread: i32,
    pub host_unread: i32,
    pub created_at: OffsetDateTime,
}

impl Conversation {
    #[must_use]
    pub fn new(pair: Participants, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            traveler_id: pair.traveler_id,
            host_id: pair.host_id,
            last_message: None,
            last_message_at: None,
            traveler_unread: 0,
            host_unread: 0,
            created_at,
        }
    }

    #[must_use]
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.traveler_id == user_id || self.host_id == user_id
    }

    #[must_use]
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.traveler_id {
            Some(self.host_id)
        } else if user_id == self.host_id {
            Some(self.traveler_id)
        } else {
            None
        }
    }

    #[must_use]
    pub fn unread_for(&self, user_id: Uuid) -> i32 {
        if user_id == self.traveler_id {
            self.traveler_unread
        } else if user_id == self.host_id {
            self.host_unread
        } else {
            0
        }
    }

    /// Sort key for the inbox: newest activity first.
    #[must_use]
    pub fn last_activity(&self) -> OffsetDateTime {
        self.last_message_at.unwrap_or(self.created_at)
    }

    /// Folds a newly stored message into the denormalized summary fields.
    ///
    /// The preview only moves forward in time, so a slower concurrent writer
    /// cannot replace a newer preview with an older one.
    pub fn record_message(&mut self, message: &Message) {
        let is_newer = self.last_message_at.is_none_or(|at| at <= message.created_at);
        if is_newer {
            self.last_message = Some(message.content.clone());
            self.last_message_at = Some(message.created_at);
        }
        if message.sender_id == self.traveler_id {
            self.host_unread += 1;
        } else {
            self.traveler_unread += 1;
        }
    }

    pub fn clear_unread(&mut self, reader_id: Uuid) {
        if reader_id == self.traveler_id {
            self.traveler_unread = 0;
        } else if reader_id == self.host_id {
            self.host_unread = 0;
        }
    }
}

/// The traveler/host pair behind a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Participants {
    pub traveler_id: Uuid,
    pub host_id: Uuid,
}

impl Participants {
    /// Orders two users into a traveler/host pair.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` when both users are the same person or share a role.
    pub fn pair(a: &User, b: &User) -> Result<Self, AppError> {
        if a.id == b.id {
            return Err(AppError::BadRequest("Cannot start a conversation with yourself".into()));
        }
        match (a.role, b.role) {
            (Role::Traveler, Role::Host) => Ok(Self { traveler_id: a.id, host_id: b.id }),
            (Role::Host, Role::Traveler) => Ok(Self { traveler_id: b.id, host_id: a.id }),
            _ => Err(AppError::BadRequest("Conversations must pair a traveler with a host".into())),
        }
    }
}

/// A conversation as one participant sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub traveler_id: Uuid,
    pub host_id: Uuid,
    pub counterpart_id: Uuid,
    pub counterpart_name: String,
    pub counterpart_avatar: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<OffsetDateTime>,
    pub unread_count: i32,
}

impl ConversationSummary {
    /// Projects `conversation` for `viewer`. A counterpart whose account is gone is shown by id only.
    #[must_use]
    pub fn for_viewer(conversation: &Conversation, viewer: Uuid, counterpart: Option<&User>) -> Self {
        let counterpart_id = conversation.counterpart_of(viewer).unwrap_or(conversation.host_id);
        Self {
            id: conversation.id,
            traveler_id: conversation.traveler_id,
            host_id: conversation.host_id,
            counterpart_id,
            counterpart_name: counterpart.map_or_else(|| "Unknown user".to_string(), |u| u.display_name.clone()),
            counterpart_avatar: counterpart.and_then(|u| u.avatar_url.clone()),
            last_message: conversation.last_message.clone(),
            last_message_at: conversation.last_message_at,
            unread_count: conversation.unread_for(viewer),
        }
    }
}
