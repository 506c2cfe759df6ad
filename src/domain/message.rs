use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    /// A payment notice; `amount` is in the smallest currency unit.
    Payment { amount: i64 },
}

impl MessageKind {
    #[must_use]
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Payment { .. } => "payment",
        }
    }

    #[must_use]
    pub const fn amount(self) -> Option<i64> {
        match self {
            Self::Text => None,
            Self::Payment { amount } => Some(amount),
        }
    }

    /// Rebuilds a kind from its stored tag and optional amount.
    ///
    /// # Errors
    /// Returns `DraftError` if the tag is unknown or the amount does not fit the tag.
    pub fn from_parts(tag: &str, amount: Option<i64>) -> Result<Self, DraftError> {
        match (tag, amount) {
            ("text", None) => Ok(Self::Text),
            ("text", Some(_)) => Err(DraftError::UnexpectedAmount),
            ("payment", Some(amount)) if amount > 0 => Ok(Self::Payment { amount }),
            ("payment", _) => Err(DraftError::InvalidAmount),
            (other, _) => Err(DraftError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: OffsetDateTime,
    pub read: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Message content cannot be empty")]
    Empty,
    #[error("Message content exceeds {max} characters")]
    TooLong { max: usize },
    #[error("Payment messages require a positive amount")]
    InvalidAmount,
    #[error("Only payment messages carry an amount")]
    UnexpectedAmount,
    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// A message as composed by the sender, before it has an id or a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub content: String,
    pub kind: MessageKind,
}

impl MessageDraft {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), kind: MessageKind::Text }
    }

    #[must_use]
    pub fn payment(content: impl Into<String>, amount: i64) -> Self {
        Self { content: content.into(), kind: MessageKind::Payment { amount } }
    }

    /// Checks the rules that hold regardless of server configuration.
    ///
    /// # Errors
    /// Returns `DraftError::Empty` for blank content and `DraftError::InvalidAmount`
    /// for a payment without a positive amount.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.content.trim().is_empty() {
            return Err(DraftError::Empty);
        }
        if let MessageKind::Payment { amount } = self.kind
            && amount <= 0
        {
            return Err(DraftError::InvalidAmount);
        }
        Ok(())
    }

    /// # Errors
    /// Everything `validate` rejects, plus content longer than `max_len` characters.
    pub fn validate_with_limit(&self, max_len: usize) -> Result<(), DraftError> {
        self.validate()?;
        if self.content.chars().count() > max_len {
            return Err(DraftError::TooLong { max: max_len });
        }
        Ok(())
    }

    #[must_use]
    pub fn into_message(self, conversation_id: Uuid, sender_id: Uuid, created_at: OffsetDateTime) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            content: self.content,
            kind: self.kind,
            created_at,
            read: false,
        }
    }
}
