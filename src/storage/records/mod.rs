pub mod conversation;
pub mod message;
pub mod user;

pub(crate) use conversation::ConversationRecord;
pub(crate) use message::MessageRecord;
pub(crate) use user::UserRecord;
