//! Typed client for the messaging API, plus the headless inbox state a UI renders from.

pub mod error;
pub mod http;
pub mod inbox;
pub mod session;

pub use error::{ClientError, SubmitError};
pub use http::{AuthClient, ClientConfig, MessagingClient};
pub use inbox::{Delivery, Inbox, InboxEntry, filter_conversations};
pub use session::Session;
