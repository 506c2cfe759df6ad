use crate::api::schemas::auth::SessionResponse;
use uuid::Uuid;

/// A bearer credential and the identity it was issued to.
///
/// Owned by whoever constructs the client; nothing reads it from ambient storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    /// Unix seconds
    pub expires_at: u64,
}

impl Session {
    #[must_use]
    pub const fn new(token: String, user_id: Uuid, expires_at: u64) -> Self {
        Self { token, user_id, expires_at }
    }

    #[must_use]
    pub const fn is_expired_at(&self, unix_secs: u64) -> bool {
        self.expires_at <= unix_secs
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self { token: response.token, user_id: response.user_id, expires_at: response.expires_at }
    }
}
