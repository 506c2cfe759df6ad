use crate::config::DatabaseConfig;
use crate::domain::conversation::{Conversation, Participants};
use crate::domain::message::Message;
use crate::domain::user::{NewUser, User};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod conversation_repo;
pub mod memory;
pub mod records;
pub mod user_repo;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(config: &DatabaseConfig, url: &str) -> std::result::Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(url)
        .await
}

/// Applies the embedded schema migrations.
///
/// # Errors
/// Returns `sqlx::migrate::MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns `AppError::Conflict` if the username is taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Loads every user in `ids` that exists; missing ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync + std::fmt::Debug {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// Returns the conversation for `pair`, creating it if needed. The flag is `true` when it was created.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if either participant does not exist.
    async fn get_or_create(&self, pair: Participants) -> Result<(Conversation, bool)>;

    /// Conversations `user_id` takes part in, newest activity first.
    async fn list_for_participant(&self, user_id: Uuid) -> Result<Vec<Conversation>>;

    /// Persists `message` and folds it into its conversation's summary fields.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the conversation does not exist.
    async fn append_message(&self, message: &Message) -> Result<Conversation>;

    /// Messages of one conversation ordered by `(created_at, id)`.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    /// Marks the counterpart's messages read for `reader_id` and clears their unread counter.
    /// Returns how many messages flipped to read.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64>;
}

/// The pair of stores a running server talks to.
#[derive(Clone, Debug)]
pub struct Storage {
    pub users: Arc<dyn UserStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Storage {
    #[must_use]
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            users: Arc::new(user_repo::PgUserRepository::new(pool.clone())),
            conversations: Arc::new(conversation_repo::PgConversationRepository::new(pool)),
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self { users: Arc::clone(&store) as Arc<dyn UserStore>, conversations: store }
    }
}
