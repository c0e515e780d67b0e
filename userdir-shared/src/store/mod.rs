/// Datastore adapter for users
///
/// The rest of the system never touches SQL directly: handlers hold an
/// `Arc<dyn UserStore>` built once at startup. Two backends exist:
///
/// - [`PgUserStore`]: PostgreSQL through the `sqlx` pool
/// - [`MemoryUserStore`]: in-process map with identical semantics
///
/// # Errors
///
/// Uniqueness violations surface as [`StoreError::Duplicate`] naming the
/// offending field, unknown ids as [`StoreError::NotFound`], and an
/// unreachable or exhausted backend as [`StoreError::Unavailable`].
///
/// # Example
///
/// ```
/// use userdir_shared::models::user::NewUser;
/// use userdir_shared::store::{MemoryUserStore, UserStore};
///
/// # async fn example() -> Result<(), userdir_shared::store::StoreError> {
/// let store = MemoryUserStore::new();
/// let user = store
///     .create(NewUser {
///         username: "alice".to_string(),
///         email: "alice@example.com".to_string(),
///     })
///     .await?;
/// assert_eq!(store.get(user.id).await?, user);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use crate::models::user::{NewUser, User, UserChanges};
use async_trait::async_trait;
use thiserror::Error;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Datastore errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No user with this id
    #[error("User {0} not found")]
    NotFound(i64),

    /// A unique field already holds this value
    #[error("A user with this {field} already exists")]
    Duplicate { field: String },

    /// The backend could not be reached in time
    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                let field = match db_err.constraint() {
                    Some(constraint) if constraint.contains("username") => "username",
                    Some(constraint) if constraint.contains("email") => "email",
                    _ => "value",
                };
                StoreError::Duplicate {
                    field: field.to_string(),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Persistence contract for `User` records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stores a new user and returns it with its assigned id
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Fetches one user
    async fn get(&self, id: i64) -> Result<User, StoreError>;

    /// Lists all users in insertion order
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Applies a partial update and returns the stored result
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError>;

    /// Hard-deletes a user
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Checks that the backend answers
    async fn ping(&self) -> Result<(), StoreError>;
}
