/// In-memory user store
///
/// Keeps users in a `BTreeMap` keyed by id so listing returns insertion
/// order. Ids start at 1 and are never reused, like a `BIGSERIAL` column.
/// Uniqueness of `username` and `email` is checked under the same write
/// lock as the mutation.

use super::{StoreError, UserStore};
use crate::models::user::{NewUser, User, UserChanges};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl MemoryState {
    /// Returns the first unique field that `username`/`email` would collide on,
    /// ignoring the user with id `except`.
    fn conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<i64>,
    ) -> Option<&'static str> {
        self.users
            .values()
            .filter(|user| Some(user.id) != except)
            .find_map(|user| {
                if username == Some(user.username.as_str()) {
                    Some("username")
                } else if email == Some(user.email.as_str()) {
                    Some("email")
                } else {
                    None
                }
            })
    }
}

/// `UserStore` backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if let Some(field) = state.conflict(
            Some(user.username.as_str()),
            Some(user.email.as_str()),
            None,
        ) {
            return Err(StoreError::Duplicate {
                field: field.to_string(),
            });
        }

        state.last_id += 1;
        let user = User {
            id: state.last_id,
            username: user.username,
            email: user.email,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }

        if let Some(field) = state.conflict(
            changes.username.as_deref(),
            changes.email.as_deref(),
            Some(id),
        ) {
            return Err(StoreError::Duplicate {
                field: field.to_string(),
            });
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        changes.apply_to(user);

        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
