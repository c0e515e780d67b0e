/// PostgreSQL-backed user store

use super::{StoreError, UserStore};
use crate::db::pool::health_check;
use crate::models::user::{NewUser, User, UserChanges};
use async_trait::async_trait;
use sqlx::PgPool;

/// `UserStore` over a sqlx connection pool
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = User::create(&self.pool, user).await?;
        tracing::debug!(user_id = user.id, "Inserted user");
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        User::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(User::list(&self.pool).await?)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        User::update(&self.pool, id, changes)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if User::delete(&self.pool, id).await? {
            tracing::debug!(user_id = id, "Deleted user");
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }
}
