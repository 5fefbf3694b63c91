use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub rental_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, msg: NewMessage) -> Result<Message, StoreError>;
    async fn list_by_rental(&self, rental_id: Uuid) -> Result<Vec<Message>, StoreError>;
}

#[derive(Clone)]
pub struct PgMessageStore {
    db: PgPool,
}

impl PgMessageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, msg: NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, rental_id, user_id, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, rental_id, user_id, message, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(msg.rental_id)
        .bind(msg.user_id)
        .bind(&msg.message)
        .fetch_one(&self.db)
        .await
        .context("insert message")?;
        Ok(row)
    }

    async fn list_by_rental(&self, rental_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, rental_id, user_id, message, created_at, updated_at
              FROM messages
             WHERE rental_id = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(rental_id)
        .fetch_all(&self.db)
        .await
        .context("list messages by rental")?;
        Ok(rows)
    }
}
