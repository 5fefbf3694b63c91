use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::StoreError,
    rentals::repo_types::{NewRental, Rental, RentalChanges},
};

#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Rental>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rental>, StoreError>;
    async fn create(&self, rental: NewRental) -> Result<Rental, StoreError>;
    /// `Ok(None)` if the rental does not exist.
    async fn update(&self, id: Uuid, changes: RentalChanges) -> Result<Option<Rental>, StoreError>;
}

#[derive(Clone)]
pub struct PgRentalStore {
    db: PgPool,
}

impl PgRentalStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RentalStore for PgRentalStore {
    async fn list_all(&self) -> Result<Vec<Rental>, StoreError> {
        let rows = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, name, surface, price, picture, description, owner_id, created_at, updated_at
            FROM rentals
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list rentals")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rental>, StoreError> {
        let row = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, name, surface, price, picture, description, owner_id, created_at, updated_at
            FROM rentals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select rental")?;
        Ok(row)
    }

    async fn create(&self, rental: NewRental) -> Result<Rental, StoreError> {
        let row = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (id, name, surface, price, picture, description, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, surface, price, picture, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&rental.name)
        .bind(rental.surface)
        .bind(rental.price)
        .bind(&rental.picture)
        .bind(&rental.description)
        .bind(rental.owner_id)
        .fetch_one(&self.db)
        .await
        .context("insert rental")?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: RentalChanges) -> Result<Option<Rental>, StoreError> {
        let row = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
               SET name = $2, surface = $3, price = $4, description = $5, updated_at = now()
             WHERE id = $1
            RETURNING id, name, surface, price, picture, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.surface)
        .bind(changes.price)
        .bind(&changes.description)
        .fetch_optional(&self.db)
        .await
        .context("update rental")?;
        Ok(row)
    }
}
