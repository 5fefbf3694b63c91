use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Rental {
    pub id: Uuid,
    pub name: String,
    pub surface: f64,
    pub price: f64,
    pub picture: String, // stored file name, see images::services
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub name: String,
    pub surface: f64,
    pub price: f64,
    pub picture: String,
    pub description: String,
    pub owner_id: Uuid,
}

/// Editable fields. Picture and owner are fixed at creation.
#[derive(Debug, Clone)]
pub struct RentalChanges {
    pub name: String,
    pub surface: f64,
    pub price: f64,
    pub description: String,
}
