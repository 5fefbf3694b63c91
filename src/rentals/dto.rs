use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{images::services::picture_url, rentals::repo_types::Rental};

#[derive(Debug, Serialize)]
pub struct RentalResponse {
    pub id: Uuid,
    pub name: String,
    pub surface: f64,
    pub price: f64,
    pub picture: String,
    pub description: String,
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Rental> for RentalResponse {
    fn from(r: Rental) -> Self {
        Self {
            id: r.id,
            picture: picture_url(&r.picture),
            name: r.name,
            surface: r.surface,
            price: r.price,
            description: r.description,
            owner_id: r.owner_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RentalsResponse {
    pub rentals: Vec<RentalResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Text fields of the create/update multipart forms, as sent.
#[derive(Debug, Default)]
pub struct RentalForm {
    pub name: Option<String>,
    pub surface: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

/// A picture part of the create form.
#[derive(Debug)]
pub struct PictureUpload {
    pub body: bytes::Bytes,
    pub content_type: String,
}
