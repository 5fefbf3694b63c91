use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::resolver::Principal,
    error::ApiError,
    images::services::{discard_picture, is_supported_mime, store_picture, UploadItem},
    rentals::{
        dto::{PictureUpload, RentalForm},
        repo_types::{NewRental, Rental, RentalChanges},
    },
    state::AppState,
};

/// Validated text fields shared by create and update.
#[derive(Debug, PartialEq)]
pub struct RentalFields {
    pub name: String,
    pub surface: f64,
    pub price: f64,
    pub description: String,
}

impl TryFrom<RentalForm> for RentalFields {
    type Error = ApiError;

    fn try_from(f: RentalForm) -> Result<Self, Self::Error> {
        let name = required("name", f.name)?;
        let surface = amount("surface", f.surface)?;
        let price = amount("price", f.price)?;
        let description = f.description.map(|d| d.trim().to_string()).unwrap_or_default();
        Ok(Self {
            name,
            surface,
            price,
            description,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{} is required", field))),
    }
}

fn amount(field: &str, value: Option<String>) -> Result<f64, ApiError> {
    let raw = required(field, value)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ApiError::Validation(format!("{} must be a non-negative number", field))),
    }
}

pub async fn list(state: &AppState) -> Result<Vec<Rental>, ApiError> {
    Ok(state.rentals.list_all().await?)
}

pub async fn get(state: &AppState, id: Uuid) -> Result<Rental, ApiError> {
    state
        .rentals
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("Rental"))
}

/// The caller becomes the owner. The picture is uploaded first and removed
/// again if the row cannot be written.
pub async fn create(
    state: &AppState,
    owner: &Principal,
    form: RentalForm,
    picture: Option<PictureUpload>,
) -> Result<Rental, ApiError> {
    let fields = RentalFields::try_from(form)?;
    let picture = picture.ok_or_else(|| ApiError::Validation("picture is required".into()))?;
    if !is_supported_mime(&picture.content_type) {
        return Err(ApiError::Validation("picture must be a jpeg, png, webp or gif image".into()));
    }

    let file = store_picture(
        state,
        UploadItem {
            body: picture.body,
            content_type: &picture.content_type,
        },
    )
    .await?;

    let created = state
        .rentals
        .create(NewRental {
            name: fields.name,
            surface: fields.surface,
            price: fields.price,
            picture: file.clone(),
            description: fields.description,
            owner_id: owner.user.id,
        })
        .await;

    match created {
        Ok(rental) => {
            info!(rental_id = %rental.id, owner_id = %rental.owner_id, "rental created");
            Ok(rental)
        }
        Err(e) => {
            discard_picture(state, &file).await;
            Err(e.into())
        }
    }
}

/// Only the owner may update a rental.
pub async fn update(
    state: &AppState,
    caller: &Principal,
    id: Uuid,
    form: RentalForm,
) -> Result<Rental, ApiError> {
    let fields = RentalFields::try_from(form)?;
    let existing = get(state, id).await?;
    if existing.owner_id != caller.user.id {
        warn!(rental_id = %id, caller_id = %caller.user.id, "update rejected: not the owner");
        return Err(ApiError::Forbidden);
    }

    let updated = state
        .rentals
        .update(
            id,
            RentalChanges {
                name: fields.name,
                surface: fields.surface,
                price: fields.price,
                description: fields.description,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("Rental"))?;
    info!(rental_id = %id, "rental updated");
    Ok(updated)
}
