use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    images::services::load_picture,
    rentals::{
        dto::{MessageResponse, PictureUpload, RentalForm, RentalResponse, RentalsResponse},
        services,
    },
    state::AppState,
};

const RENTAL_CREATED: &str = "Rental created !";
const RENTAL_UPDATED: &str = "Rental updated !";

pub fn routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/rentals", get(list_rentals).post(create_rental))
        .route("/rentals/:id", get(get_rental).put(update_rental))
        .route("/rentals/image/:file", get(get_image))
        .layer(DefaultBodyLimit::max(upload_limit))
}

#[instrument(skip(state, _caller))]
pub async fn list_rentals(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<RentalsResponse>, ApiError> {
    let rentals = services::list(&state).await?;
    Ok(Json(RentalsResponse {
        rentals: rentals.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, _caller))]
pub async fn get_rental(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RentalResponse>, ApiError> {
    Ok(Json(services::get(&state, id).await?.into()))
}

/// POST /rentals (multipart): name, surface, price, description, picture
#[instrument(skip(state, caller, mp), fields(owner_id = %caller.user.id))]
pub async fn create_rental(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    mp: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let (form, picture) = read_form(mp, true).await?;
    services::create(&state, &caller, form, picture).await?;
    Ok(Json(MessageResponse {
        message: RENTAL_CREATED,
    }))
}

/// PUT /rentals/:id (multipart): name, surface, price, description
#[instrument(skip(state, caller, mp), fields(caller_id = %caller.user.id))]
pub async fn update_rental(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let (form, _) = read_form(mp, false).await?;
    services::update(&state, &caller, id, form).await?;
    Ok(Json(MessageResponse {
        message: RENTAL_UPDATED,
    }))
}

#[instrument(skip(state, _caller))]
pub async fn get_image(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let Some(obj) = load_picture(&state, &file).await? else {
        return Err(ApiError::NotFound("Picture"));
    };
    let content_type = obj
        .content_type
        .unwrap_or_else(|| "application/octet-stream".into());
    Ok(([(header::CONTENT_TYPE, content_type)], obj.body).into_response())
}

/// Collects the known text fields and, when `with_picture`, the `picture` file.
/// Unknown parts are skipped.
async fn read_form(
    mut mp: Multipart,
    with_picture: bool,
) -> Result<(RentalForm, Option<PictureUpload>), ApiError> {
    let mut form = RentalForm::default();
    let mut picture = None;

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "picture" if with_picture => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await.map_err(bad_multipart)?;
                if !body.is_empty() {
                    picture = Some(PictureUpload { body, content_type });
                }
            }
            "name" => form.name = Some(field.text().await.map_err(bad_multipart)?),
            "surface" => form.surface = Some(field.text().await.map_err(bad_multipart)?),
            "price" => form.price = Some(field.text().await.map_err(bad_multipart)?),
            "description" => form.description = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }
    Ok((form, picture))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    warn!(error = %e, "unreadable multipart body");
    ApiError::Validation("Invalid multipart body".into())
}
