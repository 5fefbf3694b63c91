use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    messages::{
        dto::{ListMessagesQuery, MessageItem, MessageRecord, SendMessageRequest},
        services,
    },
    state::AppState,
};

const MESSAGE_SENT: &str = "Message sent with success";

pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", post(send_message).get(list_messages))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<MessageRecord>, ApiError> {
    services::send(&state, &caller, payload).await?;
    Ok(Json(MessageRecord {
        message: MESSAGE_SENT,
    }))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(q): Query<ListMessagesQuery>,
) -> Result<Json<Vec<MessageItem>>, ApiError> {
    let messages = services::list_for_rental(&state, &caller, q.rental_id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
