use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::messages::repo::Message;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub rental_id: Uuid,
    /// Optional; when sent it must be the caller's own id.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub rental_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageRecord {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageItem {
    pub id: Uuid,
    pub rental_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Message> for MessageItem {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            rental_id: m.rental_id,
            user_id: m.user_id,
            message: m.message,
            created_at: m.created_at,
        }
    }
}
