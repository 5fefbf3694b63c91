use tracing::{info, warn};

use crate::{
    auth::resolver::Principal,
    error::ApiError,
    messages::{
        dto::SendMessageRequest,
        repo::{Message, NewMessage},
    },
    state::AppState,
};

pub const MAX_MESSAGE_LEN: usize = 2000;

/// Author is always the caller.
pub async fn send(
    state: &AppState,
    caller: &Principal,
    req: SendMessageRequest,
) -> Result<Message, ApiError> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("message is required".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    if let Some(claimed) = req.user_id {
        if claimed != caller.user.id {
            warn!(caller_id = %caller.user.id, %claimed, "message rejected: user_id is not the caller");
            return Err(ApiError::Forbidden);
        }
    }

    if state.rentals.find_by_id(req.rental_id).await?.is_none() {
        return Err(ApiError::NotFound("Rental"));
    }

    let msg = state
        .messages
        .create(NewMessage {
            rental_id: req.rental_id,
            user_id: caller.user.id,
            message: text.to_string(),
        })
        .await?;
    info!(message_id = %msg.id, rental_id = %msg.rental_id, "message sent");
    Ok(msg)
}

/// The rental owner sees every message on the rental; anyone else only
/// the ones they wrote.
pub async fn list_for_rental(
    state: &AppState,
    caller: &Principal,
    rental_id: uuid::Uuid,
) -> Result<Vec<Message>, ApiError> {
    let rental = state
        .rentals
        .find_by_id(rental_id)
        .await?
        .ok_or(ApiError::NotFound("Rental"))?;

    let all = state.messages.list_by_rental(rental_id).await?;
    if rental.owner_id == caller.user.id {
        return Ok(all);
    }
    Ok(all
        .into_iter()
        .filter(|m| m.user_id == caller.user.id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo_types::NewUser, rentals::repo_types::NewRental};
    use uuid::Uuid;

    async fn user(state: &AppState, email: &str) -> Principal {
        state
            .users
            .create(NewUser {
                email: email.into(),
                name: email.into(),
                password_hash: "unused".into(),
            })
            .await
            .unwrap()
            .into()
    }

    async fn rental_of(state: &AppState, owner: &Principal) -> Uuid {
        state
            .rentals
            .create(NewRental {
                name: "Loft".into(),
                surface: 30.0,
                price: 800.0,
                picture: "x.png".into(),
                description: String::new(),
                owner_id: owner.user.id,
            })
            .await
            .unwrap()
            .id
    }

    fn req(rental_id: Uuid, text: &str, user_id: Option<Uuid>) -> SendMessageRequest {
        SendMessageRequest {
            message: text.into(),
            rental_id,
            user_id,
        }
    }

    #[tokio::test]
    async fn author_is_the_caller() {
        let state = AppState::fake();
        let owner = user(&state, "owner@x.com").await;
        let guest = user(&state, "guest@x.com").await;
        let rental_id = rental_of(&state, &owner).await;

        let msg = send(&state, &guest, req(rental_id, " Is it free in May? ", None))
            .await
            .unwrap();
        assert_eq!(msg.user_id, guest.user.id);
        assert_eq!(msg.message, "Is it free in May?");
    }

    #[tokio::test]
    async fn spoofed_user_id_is_forbidden() {
        let state = AppState::fake();
        let owner = user(&state, "owner@x.com").await;
        let guest = user(&state, "guest@x.com").await;
        let rental_id = rental_of(&state, &owner).await;

        let err = send(&state, &guest, req(rental_id, "hi", Some(owner.user.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        send(&state, &guest, req(rental_id, "hi", Some(guest.user.id)))
            .await
            .expect("own id is fine");
    }

    #[tokio::test]
    async fn unknown_rental_and_bad_text() {
        let state = AppState::fake();
        let guest = user(&state, "guest@x.com").await;

        let err = send(&state, &guest, req(Uuid::new_v4(), "hi", None)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let owner = user(&state, "owner@x.com").await;
        let rental_id = rental_of(&state, &owner).await;
        for text in ["   ".to_string(), "x".repeat(MAX_MESSAGE_LEN + 1)] {
            let err = send(&state, &guest, req(rental_id, &text, None)).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn owner_sees_all_guests_see_their_own() {
        let state = AppState::fake();
        let owner = user(&state, "owner@x.com").await;
        let a = user(&state, "a@x.com").await;
        let b = user(&state, "b@x.com").await;
        let rental_id = rental_of(&state, &owner).await;

        send(&state, &a, req(rental_id, "from a", None)).await.unwrap();
        send(&state, &b, req(rental_id, "from b", None)).await.unwrap();

        assert_eq!(list_for_rental(&state, &owner, rental_id).await.unwrap().len(), 2);
        let seen_by_a = list_for_rental(&state, &a, rental_id).await.unwrap();
        assert_eq!(seen_by_a.len(), 1);
        assert_eq!(seen_by_a[0].message, "from a");
    }
}
