use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use recircle_db::models::{ChatMessageRow, ContactRow, MembershipRow, UserRow};
use recircle_db::parse_timestamp;
use recircle_types::api::{
    ChatHistoryResponse, ChatMessageResponse, Claims, ContactListResponse, ContactResponse,
    MessageResponse, SendChatRequest, SendChatResponse,
};
use recircle_types::models::membership_tier;

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

fn message(row: ChatMessageRow) -> ChatMessageResponse {
    ChatMessageResponse {
        id: convert::uuid(&row.id, "chat message id"),
        from_user_id: convert::uuid(&row.from_user_id, "sender id"),
        to_user_id: convert::uuid(&row.to_user_id, "recipient id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        body: row.body,
    }
}

fn contact(row: ContactRow) -> ContactResponse {
    ContactResponse {
        id: convert::uuid(&row.id, "user id"),
        name: row.display_name,
        community: row.community,
    }
}

fn is_premium(membership: Option<&MembershipRow>, now: DateTime<Utc>) -> bool {
    let Some(m) = membership else {
        return false;
    };
    if !m.active || m.tier != membership_tier::PREMIUM {
        return false;
    }
    match m.renews_at.as_deref().and_then(parse_timestamp) {
        Some(renews_at) => renews_at > now,
        None => true,
    }
}

/// Free members may only message people in their own community.
fn may_message(sender: &UserRow, recipient: &UserRow, membership: Option<&MembershipRow>, now: DateTime<Utc>) -> bool {
    if is_premium(membership, now) {
        return true;
    }
    match (&sender.community_id, &recipient.community_id) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub async fn send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<SendChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(to_user_id), Some(text)) = (non_empty(req.to_user_id), non_empty(req.text)) else {
        return Err(ApiError::bad_request("toUserId and text required"));
    };
    let to_user_id: Uuid = to_user_id
        .parse()
        .map_err(|_| ApiError::not_found("User not found"))?;

    let from = claims.sub.to_string();
    let to = to_user_id.to_string();
    let (sender, recipient, membership) = blocking(&state, move |db| {
        Ok((db.get_user_by_id(&from)?, db.get_user_by_id(&to)?, db.get_membership(&from)?))
    })
    .await?;
    let (Some(sender), Some(recipient)) = (sender, recipient) else {
        return Err(ApiError::not_found("User not found"));
    };

    if !may_message(&sender, &recipient, membership.as_ref(), Utc::now()) {
        return Err(ApiError::Forbidden(
            "Upgrade to premium to chat outside your community".into(),
        ));
    }

    let row = blocking(&state, move |db| db.insert_chat_message(&sender.id, &recipient.id, &text)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SendChatResponse {
            message: "Sent".into(),
            msg: message(row),
        }),
    ))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.get_chat_history(&me, &other_user_id)).await?;
    Ok(Json(ChatHistoryResponse {
        messages: rows.into_iter().map(message).collect(),
    }))
}

/// Members of the caller's own community.
pub async fn community_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let rows = blocking(&state, move |db| {
        if db.get_user_by_id(&me)?.is_none() {
            return Ok(None);
        }
        db.community_contacts(&me).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ContactListResponse {
        contacts: rows.into_iter().map(contact).collect(),
    }))
}

/// Everyone else on the platform. Premium only.
pub async fn global_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let membership = {
        let me = me.clone();
        blocking(&state, move |db| db.get_membership(&me)).await?
    };
    if !is_premium(membership.as_ref(), Utc::now()) {
        return Err(ApiError::Forbidden("Premium membership required".into()));
    }

    let rows = blocking(&state, move |db| db.all_contacts(&me)).await?;
    Ok(Json(ContactListResponse {
        contacts: rows.into_iter().map(contact).collect(),
    }))
}

/// Only the sender may delete a message.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup_id = message_id.clone();
    let row = blocking(&state, move |db| db.get_chat_message(&lookup_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    if row.from_user_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Not allowed".into()));
    }

    blocking(&state, move |db| db.delete_chat_message(&message_id)).await?;
    info!("Chat message {} deleted by its sender", row.id);
    Ok(Json(MessageResponse::new("Message deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(community: Option<&str>) -> UserRow {
        UserRow {
            id: Uuid::new_v4().to_string(),
            display_name: "u".into(),
            email: "u@x.io".into(),
            password: "h".into(),
            city: "Bengaluru".into(),
            state: "KA".into(),
            eco_coins: 0,
            total_recycled: 0.0,
            co2_saved: 0.0,
            community_rank: 0,
            active_streak: 0,
            last_recycled_on: None,
            points: 0,
            is_new_user: true,
            location_lat: None,
            location_lng: None,
            community_id: community.map(String::from),
            guide_bonus_claimed: false,
            created_at: "2024-10-01 10:00:00".into(),
        }
    }

    fn premium(renews_at: &str) -> MembershipRow {
        MembershipRow {
            user_id: "x".into(),
            tier: "premium".into(),
            active: true,
            renews_at: Some(renews_at.into()),
        }
    }

    #[test]
    fn free_members_stay_inside_their_community() {
        let now = Utc::now();
        let a = user(Some("c1"));
        assert!(may_message(&a, &user(Some("c1")), None, now));
        assert!(!may_message(&a, &user(Some("c2")), None, now));
        assert!(!may_message(&user(None), &user(None), None, now));
    }

    #[test]
    fn premium_lapses_at_renewal() {
        let now = parse_timestamp("2024-10-15 00:00:00").unwrap();
        let a = user(Some("c1"));
        let b = user(Some("c2"));
        assert!(may_message(&a, &b, Some(&premium("2024-11-01 00:00:00")), now));
        assert!(!may_message(&a, &b, Some(&premium("2024-10-01 00:00:00")), now));

        let mut inactive = premium("2024-11-01 00:00:00");
        inactive.active = false;
        assert!(!may_message(&a, &b, Some(&inactive), now));
    }
}
