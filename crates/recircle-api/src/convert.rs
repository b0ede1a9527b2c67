//! Row to response conversions shared by several handlers. Corrupt ids and
//! timestamps are logged and defaulted rather than failing the request.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use recircle_db::models::{PledgeRow, TradeItemRow, UserRow};
use recircle_db::{parse_timestamp, rewards};
use recircle_types::api::{PledgeResponse, TradeItemResponse, UserResponse};

pub fn uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on '{}'", raw, owner);
        DateTime::default()
    })
}

/// Trimmed, non-blank string or `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn user(row: UserRow) -> UserResponse {
    UserResponse {
        id: uuid(&row.id, "user id"),
        created_at: timestamp(&row.created_at, &row.id),
        role: rewards::role_for(row.eco_coins).to_string(),
        display_name: row.display_name,
        email: row.email,
        city: row.city,
        state: row.state,
        eco_coins: row.eco_coins,
        community_rank: row.community_rank,
        total_recycled: row.total_recycled,
        co2_saved: row.co2_saved,
        active_streak: row.active_streak,
        points: row.points,
        is_new_user: row.is_new_user,
        guide_bonus_claimed: row.guide_bonus_claimed,
    }
}

pub fn trade_item(row: TradeItemRow) -> TradeItemResponse {
    TradeItemResponse {
        id: uuid(&row.id, "item id"),
        seller_id: uuid(&row.seller_id, "seller id"),
        created_at: timestamp(&row.created_at, &row.id),
        title: row.title,
        description: row.description,
        price: row.price,
        seller_name: row.seller_name,
        status: row.status,
    }
}

pub fn pledge(row: PledgeRow) -> PledgeResponse {
    PledgeResponse {
        id: uuid(&row.id, "pledge id"),
        project_id: uuid(&row.project_id, "project id"),
        created_at: timestamp(&row.created_at, &row.id),
        project_title: row.project_title,
        pledge_amount: row.pledge_amount,
        pledge_type: row.pledge_type,
        message: row.message,
        status: row.status,
    }
}
