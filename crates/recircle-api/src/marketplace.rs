use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use recircle_db::models::{ItemViewRow, MarketplaceActivityRow};
use recircle_types::api::{
    ActivitySummary, Claims, CoinBalance, ItemViewHistoryResponse, ItemViewRequest,
    ItemViewResponse, MarketplaceActivityRequest, MarketplaceActivityResponse,
    MarketplaceHistoryResponse, RecordItemViewResponse, RecordMarketplaceActivityResponse,
    ViewSummary,
};
use recircle_types::models::MarketplaceActivityKind;

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const HISTORY_LIMIT: u32 = 50;
const DEFAULT_CATEGORY: &str = "general";

fn activity(row: MarketplaceActivityRow) -> MarketplaceActivityResponse {
    MarketplaceActivityResponse {
        id: convert::uuid(&row.id, "marketplace activity id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        item_id: row.item_id,
        item_name: row.item_name,
        item_price: row.item_price,
        activity_type: row.activity_type,
        coins_spent: row.coins_spent,
    }
}

fn view(row: ItemViewRow) -> ItemViewResponse {
    ItemViewResponse {
        id: convert::uuid(&row.id, "item view id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        item_id: row.item_id,
        item_name: row.item_name,
        item_category: row.item_category,
        view_duration: row.view_duration,
    }
}

pub async fn record_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<MarketplaceActivityRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(item_id), Some(item_name), Some(kind)) = (
        non_empty(req.item_id),
        non_empty(req.item_name),
        non_empty(req.activity_type),
    ) else {
        return Err(ApiError::bad_request(
            "Item ID, name, and activity type are required",
        ));
    };
    let kind = MarketplaceActivityKind::parse(&kind)
        .ok_or_else(|| ApiError::bad_request("Invalid activity type"))?;

    let coins_spent = req.coins_spent.unwrap_or(0);
    if kind == MarketplaceActivityKind::Purchase && coins_spent <= 0 {
        return Err(ApiError::bad_request("Coins spent is required for purchases"));
    }
    // Only purchases move coins.
    let coins_spent = if kind == MarketplaceActivityKind::Purchase { coins_spent } else { 0 };
    let item_price = req.item_price.unwrap_or(0);

    let uid = claims.sub.to_string();
    let (row, balance) = blocking(&state, move |db| {
        db.record_marketplace_activity(&uid, &item_id, &item_name, item_price, kind, coins_spent)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordMarketplaceActivityResponse {
            message: "Marketplace activity recorded successfully!".into(),
            activity: activity(row),
            user_stats: balance.map(|eco_coins| CoinBalance { eco_coins }),
        }),
    ))
}

pub async fn activity_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (rows, totals) = blocking(&state, move |db| {
        Ok((
            db.get_marketplace_activities(&uid, HISTORY_LIMIT)?,
            db.get_marketplace_summary(&uid)?,
        ))
    })
    .await?;

    Ok(Json(MarketplaceHistoryResponse {
        activities: rows.into_iter().map(activity).collect(),
        summary: totals
            .into_iter()
            .map(|t| ActivitySummary {
                activity_type: t.activity_type,
                count: t.count,
                total_coins_spent: t.coins_spent,
            })
            .collect(),
    }))
}

pub async fn record_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<ItemViewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(item_id), Some(item_name)) = (non_empty(req.item_id), non_empty(req.item_name)) else {
        return Err(ApiError::bad_request("Item ID and name are required"));
    };
    let category = non_empty(req.item_category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let duration = req.view_duration.unwrap_or(0).max(0);

    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        db.record_item_view(&uid, &item_id, &item_name, &category, duration)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordItemViewResponse {
            message: "Item view recorded successfully!".into(),
            view: view(row),
        }),
    ))
}

pub async fn view_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (rows, totals) = blocking(&state, move |db| {
        Ok((db.get_item_views(&uid, HISTORY_LIMIT)?, db.get_view_summary(&uid)?))
    })
    .await?;

    Ok(Json(ItemViewHistoryResponse {
        views: rows.into_iter().map(view).collect(),
        summary: totals
            .into_iter()
            .map(|t| ViewSummary {
                category: t.category,
                count: t.count,
                total_view_duration: t.view_duration,
            })
            .collect(),
    }))
}
