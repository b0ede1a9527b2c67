use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use recircle_db::models::RecyclingRow;
use recircle_db::queries::NewRecycling;
use recircle_db::rewards;
use recircle_types::api::{
    Claims, GuideBonusResponse, MaterialBreakdown, RecordRecyclingResponse, RecyclingActivityResponse,
    RecyclingHistoryResponse, RecyclingRequest, RecyclingStats,
};
use recircle_types::models::Material;

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const HISTORY_LIMIT: u32 = 50;
/// Largest single drop-off accepted, in kg.
pub const MAX_WEIGHT_KG: f64 = 10_000.0;

fn activity(row: RecyclingRow) -> RecyclingActivityResponse {
    RecyclingActivityResponse {
        id: convert::uuid(&row.id, "recycling id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        material: row.material,
        weight: row.weight,
        co2_saved: row.co2_saved,
        coins_earned: row.coins_earned,
        location: row.location,
        notes: row.notes,
    }
}

pub async fn record(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<RecyclingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(material), Some(weight)) = (non_empty(req.material), req.weight.filter(|w| *w > 0.0))
    else {
        return Err(ApiError::bad_request("Material and weight are required"));
    };
    let material = Material::parse(&material.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Invalid material type"))?;
    if !weight.is_finite() || weight > MAX_WEIGHT_KG {
        return Err(ApiError::bad_request("Weight is out of range"));
    }

    let uid = claims.sub.to_string();
    let location = non_empty(req.location);
    let notes = non_empty(req.notes);

    let outcome = blocking(&state, move |db| {
        db.record_recycling(&NewRecycling {
            user_id: &uid,
            material,
            weight,
            location: location.as_deref(),
            notes: notes.as_deref(),
        })
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordRecyclingResponse {
            message: "Recycling activity recorded successfully!".into(),
            user_stats: RecyclingStats {
                eco_coins: outcome.eco_coins,
                total_recycled: outcome.total_recycled,
                co2_saved: outcome.co2_saved,
                community_rank: outcome.community_rank,
                active_streak: outcome.active_streak,
            },
            activity: activity(outcome.activity),
        }),
    ))
}

pub async fn guide_check(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = blocking(&state, move |db| db.claim_guide_bonus(&uid)).await?;

    Ok(Json(GuideBonusResponse {
        role: rewards::role_for(user.eco_coins).to_string(),
        eco_coins: user.eco_coins,
        guide_bonus_claimed: user.guide_bonus_claimed,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (rows, totals) = blocking(&state, move |db| {
        Ok((
            db.get_recycling_activities(&uid, HISTORY_LIMIT)?,
            db.get_recycling_breakdown(&uid)?,
        ))
    })
    .await?;

    Ok(Json(RecyclingHistoryResponse {
        activities: rows.into_iter().map(activity).collect(),
        breakdown: totals
            .into_iter()
            .map(|t| MaterialBreakdown {
                material: t.material,
                total_weight: t.total_weight,
                count: t.count,
            })
            .collect(),
    }))
}
