use axum::{Extension, Json, extract::State, response::IntoResponse};

use recircle_types::api::{Claims, CoinTransactionResponse, LedgerResponse};

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const HISTORY_LIMIT: u32 = 50;

/// Current balance plus the most recent coin movements, newest first.
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (user, rows) = blocking(&state, move |db| {
        Ok((db.get_user_by_id(&uid)?, db.get_coin_transactions(&uid, HISTORY_LIMIT)?))
    })
    .await?;
    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(LedgerResponse {
        eco_coins: user.eco_coins,
        transactions: rows
            .into_iter()
            .map(|t| CoinTransactionResponse {
                id: convert::uuid(&t.id, "coin transaction id"),
                created_at: convert::timestamp(&t.created_at, &t.id),
                amount: t.amount,
                reason: t.reason,
            })
            .collect(),
    }))
}
