use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use recircle_types::api::{
    AddItemRequest, Claims, FinalizeTradeRequest, FinalizeTradeResponse, ItemActionResponse,
    ItemListResponse, SellerInfo, TradeParty, WishlistToggleResponse,
};

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(title), Some(description), Some(price)) = (
        non_empty(req.title),
        non_empty(req.description),
        req.price.filter(|p| *p > 0),
    ) else {
        return Err(ApiError::bad_request(
            "title, description, and valid price required",
        ));
    };

    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| db.create_trade_item(&uid, &title, &description, price)).await?;
    info!("Item {} listed by {}", row.id, row.seller_id);

    Ok((
        StatusCode::CREATED,
        Json(ItemActionResponse {
            message: "Item listed successfully".into(),
            item: convert::trade_item(row),
        }),
    ))
}

pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.list_trade_items()).await?;
    Ok(Json(ItemListResponse {
        items: rows.into_iter().map(convert::trade_item).collect(),
    }))
}

pub async fn seller_info(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(&state, move |db| db.get_user_by_id(&seller_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Seller not found"))?;

    Ok(Json(SellerInfo {
        id: convert::uuid(&user.id, "user id"),
        display_name: user.display_name,
        email: user.email,
        city: user.city,
        state: user.state,
    }))
}

pub async fn buy_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| db.buy_trade_item(&item_id, &uid)).await?;

    Ok(Json(ItemActionResponse {
        message: "Item purchased".into(),
        item: convert::trade_item(row),
    }))
}

pub async fn toggle_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let wishlisted = blocking(&state, move |db| db.toggle_wishlist(&uid, &item_id)).await?;
    Ok(Json(WishlistToggleResponse { wishlisted }))
}

pub async fn wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = blocking(&state, move |db| db.get_wishlist(&uid)).await?;
    Ok(Json(ItemListResponse {
        items: rows.into_iter().map(convert::trade_item).collect(),
    }))
}

pub async fn finalize(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<FinalizeTradeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(buyer), Some(seller)) = (req.buyer_id, req.seller_id) else {
        return Err(ApiError::bad_request("Invalid input"));
    };
    if buyer == seller {
        return Err(ApiError::bad_request("Invalid input"));
    }
    if claims.sub != buyer && claims.sub != seller {
        return Err(ApiError::Forbidden("Only a party to the trade can finalize it".into()));
    }

    let (buyer_coins, seller_coins) = blocking(&state, move |db| {
        db.finalize_trade(&buyer.to_string(), &seller.to_string())
    })
    .await?;
    info!("Trade finalized between {} and {}", buyer, seller);

    Ok(Json(FinalizeTradeResponse {
        buyer: TradeParty {
            id: buyer,
            eco_coins: buyer_coins,
        },
        seller: TradeParty {
            id: seller,
            eco_coins: seller_coins,
        },
    }))
}
