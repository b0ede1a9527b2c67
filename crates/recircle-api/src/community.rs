use axum::{
    Extension, Json,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    response::IntoResponse,
};

use recircle_db::queries::Cluster;
use recircle_types::api::{
    Claims, ClusterListResponse, ClusterQuery, ClusterResponse, LeaderboardEntry,
    LeaderboardResponse, LocationRequest, LocationResponse,
};

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const DEFAULT_RADIUS_KM: f64 = 10.0;
const LEADERBOARD_SIZE: u32 = 10;
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Attach distances from the origin and order nearest first.
fn nearest_first(clusters: Vec<Cluster>, lat: f64, lng: f64) -> Vec<ClusterResponse> {
    let mut out: Vec<ClusterResponse> = clusters
        .into_iter()
        .map(|c| ClusterResponse {
            id: convert::uuid(&c.community_id, "community id"),
            distance_km: haversine_km(lat, lng, c.lat, c.lng),
            name: c.name,
            lat: c.lat,
            lng: c.lng,
            members: c.members,
            member_names: c.member_names,
        })
        .collect();
    out.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    out
}

pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(lat), Some(lng)) = (req.latitude, req.longitude) else {
        return Err(ApiError::bad_request("latitude and longitude are required"));
    };
    let city = non_empty(req.city);
    let region = non_empty(req.state);

    let uid = claims.sub.to_string();
    let (user, community) = blocking(&state, move |db| {
        let user = db.update_location(&uid, lat, lng, city.as_deref(), region.as_deref())?;
        let community = match &user.community_id {
            Some(id) => db.get_community_name(id)?,
            None => None,
        };
        Ok((user, community))
    })
    .await?;

    Ok(Json(LocationResponse {
        message: "Location updated".into(),
        community: community.unwrap_or_else(|| user.city.clone()),
        user: convert::user(user),
    }))
}

pub async fn clusters(
    State(state): State<AppState>,
    query: Result<Query<ClusterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::bad_request("lat and lng required"));
    };
    let radius_km = query.radius_km.filter(|r| *r > 0.0).unwrap_or(DEFAULT_RADIUS_KM);

    let clusters = blocking(&state, |db| db.community_clusters()).await?;

    Ok(Json(ClusterListResponse {
        clusters: nearest_first(clusters, lat, lng),
        radius_km,
    }))
}

pub async fn leaderboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.leaderboard(LEADERBOARD_SIZE)).await?;
    Ok(Json(LeaderboardResponse {
        leaders: rows
            .into_iter()
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i as i64 + 1,
                id: convert::uuid(&u.id, "user id"),
                display_name: u.display_name,
                city: u.city,
                total_recycled: u.total_recycled,
                co2_saved: u.co2_saved,
                eco_coins: u.eco_coins,
            })
            .collect(),
    }))
}
