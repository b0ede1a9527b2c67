use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims issued at signup/login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

/// Accepts either a JSON string or a JSON number and yields it as a string.
/// The web client sends catalogue ids as numbers and database ids as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    pub eco_coins: i64,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub eco_coins: i64,
    pub community_rank: i64,
    pub total_recycled: f64,
    pub co2_saved: f64,
    pub active_streak: i64,
    pub points: i64,
    pub role: String,
    pub is_new_user: bool,
    pub guide_bonus_claimed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
}

// -- Recycling --

#[derive(Debug, Default, Deserialize)]
pub struct RecyclingRequest {
    pub material: Option<String>,
    pub weight: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclingActivityResponse {
    pub id: Uuid,
    pub material: String,
    pub weight: f64,
    pub co2_saved: f64,
    pub coins_earned: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecyclingStats {
    pub eco_coins: i64,
    pub total_recycled: f64,
    pub co2_saved: f64,
    pub community_rank: i64,
    pub active_streak: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRecyclingResponse {
    pub message: String,
    pub activity: RecyclingActivityResponse,
    pub user_stats: RecyclingStats,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideBonusResponse {
    pub eco_coins: i64,
    pub role: String,
    pub guide_bonus_claimed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialBreakdown {
    pub material: String,
    pub total_weight: f64,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecyclingHistoryResponse {
    pub activities: Vec<RecyclingActivityResponse>,
    pub breakdown: Vec<MaterialBreakdown>,
}

// -- Marketplace tracking --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceActivityRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_price: Option<i64>,
    pub activity_type: Option<String>,
    pub coins_spent: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceActivityResponse {
    pub id: Uuid,
    pub item_id: String,
    pub item_name: String,
    pub item_price: i64,
    pub activity_type: String,
    pub coins_spent: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMarketplaceActivityResponse {
    pub message: String,
    pub activity: MarketplaceActivityResponse,
    pub user_stats: Option<CoinBalance>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub activity_type: String,
    pub count: i64,
    pub total_coins_spent: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarketplaceHistoryResponse {
    pub activities: Vec<MarketplaceActivityResponse>,
    pub summary: Vec<ActivitySummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemViewRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    pub item_category: Option<String>,
    pub view_duration: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemViewResponse {
    pub id: Uuid,
    pub item_id: String,
    pub item_name: String,
    pub item_category: String,
    pub view_duration: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordItemViewResponse {
    pub message: String,
    pub view: ItemViewResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummary {
    pub category: String,
    pub count: i64,
    pub total_view_duration: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemViewHistoryResponse {
    pub views: Vec<ItemViewResponse>,
    pub summary: Vec<ViewSummary>,
}

// -- EcoTrade --

#[derive(Debug, Default, Deserialize)]
pub struct AddItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItemResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub seller_id: Uuid,
    pub seller_name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemActionResponse {
    pub message: String,
    pub item: TradeItemResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<TradeItemResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WishlistToggleResponse {
    pub wishlisted: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeTradeRequest {
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeParty {
    pub id: Uuid,
    pub eco_coins: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeTradeResponse {
    pub buyer: TradeParty,
    pub seller: TradeParty,
}

// -- Events --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: String,
    pub fee: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipateEventRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationResponse {
    pub id: Uuid,
    pub event_id: String,
    pub event_name: String,
    pub coins_earned: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordParticipationResponse {
    pub message: String,
    pub participation: ParticipationResponse,
    pub user_stats: CoinBalance,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipationListResponse {
    pub participations: Vec<ParticipationResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub event_id: String,
    pub user_id: Uuid,
    pub paid: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub message: String,
    pub enrollment: EnrollmentResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPaymentRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub event_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

// -- Pledge-funded projects --

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub total_pledges: i64,
    pub total_amount: i64,
    pub progress_percentage: f64,
    pub pledge_types: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeRequest {
    pub project_id: Option<String>,
    pub pledge_amount: Option<i64>,
    pub pledge_type: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_title: String,
    pub pledge_amount: i64,
    pub pledge_type: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPledgeResponse {
    pub message: String,
    pub pledge: PledgeResponse,
    pub user_stats: Option<CoinBalance>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeProjectSummary {
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub goal_amount: i64,
    pub current_amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPledge {
    #[serde(flatten)]
    pub pledge: PledgeResponse,
    pub project: PledgeProjectSummary,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeTypeSummary {
    pub pledge_type: String,
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PledgeHistoryResponse {
    pub pledges: Vec<UserPledge>,
    pub summary: Vec<PledgeTypeSummary>,
}

// -- Community projects --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub shared_links: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityProjectResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: Uuid,
    pub shared_links: Vec<String>,
    pub participants: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommunityProjectResponse {
    pub message: String,
    pub project: CommunityProjectResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunityProjectListResponse {
    pub projects: Vec<CommunityProjectResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectParticipants {
    pub id: Uuid,
    pub participants: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPoints {
    pub points: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipateProjectResponse {
    pub message: String,
    pub project: ProjectParticipants,
    pub user: UserPoints,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProjectRequest {
    pub proof_url: Option<String>,
    pub note: Option<String>,
    pub shared_links: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitProjectResponse {
    pub message: String,
    pub user: UserPoints,
}

// -- Chat --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest {
    pub to_user_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendChatResponse {
    pub message: String,
    pub msg: ChatMessageResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub community: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactResponse>,
}

// -- Community --

#[derive(Debug, Default, Deserialize)]
pub struct LocationRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationResponse {
    pub message: String,
    pub community: String,
    pub user: UserResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    pub id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub members: usize,
    pub member_names: Vec<String>,
    pub distance_km: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterListResponse {
    pub clusters: Vec<ClusterResponse>,
    pub radius_km: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub id: Uuid,
    pub display_name: String,
    pub city: String,
    pub total_recycled: f64,
    pub co2_saved: f64,
    pub eco_coins: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub leaders: Vec<LeaderboardEntry>,
}

// -- Payments --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub reference_id: Option<String>,
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayOrderResponse {
    pub order_id: String,
    pub key: String,
    pub amount: i64,
    pub currency: String,
    pub payment_id: Uuid,
}

// -- Ledger --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransactionResponse {
    pub id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub eco_coins: i64,
    pub transactions: Vec<CoinTransactionResponse>,
}
