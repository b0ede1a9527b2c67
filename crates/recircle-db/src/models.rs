//! Database row types. These map directly to SQLite rows and stay
//! independent of the JSON shapes in recircle-types.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub city: String,
    pub state: String,
    pub eco_coins: i64,
    pub total_recycled: f64,
    pub co2_saved: f64,
    pub community_rank: i64,
    pub active_streak: i64,
    pub last_recycled_on: Option<String>,
    pub points: i64,
    pub is_new_user: bool,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub community_id: Option<String>,
    pub guide_bonus_claimed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CoinTransactionRow {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct RecyclingRow {
    pub id: String,
    pub user_id: String,
    pub material: String,
    pub weight: f64,
    pub co2_saved: f64,
    pub coins_earned: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MaterialTotalRow {
    pub material: String,
    pub total_weight: f64,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct MarketplaceActivityRow {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub item_name: String,
    pub item_price: i64,
    pub activity_type: String,
    pub coins_spent: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ActivityTotalRow {
    pub activity_type: String,
    pub count: i64,
    pub coins_spent: i64,
}

#[derive(Debug, Clone)]
pub struct ItemViewRow {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub item_name: String,
    pub item_category: String,
    pub view_duration: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ViewTotalRow {
    pub category: String,
    pub count: i64,
    pub view_duration: i64,
}

#[derive(Debug, Clone)]
pub struct TradeItemRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub seller_id: String,
    pub seller_name: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: String,
    pub fee: i64,
}

#[derive(Debug, Clone)]
pub struct ParticipationRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub event_name: String,
    pub coins_earned: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub paid: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PledgeRow {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub project_title: String,
    pub pledge_amount: i64,
    pub pledge_type: String,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PledgeTotalRow {
    pub pledge_type: String,
    pub count: i64,
    pub total_amount: i64,
}

#[derive(Debug, Clone)]
pub struct CommunityProjectRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub shared_links: Vec<String>,
    pub participants: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub user_id: String,
    pub tier: String,
    pub active: bool,
    pub renews_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatMessageRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub body: String,
    pub created_at: String,
}

/// Someone the caller can pick to chat with.
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub id: String,
    pub display_name: String,
    pub community: Option<String>,
}

/// One located member of a community, as read for map clustering.
#[derive(Debug, Clone)]
pub struct CommunityMemberRow {
    pub community_id: String,
    pub community_name: String,
    pub display_name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub reference_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub provider: String,
    pub provider_ref: Option<String>,
    pub status: String,
    pub title: Option<String>,
    pub created_at: String,
}
