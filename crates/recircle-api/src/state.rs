use std::sync::Arc;

use tracing::error;

use recircle_db::Database;

use crate::error::ApiError;
use crate::payments::gateway::{CheckoutGateway, OrderGateway};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub payments: PaymentSettings,
}

/// Gateway handles and secrets. `None` means the provider is not configured.
#[derive(Default)]
pub struct PaymentSettings {
    /// Public origin used for checkout success/cancel redirects.
    pub base_url: String,
    pub stripe: Option<Arc<dyn CheckoutGateway>>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_membership_price: Option<String>,
    pub razorpay: Option<Arc<dyn OrderGateway>>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_webhook_secret: Option<String>,
}

/// Run a database closure on the blocking pool.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
