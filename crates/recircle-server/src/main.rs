mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use recircle_api::payments::gateway::{CheckoutGateway, OrderGateway, RazorpayClient, StripeClient};
use recircle_api::state::{AppState, AppStateInner, PaymentSettings};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recircle=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = recircle_db::Database::open(&config.db_path)?;

    let payments = payment_settings(&config);
    info!(
        "Payments: stripe {}, razorpay {}",
        if payments.stripe.is_some() { "on" } else { "off" },
        if payments.razorpay.is_some() { "on" } else { "off" },
    );

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        payments,
    });

    let app = recircle_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("ReCircle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn payment_settings(config: &Config) -> PaymentSettings {
    let mut settings = PaymentSettings {
        base_url: config.base_url.clone(),
        ..Default::default()
    };

    if let Some(stripe) = &config.stripe {
        let client: Arc<dyn CheckoutGateway> = Arc::new(StripeClient::new(stripe.secret_key.clone()));
        settings.stripe = Some(client);
        settings.stripe_webhook_secret = stripe.webhook_secret.clone();
        settings.stripe_membership_price = stripe.membership_price.clone();
    }
    if let Some(rzp) = &config.razorpay {
        let client: Arc<dyn OrderGateway> =
            Arc::new(RazorpayClient::new(rzp.key_id.clone(), rzp.key_secret.clone()));
        settings.razorpay = Some(client);
        settings.razorpay_key_id = Some(rzp.key_id.clone());
        settings.razorpay_webhook_secret = rzp.webhook_secret.clone();
    }
    settings
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
