//! Thin HTTP clients for the two payment providers. Handlers only see the
//! traits, so tests can swap in a fake.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use recircle_types::models::PaymentKind;

const STRIPE_API: &str = "https://api.stripe.com/v1";
const RAZORPAY_API: &str = "https://api.razorpay.com/v1";

pub enum LineItem {
    /// A price pre-created in the Stripe dashboard.
    Price(String),
    /// Ad-hoc price. `unit_amount` is in minor units.
    Custom {
        name: String,
        currency: String,
        unit_amount: i64,
    },
}

pub struct CheckoutRequest {
    pub payment_id: String,
    pub kind: PaymentKind,
    pub reference_id: Option<String>,
    pub line_item: LineItem,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

pub struct OrderRequest {
    /// Minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub title: Option<String>,
    pub kind: PaymentKind,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession>;
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(&self, req: &OrderRequest) -> Result<Order>;
}

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }
}

/// Stripe's form encoding for a single-line payment session.
fn checkout_form(req: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("metadata[paymentId]".to_string(), req.payment_id.clone()),
        ("metadata[type]".to_string(), req.kind.as_str().to_string()),
        (
            "metadata[referenceId]".to_string(),
            req.reference_id.clone().unwrap_or_default(),
        ),
    ];

    match &req.line_item {
        LineItem::Price(price) => {
            form.push(("line_items[0][price]".to_string(), price.clone()));
        }
        LineItem::Custom {
            name,
            currency,
            unit_amount,
        } => {
            form.push((
                "line_items[0][price_data][currency]".to_string(),
                currency.to_lowercase(),
            ));
            form.push((
                "line_items[0][price_data][product_data][name]".to_string(),
                name.clone(),
            ));
            form.push((
                "line_items[0][price_data][unit_amount]".to_string(),
                unit_amount.to_string(),
            ));
        }
    }
    form
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession> {
        let res = self
            .http
            .post(format!("{}/checkout/sessions", STRIPE_API))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(req))
            .send()
            .await
            .context("Stripe request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Stripe returned {}: {}", status, body);
        }

        let session: CheckoutSession = res.json().await.context("Bad Stripe response")?;
        debug!("Stripe checkout session {} for payment {}", session.id, req.payment_id);
        Ok(session)
    }
}

pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id,
            key_secret,
        }
    }
}

#[async_trait]
impl OrderGateway for RazorpayClient {
    async fn create_order(&self, req: &OrderRequest) -> Result<Order> {
        let body = serde_json::json!({
            "amount": req.amount,
            "currency": req.currency,
            "receipt": req.receipt,
            "notes": {
                "title": req.title.clone().unwrap_or_default(),
                "type": req.kind.as_str(),
                "referenceId": req.reference_id.clone().unwrap_or_default(),
            },
        });

        let res = self
            .http
            .post(format!("{}/orders", RAZORPAY_API))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .context("Razorpay request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Razorpay returned {}: {}", status, body);
        }

        let order: Order = res.json().await.context("Bad Razorpay response")?;
        debug!("Razorpay order {} ({} {})", order.id, order.amount, order.currency);
        Ok(order)
    }
}
