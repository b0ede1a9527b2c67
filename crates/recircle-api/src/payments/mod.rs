pub mod gateway;
pub mod signature;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use recircle_db::queries::{NewPayment, PaymentUpdate};
use recircle_types::api::{CheckoutRequest, CheckoutResponse, RazorpayOrderResponse};
use recircle_types::models::{PaymentKind, PaymentProvider};

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

use self::gateway::{LineItem, OrderRequest};

const DEFAULT_CURRENCY: &str = "INR";
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
const RAZORPAY_SIGNATURE_HEADER: &str = "x-razorpay-signature";
const STRIPE_SESSION_COMPLETED: &str = "checkout.session.completed";
const RAZORPAY_PAYMENT_CAPTURED: &str = "payment.captured";

/// Whole major units; gateways are always charged in minor units.
fn major_units(amount: f64) -> i64 {
    amount.round() as i64
}

fn minor_units(units: i64) -> Result<i64, ApiError> {
    units
        .checked_mul(100)
        .ok_or_else(|| ApiError::bad_request("Amount is too large"))
}

fn parse_kind(raw: &str) -> Result<PaymentKind, ApiError> {
    PaymentKind::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid payment type"))
}

/// Pick the Stripe line item: the preset membership price when one is
/// configured, otherwise an ad-hoc price from amount and title.
fn line_item(
    kind: PaymentKind,
    membership_price: Option<&str>,
    amount: Option<i64>,
    title: Option<&str>,
    currency: &str,
) -> Result<LineItem, ApiError> {
    if let (PaymentKind::Membership, Some(price)) = (kind, membership_price) {
        return Ok(LineItem::Price(price.to_string()));
    }
    match (amount, title) {
        (Some(units), Some(name)) if units > 0 => Ok(LineItem::Custom {
            name: name.to_string(),
            currency: currency.to_string(),
            unit_amount: minor_units(units)?,
        }),
        _ => Err(ApiError::bad_request("amount and title required")),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn log_completion(update: Option<PaymentUpdate>, provider: PaymentProvider) {
    match update {
        Some(u) if u.fulfilled => {
            info!("{} payment {} ({}) paid and fulfilled", provider.as_str(), u.payment.id, u.payment.kind)
        }
        Some(u) => info!("{} payment {} was already paid", provider.as_str(), u.payment.id),
        None => warn!("{} webhook referenced an unknown payment", provider.as_str()),
    }
}

fn ack() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({})))
}

pub async fn checkout(
    State(state): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let Some(stripe) = state.payments.stripe.clone() else {
        return Err(ApiError::Config("Stripe not configured".into()));
    };
    let (Some(user_id), Some(kind)) = (req.user_id, non_empty(req.kind)) else {
        return Err(ApiError::bad_request("userId and type required"));
    };
    let kind = parse_kind(&kind)?;
    let reference_id = non_empty(req.reference_id);
    let title = non_empty(req.title);
    let currency = non_empty(req.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let amount = req.amount.map(major_units);

    let line_item = line_item(
        kind,
        state.payments.stripe_membership_price.as_deref(),
        amount,
        title.as_deref(),
        &currency,
    )?;

    let payment = {
        let uid = user_id.to_string();
        let reference_id = reference_id.clone();
        let title = title.clone();
        let currency = currency.clone();
        blocking(&state, move |db| {
            if db.get_user_by_id(&uid)?.is_none() {
                return Ok(None);
            }
            db.create_payment(&NewPayment {
                user_id: &uid,
                kind,
                reference_id: reference_id.as_deref(),
                amount: amount.unwrap_or(0),
                currency: &currency,
                provider: PaymentProvider::Stripe,
                provider_ref: None,
                title: title.as_deref(),
            })
            .map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?
    };

    let base = state.payments.base_url.trim_end_matches('/');
    let session = stripe
        .create_checkout_session(&gateway::CheckoutRequest {
            payment_id: payment.id.clone(),
            kind,
            reference_id,
            line_item,
            success_url: format!("{}/pay?success=1&pid={}", base, payment.id),
            cancel_url: format!("{}/pay?canceled=1&pid={}", base, payment.id),
        })
        .await?;

    let payment_id = payment.id.clone();
    let session_id = session.id.clone();
    blocking(&state, move |db| db.set_provider_ref(&payment_id, &session_id)).await?;
    info!("Stripe checkout {} opened for payment {}", session.id, payment.id);

    Ok(Json(CheckoutResponse { url: session.url }))
}

pub async fn razorpay_order(
    State(state): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(user_id), Some(kind), Some(amount)) = (
        req.user_id,
        non_empty(req.kind),
        req.amount.map(major_units).filter(|a| *a > 0),
    ) else {
        return Err(ApiError::bad_request("userId, type, amount required"));
    };
    let (Some(razorpay), Some(key_id)) = (
        state.payments.razorpay.clone(),
        state.payments.razorpay_key_id.clone(),
    ) else {
        return Err(ApiError::Config("Razorpay not configured".into()));
    };
    let kind = parse_kind(&kind)?;
    let order_amount = minor_units(amount)?;
    let reference_id = non_empty(req.reference_id);
    let title = non_empty(req.title);
    let currency = non_empty(req.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let uid = user_id.to_string();
    let exists = blocking(&state, move |db| Ok(db.get_user_by_id(&uid)?.is_some())).await?;
    if !exists {
        return Err(ApiError::not_found("User not found"));
    }

    let order = razorpay
        .create_order(&OrderRequest {
            amount: order_amount,
            currency: currency.clone(),
            receipt: format!("rcpt_{}", chrono::Utc::now().timestamp_millis()),
            title: title.clone(),
            kind,
            reference_id: reference_id.clone(),
        })
        .await?;

    let order_id = order.id.clone();
    let payment = blocking(&state, move |db| {
        db.create_payment(&NewPayment {
            user_id: &user_id.to_string(),
            kind,
            reference_id: reference_id.as_deref(),
            amount,
            currency: &currency,
            provider: PaymentProvider::Razorpay,
            provider_ref: Some(&order_id),
            title: title.as_deref(),
        })
    })
    .await?;
    info!("Razorpay order {} created for payment {}", order.id, payment.id);

    Ok(Json(RazorpayOrderResponse {
        order_id: order.id,
        key: key_id,
        amount: order.amount,
        currency: order.currency,
        payment_id: convert::uuid(&payment.id, "payment id"),
    }))
}

#[derive(Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    kind: String,
    data: StripeEventData,
}

#[derive(Deserialize)]
struct StripeEventData {
    object: StripeSession,
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    #[serde(default)]
    metadata: Option<StripeMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StripeMetadata {
    payment_id: Option<String>,
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(_), Some(secret)) = (&state.payments.stripe, &state.payments.stripe_webhook_secret) else {
        return Ok(ack());
    };
    if !signature::verify_stripe(secret, &body, header(&headers, STRIPE_SIGNATURE_HEADER)) {
        warn!("Stripe webhook rejected: bad signature");
        return Err(ApiError::bad_request("Invalid signature"));
    }

    // Other event types are acknowledged untouched.
    let Ok(event) = serde_json::from_slice::<StripeEvent>(&body) else {
        return Ok(ack());
    };
    if event.kind != STRIPE_SESSION_COMPLETED {
        return Ok(ack());
    }

    let session = event.data.object;
    let Some(payment_id) = session.metadata.and_then(|m| m.payment_id) else {
        return Ok(ack());
    };
    let update = blocking(&state, move |db| {
        if db.get_payment(&payment_id)?.is_none() {
            return Ok(None);
        }
        db.set_provider_ref(&payment_id, &session.id)?;
        db.complete_payment(&payment_id)
    })
    .await?;
    log_completion(update, PaymentProvider::Stripe);

    Ok(ack())
}

#[derive(Deserialize)]
struct RazorpayEvent {
    event: String,
    payload: Option<RazorpayPayload>,
}

#[derive(Deserialize)]
struct RazorpayPayload {
    payment: RazorpayPaymentWrapper,
}

#[derive(Deserialize)]
struct RazorpayPaymentWrapper {
    entity: RazorpayPaymentEntity,
}

#[derive(Deserialize)]
struct RazorpayPaymentEntity {
    order_id: Option<String>,
}

pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Some(secret) = &state.payments.razorpay_webhook_secret else {
        return Ok(ack());
    };
    if !signature::verify_razorpay(secret, &body, header(&headers, RAZORPAY_SIGNATURE_HEADER)) {
        warn!("Razorpay webhook rejected: bad signature");
        return Err(ApiError::bad_request("Invalid signature"));
    }

    let Ok(event) = serde_json::from_slice::<RazorpayEvent>(&body) else {
        return Ok(ack());
    };
    if event.event != RAZORPAY_PAYMENT_CAPTURED {
        return Ok(ack());
    }
    let Some(order_id) = event.payload.and_then(|p| p.payment.entity.order_id) else {
        return Ok(ack());
    };

    let update = blocking(&state, move |db| {
        match db.find_payment_by_provider_ref(PaymentProvider::Razorpay, &order_id)? {
            Some(payment) => db.complete_payment(&payment.id),
            None => Ok(None),
        }
    })
    .await?;
    log_completion(update, PaymentProvider::Razorpay);

    Ok(ack())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_round_to_whole_units() {
        assert_eq!(major_units(199.4), 199);
        assert_eq!(major_units(199.5), 200);
    }

    #[test]
    fn membership_uses_preset_price_when_configured() {
        let item = line_item(PaymentKind::Membership, Some("price_1"), None, None, "INR");
        assert!(matches!(item, Ok(LineItem::Price(p)) if p == "price_1"));
    }

    #[test]
    fn custom_line_item_needs_amount_and_title() {
        assert!(line_item(PaymentKind::Event, Some("price_1"), Some(50), None, "INR").is_err());
        assert!(line_item(PaymentKind::Membership, None, None, Some("Premium"), "INR").is_err());

        let item = line_item(PaymentKind::Event, None, Some(50), Some("Cleanup"), "INR");
        let Ok(LineItem::Custom { unit_amount, name, .. }) = item else {
            panic!("expected custom line item");
        };
        assert_eq!(unit_amount, 5000);
        assert_eq!(name, "Cleanup");
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_wrapping() {
        assert_eq!(minor_units(199).unwrap(), 19900);
        let err = minor_units(major_units(1e17)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Amount is too large"));

        let item = line_item(PaymentKind::Event, None, Some(i64::MAX), Some("Cleanup"), "INR");
        assert!(matches!(item, Err(ApiError::BadRequest(_))));
    }
}
