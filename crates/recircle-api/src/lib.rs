pub mod auth;
pub mod chat;
pub mod community;
pub mod convert;
pub mod ecotrade;
pub mod error;
pub mod events;
pub mod ledger;
pub mod marketplace;
pub mod middleware;
pub mod payments;
pub mod projects;
pub mod recycling;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

/// Every API route. Callers add CORS and tracing layers on top.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/ecotrade/items", get(ecotrade::list_items))
        .route("/api/ecotrade/seller-info/{id}", get(ecotrade::seller_info))
        .route("/api/events", get(events::list))
        .route("/api/events/payment", post(events::payment))
        .route("/api/projects", get(projects::list))
        .route("/api/projects/community", get(projects::list_community))
        .route("/api/community/map/clusters", get(community::clusters))
        .route("/api/community/leaderboard", get(community::leaderboard))
        .route("/api/payments/checkout", post(payments::checkout))
        .route("/api/payments/webhook", post(payments::stripe_webhook))
        .route("/api/payments/razorpay/order", post(payments::razorpay_order))
        .route("/api/payments/razorpay/webhook", post(payments::razorpay_webhook))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/recycling", post(recycling::record).get(recycling::history))
        .route("/api/recycling/guide/check", post(recycling::guide_check))
        .route(
            "/api/marketplace/activity",
            post(marketplace::record_activity).get(marketplace::activity_history),
        )
        .route(
            "/api/marketplace/views",
            post(marketplace::record_view).get(marketplace::view_history),
        )
        .route("/api/ecotrade/add", post(ecotrade::add_item))
        .route("/api/ecotrade/buy/{item_id}", post(ecotrade::buy_item))
        .route("/api/ecotrade/wishlist", get(ecotrade::wishlist))
        .route("/api/ecotrade/wishlist/{item_id}", post(ecotrade::toggle_wishlist))
        .route("/api/ecotrade/finalize", post(ecotrade::finalize))
        .route(
            "/api/events/participate",
            post(events::participate).get(events::participations),
        )
        .route("/api/events/enroll/{id}", post(events::enroll))
        .route("/api/projects/pledge", post(projects::pledge).get(projects::pledges))
        .route("/api/projects/create", post(projects::create_community))
        .route("/api/projects/participate/{id}", post(projects::participate))
        .route("/api/projects/submit/{id}", post(projects::submit))
        .route("/api/chat/send", post(chat::send))
        .route("/api/chat/history/{user_id}", get(chat::history))
        .route("/api/chat/community", get(chat::community_contacts))
        .route("/api/chat/global", get(chat::global_contacts))
        .route("/api/chat/message/{id}", delete(chat::delete_message))
        .route("/api/community/location", post(community::update_location))
        .route("/api/ledger", get(ledger::history))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use recircle_db::Database;
    use recircle_db::queries::NewPayment;
    use recircle_types::models::{PaymentKind, PaymentProvider};

    use super::*;
    use crate::payments::gateway::{
        CheckoutGateway, CheckoutRequest, CheckoutSession, Order, OrderGateway, OrderRequest,
    };
    use crate::payments::signature::sign_hex;
    use crate::state::{AppStateInner, PaymentSettings};

    const JWT_SECRET: &str = "test-secret";
    const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";
    const RAZORPAY_WEBHOOK_SECRET: &str = "rzp_whsec_test";

    struct FakeStripe;

    #[async_trait]
    impl CheckoutGateway for FakeStripe {
        async fn create_checkout_session(&self, req: &CheckoutRequest) -> Result<CheckoutSession> {
            Ok(CheckoutSession {
                id: format!("cs_{}", req.payment_id),
                url: format!("https://checkout.test/{}", req.payment_id),
            })
        }
    }

    struct FakeRazorpay;

    #[async_trait]
    impl OrderGateway for FakeRazorpay {
        async fn create_order(&self, req: &OrderRequest) -> Result<Order> {
            Ok(Order {
                id: format!("order_{}", req.receipt),
                amount: req.amount,
                currency: req.currency.clone(),
            })
        }
    }

    fn app() -> (Router, AppState) {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: JWT_SECRET.into(),
            payments: PaymentSettings {
                base_url: "http://localhost:3000".into(),
                stripe: Some(Arc::new(FakeStripe)),
                stripe_webhook_secret: Some(STRIPE_WEBHOOK_SECRET.into()),
                stripe_membership_price: None,
                razorpay: Some(Arc::new(FakeRazorpay)),
                razorpay_key_id: Some("rzp_test_key".into()),
                razorpay_webhook_secret: Some(RAZORPAY_WEBHOOK_SECRET.into()),
            },
        });
        (router(state.clone()), state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        send(app, req.body(body).unwrap()).await
    }

    /// Sign up and return (token, user id).
    async fn signup(app: &Router, email: &str, city: &str) -> (String, String) {
        let (status, body) = call(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "displayName": email.split('@').next().unwrap(),
                "email": email,
                "password": "hunter22",
                "city": city,
                "state": "KA",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn set_location(app: &Router, token: &str, city: &str, lat: f64, lng: f64) {
        let (status, body) = call(
            app,
            "POST",
            "/api/community/location",
            Some(token),
            Some(json!({ "latitude": lat, "longitude": lng, "city": city })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["community"], city);
    }

    fn webhook(uri: &str, header_name: &str, signature: String, payload: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header_name, signature)
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn stripe_signature(payload: &str) -> String {
        let t = chrono::Utc::now().timestamp();
        let sig = sign_hex(STRIPE_WEBHOOK_SECRET, format!("{}.{}", t, payload).as_bytes());
        format!("t={},v1={}", t, sig)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let (app, _) = app();
        let (status, body) = call(&app, "GET", "/api/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token provided");

        let (status, body) = call(&app, "GET", "/api/auth/profile", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn duplicate_signup_and_bad_login_are_rejected() {
        let (app, _) = app();
        signup(&app, "asha@recircle.test", "Bengaluru").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({
                "displayName": "Asha", "email": "asha@recircle.test", "password": "x",
                "city": "Bengaluru", "state": "KA",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists with this email");

        let (status, _) = call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "asha@recircle.test", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "asha@recircle.test", "password": "hunter22" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "asha@recircle.test");
    }

    #[tokio::test]
    async fn recycling_credits_coins_and_writes_the_ledger() {
        let (app, _) = app();
        let (token, _) = signup(&app, "ravi@recircle.test", "Bengaluru").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "plastic", "weight": 2.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        // 2.5 kg at 3 coins/kg rounds to 8.
        assert_eq!(body["userStats"]["ecoCoins"], 8);
        assert_eq!(body["userStats"]["communityRank"], 1);

        let (status, body) = call(&app, "GET", "/api/ledger", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ecoCoins"], 8);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
        assert_eq!(body["transactions"][0]["amount"], 8);

        let (status, body) = call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "styrofoam", "weight": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid material type");
    }

    #[tokio::test]
    async fn donation_pledge_spends_coins_and_rejects_overdraft() {
        let (app, _) = app();
        let (token, _) = signup(&app, "meera@recircle.test", "Bengaluru").await;
        call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "metal", "weight": 10 })),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/projects/pledge",
            Some(&token),
            Some(json!({
                "projectId": "00000000-0000-0000-0000-000000000101",
                "pledgeAmount": 30,
                "pledgeType": "donation",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["userStats"]["ecoCoins"], 20);

        let (status, body) = call(
            &app,
            "POST",
            "/api/projects/pledge",
            Some(&token),
            Some(json!({
                "projectId": "00000000-0000-0000-0000-000000000102",
                "pledgeAmount": 100,
                "pledgeType": "donation",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Insufficient eco coins for donation");

        let (_, body) = call(&app, "GET", "/api/ledger", Some(&token), None).await;
        assert_eq!(body["ecoCoins"], 20);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

        let (_, body) = call(&app, "GET", "/api/projects/pledge", Some(&token), None).await;
        assert_eq!(body["pledges"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn event_participation_is_once_per_event() {
        let (app, _) = app();
        let (token, _) = signup(&app, "kiran@recircle.test", "Bengaluru").await;
        let body = json!({ "eventId": 1, "eventName": "Cubbon Park Cleanup", "eventType": "community-cleanup" });

        let (status, res) =
            call(&app, "POST", "/api/events/participate", Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "{res}");
        assert_eq!(res["userStats"]["ecoCoins"], 50);

        let (status, res) =
            call(&app, "POST", "/api/events/participate", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["message"], "You have already participated in this event");
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let (app, _) = app();
        let payload = r#"{"type":"checkout.session.completed"}"#;

        let (status, body) = send(
            &app,
            webhook("/api/payments/webhook", "stripe-signature", "t=1,v1=00".into(), payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid signature");

        let (status, _) = send(
            &app,
            webhook("/api/payments/razorpay/webhook", "x-razorpay-signature", "deadbeef".into(), payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn checkout_requires_a_line_item() {
        let (app, _) = app();
        let (_, user_id) = signup(&app, "dev@recircle.test", "Bengaluru").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/payments/checkout",
            None,
            Some(json!({ "userId": user_id, "type": "event", "referenceId": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "amount and title required");

        let (status, body) = call(
            &app,
            "POST",
            "/api/payments/checkout",
            None,
            Some(json!({ "type": "event" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "userId and type required");
    }

    #[tokio::test]
    async fn premium_membership_unlocks_chat_outside_the_community() {
        let (app, state) = app();
        let (asha, asha_id) = signup(&app, "asha@recircle.test", "Bengaluru").await;
        let (ravi, ravi_id) = signup(&app, "ravi@recircle.test", "Bengaluru").await;
        let (zoya, zoya_id) = signup(&app, "zoya@recircle.test", "Mumbai").await;
        set_location(&app, &asha, "Bengaluru", 12.97, 77.59).await;
        set_location(&app, &ravi, "Bengaluru", 12.93, 77.62).await;
        set_location(&app, &zoya, "Mumbai", 19.07, 72.87).await;

        // Same community works on the free tier.
        let (status, body) = call(
            &app,
            "POST",
            "/api/chat/send",
            Some(&asha),
            Some(json!({ "toUserId": ravi_id, "text": "Cleanup on Saturday?" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["message"], "Sent");

        let (status, body) = call(
            &app,
            "POST",
            "/api/chat/send",
            Some(&asha),
            Some(json!({ "toUserId": zoya_id, "text": "Hi from Bengaluru" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Upgrade to premium to chat outside your community");

        // Pay for premium through Stripe checkout and the signed webhook.
        let (status, body) = call(
            &app,
            "POST",
            "/api/payments/checkout",
            None,
            Some(json!({ "userId": asha_id, "type": "membership", "amount": 99, "title": "Premium" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let url = body["url"].as_str().unwrap();
        let payment_id = url.rsplit('/').next().unwrap().to_string();

        let payload = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_live_1", "metadata": { "paymentId": payment_id } } },
        })
        .to_string();
        let (status, _) = send(
            &app,
            webhook("/api/payments/webhook", "stripe-signature", stripe_signature(&payload), &payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let payment = state.db.get_payment(&payment_id).unwrap().unwrap();
        assert_eq!(payment.status, "paid");
        assert_eq!(payment.provider_ref.as_deref(), Some("cs_live_1"));

        // Replaying the webhook does not fulfil twice.
        let (status, _) = send(
            &app,
            webhook("/api/payments/webhook", "stripe-signature", stripe_signature(&payload), &payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            "POST",
            "/api/chat/send",
            Some(&asha),
            Some(json!({ "toUserId": zoya_id, "text": "Hi from Bengaluru" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            call(&app, "GET", &format!("/api/chat/history/{}", asha_id), Some(&zoya), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["body"], "Hi from Bengaluru");
    }

    #[tokio::test]
    async fn razorpay_capture_marks_the_event_enrollment_paid() {
        let (app, state) = app();
        let (_, user_id) = signup(&app, "nila@recircle.test", "Bengaluru").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/payments/razorpay/order",
            None,
            Some(json!({ "userId": user_id, "type": "event", "referenceId": 2, "amount": 199, "title": "Repair Café" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["amount"], 19900);
        assert_eq!(body["key"], "rzp_test_key");
        let order_id = body["orderId"].as_str().unwrap().to_string();
        let payment_id = body["paymentId"].as_str().unwrap().to_string();

        let payload = json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "order_id": order_id } } },
        })
        .to_string();
        let signature = sign_hex(RAZORPAY_WEBHOOK_SECRET, payload.as_bytes());
        let (status, _) = send(
            &app,
            webhook("/api/payments/razorpay/webhook", "x-razorpay-signature", signature, &payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let payment = state.db.get_payment(&payment_id).unwrap().unwrap();
        assert_eq!(payment.status, "paid");
        let enrollment = state.db.enroll_in_event("2", &user_id).unwrap();
        assert!(enrollment.paid);
    }

    #[tokio::test]
    async fn clusters_need_coordinates_and_sort_by_distance() {
        let (app, _) = app();
        let (asha, _) = signup(&app, "asha@recircle.test", "Bengaluru").await;
        let (zoya, _) = signup(&app, "zoya@recircle.test", "Mumbai").await;
        set_location(&app, &asha, "Bengaluru", 12.97, 77.59).await;
        set_location(&app, &zoya, "Mumbai", 19.07, 72.87).await;

        let (status, body) = call(&app, "GET", "/api/community/map/clusters", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "lat and lng required");

        let (status, body) =
            call(&app, "GET", "/api/community/map/clusters?lat=19.0&lng=72.8", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["radiusKm"], 10.0);
        assert_eq!(body["clusters"][0]["name"], "Mumbai");
        assert_eq!(body["clusters"][1]["name"], "Bengaluru");
    }

    #[tokio::test]
    async fn absurd_recycling_weight_is_rejected_and_the_database_keeps_serving() {
        let (app, _) = app();
        let (token, _) = signup(&app, "huge@recircle.test", "Bengaluru").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "metal", "weight": 1e300 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Weight is out of range");

        let (status, body) = call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "metal", "weight": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["userStats"]["ecoCoins"], 10);
    }

    #[tokio::test]
    async fn oversized_payment_amounts_are_rejected() {
        let (app, _) = app();
        let (_, user_id) = signup(&app, "rich@recircle.test", "Bengaluru").await;
        let order = json!({ "userId": user_id, "type": "event", "amount": 1e17, "title": "Gala" });

        let (status, body) =
            call(&app, "POST", "/api/payments/checkout", None, Some(order.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Amount is too large");

        let (status, body) =
            call(&app, "POST", "/api/payments/razorpay/order", None, Some(order)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Amount is too large");
    }

    #[tokio::test]
    async fn malformed_bodies_and_queries_answer_with_a_message() {
        let (app, _) = app();
        let (token, _) = signup(&app, "typo@recircle.test", "Bengaluru").await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/recycling")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"material\": \"paper\", "))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string(), "{body}");

        let (status, body) = call(
            &app,
            "POST",
            "/api/recycling",
            Some(&token),
            Some(json!({ "material": "paper", "weight": "heavy" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string(), "{body}");

        let (status, body) =
            call(&app, "GET", "/api/community/map/clusters?lat=abc&lng=1", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string(), "{body}");
    }

    #[tokio::test]
    async fn recycling_guide_bonus_is_claimed_once() {
        let (app, _) = app();
        let (token, _) = signup(&app, "guide@recircle.test", "Bengaluru").await;

        let (status, body) =
            call(&app, "POST", "/api/recycling/guide/check", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ecoCoins"], 5);
        assert_eq!(body["role"], "Eco Learner");
        assert_eq!(body["guideBonusClaimed"], true);

        let (status, body) =
            call(&app, "POST", "/api/recycling/guide/check", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Guide bonus already claimed");

        let (_, body) = call(&app, "GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(body["user"]["ecoCoins"], 5);
        assert_eq!(body["user"]["guideBonusClaimed"], true);
    }

    #[tokio::test]
    async fn contact_lists_follow_community_and_membership() {
        let (app, state) = app();
        let (asha, asha_id) = signup(&app, "asha@recircle.test", "Bengaluru").await;
        let (ravi, ravi_id) = signup(&app, "ravi@recircle.test", "Bengaluru").await;
        let (zoya, _) = signup(&app, "zoya@recircle.test", "Mumbai").await;
        set_location(&app, &asha, "Bengaluru", 12.97, 77.59).await;
        set_location(&app, &ravi, "Bengaluru", 12.93, 77.62).await;
        set_location(&app, &zoya, "Mumbai", 19.07, 72.87).await;

        let (status, body) = call(&app, "GET", "/api/chat/community", Some(&asha), None).await;
        assert_eq!(status, StatusCode::OK);
        let contacts = body["contacts"].as_array().unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0]["id"], ravi_id.as_str());
        assert_eq!(contacts[0]["community"], "Bengaluru");

        let (status, body) = call(&app, "GET", "/api/chat/global", Some(&asha), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Premium membership required");

        let payment = state
            .db
            .create_payment(&NewPayment {
                user_id: &asha_id,
                kind: PaymentKind::Membership,
                reference_id: None,
                amount: 99,
                currency: "INR",
                provider: PaymentProvider::Stripe,
                provider_ref: None,
                title: Some("Premium"),
            })
            .unwrap();
        state.db.complete_payment(&payment.id).unwrap();

        let (status, body) = call(&app, "GET", "/api/chat/global", Some(&asha), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["contacts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn only_the_sender_can_delete_a_message() {
        let (app, state) = app();
        let (asha, _) = signup(&app, "asha@recircle.test", "Bengaluru").await;
        let (ravi, ravi_id) = signup(&app, "ravi@recircle.test", "Bengaluru").await;
        set_location(&app, &asha, "Bengaluru", 12.97, 77.59).await;
        set_location(&app, &ravi, "Bengaluru", 12.93, 77.62).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/chat/send",
            Some(&asha),
            Some(json!({ "toUserId": ravi_id, "text": "wrong chat, sorry" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let uri = format!("/api/chat/message/{}", body["msg"]["id"].as_str().unwrap());
        let message_id = body["msg"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, "DELETE", &uri, Some(&ravi), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not allowed");

        let (status, body) = call(&app, "DELETE", &uri, Some(&asha), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(state.db.get_chat_message(&message_id).unwrap().is_none());

        let (status, body) = call(&app, "DELETE", &uri, Some(&asha), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Message not found");
    }
}
