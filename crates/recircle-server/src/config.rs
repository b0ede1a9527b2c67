use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

/// Placeholder JWT secrets that MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub membership_price: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub base_url: String,
    pub stripe: Option<StripeConfig>,
    pub razorpay: Option<RazorpayConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = var("RECIRCLE_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let jwt_secret = match var("RECIRCLE_JWT_SECRET") {
            Some(s) if production && PLACEHOLDER_SECRETS.contains(&s.as_str()) => {
                bail!("RECIRCLE_JWT_SECRET is still a placeholder; set a real secret for production")
            }
            Some(s) => s,
            None if production => bail!("RECIRCLE_JWT_SECRET must be set in production"),
            None => {
                warn!("RECIRCLE_JWT_SECRET unset, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let port = match var("RECIRCLE_PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid RECIRCLE_PORT '{}'", p))?,
            None => 3000,
        };

        let stripe = var("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
            secret_key,
            webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            membership_price: var("STRIPE_PRICE_MEMBERSHIP"),
        });

        let razorpay = match (var("RAZORPAY_KEY_ID"), var("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig {
                key_id,
                key_secret,
                webhook_secret: var("RAZORPAY_WEBHOOK_SECRET"),
            }),
            (None, None) => None,
            _ => {
                warn!("Razorpay needs both RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET; disabled");
                None
            }
        };

        Ok(Self {
            host: var("RECIRCLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("RECIRCLE_DB_PATH").unwrap_or_else(|| "recircle.db".into()).into(),
            jwt_secret,
            base_url: var("RECIRCLE_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            stripe,
            razorpay,
        })
    }
}
