use serde::{Deserialize, Serialize};

/// Recyclable material categories accepted by the recycling log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Paper,
    Plastic,
    Glass,
    Metal,
    Organic,
}

impl Material {
    pub const ALL: [Material; 5] = [
        Material::Paper,
        Material::Plastic,
        Material::Glass,
        Material::Metal,
        Material::Organic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Plastic => "plastic",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Organic => "organic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

/// Kinds of marketplace interaction that get logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketplaceActivityKind {
    View,
    Purchase,
    Favorite,
    Share,
}

impl MarketplaceActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Purchase => "purchase",
            Self::Favorite => "favorite",
            Self::Share => "share",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "purchase" => Some(Self::Purchase),
            "favorite" => Some(Self::Favorite),
            "share" => Some(Self::Share),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PledgeType {
    Vote,
    Donation,
    Volunteer,
}

impl PledgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::Donation => "donation",
            Self::Volunteer => "volunteer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vote" => Some(Self::Vote),
            "donation" => Some(Self::Donation),
            "volunteer" => Some(Self::Volunteer),
            _ => None,
        }
    }
}

/// What a payment buys. Drives post-payment fulfilment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Membership,
    Event,
    Item,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Membership => "membership",
            Self::Event => "event",
            Self::Item => "item",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "membership" => Some(Self::Membership),
            "event" => Some(Self::Event),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Razorpay,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Razorpay => "razorpay",
        }
    }
}

/// Listing lifecycle for EcoTrade items.
pub mod item_status {
    pub const ACTIVE: &str = "active";
    pub const SOLD: &str = "sold";
}

/// Pledge lifecycle.
pub mod pledge_status {
    pub const ACTIVE: &str = "active";
    pub const CANCELLED: &str = "cancelled";
}

pub mod payment_status {
    pub const PENDING: &str = "pending";
    pub const PAID: &str = "paid";
}

pub mod membership_tier {
    pub const FREE: &str = "free";
    pub const PREMIUM: &str = "premium";
}
