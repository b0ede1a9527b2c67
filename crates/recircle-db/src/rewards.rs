//! Reward tables and the small pure rules derived from them.

use chrono::NaiveDate;
use recircle_types::models::Material;

/// Points for joining a community project.
pub const PARTICIPATION_POINTS: i64 = 5;
/// Points for submitting proof of work on a community project.
pub const SUBMISSION_POINTS: i64 = 10;
/// Coins credited to each side when an EcoTrade is finalized.
pub const TRADE_FINALIZE_BONUS: i64 = 50;
/// One-time coins for working through the recycling guide checklist.
pub const GUIDE_BONUS: i64 = 5;

const DEFAULT_EVENT_REWARD: i64 = 20;

/// Coins per kg.
pub fn coin_rate(material: Material) -> i64 {
    match material {
        Material::Paper => 2,
        Material::Plastic => 3,
        Material::Glass => 4,
        Material::Metal => 5,
        Material::Organic => 1,
    }
}

/// kg of CO2 avoided per kg recycled.
pub fn co2_per_kg(material: Material) -> f64 {
    match material {
        Material::Paper => 0.8,
        Material::Plastic => 1.2,
        Material::Glass => 0.3,
        Material::Metal => 2.5,
        Material::Organic => 0.5,
    }
}

/// Coins earned and CO2 saved for one recycling drop-off.
pub fn recycling_reward(material: Material, weight: f64) -> (i64, f64) {
    let coins = (weight * coin_rate(material) as f64).round() as i64;
    let co2 = weight * co2_per_kg(material);
    (coins, co2)
}

pub fn event_reward(event_type: Option<&str>) -> i64 {
    match event_type {
        Some("community-cleanup") => 50,
        Some("recycling-workshop") => 30,
        Some("eco-education") => 25,
        Some("tree-planting") => 40,
        Some("sustainability-fair") => 35,
        _ => DEFAULT_EVENT_REWARD,
    }
}

/// Role ladder shown on the profile.
pub fn role_for(eco_coins: i64) -> &'static str {
    match eco_coins {
        i64::MIN..=9 => "Eco Learner",
        10..=29 => "Eco Explorer",
        30..=59 => "Eco Champion",
        _ => "Eco Enabler",
    }
}

/// Streak after recycling on `today`, given the previous recycling day.
pub fn next_streak(last: Option<NaiveDate>, current: i64, today: NaiveDate) -> i64 {
    match last {
        Some(day) if day == today => current.max(1),
        Some(day) if day.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}
