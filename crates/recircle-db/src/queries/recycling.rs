use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Row};
use tracing::info;

use recircle_types::models::Material;

use crate::error::LedgerError;
use crate::ledger;
use crate::models::{MaterialTotalRow, RecyclingRow, UserRow};
use crate::queries::users::query_user_by_id;
use crate::rewards;
use crate::{Database, new_id};

pub struct NewRecycling<'a> {
    pub user_id: &'a str,
    pub material: Material,
    pub weight: f64,
    pub location: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// The stored activity plus the user's counters after the write.
#[derive(Debug)]
pub struct RecyclingOutcome {
    pub activity: RecyclingRow,
    pub eco_coins: i64,
    pub total_recycled: f64,
    pub co2_saved: f64,
    pub community_rank: i64,
    pub active_streak: i64,
}

fn map_recycling(row: &Row<'_>) -> rusqlite::Result<RecyclingRow> {
    Ok(RecyclingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        material: row.get(2)?,
        weight: row.get(3)?,
        co2_saved: row.get(4)?,
        coins_earned: row.get(5)?,
        location: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const RECYCLING_COLUMNS: &str =
    "id, user_id, material, weight, co2_saved, coins_earned, location, notes, created_at";

fn query_recycling_by_id(conn: &Connection, id: &str) -> Result<RecyclingRow> {
    let sql = format!("SELECT {} FROM recycling_activities WHERE id = ?1", RECYCLING_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_recycling)?)
}

impl Database {
    /// Log a drop-off and apply its rewards: coins (with ledger row), weight,
    /// CO2, streak, and the caller's community rank. All in one transaction.
    pub fn record_recycling(&self, new: &NewRecycling<'_>) -> Result<RecyclingOutcome> {
        let (coins, co2) = rewards::recycling_reward(new.material, new.weight);
        let today = Utc::now().date_naive();

        let outcome = self.with_tx(|tx| {
            let user = query_user_by_id(tx, new.user_id)?.ok_or(LedgerError::UserNotFound)?;
            let last = user
                .last_recycled_on
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let streak = rewards::next_streak(last, user.active_streak, today);

            let id = new_id();
            tx.execute(
                "INSERT INTO recycling_activities
                    (id, user_id, material, weight, co2_saved, coins_earned, location, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    new.user_id,
                    new.material.as_str(),
                    new.weight,
                    co2,
                    coins,
                    new.location,
                    new.notes,
                ],
            )?;

            tx.execute(
                "UPDATE users SET
                    total_recycled = total_recycled + ?1,
                    co2_saved = co2_saved + ?2,
                    active_streak = ?3,
                    last_recycled_on = ?4,
                    is_new_user = 0
                 WHERE id = ?5",
                rusqlite::params![
                    new.weight,
                    co2,
                    streak,
                    today.format("%Y-%m-%d").to_string(),
                    new.user_id,
                ],
            )?;

            if coins > 0 {
                let reason = format!("Recycling: {}", new.material.as_str());
                ledger::apply_coins(tx, new.user_id, coins, &reason)?;
            }

            let rank = ledger::recompute_rank(tx, new.user_id)?;
            let user = query_user_by_id(tx, new.user_id)?.ok_or(LedgerError::UserNotFound)?;

            Ok(RecyclingOutcome {
                activity: query_recycling_by_id(tx, &id)?,
                eco_coins: user.eco_coins,
                total_recycled: user.total_recycled,
                co2_saved: user.co2_saved,
                community_rank: rank,
                active_streak: user.active_streak,
            })
        })?;

        info!(
            "Recycling logged for {}: {} kg {} (+{} coins, rank {})",
            new.user_id,
            new.weight,
            new.material.as_str(),
            coins,
            outcome.community_rank
        );
        Ok(outcome)
    }

    /// Credit the recycling guide bonus. Each user can claim it once.
    pub fn claim_guide_bonus(&self, user_id: &str) -> Result<UserRow> {
        let user = self.with_tx(|tx| {
            let user = query_user_by_id(tx, user_id)?.ok_or(LedgerError::UserNotFound)?;
            if user.guide_bonus_claimed {
                return Err(LedgerError::GuideBonusClaimed.into());
            }
            ledger::apply_coins(tx, user_id, rewards::GUIDE_BONUS, "Recycling Guide Checklist")?;
            tx.execute("UPDATE users SET guide_bonus_claimed = 1 WHERE id = ?1", [user_id])?;
            query_user_by_id(tx, user_id)?.ok_or_else(|| LedgerError::UserNotFound.into())
        })?;
        info!("Guide bonus claimed by {}", user_id);
        Ok(user)
    }

    pub fn get_recycling_activities(&self, user_id: &str, limit: u32) -> Result<Vec<RecyclingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM recycling_activities
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                RECYCLING_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_recycling)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_recycling_breakdown(&self, user_id: &str) -> Result<Vec<MaterialTotalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT material, COALESCE(SUM(weight), 0), COUNT(id)
                 FROM recycling_activities
                 WHERE user_id = ?1
                 GROUP BY material
                 ORDER BY material",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MaterialTotalRow {
                        material: row.get(0)?,
                        total_weight: row.get(1)?,
                        count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn drop_off<'a>(user_id: &'a str, material: Material, weight: f64) -> NewRecycling<'a> {
        NewRecycling {
            user_id,
            material,
            weight,
            location: None,
            notes: None,
        }
    }

    #[test]
    fn recycling_credits_coins_weight_and_ledger() {
        let db = test_support::db();
        let uid = test_support::user(&db, "r@x.io");

        let out = db
            .record_recycling(&drop_off(&uid, Material::Metal, 2.0))
            .unwrap();
        assert_eq!(out.activity.coins_earned, 10);
        assert_eq!(out.eco_coins, 10);
        assert!((out.total_recycled - 2.0).abs() < 1e-9);
        assert!((out.co2_saved - 5.0).abs() < 1e-9);
        assert_eq!(out.community_rank, 1);
        assert_eq!(out.active_streak, 1);

        let user = db.get_user_by_id(&uid).unwrap().unwrap();
        assert!(!user.is_new_user);
        assert_eq!(db.ledger_total(&uid).unwrap(), 10);

        let tx = db.get_coin_transactions(&uid, 5).unwrap();
        assert_eq!(tx.len(), 1);
        assert_eq!(tx[0].reason, "Recycling: metal");
    }

    #[test]
    fn same_day_recycling_keeps_streak() {
        let db = test_support::db();
        let uid = test_support::user(&db, "s@x.io");
        db.record_recycling(&drop_off(&uid, Material::Paper, 1.0)).unwrap();
        let out = db.record_recycling(&drop_off(&uid, Material::Paper, 1.0)).unwrap();
        assert_eq!(out.active_streak, 1);
        assert_eq!(out.eco_coins, 4);
    }

    #[test]
    fn rank_is_recomputed_against_other_users() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@x.io");
        let b = test_support::user(&db, "b@x.io");

        let out_a = db.record_recycling(&drop_off(&a, Material::Glass, 3.0)).unwrap();
        assert_eq!(out_a.community_rank, 1);

        let out_b = db.record_recycling(&drop_off(&b, Material::Glass, 5.0)).unwrap();
        assert_eq!(out_b.community_rank, 1);

        let out_a = db.record_recycling(&drop_off(&a, Material::Glass, 0.5)).unwrap();
        assert_eq!(out_a.community_rank, 2);
    }

    #[test]
    fn breakdown_groups_by_material() {
        let db = test_support::db();
        let uid = test_support::user(&db, "g@x.io");
        db.record_recycling(&drop_off(&uid, Material::Paper, 1.5)).unwrap();
        db.record_recycling(&drop_off(&uid, Material::Paper, 2.5)).unwrap();
        db.record_recycling(&drop_off(&uid, Material::Glass, 1.0)).unwrap();

        let breakdown = db.get_recycling_breakdown(&uid).unwrap();
        assert_eq!(breakdown.len(), 2);
        let paper = breakdown.iter().find(|b| b.material == "paper").unwrap();
        assert_eq!(paper.count, 2);
        assert!((paper.total_weight - 4.0).abs() < 1e-9);

        let activities = db.get_recycling_activities(&uid, 50).unwrap();
        assert_eq!(activities.len(), 3);
        assert_eq!(activities[0].material, "glass");
    }

    #[test]
    fn unknown_user_is_rejected() {
        let db = test_support::db();
        let err = db
            .record_recycling(&drop_off("nobody", Material::Paper, 1.0))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::UserNotFound)
        );
    }

    #[test]
    fn guide_bonus_pays_out_once() {
        let db = test_support::db();
        let uid = test_support::user(&db, "guide@x.io");

        let user = db.claim_guide_bonus(&uid).unwrap();
        assert_eq!(user.eco_coins, rewards::GUIDE_BONUS);
        assert!(user.guide_bonus_claimed);

        let err = db.claim_guide_bonus(&uid).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::GuideBonusClaimed)
        );
        let txs = db.get_coin_transactions(&uid, 10).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].reason, "Recycling Guide Checklist");
    }
}
