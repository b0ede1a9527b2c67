use anyhow::Result;
use rusqlite::{Connection, Row};

use recircle_types::models::MarketplaceActivityKind;

use crate::ledger;
use crate::models::{ActivityTotalRow, ItemViewRow, MarketplaceActivityRow, ViewTotalRow};
use crate::{Database, new_id};

const ACTIVITY_COLUMNS: &str =
    "id, user_id, item_id, item_name, item_price, activity_type, coins_spent, created_at";

const VIEW_COLUMNS: &str =
    "id, user_id, item_id, item_name, item_category, view_duration, created_at";

fn map_activity(row: &Row<'_>) -> rusqlite::Result<MarketplaceActivityRow> {
    Ok(MarketplaceActivityRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        item_name: row.get(3)?,
        item_price: row.get(4)?,
        activity_type: row.get(5)?,
        coins_spent: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_view(row: &Row<'_>) -> rusqlite::Result<ItemViewRow> {
    Ok(ItemViewRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        item_name: row.get(3)?,
        item_category: row.get(4)?,
        view_duration: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_activity(conn: &Connection, id: &str) -> Result<MarketplaceActivityRow> {
    let sql = format!("SELECT {} FROM marketplace_activities WHERE id = ?1", ACTIVITY_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_activity)?)
}

impl Database {
    /// Log a marketplace interaction. Purchases debit `coins_spent` through
    /// the ledger first, so an insufficient balance leaves no activity row.
    /// Returns the row and, for purchases, the new balance.
    pub fn record_marketplace_activity(
        &self,
        user_id: &str,
        item_id: &str,
        item_name: &str,
        item_price: i64,
        kind: MarketplaceActivityKind,
        coins_spent: i64,
    ) -> Result<(MarketplaceActivityRow, Option<i64>)> {
        self.with_tx(|tx| {
            let balance = if kind == MarketplaceActivityKind::Purchase {
                let reason = format!("Marketplace purchase: {}", item_name);
                Some(ledger::apply_coins(tx, user_id, -coins_spent, &reason)?)
            } else {
                None
            };

            let id = new_id();
            tx.execute(
                "INSERT INTO marketplace_activities
                    (id, user_id, item_id, item_name, item_price, activity_type, coins_spent)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    user_id,
                    item_id,
                    item_name,
                    item_price,
                    kind.as_str(),
                    coins_spent
                ],
            )?;

            Ok((query_activity(tx, &id)?, balance))
        })
    }

    pub fn get_marketplace_activities(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<MarketplaceActivityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM marketplace_activities
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                ACTIVITY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_activity)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_marketplace_summary(&self, user_id: &str) -> Result<Vec<ActivityTotalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT activity_type, COUNT(id), COALESCE(SUM(coins_spent), 0)
                 FROM marketplace_activities
                 WHERE user_id = ?1
                 GROUP BY activity_type
                 ORDER BY activity_type",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ActivityTotalRow {
                        activity_type: row.get(0)?,
                        count: row.get(1)?,
                        coins_spent: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn record_item_view(
        &self,
        user_id: &str,
        item_id: &str,
        item_name: &str,
        item_category: &str,
        view_duration: i64,
    ) -> Result<ItemViewRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO item_views (id, user_id, item_id, item_name, item_category, view_duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, item_id, item_name, item_category, view_duration],
            )?;
            let sql = format!("SELECT {} FROM item_views WHERE id = ?1", VIEW_COLUMNS);
            Ok(conn.query_row(&sql, [&id], map_view)?)
        })
    }

    pub fn get_item_views(&self, user_id: &str, limit: u32) -> Result<Vec<ItemViewRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM item_views
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                VIEW_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_view)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_view_summary(&self, user_id: &str) -> Result<Vec<ViewTotalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT item_category, COUNT(id), COALESCE(SUM(view_duration), 0)
                 FROM item_views
                 WHERE user_id = ?1
                 GROUP BY item_category
                 ORDER BY item_category",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ViewTotalRow {
                        category: row.get(0)?,
                        count: row.get(1)?,
                        view_duration: row.get(2)?,
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
    use crate::error::LedgerError;
    use crate::test_support;

    #[test]
    fn purchase_debits_coins() {
        let db = test_support::db();
        let uid = test_support::user(&db, "m@x.io");
        db.with_tx(|tx| ledger::apply_coins(tx, &uid, 30, "seed")).unwrap();

        let (row, balance) = db
            .record_marketplace_activity(&uid, "7", "Bamboo brush", 12, MarketplaceActivityKind::Purchase, 12)
            .unwrap();
        assert_eq!(row.activity_type, "purchase");
        assert_eq!(balance, Some(18));
        assert_eq!(db.ledger_total(&uid).unwrap(), 18);
    }

    #[test]
    fn purchase_without_funds_writes_nothing() {
        let db = test_support::db();
        let uid = test_support::user(&db, "poor@x.io");

        let err = db
            .record_marketplace_activity(&uid, "7", "Lamp", 50, MarketplaceActivityKind::Purchase, 50)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::InsufficientCoins)
        );
        assert!(db.get_marketplace_activities(&uid, 50).unwrap().is_empty());
    }

    #[test]
    fn non_purchases_leave_balance_alone() {
        let db = test_support::db();
        let uid = test_support::user(&db, "v@x.io");

        let (_, balance) = db
            .record_marketplace_activity(&uid, "1", "Jar", 0, MarketplaceActivityKind::Favorite, 0)
            .unwrap();
        assert!(balance.is_none());
        db.record_marketplace_activity(&uid, "2", "Jar", 0, MarketplaceActivityKind::Favorite, 0)
            .unwrap();
        db.record_marketplace_activity(&uid, "3", "Jar", 0, MarketplaceActivityKind::Share, 0)
            .unwrap();

        let summary = db.get_marketplace_summary(&uid).unwrap();
        let favorites = summary.iter().find(|s| s.activity_type == "favorite").unwrap();
        assert_eq!(favorites.count, 2);
        assert_eq!(favorites.coins_spent, 0);
    }

    #[test]
    fn views_are_summarised_by_category() {
        let db = test_support::db();
        let uid = test_support::user(&db, "w@x.io");
        db.record_item_view(&uid, "1", "Chair", "furniture", 30).unwrap();
        db.record_item_view(&uid, "2", "Desk", "furniture", 15).unwrap();
        db.record_item_view(&uid, "3", "Kettle", "general", 5).unwrap();

        let summary = db.get_view_summary(&uid).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "furniture");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].view_duration, 45);
        assert_eq!(db.get_item_views(&uid, 50).unwrap().len(), 3);
    }
}
