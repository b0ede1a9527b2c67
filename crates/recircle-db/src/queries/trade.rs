use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use recircle_types::models::item_status;

use crate::error::LedgerError;
use crate::models::TradeItemRow;
use crate::queries::users::query_user_by_id;
use crate::{Database, ledger, new_id, rewards};

// JOIN users to fetch the seller name in a single query
const ITEM_SELECT: &str = "SELECT i.id, i.title, i.description, i.price, i.seller_id, u.display_name, i.status, i.created_at
     FROM ecotrade_items i
     LEFT JOIN users u ON i.seller_id = u.id";

fn map_item(row: &Row<'_>) -> rusqlite::Result<TradeItemRow> {
    Ok(TradeItemRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        seller_id: row.get(4)?,
        seller_name: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_item(conn: &Connection, id: &str) -> Result<Option<TradeItemRow>> {
    let sql = format!("{} WHERE i.id = ?1", ITEM_SELECT);
    Ok(conn.query_row(&sql, [id], map_item).optional()?)
}

/// Mark an item sold and drop it from every wishlist.
pub(crate) fn mark_item_sold(conn: &Connection, item_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE ecotrade_items SET status = ?1 WHERE id = ?2",
        rusqlite::params![item_status::SOLD, item_id],
    )?;
    conn.execute("DELETE FROM wishlist_items WHERE item_id = ?1", [item_id])?;
    Ok(())
}

impl Database {
    pub fn create_trade_item(
        &self,
        seller_id: &str,
        title: &str,
        description: &str,
        price: i64,
    ) -> Result<TradeItemRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO ecotrade_items (id, title, description, price, seller_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, title, description, price, seller_id, item_status::ACTIVE],
            )?;
            query_item(conn, &id)?.ok_or_else(|| anyhow::anyhow!("item {} vanished after insert", id))
        })
    }

    pub fn list_trade_items(&self) -> Result<Vec<TradeItemRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY i.created_at DESC, i.rowid DESC", ITEM_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_trade_item(&self, id: &str) -> Result<Option<TradeItemRow>> {
        self.with_conn(|conn| query_item(conn, id))
    }

    /// Buy an active listing: mark it sold and clear wishlists atomically.
    pub fn buy_trade_item(&self, item_id: &str, buyer_id: &str) -> Result<TradeItemRow> {
        self.with_tx(|tx| {
            let item = query_item(tx, item_id)?
                .filter(|i| i.status == item_status::ACTIVE)
                .ok_or(LedgerError::ItemNotAvailable)?;
            if item.seller_id == buyer_id {
                return Err(LedgerError::OwnItem.into());
            }

            mark_item_sold(tx, item_id)?;
            info!("Item {} bought by {}", item_id, buyer_id);
            query_item(tx, item_id)?.ok_or_else(|| LedgerError::ItemNotFound.into())
        })
    }

    /// Add or remove an item from the user's wishlist. Returns true when the
    /// item is on the wishlist afterwards.
    pub fn toggle_wishlist(&self, user_id: &str, item_id: &str) -> Result<bool> {
        self.with_tx(|tx| {
            if query_item(tx, item_id)?.is_none() {
                return Err(LedgerError::ItemNotFound.into());
            }

            let removed = tx.execute(
                "DELETE FROM wishlist_items WHERE user_id = ?1 AND item_id = ?2",
                [user_id, item_id],
            )?;
            if removed > 0 {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO wishlist_items (id, user_id, item_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![new_id(), user_id, item_id],
            )?;
            Ok(true)
        })
    }

    pub fn get_wishlist(&self, user_id: &str) -> Result<Vec<TradeItemRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN wishlist_items w ON w.item_id = i.id
                 WHERE w.user_id = ?1
                 ORDER BY w.created_at DESC, w.rowid DESC",
                ITEM_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Credit the finalize bonus to both parties. Returns (buyer, seller)
    /// balances.
    pub fn finalize_trade(&self, buyer_id: &str, seller_id: &str) -> Result<(i64, i64)> {
        self.with_tx(|tx| {
            for id in [buyer_id, seller_id] {
                if query_user_by_id(tx, id)?.is_none() {
                    return Err(LedgerError::UserNotFound.into());
                }
            }

            let bonus = rewards::TRADE_FINALIZE_BONUS;
            let buyer = ledger::apply_coins(tx, buyer_id, bonus, "EcoTrade finalized")?;
            let seller = ledger::apply_coins(tx, seller_id, bonus, "EcoTrade finalized")?;
            Ok((buyer, seller))
        })
    }
}
