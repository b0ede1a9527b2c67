//! Coin ledger and community rank. Callers pass the connection (or an open
//! transaction) so a balance change always lands with its ledger row.

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::LedgerError;
use crate::models::CoinTransactionRow;
use crate::{Database, new_id};

/// Credit (positive) or debit (negative) `amount` coins and record it.
/// Returns the new balance. A debit that would go below zero fails with
/// [`LedgerError::InsufficientCoins`] and writes nothing, as does a credit
/// that would overflow the balance.
pub fn apply_coins(conn: &Connection, user_id: &str, amount: i64, reason: &str) -> Result<i64> {
    let balance = coin_balance(conn, user_id)?;
    let next = balance
        .checked_add(amount)
        .ok_or(LedgerError::CoinOverflow)?;
    if next < 0 {
        return Err(LedgerError::InsufficientCoins.into());
    }

    conn.execute(
        "UPDATE users SET eco_coins = ?1 WHERE id = ?2",
        rusqlite::params![next, user_id],
    )?;
    conn.execute(
        "INSERT INTO coin_transactions (id, user_id, amount, reason) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![new_id(), user_id, amount, reason],
    )?;

    debug!("ledger: {} {:+} ({}) -> {}", user_id, amount, reason, next);
    Ok(next)
}

pub fn coin_balance(conn: &Connection, user_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT eco_coins FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::UserNotFound.into())
}

pub fn add_points(conn: &Connection, user_id: &str, points: i64) -> Result<i64> {
    let changed = conn.execute(
        "UPDATE users SET points = points + ?1 WHERE id = ?2",
        rusqlite::params![points, user_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::UserNotFound.into());
    }
    let total = conn.query_row("SELECT points FROM users WHERE id = ?1", [user_id], |r| {
        r.get(0)
    })?;
    Ok(total)
}

/// Re-sort every user by total recycled weight and store `user_id`'s
/// 1-based position. Ties go to whoever signed up first.
pub fn recompute_rank(conn: &Connection, user_id: &str) -> Result<i64> {
    let mut stmt = conn.prepare(
        "SELECT id FROM users ORDER BY total_recycled DESC, created_at ASC, rowid ASC",
    )?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let rank = ids
        .iter()
        .position(|id| id == user_id)
        .map(|i| i as i64 + 1)
        .ok_or(LedgerError::UserNotFound)?;

    conn.execute(
        "UPDATE users SET community_rank = ?1 WHERE id = ?2",
        rusqlite::params![rank, user_id],
    )?;
    Ok(rank)
}

impl Database {
    /// Most recent ledger rows for a user.
    pub fn get_coin_transactions(&self, user_id: &str, limit: u32) -> Result<Vec<CoinTransactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, amount, reason, created_at FROM coin_transactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(CoinTransactionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        amount: row.get(2)?,
                        reason: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sum of the ledger for a user. Equals `users.eco_coins` as long as
    /// every balance change went through [`apply_coins`].
    pub fn ledger_total(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let total = conn.query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM coin_transactions WHERE user_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(total)
        })
    }
}
