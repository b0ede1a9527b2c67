use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::LedgerError;
use crate::models::{EnrollmentRow, EventRow, ParticipationRow};
use crate::{Database, ledger, new_id, rewards};

fn map_event(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        starts_at: row.get(4)?,
        fee: row.get(5)?,
    })
}

fn map_participation(row: &Row<'_>) -> rusqlite::Result<ParticipationRow> {
    Ok(ParticipationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        event_id: row.get(2)?,
        event_name: row.get(3)?,
        coins_earned: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const PARTICIPATION_COLUMNS: &str = "id, user_id, event_id, event_name, coins_earned, created_at";

pub(crate) fn query_event(conn: &Connection, id: &str) -> Result<Option<EventRow>> {
    Ok(conn
        .query_row(
            "SELECT id, title, description, location, starts_at, fee FROM events WHERE id = ?1",
            [id],
            map_event,
        )
        .optional()?)
}

fn query_enrollment(conn: &Connection, event_id: &str, user_id: &str) -> Result<Option<EnrollmentRow>> {
    Ok(conn
        .query_row(
            "SELECT id, event_id, user_id, paid FROM event_enrollments
             WHERE event_id = ?1 AND user_id = ?2",
            [event_id, user_id],
            |row| {
                Ok(EnrollmentRow {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    user_id: row.get(2)?,
                    paid: row.get(3)?,
                })
            },
        )
        .optional()?)
}

/// Insert the enrollment if missing. Existing rows are left as they are.
pub(crate) fn upsert_enrollment(conn: &Connection, event_id: &str, user_id: &str) -> Result<EnrollmentRow> {
    conn.execute(
        "INSERT INTO event_enrollments (id, event_id, user_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(event_id, user_id) DO NOTHING",
        rusqlite::params![new_id(), event_id, user_id],
    )?;
    query_enrollment(conn, event_id, user_id)?
        .ok_or_else(|| anyhow::anyhow!("enrollment {}/{} vanished after upsert", event_id, user_id))
}

pub(crate) fn set_enrollment_paid(conn: &Connection, event_id: &str, user_id: &str) -> Result<EnrollmentRow> {
    let changed = conn.execute(
        "UPDATE event_enrollments SET paid = 1 WHERE event_id = ?1 AND user_id = ?2",
        [event_id, user_id],
    )?;
    if changed == 0 {
        return Err(LedgerError::EnrollmentNotFound.into());
    }
    query_enrollment(conn, event_id, user_id)?.ok_or_else(|| LedgerError::EnrollmentNotFound.into())
}

impl Database {
    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, location, starts_at, fee FROM events ORDER BY starts_at",
            )?;
            let rows = stmt
                .query_map([], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    /// Record attendance once per user and event, crediting the reward for
    /// the event type. Returns the row and the new balance.
    pub fn record_event_participation(
        &self,
        user_id: &str,
        event_id: &str,
        event_name: &str,
        event_type: Option<&str>,
    ) -> Result<(ParticipationRow, i64)> {
        let coins = rewards::event_reward(event_type);

        self.with_tx(|tx| {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM event_participations WHERE user_id = ?1 AND event_id = ?2",
                    [user_id, event_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(LedgerError::AlreadyParticipatedInEvent.into());
            }

            let id = new_id();
            tx.execute(
                "INSERT INTO event_participations (id, user_id, event_id, event_name, coins_earned)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, event_id, event_name, coins],
            )?;
            tx.execute("UPDATE users SET is_new_user = 0 WHERE id = ?1", [user_id])?;

            let reason = format!("Event: {}", event_name);
            let balance = ledger::apply_coins(tx, user_id, coins, &reason)?;

            let sql = format!(
                "SELECT {} FROM event_participations WHERE id = ?1",
                PARTICIPATION_COLUMNS
            );
            let row = tx.query_row(&sql, [&id], map_participation)?;
            Ok((row, balance))
        })
    }

    pub fn get_event_participations(&self, user_id: &str, limit: u32) -> Result<Vec<ParticipationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM event_participations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                PARTICIPATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_participation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Idempotent enrollment.
    pub fn enroll_in_event(&self, event_id: &str, user_id: &str) -> Result<EnrollmentRow> {
        self.with_tx(|tx| {
            if query_event(tx, event_id)?.is_none() {
                return Err(LedgerError::EventNotFound.into());
            }
            upsert_enrollment(tx, event_id, user_id)
        })
    }

    pub fn mark_enrollment_paid(&self, event_id: &str, user_id: &str) -> Result<EnrollmentRow> {
        self.with_conn(|conn| set_enrollment_paid(conn, event_id, user_id))
    }
}
