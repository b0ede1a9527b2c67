use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::{MembershipRow, UserRow};

pub(crate) const USER_COLUMNS: &str = "id, display_name, email, password, city, state, eco_coins, \
     total_recycled, co2_saved, community_rank, active_streak, last_recycled_on, points, \
     is_new_user, location_lat, location_lng, community_id, guide_bonus_claimed, created_at";

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        eco_coins: row.get(6)?,
        total_recycled: row.get(7)?,
        co2_saved: row.get(8)?,
        community_rank: row.get(9)?,
        active_streak: row.get(10)?,
        last_recycled_on: row.get(11)?,
        points: row.get(12)?,
        is_new_user: row.get(13)?,
        location_lat: row.get(14)?,
        location_lng: row.get(15)?,
        community_id: row.get(16)?,
        guide_bonus_claimed: row.get(17)?,
        created_at: row.get(18)?,
    })
}

pub(crate) fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    let row = conn.query_row(&sql, [id], map_user).optional()?;
    Ok(row)
}

pub(crate) fn query_membership(conn: &Connection, user_id: &str) -> Result<Option<MembershipRow>> {
    let row = conn
        .query_row(
            "SELECT user_id, tier, active, renews_at FROM memberships WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(MembershipRow {
                    user_id: row.get(0)?,
                    tier: row.get(1)?,
                    active: row.get(2)?,
                    renews_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        display_name: &str,
        email: &str,
        password_hash: &str,
        city: &str,
        state: &str,
    ) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, email, password, city, state)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, display_name, email, password_hash, city, state),
            )?;
            query_user_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
            let row = conn.query_row(&sql, [email], map_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_membership(&self, user_id: &str) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| query_membership(conn, user_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;

    #[test]
    fn new_users_start_with_zeroed_counters() {
        let db = test_support::db();
        let uid = test_support::user(&db, "new@x.io");

        let user = db.get_user_by_email("new@x.io").unwrap().unwrap();
        assert_eq!(user.id, uid);
        assert_eq!(user.eco_coins, 0);
        assert_eq!(user.community_rank, 0);
        assert_eq!(user.points, 0);
        assert!(user.is_new_user);
        assert!(user.community_id.is_none());
        assert!(db.get_membership(&uid).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = test_support::db();
        test_support::user(&db, "dup@x.io");
        let res = db.create_user(&crate::new_id(), "Dup", "dup@x.io", "h", "c", "s");
        assert!(res.is_err());
    }
}
