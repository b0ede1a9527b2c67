use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::models::{ChatMessageRow, ContactRow};
use crate::{Database, new_id};

const CHAT_COLUMNS: &str = "id, from_user_id, to_user_id, body, created_at";

const CONTACT_SELECT: &str = "SELECT u.id, u.display_name, c.name
     FROM users u
     LEFT JOIN communities c ON c.id = u.community_id";

fn map_contact(row: &Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        community: row.get(2)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<ChatMessageRow> {
    Ok(ChatMessageRow {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    pub fn insert_chat_message(&self, from_user_id: &str, to_user_id: &str, body: &str) -> Result<ChatMessageRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO chat_messages (id, from_user_id, to_user_id, body) VALUES (?1, ?2, ?3, ?4)",
                (&id, from_user_id, to_user_id, body),
            )?;
            let sql = format!("SELECT {} FROM chat_messages WHERE id = ?1", CHAT_COLUMNS);
            Ok(conn.query_row(&sql, [&id], map_message)?)
        })
    }

    /// Both directions of a conversation, oldest first.
    pub fn get_chat_history(&self, user_a: &str, user_b: &str) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM chat_messages
                 WHERE (from_user_id = ?1 AND to_user_id = ?2)
                    OR (from_user_id = ?2 AND to_user_id = ?1)
                 ORDER BY created_at ASC, rowid ASC",
                CHAT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_a, user_b], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_chat_message(&self, id: &str) -> Result<Option<ChatMessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM chat_messages WHERE id = ?1", CHAT_COLUMNS);
            Ok(conn.query_row(&sql, [id], map_message).optional()?)
        })
    }

    /// Returns false when no such message exists.
    pub fn delete_chat_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM chat_messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    /// Other members of `user_id`'s community. Empty until they join one.
    pub fn community_contacts(&self, user_id: &str) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE u.community_id = (SELECT community_id FROM users WHERE id = ?1)
                   AND u.id != ?1
                 ORDER BY u.display_name, u.rowid",
                CONTACT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every other member, whatever their community.
    pub fn all_contacts(&self, user_id: &str) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE u.id != ?1
                 ORDER BY u.display_name, u.rowid",
                CONTACT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;

    #[test]
    fn history_covers_both_directions_in_order() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@x.io");
        let b = test_support::user(&db, "b@x.io");
        let c = test_support::user(&db, "c@x.io");

        db.insert_chat_message(&a, &b, "hi").unwrap();
        db.insert_chat_message(&b, &a, "hello").unwrap();
        db.insert_chat_message(&a, &c, "elsewhere").unwrap();

        let history = db.get_chat_history(&b, &a).unwrap();
        let bodies: Vec<_> = history.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["hi", "hello"]);
    }

    #[test]
    fn unknown_recipient_is_rejected_by_foreign_key() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@x.io");
        assert!(db.insert_chat_message(&a, "ghost", "hi").is_err());
    }

    #[test]
    fn deleted_message_is_gone() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@x.io");
        let b = test_support::user(&db, "b@x.io");
        let msg = db.insert_chat_message(&a, &b, "oops").unwrap();

        assert_eq!(db.get_chat_message(&msg.id).unwrap().unwrap().from_user_id, a);
        assert!(db.delete_chat_message(&msg.id).unwrap());
        assert!(db.get_chat_message(&msg.id).unwrap().is_none());
        assert!(!db.delete_chat_message(&msg.id).unwrap());
    }

    #[test]
    fn contacts_split_by_community() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@x.io");
        let b = test_support::user(&db, "b@x.io");
        let c = test_support::user(&db, "c@x.io");
        let loner = test_support::user(&db, "d@x.io");
        db.update_location(&a, 12.97, 77.59, Some("Bengaluru"), Some("KA")).unwrap();
        db.update_location(&b, 12.93, 77.62, Some("Bengaluru"), Some("KA")).unwrap();
        db.update_location(&c, 19.07, 72.87, Some("Mumbai"), Some("MH")).unwrap();

        let local = db.community_contacts(&a).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].id, b);
        assert_eq!(local[0].community.as_deref(), Some("Bengaluru"));

        assert!(db.community_contacts(&loner).unwrap().is_empty());

        let everyone = db.all_contacts(&a).unwrap();
        assert_eq!(everyone.len(), 3);
        assert!(everyone.iter().all(|u| u.id != a));
    }
}
