use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(V1_SCHEMA)?;
    }

    if version < 2 {
        info!("Running migration v2 (seed events and projects)");
        conn.execute_batch(V2_SEED)?;
    }

    if version < 3 {
        info!("Running migration v3 (recycling guide bonus)");
        conn.execute_batch(V3_GUIDE_BONUS)?;
    }

    info!("Database migrations complete");
    Ok(())
}

const V1_SCHEMA: &str = "
    CREATE TABLE communities (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE users (
        id                TEXT PRIMARY KEY,
        display_name      TEXT NOT NULL,
        email             TEXT NOT NULL UNIQUE,
        password          TEXT NOT NULL,
        city              TEXT NOT NULL,
        state             TEXT NOT NULL,
        eco_coins         INTEGER NOT NULL DEFAULT 0,
        total_recycled    REAL NOT NULL DEFAULT 0,
        co2_saved         REAL NOT NULL DEFAULT 0,
        community_rank    INTEGER NOT NULL DEFAULT 0,
        active_streak     INTEGER NOT NULL DEFAULT 0,
        last_recycled_on  TEXT,
        points            INTEGER NOT NULL DEFAULT 0,
        is_new_user       INTEGER NOT NULL DEFAULT 1,
        location_lat      REAL,
        location_lng      REAL,
        community_id      TEXT REFERENCES communities(id),
        created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE coin_transactions (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL REFERENCES users(id),
        amount      INTEGER NOT NULL,
        reason      TEXT NOT NULL,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_coin_transactions_user ON coin_transactions(user_id, created_at);

    CREATE TABLE recycling_activities (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL REFERENCES users(id),
        material      TEXT NOT NULL,
        weight        REAL NOT NULL,
        co2_saved     REAL NOT NULL,
        coins_earned  INTEGER NOT NULL,
        location      TEXT,
        notes         TEXT,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_recycling_user ON recycling_activities(user_id, created_at);

    CREATE TABLE event_participations (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL REFERENCES users(id),
        event_id      TEXT NOT NULL,
        event_name    TEXT NOT NULL,
        coins_earned  INTEGER NOT NULL,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE(user_id, event_id)
    );

    CREATE TABLE marketplace_activities (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL REFERENCES users(id),
        item_id        TEXT NOT NULL,
        item_name      TEXT NOT NULL,
        item_price     INTEGER NOT NULL DEFAULT 0,
        activity_type  TEXT NOT NULL,
        coins_spent    INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_marketplace_user ON marketplace_activities(user_id, created_at);

    CREATE TABLE item_views (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL REFERENCES users(id),
        item_id        TEXT NOT NULL,
        item_name      TEXT NOT NULL,
        item_category  TEXT NOT NULL,
        view_duration  INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE ecotrade_items (
        id           TEXT PRIMARY KEY,
        title        TEXT NOT NULL,
        description  TEXT NOT NULL,
        price        INTEGER NOT NULL,
        seller_id    TEXT NOT NULL REFERENCES users(id),
        status       TEXT NOT NULL DEFAULT 'active',
        created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE wishlist_items (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL REFERENCES users(id),
        item_id     TEXT NOT NULL REFERENCES ecotrade_items(id),
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE(user_id, item_id)
    );

    CREATE TABLE projects (
        id              TEXT PRIMARY KEY,
        title           TEXT NOT NULL,
        description     TEXT NOT NULL,
        category        TEXT NOT NULL,
        goal_amount     INTEGER NOT NULL,
        current_amount  INTEGER NOT NULL DEFAULT 0,
        status          TEXT NOT NULL DEFAULT 'active',
        created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE project_pledges (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL REFERENCES users(id),
        project_id     TEXT NOT NULL REFERENCES projects(id),
        project_title  TEXT NOT NULL,
        pledge_amount  INTEGER NOT NULL,
        pledge_type    TEXT NOT NULL,
        message        TEXT,
        status         TEXT NOT NULL DEFAULT 'active',
        created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_pledges_project ON project_pledges(project_id);
    CREATE INDEX idx_pledges_user ON project_pledges(user_id, created_at);

    CREATE TABLE community_projects (
        id            TEXT PRIMARY KEY,
        title         TEXT NOT NULL,
        description   TEXT NOT NULL,
        creator_id    TEXT NOT NULL REFERENCES users(id),
        shared_links  TEXT NOT NULL DEFAULT '[]',
        participants  INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE community_project_participations (
        id          TEXT PRIMARY KEY,
        project_id  TEXT NOT NULL REFERENCES community_projects(id),
        user_id     TEXT NOT NULL REFERENCES users(id),
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE(project_id, user_id)
    );

    CREATE TABLE community_project_submissions (
        id          TEXT PRIMARY KEY,
        project_id  TEXT NOT NULL REFERENCES community_projects(id),
        user_id     TEXT NOT NULL REFERENCES users(id),
        proof_url   TEXT,
        note        TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE TABLE events (
        id           TEXT PRIMARY KEY,
        title        TEXT NOT NULL,
        description  TEXT NOT NULL,
        location     TEXT NOT NULL,
        starts_at    TEXT NOT NULL,
        fee          INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE event_enrollments (
        id          TEXT PRIMARY KEY,
        event_id    TEXT NOT NULL REFERENCES events(id),
        user_id     TEXT NOT NULL REFERENCES users(id),
        paid        INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        UNIQUE(event_id, user_id)
    );

    CREATE TABLE memberships (
        user_id    TEXT PRIMARY KEY REFERENCES users(id),
        tier       TEXT NOT NULL DEFAULT 'free',
        active     INTEGER NOT NULL DEFAULT 0,
        renews_at  TEXT
    );

    CREATE TABLE chat_messages (
        id            TEXT PRIMARY KEY,
        from_user_id  TEXT NOT NULL REFERENCES users(id),
        to_user_id    TEXT NOT NULL REFERENCES users(id),
        body          TEXT NOT NULL,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_chat_pair ON chat_messages(from_user_id, to_user_id, created_at);

    CREATE TABLE payments (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL REFERENCES users(id),
        kind          TEXT NOT NULL,
        reference_id  TEXT,
        amount        INTEGER NOT NULL,
        currency      TEXT NOT NULL,
        provider      TEXT NOT NULL,
        provider_ref  TEXT,
        status        TEXT NOT NULL DEFAULT 'pending',
        title         TEXT,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
    );

    CREATE INDEX idx_payments_provider_ref ON payments(provider, provider_ref);

    INSERT INTO schema_version (version) VALUES (1);
";

// Catalogue data the web client expects to exist.
const V2_SEED: &str = "
    INSERT OR IGNORE INTO events (id, title, description, location, starts_at, fee) VALUES
        ('1', 'Cubbon Park Cleanup',
         'Join the neighborhood cleanup followed by chai at the bandstand.',
         'Cubbon Park, Bengaluru', '2024-10-26 09:00:00', 0),
        ('2', 'Repair Café Indiranagar',
         'Bring your appliances and learn to fix them with volunteer experts.',
         'Indiranagar Makerspace, Bengaluru', '2024-10-27 11:00:00', 199),
        ('3', 'Zero-Waste Workshop — Jayanagar',
         'Hands-on session on segregation and composting for Bengaluru households.',
         'Jayanagar Community Hall, Bengaluru', '2024-11-02 10:00:00', 299);

    INSERT OR IGNORE INTO projects (id, title, description, category, goal_amount) VALUES
        ('00000000-0000-0000-0000-000000000101', 'Neighbourhood Compost Hub',
         'Shared composting bins for apartment blocks.', 'Environment', 500),
        ('00000000-0000-0000-0000-000000000102', 'Lake Shore Plastic Sweep',
         'Monthly plastic collection drive along the lake shore.', 'Environment', 300),
        ('00000000-0000-0000-0000-000000000103', 'School Recycling Corners',
         'Sorting stations and signage for government schools.', 'Education', 800);

    INSERT INTO schema_version (version) VALUES (2);
";

const V3_GUIDE_BONUS: &str = "
    ALTER TABLE users ADD COLUMN guide_bonus_claimed INTEGER NOT NULL DEFAULT 0;

    INSERT INTO schema_version (version) VALUES (3);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 3);

        let events: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))
            .unwrap();
        assert_eq!(events, 3);
    }
}
