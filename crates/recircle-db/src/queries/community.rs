use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::LedgerError;
use crate::models::{CommunityMemberRow, UserRow};
use crate::queries::users::{USER_COLUMNS, map_user, query_user_by_id};
use crate::{Database, new_id};

/// Names shown per cluster on the map.
const CLUSTER_NAME_LIMIT: usize = 5;

/// A community's located members folded into one map point.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub community_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub members: usize,
    pub member_names: Vec<String>,
}

fn find_or_create_community(conn: &Connection, name: &str) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM communities WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO communities (id, name) VALUES (?1, ?2)",
        rusqlite::params![id, name],
    )?;
    info!("Community created: {}", name);
    Ok(id)
}

/// Fold located members into per-community clusters, keeping the first
/// member rows' order for the displayed names.
fn fold_clusters(members: Vec<CommunityMemberRow>) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    for m in members {
        let idx = match clusters.iter().position(|c| c.community_id == m.community_id) {
            Some(i) => i,
            None => {
                clusters.push(Cluster {
                    community_id: m.community_id.clone(),
                    name: m.community_name.clone(),
                    lat: 0.0,
                    lng: 0.0,
                    members: 0,
                    member_names: Vec::new(),
                });
                clusters.len() - 1
            }
        };
        let c = &mut clusters[idx];
        // Running sums until the centroid pass below.
        c.lat += m.lat;
        c.lng += m.lng;
        c.members += 1;
        if c.member_names.len() < CLUSTER_NAME_LIMIT {
            c.member_names.push(m.display_name);
        }
    }

    for c in &mut clusters {
        let n = c.members as f64;
        c.lat /= n;
        c.lng /= n;
    }
    clusters
}

impl Database {
    /// Store the user's coordinates (and city/state when given), then join
    /// the community named after their city, creating it on first use.
    pub fn update_location(
        &self,
        user_id: &str,
        lat: f64,
        lng: f64,
        city: Option<&str>,
        state: Option<&str>,
    ) -> Result<UserRow> {
        self.with_tx(|tx| {
            let user = query_user_by_id(tx, user_id)?.ok_or(LedgerError::UserNotFound)?;
            let city = city.unwrap_or(user.city.as_str());
            let state = state.unwrap_or(user.state.as_str());
            let community_id = find_or_create_community(tx, city)?;

            tx.execute(
                "UPDATE users SET location_lat = ?1, location_lng = ?2, city = ?3, state = ?4,
                    community_id = ?5
                 WHERE id = ?6",
                rusqlite::params![lat, lng, city, state, community_id, user_id],
            )?;

            query_user_by_id(tx, user_id)?.ok_or_else(|| LedgerError::UserNotFound.into())
        })
    }

    pub fn get_community_name(&self, community_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT name FROM communities WHERE id = ?1", [community_id], |r| r.get(0))
                .optional()?)
        })
    }

    /// One cluster per community that has at least one located member.
    pub fn community_clusters(&self) -> Result<Vec<Cluster>> {
        let members = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, u.display_name, u.location_lat, u.location_lng
                 FROM users u
                 JOIN communities c ON c.id = u.community_id
                 WHERE u.location_lat IS NOT NULL AND u.location_lng IS NOT NULL
                 ORDER BY c.name, u.created_at, u.rowid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CommunityMemberRow {
                        community_id: row.get(0)?,
                        community_name: row.get(1)?,
                        display_name: row.get(2)?,
                        lat: row.get(3)?,
                        lng: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(fold_clusters(members))
    }

    /// Top recyclers. Position in the result is the rank.
    pub fn leaderboard(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users
                 ORDER BY total_recycled DESC, created_at ASC, rowid ASC
                 LIMIT ?1",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
