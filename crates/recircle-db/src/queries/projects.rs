use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use recircle_types::models::{PledgeType, pledge_status};

use crate::error::LedgerError;
use crate::models::{CommunityProjectRow, PledgeRow, PledgeTotalRow, ProjectRow};
use crate::{Database, ledger, new_id, rewards};

const PROJECT_COLUMNS: &str =
    "id, title, description, category, goal_amount, current_amount, status, created_at";

const PLEDGE_COLUMNS: &str = "id, user_id, project_id, project_title, pledge_amount, pledge_type, message, status, created_at";

const PROJECT_ACTIVE: &str = "active";

const COMMUNITY_PROJECT_COLUMNS: &str =
    "id, title, description, creator_id, shared_links, participants, created_at";

pub struct NewPledge<'a> {
    pub user_id: &'a str,
    pub project_id: &'a str,
    pub amount: i64,
    pub pledge_type: PledgeType,
    pub message: Option<&'a str>,
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        goal_amount: row.get(4)?,
        current_amount: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_pledge(row: &Row<'_>) -> rusqlite::Result<PledgeRow> {
    Ok(PledgeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        project_title: row.get(3)?,
        pledge_amount: row.get(4)?,
        pledge_type: row.get(5)?,
        message: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_community_project(row: &Row<'_>) -> rusqlite::Result<CommunityProjectRow> {
    let links: String = row.get(4)?;
    Ok(CommunityProjectRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        creator_id: row.get(3)?,
        shared_links: serde_json::from_str(&links).unwrap_or_else(|e| {
            warn!("Corrupt shared_links on community project: {}", e);
            Vec::new()
        }),
        participants: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_project(conn: &Connection, id: &str) -> Result<Option<ProjectRow>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_project).optional()?)
}

fn query_community_project(conn: &Connection, id: &str) -> Result<Option<CommunityProjectRow>> {
    let sql = format!(
        "SELECT {} FROM community_projects WHERE id = ?1",
        COMMUNITY_PROJECT_COLUMNS
    );
    Ok(conn.query_row(&sql, [id], map_community_project).optional()?)
}

impl Database {
    /// Pledge-funded projects, newest first. `None` filters are ignored.
    pub fn list_projects(&self, category: Option<&str>, status: Option<&str>) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM projects
                 WHERE (?1 IS NULL OR category = ?1)
                   AND (?2 IS NULL OR status = ?2)
                 ORDER BY created_at DESC, rowid DESC",
                PROJECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![category, status], map_project)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_project(&self, id: &str) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| query_project(conn, id))
    }

    /// Active pledges for a project.
    pub fn get_project_pledges(&self, project_id: &str) -> Result<Vec<PledgeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM project_pledges
                 WHERE project_id = ?1 AND status = ?2
                 ORDER BY created_at, rowid",
                PLEDGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![project_id, pledge_status::ACTIVE], map_pledge)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Create a pledge. Every check, including the donation balance, runs
    /// before the first write, so a rejected pledge leaves no trace.
    /// Returns the pledge and, for donations, the donor's new balance.
    pub fn record_pledge(&self, new: &NewPledge<'_>) -> Result<(PledgeRow, Option<i64>)> {
        let (pledge, balance) = self.with_tx(|tx| {
            let project = query_project(tx, new.project_id)?.ok_or(LedgerError::ProjectNotFound)?;
            if project.status != PROJECT_ACTIVE {
                return Err(LedgerError::ProjectInactive.into());
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM project_pledges WHERE user_id = ?1 AND project_id = ?2 AND status = ?3",
                    [new.user_id, new.project_id, pledge_status::ACTIVE],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(LedgerError::AlreadyPledged.into());
            }

            let is_donation = new.pledge_type == PledgeType::Donation;
            if is_donation && ledger::coin_balance(tx, new.user_id)? < new.amount {
                return Err(LedgerError::InsufficientCoinsForDonation.into());
            }

            let id = new_id();
            tx.execute(
                "INSERT INTO project_pledges
                    (id, user_id, project_id, project_title, pledge_amount, pledge_type, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    new.user_id,
                    new.project_id,
                    project.title,
                    new.amount,
                    new.pledge_type.as_str(),
                    new.message,
                ],
            )?;
            tx.execute(
                "UPDATE projects SET current_amount = current_amount + ?1 WHERE id = ?2",
                rusqlite::params![new.amount, new.project_id],
            )?;

            let balance = if is_donation {
                let reason = format!("Donation: {}", project.title);
                Some(ledger::apply_coins(tx, new.user_id, -new.amount, &reason)?)
            } else {
                None
            };

            let sql = format!("SELECT {} FROM project_pledges WHERE id = ?1", PLEDGE_COLUMNS);
            let pledge = tx.query_row(&sql, [&id], map_pledge)?;
            Ok((pledge, balance))
        })?;

        info!(
            "Pledge {} ({} x{}) on project {}",
            pledge.id, pledge.pledge_type, pledge.pledge_amount, pledge.project_title
        );
        Ok((pledge, balance))
    }

    /// The user's pledges, newest first, each with its project.
    pub fn get_user_pledges(&self, user_id: &str) -> Result<Vec<(PledgeRow, ProjectRow)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pl.id, pl.user_id, pl.project_id, pl.project_title, pl.pledge_amount,
                        pl.pledge_type, pl.message, pl.status, pl.created_at,
                        p.id, p.title, p.description, p.category, p.goal_amount,
                        p.current_amount, p.status, p.created_at
                 FROM project_pledges pl
                 JOIN projects p ON p.id = pl.project_id
                 WHERE pl.user_id = ?1
                 ORDER BY pl.created_at DESC, pl.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    let pledge = map_pledge(row)?;
                    let project = ProjectRow {
                        id: row.get(9)?,
                        title: row.get(10)?,
                        description: row.get(11)?,
                        category: row.get(12)?,
                        goal_amount: row.get(13)?,
                        current_amount: row.get(14)?,
                        status: row.get(15)?,
                        created_at: row.get(16)?,
                    };
                    Ok((pledge, project))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_pledge_summary(&self, user_id: &str) -> Result<Vec<PledgeTotalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pledge_type, COUNT(id), COALESCE(SUM(pledge_amount), 0)
                 FROM project_pledges
                 WHERE user_id = ?1
                 GROUP BY pledge_type
                 ORDER BY pledge_type",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PledgeTotalRow {
                        pledge_type: row.get(0)?,
                        count: row.get(1)?,
                        total_amount: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Community projects --

    pub fn create_community_project(
        &self,
        creator_id: &str,
        title: &str,
        description: &str,
        shared_links: &[String],
    ) -> Result<CommunityProjectRow> {
        let links = serde_json::to_string(shared_links)?;
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO community_projects (id, title, description, creator_id, shared_links)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, description, creator_id, links],
            )?;
            query_community_project(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("community project {} vanished after insert", id))
        })
    }

    pub fn list_community_projects(&self) -> Result<Vec<CommunityProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM community_projects ORDER BY created_at DESC, rowid DESC",
                COMMUNITY_PROJECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_community_project)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Join a community project once. Returns (participants, user points).
    pub fn join_community_project(&self, project_id: &str, user_id: &str) -> Result<(i64, i64)> {
        self.with_tx(|tx| {
            if query_community_project(tx, project_id)?.is_none() {
                return Err(LedgerError::ProjectNotFound.into());
            }

            let inserted = tx.execute(
                "INSERT INTO community_project_participations (id, project_id, user_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(project_id, user_id) DO NOTHING",
                rusqlite::params![new_id(), project_id, user_id],
            )?;
            if inserted == 0 {
                return Err(LedgerError::AlreadyParticipated.into());
            }

            tx.execute(
                "UPDATE community_projects SET participants = participants + 1 WHERE id = ?1",
                [project_id],
            )?;
            let participants: i64 = tx.query_row(
                "SELECT participants FROM community_projects WHERE id = ?1",
                [project_id],
                |r| r.get(0),
            )?;
            let points = ledger::add_points(tx, user_id, rewards::PARTICIPATION_POINTS)?;
            Ok((participants, points))
        })
    }

    /// Record proof of work, append any shared links, and award points.
    /// Returns the user's points.
    pub fn submit_community_project(
        &self,
        project_id: &str,
        user_id: &str,
        proof_url: Option<&str>,
        note: Option<&str>,
        shared_links: &[String],
    ) -> Result<i64> {
        self.with_tx(|tx| {
            let project = query_community_project(tx, project_id)?.ok_or(LedgerError::ProjectNotFound)?;

            tx.execute(
                "INSERT INTO community_project_submissions (id, project_id, user_id, proof_url, note)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![new_id(), project_id, user_id, proof_url, note],
            )?;

            if !shared_links.is_empty() {
                let mut links = project.shared_links;
                links.extend_from_slice(shared_links);
                tx.execute(
                    "UPDATE community_projects SET shared_links = ?1 WHERE id = ?2",
                    rusqlite::params![serde_json::to_string(&links)?, project_id],
                )?;
            }

            ledger::add_points(tx, user_id, rewards::SUBMISSION_POINTS)
        })
    }

    pub fn get_community_project(&self, id: &str) -> Result<Option<CommunityProjectRow>> {
        self.with_conn(|conn| query_community_project(conn, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    const COMPOST: &str = "00000000-0000-0000-0000-000000000101";

    fn pledge<'a>(user_id: &'a str, amount: i64, pledge_type: PledgeType) -> NewPledge<'a> {
        NewPledge {
            user_id,
            project_id: COMPOST,
            amount,
            pledge_type,
            message: Some("go"),
        }
    }

    #[test]
    fn donation_moves_coins_into_project() {
        let db = test_support::db();
        let uid = test_support::user(&db, "d@x.io");
        db.with_tx(|tx| ledger::apply_coins(tx, &uid, 40, "seed")).unwrap();

        let (row, balance) = db.record_pledge(&pledge(&uid, 25, PledgeType::Donation)).unwrap();
        assert_eq!(row.pledge_amount, 25);
        assert_eq!(balance, Some(15));
        assert_eq!(db.get_project(COMPOST).unwrap().unwrap().current_amount, 25);
        assert_eq!(db.ledger_total(&uid).unwrap(), 15);
    }

    #[test]
    fn underfunded_donation_leaves_no_trace() {
        let db = test_support::db();
        let uid = test_support::user(&db, "broke@x.io");
        db.with_tx(|tx| ledger::apply_coins(tx, &uid, 5, "seed")).unwrap();

        let err = db.record_pledge(&pledge(&uid, 25, PledgeType::Donation)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::InsufficientCoinsForDonation)
        );
        assert_eq!(db.get_project(COMPOST).unwrap().unwrap().current_amount, 0);
        assert!(db.get_user_pledges(&uid).unwrap().is_empty());
        assert_eq!(db.get_user_by_id(&uid).unwrap().unwrap().eco_coins, 5);

        // No cancelled pledge blocks a later attempt.
        let (_, balance) = db.record_pledge(&pledge(&uid, 3, PledgeType::Vote)).unwrap();
        assert!(balance.is_none());
    }

    #[test]
    fn second_active_pledge_is_rejected() {
        let db = test_support::db();
        let uid = test_support::user(&db, "v@x.io");
        db.record_pledge(&pledge(&uid, 1, PledgeType::Vote)).unwrap();
        let err = db.record_pledge(&pledge(&uid, 1, PledgeType::Volunteer)).unwrap_err();
        assert_eq!(err.downcast_ref::<LedgerError>(), Some(&LedgerError::AlreadyPledged));

        let summary = db.get_pledge_summary(&uid).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].pledge_type, "vote");
        assert_eq!(db.get_project_pledges(COMPOST).unwrap().len(), 1);
    }

    #[test]
    fn inactive_and_missing_projects_are_rejected() {
        let db = test_support::db();
        let uid = test_support::user(&db, "i@x.io");
        db.with_conn(|conn| {
            conn.execute("UPDATE projects SET status = 'completed' WHERE id = ?1", [COMPOST])?;
            Ok(())
        })
        .unwrap();

        let err = db.record_pledge(&pledge(&uid, 1, PledgeType::Vote)).unwrap_err();
        assert_eq!(err.downcast_ref::<LedgerError>(), Some(&LedgerError::ProjectInactive));

        let missing = NewPledge {
            project_id: "nope",
            ..pledge(&uid, 1, PledgeType::Vote)
        };
        let err = db.record_pledge(&missing).unwrap_err();
        assert_eq!(err.downcast_ref::<LedgerError>(), Some(&LedgerError::ProjectNotFound));
    }

    #[test]
    fn project_filters() {
        let db = test_support::db();
        assert_eq!(db.list_projects(None, Some("active")).unwrap().len(), 3);
        assert_eq!(db.list_projects(Some("Education"), Some("active")).unwrap().len(), 1);
        assert!(db.list_projects(None, Some("completed")).unwrap().is_empty());
    }

    #[test]
    fn community_project_participation_and_submission() {
        let db = test_support::db();
        let creator = test_support::user(&db, "c@x.io");
        let helper = test_support::user(&db, "h@x.io");

        let project = db
            .create_community_project(&creator, "Seed swap", "Swap seeds", &["https://a".into()])
            .unwrap();
        assert_eq!(project.shared_links, vec!["https://a".to_string()]);

        assert_eq!(db.join_community_project(&project.id, &helper).unwrap(), (1, 5));
        let err = db.join_community_project(&project.id, &helper).unwrap_err();
        assert_eq!(err.downcast_ref::<LedgerError>(), Some(&LedgerError::AlreadyParticipated));

        let points = db
            .submit_community_project(&project.id, &helper, Some("https://proof"), None, &["https://b".into()])
            .unwrap();
        assert_eq!(points, 15);

        let project = db.get_community_project(&project.id).unwrap().unwrap();
        assert_eq!(project.shared_links.len(), 2);
        assert_eq!(project.participants, 1);
        assert_eq!(db.list_community_projects().unwrap().len(), 1);
    }
}
