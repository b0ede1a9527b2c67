use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use recircle_db::models::{CommunityProjectRow, PledgeRow, ProjectRow};
use recircle_db::queries::NewPledge;
use recircle_types::api::{
    Claims, CoinBalance, CommunityProjectListResponse, CommunityProjectResponse,
    CreateCommunityProjectRequest, CreateCommunityProjectResponse, ParticipateProjectResponse,
    PledgeHistoryResponse, PledgeProjectSummary, PledgeRequest, PledgeTypeSummary,
    ProjectListResponse, ProjectParticipants, ProjectQuery, ProjectResponse, RecordPledgeResponse,
    SubmitProjectRequest, SubmitProjectResponse, UserPledge, UserPoints,
};
use recircle_types::models::PledgeType;

use crate::convert::{self, non_empty};
use crate::error::ApiError;
use crate::state::{AppState, blocking};

const DEFAULT_STATUS: &str = "active";
const ALL_CATEGORIES: &str = "all";

/// Funding progress as a percentage of the goal, capped at 100.
fn progress_percentage(total: i64, goal: i64) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    (total as f64 / goal as f64 * 100.0).min(100.0)
}

fn project_with_stats(project: ProjectRow, pledges: &[PledgeRow]) -> ProjectResponse {
    let total_amount: i64 = pledges.iter().map(|p| p.pledge_amount).sum();
    let mut pledge_types = BTreeMap::new();
    for p in pledges {
        *pledge_types.entry(p.pledge_type.clone()).or_insert(0) += 1;
    }

    ProjectResponse {
        id: convert::uuid(&project.id, "project id"),
        created_at: convert::timestamp(&project.created_at, &project.id),
        progress_percentage: progress_percentage(total_amount, project.goal_amount),
        total_pledges: pledges.len() as i64,
        total_amount,
        pledge_types,
        title: project.title,
        description: project.description,
        category: project.category,
        goal_amount: project.goal_amount,
        current_amount: project.current_amount,
        status: project.status,
    }
}

fn community_project(row: CommunityProjectRow) -> CommunityProjectResponse {
    CommunityProjectResponse {
        id: convert::uuid(&row.id, "community project id"),
        creator_id: convert::uuid(&row.creator_id, "creator id"),
        created_at: convert::timestamp(&row.created_at, &row.id),
        title: row.title,
        description: row.description,
        shared_links: row.shared_links,
        participants: row.participants,
    }
}

/// Drop blank links.
fn clean_links(links: Option<Vec<String>>) -> Vec<String> {
    links
        .unwrap_or_default()
        .into_iter()
        .filter_map(|l| non_empty(Some(l)))
        .collect()
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ProjectQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let category = non_empty(query.category).filter(|c| !c.eq_ignore_ascii_case(ALL_CATEGORIES));
    let status = non_empty(query.status).unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let projects = blocking(&state, move |db| {
        let projects = db.list_projects(category.as_deref(), Some(status.as_str()))?;
        projects
            .into_iter()
            .map(|p| {
                let pledges = db.get_project_pledges(&p.id)?;
                Ok(project_with_stats(p, &pledges))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(ProjectListResponse { projects }))
}

pub async fn pledge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<PledgeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(project_id), Some(amount), Some(pledge_type)) = (
        non_empty(req.project_id),
        req.pledge_amount.filter(|a| *a > 0),
        non_empty(req.pledge_type),
    ) else {
        return Err(ApiError::bad_request(
            "Project ID, pledge amount, and pledge type are required",
        ));
    };
    let pledge_type =
        PledgeType::parse(&pledge_type).ok_or_else(|| ApiError::bad_request("Invalid pledge type"))?;
    let message = non_empty(req.message);

    let uid = claims.sub.to_string();
    let (row, balance) = blocking(&state, move |db| {
        db.record_pledge(&NewPledge {
            user_id: &uid,
            project_id: &project_id,
            amount,
            pledge_type,
            message: message.as_deref(),
        })
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordPledgeResponse {
            message: "Pledge created successfully!".into(),
            pledge: convert::pledge(row),
            user_stats: balance.map(|eco_coins| CoinBalance { eco_coins }),
        }),
    ))
}

pub async fn pledges(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (rows, totals) = blocking(&state, move |db| {
        Ok((db.get_user_pledges(&uid)?, db.get_pledge_summary(&uid)?))
    })
    .await?;

    Ok(Json(PledgeHistoryResponse {
        pledges: rows
            .into_iter()
            .map(|(pledge, project)| UserPledge {
                pledge: convert::pledge(pledge),
                project: PledgeProjectSummary {
                    title: project.title,
                    description: project.description,
                    category: project.category,
                    status: project.status,
                    goal_amount: project.goal_amount,
                    current_amount: project.current_amount,
                },
            })
            .collect(),
        summary: totals
            .into_iter()
            .map(|t| PledgeTypeSummary {
                pledge_type: t.pledge_type,
                count: t.count,
                total_amount: t.total_amount,
            })
            .collect(),
    }))
}

pub async fn create_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateCommunityProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let (Some(title), Some(description)) = (non_empty(req.title), non_empty(req.description)) else {
        return Err(ApiError::bad_request("Title and description are required"));
    };
    let links = clean_links(req.shared_links);

    let uid = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        db.create_community_project(&uid, &title, &description, &links)
    })
    .await?;
    info!("Community project {} created by {}", row.id, row.creator_id);

    Ok((
        StatusCode::CREATED,
        Json(CreateCommunityProjectResponse {
            message: "Project created".into(),
            project: community_project(row),
        }),
    ))
}

pub async fn list_community(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| db.list_community_projects()).await?;
    Ok(Json(CommunityProjectListResponse {
        projects: rows.into_iter().map(community_project).collect(),
    }))
}

pub async fn participate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let pid = project_id.clone();
    let (participants, points) = blocking(&state, move |db| db.join_community_project(&pid, &uid)).await?;

    Ok(Json(ParticipateProjectResponse {
        message: "Participation recorded".into(),
        project: ProjectParticipants {
            id: convert::uuid(&project_id, "community project id"),
            participants,
        },
        user: UserPoints { points },
    }))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<String>,
    body: Result<Json<SubmitProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let proof_url = non_empty(req.proof_url);
    let note = non_empty(req.note);
    let links = clean_links(req.shared_links);

    let uid = claims.sub.to_string();
    let points = blocking(&state, move |db| {
        db.submit_community_project(&project_id, &uid, proof_url.as_deref(), note.as_deref(), &links)
    })
    .await?;

    Ok(Json(SubmitProjectResponse {
        message: "Submission recorded and points awarded".into(),
        user: UserPoints { points },
    }))
}
