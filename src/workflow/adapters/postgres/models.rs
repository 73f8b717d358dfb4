//! Diesel row models for workflow persistence.

use super::schema::{plans, project_settings, projects, reviews, task_blocking, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Project row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    /// Project identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Project settings row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = project_settings)]
#[diesel(primary_key(project_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectSettingsRow {
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Approvals required for plans.
    pub required_approvals_plan: i32,
    /// Approvals required for tasks.
    pub required_approvals_task: i32,
    /// Stored for external collaborators.
    pub auto_approve_main_updates: bool,
    /// JSON array of hat UUIDs.
    pub assigned_hats: Value,
}

/// Plan row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = plans)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlanRow {
    /// Plan identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Content.
    pub content: Option<String>,
    /// Workflow status.
    pub status: String,
    /// Task that spawned the plan.
    pub parent_task_id: Option<uuid::Uuid>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Generation progress.
    pub processing_status: String,
    /// Last generation error.
    pub processing_error: Option<String>,
    /// Latest generation run.
    pub generation_run_id: Option<uuid::Uuid>,
    /// Kind of the latest generation run.
    pub generation_kind: Option<String>,
    /// Author.
    pub created_by: Option<uuid::Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Task row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Plan link.
    pub plan_id: Option<uuid::Uuid>,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: String,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Branch name.
    pub branch: Option<String>,
    /// Worktree path.
    pub worktree_path: Option<String>,
    /// Latest session start.
    pub session_started_at: Option<DateTime<Utc>>,
    /// Latest session end.
    pub session_ended_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Blocking edge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_blocking)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockingRow {
    /// Dependent task.
    pub task_id: uuid::Uuid,
    /// Blocking task.
    pub blocked_by_id: uuid::Uuid,
}

/// Review row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    /// Review identifier.
    pub id: uuid::Uuid,
    /// Project owning the reviewed item.
    pub project_id: uuid::Uuid,
    /// Kind of reviewed item.
    pub target_type: String,
    /// Identifier of the reviewed item.
    pub target_id: uuid::Uuid,
    /// Reviewer.
    pub reviewer_id: uuid::Uuid,
    /// Verdict.
    pub decision: String,
    /// Optional comment.
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
