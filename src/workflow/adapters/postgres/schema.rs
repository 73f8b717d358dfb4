//! Diesel schema for workflow persistence.

diesel::table! {
    /// Projects owning plans and tasks.
    projects (id) {
        /// Project identifier.
        id -> Uuid,
        /// Display name.
        name -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Workflow settings, one row per project.
    project_settings (project_id) {
        /// Owning project.
        project_id -> Uuid,
        /// Approvals required for plans.
        required_approvals_plan -> Int4,
        /// Approvals required for tasks.
        required_approvals_task -> Int4,
        /// Stored for external collaborators.
        auto_approve_main_updates -> Bool,
        /// Assigned reviewer hats as a JSON array of UUIDs.
        assigned_hats -> Jsonb,
    }
}

diesel::table! {
    /// Plans.
    plans (id) {
        /// Plan identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Title.
        #[max_length = 500]
        title -> Varchar,
        /// Generated or authored content.
        content -> Nullable<Text>,
        /// Workflow status.
        #[max_length = 32]
        status -> Varchar,
        /// Task that spawned the plan.
        parent_task_id -> Nullable<Uuid>,
        /// Optimistic concurrency version.
        version -> Int8,
        /// Generation progress.
        #[max_length = 32]
        processing_status -> Varchar,
        /// Last generation error.
        processing_error -> Nullable<Text>,
        /// Run identifier of the latest accepted generation job.
        generation_run_id -> Nullable<Uuid>,
        /// Kind of the latest accepted generation job.
        #[max_length = 32]
        generation_kind -> Nullable<Varchar>,
        /// Author.
        created_by -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tasks.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Plan the task belongs to.
        plan_id -> Nullable<Uuid>,
        /// Title.
        #[max_length = 500]
        title -> Varchar,
        /// Description.
        description -> Nullable<Text>,
        /// Workflow status.
        #[max_length = 32]
        status -> Varchar,
        /// Optimistic concurrency version.
        version -> Int8,
        /// Branch chosen by the session runner.
        branch -> Nullable<Text>,
        /// Worktree chosen by the session runner.
        worktree_path -> Nullable<Text>,
        /// Start of the latest coding session.
        session_started_at -> Nullable<Timestamptz>,
        /// End of the latest coding session.
        session_ended_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Blocking edges: `task_id` is blocked by `blocked_by_id`.
    task_blocking (task_id, blocked_by_id) {
        /// Dependent task.
        task_id -> Uuid,
        /// Blocking task.
        blocked_by_id -> Uuid,
    }
}

diesel::table! {
    /// Reviews of plans and tasks.
    reviews (id) {
        /// Review identifier.
        id -> Uuid,
        /// Project owning the reviewed item.
        project_id -> Uuid,
        /// Kind of reviewed item.
        #[max_length = 16]
        target_type -> Varchar,
        /// Identifier of the reviewed item.
        target_id -> Uuid,
        /// Reviewer.
        reviewer_id -> Uuid,
        /// Verdict.
        #[max_length = 32]
        decision -> Varchar,
        /// Optional comment.
        comment -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(project_settings -> projects (project_id));
diesel::joinable!(plans -> projects (project_id));
diesel::joinable!(tasks -> projects (project_id));
diesel::joinable!(reviews -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(
    projects,
    project_settings,
    plans,
    tasks,
    task_blocking,
    reviews,
);
