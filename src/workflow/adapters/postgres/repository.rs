//! `PostgreSQL` repository implementation for projects and workflow boards.

use super::{
    conversion::{
        plan_to_row, project_to_rows, review_to_row, row_to_plan, row_to_review, row_to_task,
        rows_to_project, task_to_row, version_to_db,
    },
    models::{BlockingRow, PlanRow, ProjectRow, ProjectSettingsRow, ReviewRow, TaskRow},
    schema::{plans, project_settings, projects, reviews, task_blocking, tasks},
};
use crate::workflow::{
    domain::{
        BoardChanges, Plan, PlanId, Project, ProjectBoard, ProjectId, Task, TaskId, Version,
        WorkItemRef,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::{BTreeSet, HashMap};

/// `PostgreSQL` connection pool type used by workflow adapters.
pub type WorkflowPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed workflow repository.
///
/// Units of work lock the project row with `SELECT ... FOR UPDATE`, so
/// mutations are serialized per project while other projects proceed.
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: WorkflowPgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkflowPgPool) -> Self {
        Self { pool }
    }

    /// Builds a pool of at most `max_connections` connections to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::Persistence`] when the pool cannot
    /// establish its initial connections.
    pub fn connect(url: &str, max_connections: u32) -> WorkflowRepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .map_err(WorkflowRepositoryError::persistence)?;
        Ok(Self::new(pool))
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkflowRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkflowRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkflowRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkflowRepositoryError::persistence)?
    }
}

/// Error carried out of a Diesel transaction running a unit of work.
enum UnitOfWorkError<E> {
    Work(E),
    Repository(WorkflowRepositoryError),
}

impl<E> From<DieselError> for UnitOfWorkError<E> {
    fn from(err: DieselError) -> Self {
        Self::Repository(WorkflowRepositoryError::persistence(err))
    }
}

impl<E> From<WorkflowRepositoryError> for UnitOfWorkError<E> {
    fn from(err: WorkflowRepositoryError) -> Self {
        Self::Repository(err)
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn store_project(&self, project: &Project) -> WorkflowRepositoryResult<()> {
        let project_id = project.id();
        let (project_row, settings_row) = project_to_rows(project)?;

        self.run_blocking(move |connection| {
            connection
                .transaction::<_, DieselError, _>(|tx| {
                    diesel::insert_into(projects::table)
                        .values(&project_row)
                        .execute(tx)?;
                    diesel::insert_into(project_settings::table)
                        .values(&settings_row)
                        .execute(tx)?;
                    Ok(())
                })
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkflowRepositoryError::DuplicateProject(project_id)
                    }
                    _ => WorkflowRepositoryError::persistence(err),
                })
        })
        .await
    }

    async fn find_project(&self, id: ProjectId) -> WorkflowRepositoryResult<Option<Project>> {
        self.run_blocking(move |connection| {
            let rows = projects::table
                .inner_join(project_settings::table)
                .filter(projects::id.eq(id.into_inner()))
                .select((ProjectRow::as_select(), ProjectSettingsRow::as_select()))
                .first::<(ProjectRow, ProjectSettingsRow)>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            rows.map(|(project, settings)| rows_to_project(project, settings))
                .transpose()
        })
        .await
    }

    async fn delete_project(&self, id: ProjectId) -> WorkflowRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(projects::table.find(id.into_inner()))
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            if deleted == 0 {
                return Err(WorkflowRepositoryError::ProjectNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn locate(&self, item: WorkItemRef) -> WorkflowRepositoryResult<Option<ProjectId>> {
        self.run_blocking(move |connection| {
            let owner = match item {
                WorkItemRef::Plan(id) => plans::table
                    .find(id.into_inner())
                    .select(plans::project_id)
                    .first::<uuid::Uuid>(connection)
                    .optional(),
                WorkItemRef::Task(id) => tasks::table
                    .find(id.into_inner())
                    .select(tasks::project_id)
                    .first::<uuid::Uuid>(connection)
                    .optional(),
            }
            .map_err(WorkflowRepositoryError::persistence)?;
            Ok(owner.map(ProjectId::from_uuid))
        })
        .await
    }

    async fn find_plan(&self, id: PlanId) -> WorkflowRepositoryResult<Option<Plan>> {
        self.run_blocking(move |connection| {
            let row = plans::table
                .find(id.into_inner())
                .select(PlanRow::as_select())
                .first::<PlanRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            row.map(row_to_plan).transpose()
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> WorkflowRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(WorkflowRepositoryError::persistence)?;
            let Some(task_row) = row else {
                return Ok(None);
            };
            let edges = load_edges(connection, vec![task_row.id])?;
            row_to_task(task_row, &edges).map(Some)
        })
        .await
    }

    async fn load_board(&self, project_id: ProjectId) -> WorkflowRepositoryResult<ProjectBoard> {
        self.run_blocking(move |connection| {
            let project = load_project(connection, project_id, false)?;
            load_board_for(connection, project)
        })
        .await
    }

    async fn transact<T, E, F>(&self, project_id: ProjectId, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut ProjectBoard) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<WorkflowRepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| UnitOfWorkError::Repository(WorkflowRepositoryError::persistence(err)))?;
            connection.transaction::<T, UnitOfWorkError<E>, _>(|tx| {
                let project = load_project(tx, project_id, true)?;
                let mut board = load_board_for(tx, project)?;
                let output = work(&mut board).map_err(UnitOfWorkError::Work)?;
                write_changes(tx, project_id, &board.changes())?;
                Ok(output)
            })
        })
        .await;

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(UnitOfWorkError::Work(err))) => Err(err),
            Ok(Err(UnitOfWorkError::Repository(err))) => Err(E::from(err)),
            Err(join_err) => Err(E::from(WorkflowRepositoryError::persistence(join_err))),
        }
    }
}

fn load_project(
    connection: &mut PgConnection,
    project_id: ProjectId,
    lock: bool,
) -> WorkflowRepositoryResult<Project> {
    let query = projects::table
        .find(project_id.into_inner())
        .select(ProjectRow::as_select());
    let project_row = if lock {
        query.for_update().first::<ProjectRow>(connection)
    } else {
        query.first::<ProjectRow>(connection)
    }
    .optional()
    .map_err(WorkflowRepositoryError::persistence)?
    .ok_or(WorkflowRepositoryError::ProjectNotFound(project_id))?;

    let settings_row = project_settings::table
        .find(project_id.into_inner())
        .select(ProjectSettingsRow::as_select())
        .first::<ProjectSettingsRow>(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    rows_to_project(project_row, settings_row)
}

fn load_board_for(
    connection: &mut PgConnection,
    project: Project,
) -> WorkflowRepositoryResult<ProjectBoard> {
    let project_uuid = project.id().into_inner();

    let plan_rows = plans::table
        .filter(plans::project_id.eq(project_uuid))
        .select(PlanRow::as_select())
        .load::<PlanRow>(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    let task_rows = tasks::table
        .filter(tasks::project_id.eq(project_uuid))
        .select(TaskRow::as_select())
        .load::<TaskRow>(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    let review_rows = reviews::table
        .filter(reviews::project_id.eq(project_uuid))
        .order(reviews::created_at.asc())
        .select(ReviewRow::as_select())
        .load::<ReviewRow>(connection)
        .map_err(WorkflowRepositoryError::persistence)?;

    let edges = load_edges(connection, task_rows.iter().map(|row| row.id).collect())?;

    let stored_plans = plan_rows
        .into_iter()
        .map(row_to_plan)
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
    let stored_tasks = task_rows
        .into_iter()
        .map(|row| row_to_task(row, &edges))
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
    let stored_reviews = review_rows
        .into_iter()
        .map(row_to_review)
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;

    Ok(ProjectBoard::load(
        project,
        stored_plans,
        stored_tasks,
        stored_reviews,
    ))
}

fn load_edges(
    connection: &mut PgConnection,
    task_ids: Vec<uuid::Uuid>,
) -> WorkflowRepositoryResult<HashMap<uuid::Uuid, BTreeSet<TaskId>>> {
    if task_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = task_blocking::table
        .filter(task_blocking::task_id.eq_any(task_ids))
        .select(BlockingRow::as_select())
        .load::<BlockingRow>(connection)
        .map_err(WorkflowRepositoryError::persistence)?;

    let mut edges: HashMap<uuid::Uuid, BTreeSet<TaskId>> = HashMap::new();
    for row in rows {
        edges
            .entry(row.task_id)
            .or_default()
            .insert(TaskId::from_uuid(row.blocked_by_id));
    }
    Ok(edges)
}

fn write_changes(
    connection: &mut PgConnection,
    project_id: ProjectId,
    changes: &BoardChanges<'_>,
) -> WorkflowRepositoryResult<()> {
    if changes.is_empty() {
        return Ok(());
    }

    if let Some(project) = changes.project {
        let (project_row, settings_row) = project_to_rows(project)?;
        diesel::update(projects::table.find(project_row.id))
            .set((
                projects::name.eq(&project_row.name),
                projects::updated_at.eq(project_row.updated_at),
            ))
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
        diesel::update(project_settings::table.find(settings_row.project_id))
            .set(&settings_row)
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    let new_plans = changes
        .created_plans
        .iter()
        .map(|plan| plan_to_row(plan))
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
    if !new_plans.is_empty() {
        diesel::insert_into(plans::table)
            .values(&new_plans)
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    let new_tasks = changes
        .created_tasks
        .iter()
        .map(|task| task_to_row(task))
        .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
    if !new_tasks.is_empty() {
        diesel::insert_into(tasks::table)
            .values(&new_tasks)
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    for (plan, expected) in &changes.updated_plans {
        let row = plan_to_row(plan)?;
        let updated = diesel::update(
            plans::table
                .filter(plans::id.eq(row.id))
                .filter(plans::version.eq(version_to_db(*expected)?)),
        )
        .set(&row)
        .execute(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
        ensure_swapped(updated, WorkItemRef::Plan(plan.id()), *expected)?;
    }

    for update in &changes.updated_tasks {
        let row = task_to_row(update.task)?;
        let updated = diesel::update(
            tasks::table
                .filter(tasks::id.eq(row.id))
                .filter(tasks::version.eq(version_to_db(update.expected)?)),
        )
        .set(&row)
        .execute(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
        ensure_swapped(updated, WorkItemRef::Task(update.task.id()), update.expected)?;

        if update.blockers_changed {
            diesel::delete(task_blocking::table.filter(task_blocking::task_id.eq(row.id)))
                .execute(connection)
                .map_err(WorkflowRepositoryError::persistence)?;
            insert_edges(connection, update.task)?;
        }
    }

    for task in &changes.created_tasks {
        insert_edges(connection, task)?;
    }

    let new_reviews: Vec<ReviewRow> = changes
        .created_reviews
        .iter()
        .map(|review| review_to_row(review, project_id))
        .collect();
    if !new_reviews.is_empty() {
        diesel::insert_into(reviews::table)
            .values(&new_reviews)
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    let deleted_targets: Vec<uuid::Uuid> = changes
        .deleted_items()
        .into_iter()
        .map(WorkItemRef::uuid)
        .collect();
    if !deleted_targets.is_empty() {
        diesel::delete(reviews::table.filter(reviews::target_id.eq_any(deleted_targets)))
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    let deleted_tasks: Vec<uuid::Uuid> = changes
        .deleted_tasks
        .iter()
        .map(|id| id.into_inner())
        .collect();
    if !deleted_tasks.is_empty() {
        diesel::delete(tasks::table.filter(tasks::id.eq_any(deleted_tasks)))
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    let deleted_plans: Vec<uuid::Uuid> = changes
        .deleted_plans
        .iter()
        .map(|id| id.into_inner())
        .collect();
    if !deleted_plans.is_empty() {
        diesel::delete(plans::table.filter(plans::id.eq_any(deleted_plans)))
            .execute(connection)
            .map_err(WorkflowRepositoryError::persistence)?;
    }

    Ok(())
}

fn insert_edges(connection: &mut PgConnection, task: &Task) -> WorkflowRepositoryResult<()> {
    let rows: Vec<BlockingRow> = task
        .blocked_by()
        .iter()
        .map(|blocker| BlockingRow {
            task_id: task.id().into_inner(),
            blocked_by_id: blocker.into_inner(),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    diesel::insert_into(task_blocking::table)
        .values(&rows)
        .execute(connection)
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(())
}

fn ensure_swapped(
    updated: usize,
    item: WorkItemRef,
    expected: Version,
) -> WorkflowRepositoryResult<()> {
    if updated == 0 {
        Err(WorkflowRepositoryError::StaleVersion { item, expected })
    } else {
        Ok(())
    }
}
