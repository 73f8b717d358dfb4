//! Generation bookkeeping on plans.
//!
//! Results are matched against the run recorded on the plan. A result for
//! any other run, or for a plan that is no longer generating, changes
//! nothing; this makes redelivered results harmless.

use super::{ProjectBoard, TaskDraft};
use crate::workflow::domain::{
    BlockerResolution, GenerationKind, GenerationRun, GenerationRunId, HasStatus, Plan, PlanId,
    TaskId, Title, Version, WorkflowDomainError,
};
use chrono::{DateTime, Utc};

/// One task produced by a task-breakdown job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownTask {
    /// Validated title.
    pub title: Title,
    /// Description, if any.
    pub description: Option<String>,
    /// Positions of earlier tasks in the same breakdown that block this one.
    pub blocked_by_indices: Vec<usize>,
}

impl ProjectBoard {
    /// Claims a plan for a new generation job and records the run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::GenerationInFlight`] while another job
    /// runs, the breakdown preconditions from [`Plan::begin_generation`], and
    /// not-found or stale-version errors.
    pub fn claim_generation(
        &mut self,
        plan_id: PlanId,
        kind: GenerationKind,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<GenerationRun, WorkflowDomainError> {
        let plan = self.plan_mut(plan_id)?;
        plan.ensure_version(expected)?;
        plan.begin_generation(kind, now)
    }

    /// Records a failure for `run`. Returns whether the plan was waiting on
    /// that run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::PlanNotFound`] for unknown plans.
    pub fn fail_generation(
        &mut self,
        plan_id: PlanId,
        run: GenerationRunId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WorkflowDomainError> {
        let plan = self.plan_mut(plan_id)?;
        if !plan.awaits_run(run) {
            return Ok(false);
        }
        plan.fail_generation(error, now);
        Ok(true)
    }

    /// Marks the plan's in-flight job as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::NotGenerating`] when no job is running,
    /// and not-found or stale-version errors.
    pub fn cancel_generation(
        &mut self,
        plan_id: PlanId,
        expected: Option<Version>,
        now: DateTime<Utc>,
    ) -> Result<&Plan, WorkflowDomainError> {
        let plan = self.plan_mut(plan_id)?;
        plan.ensure_version(expected)?;
        plan.cancel_generation(now)?;
        Ok(plan)
    }

    /// Stores generated plan content for `run`. Returns whether it was
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::GenerationKindMismatch`] when `run` is
    /// a task-breakdown job, and not-found errors.
    pub fn apply_plan_content(
        &mut self,
        plan_id: PlanId,
        run: GenerationRunId,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<bool, WorkflowDomainError> {
        if !self.awaiting(plan_id, run, GenerationKind::PlanContent)? {
            return Ok(false);
        }
        self.plan_mut(plan_id)?.complete_generation(Some(content), now);
        Ok(true)
    }

    /// Creates the tasks of a breakdown for `run`, in list order, inside the
    /// plan.
    ///
    /// Indices that do not point at an earlier list position are dropped.
    /// Returns the created task ids, or `None` when the result was not for
    /// the plan's active run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::GenerationKindMismatch`] when `run` is
    /// a plan-content job, and not-found errors.
    pub fn apply_task_breakdown(
        &mut self,
        plan_id: PlanId,
        run: GenerationRunId,
        breakdown: Vec<BreakdownTask>,
        resolution: BlockerResolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<TaskId>>, WorkflowDomainError> {
        if !self.awaiting(plan_id, run, GenerationKind::TaskBreakdown)? {
            return Ok(None);
        }

        let mut created: Vec<TaskId> = Vec::with_capacity(breakdown.len());
        for (position, item) in breakdown.into_iter().enumerate() {
            let blockers: Vec<TaskId> = item
                .blocked_by_indices
                .iter()
                .filter(|&&index| index < position)
                .filter_map(|&index| created.get(index).copied())
                .collect();
            let mut draft = TaskDraft::new(item.title)
                .with_plan(plan_id)
                .with_blockers(blockers);
            draft.description = item.description;
            let id = self.create_task(draft, resolution, now)?.id();
            created.push(id);
        }

        self.plan_mut(plan_id)?.complete_generation(None, now);
        Ok(Some(created))
    }

    fn awaiting(
        &self,
        plan_id: PlanId,
        run: GenerationRunId,
        kind: GenerationKind,
    ) -> Result<bool, WorkflowDomainError> {
        let plan = self.require_plan(plan_id)?;
        if !plan.awaits_run(run) {
            return Ok(false);
        }
        match plan.generation_run() {
            Some(active) if active.kind != kind => Err(WorkflowDomainError::GenerationKindMismatch {
                plan_id,
                expected: active.kind,
                actual: kind,
            }),
            _ => Ok(true),
        }
    }
}
