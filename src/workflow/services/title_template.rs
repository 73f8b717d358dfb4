//! Title template for plans spawned from tasks.

use super::{WorkflowServiceError, WorkflowServiceResult};
use crate::workflow::domain::Task;
use minijinja::{Environment, context};

/// Default title of a spawned plan.
pub const DEFAULT_SPAWN_TITLE: &str = "Sub-plan: {{ title }}";

/// `minijinja` template rendering the title of a plan spawned from a task.
///
/// The template sees `title`, `description` and `task_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTitleTemplate {
    source: String,
}

impl PlanTitleTemplate {
    /// Compiles `source` once to reject syntax errors early.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::TitleTemplate`] when the template does
    /// not compile.
    pub fn new(source: impl Into<String>) -> WorkflowServiceResult<Self> {
        let template = Self {
            source: source.into(),
        };
        Environment::new()
            .template_from_str(&template.source)
            .map_err(template_error)?;
        Ok(template)
    }

    /// Returns the template source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the title for a plan spawned from `task`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::TitleTemplate`] when rendering fails.
    pub fn render(&self, task: &Task) -> WorkflowServiceResult<String> {
        Environment::new()
            .render_str(
                &self.source,
                context! {
                    title => task.title().as_str(),
                    description => task.description(),
                    task_id => task.id().to_string(),
                },
            )
            .map_err(template_error)
    }
}

impl Default for PlanTitleTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_SPAWN_TITLE.to_owned(),
        }
    }
}

fn template_error(err: minijinja::Error) -> WorkflowServiceError {
    WorkflowServiceError::TitleTemplate {
        reason: err.to_string(),
    }
}
