//! Runtime configuration loaded from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [workflow]
//! resolution = "merged_only"
//! task_approval = "staged"
//! default_required_approvals_plan = 2
//!
//! [logging]
//! format = "json"
//! ```

use crate::workflow::{
    domain::{
        ApprovalThreshold, BlockerResolution, ProjectSettings, TaskApprovalMode, WorkflowRules,
    },
    services::{DEFAULT_SPAWN_TITLE, PlanTitleTemplate},
};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Overrides the database URL.
pub const DATABASE_URL_ENV: &str = "ATELIER_DATABASE_URL";
/// Overrides the log filter.
pub const LOG_FILTER_ENV: &str = "ATELIER_LOG";
/// Overrides whether generation jobs may start.
pub const GENERATION_ENABLED_ENV: &str = "ATELIER_GENERATION_ENABLED";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Workflow policy defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Which blocker statuses release dependents.
    pub resolution: BlockerResolution,
    /// Whether task approval passes through `approved`.
    pub task_approval: TaskApprovalMode,
    /// Template for titles of plans spawned from tasks.
    pub spawn_plan_title: String,
    /// Plan approvals required by newly created projects.
    pub default_required_approvals_plan: u32,
    /// Task approvals required by newly created projects.
    pub default_required_approvals_task: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            resolution: BlockerResolution::default(),
            task_approval: TaskApprovalMode::default(),
            spawn_plan_title: DEFAULT_SPAWN_TITLE.to_owned(),
            default_required_approvals_plan: ApprovalThreshold::DEFAULT.value(),
            default_required_approvals_task: ApprovalThreshold::DEFAULT.value(),
        }
    }
}

/// AI generation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// When false, generation requests fail as unavailable.
    pub enabled: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// `PostgreSQL` connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `None` selects the in-memory repository.
    pub url: Option<String>,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 8,
        }
    }
}

/// Formatter used for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtelierConfig {
    /// Workflow policies and project defaults.
    pub workflow: WorkflowConfig,
    /// Generation switches.
    pub generation: GenerationConfig,
    /// Database connection.
    pub database: DatabaseConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl AtelierConfig {
    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// as [`AtelierConfig::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_string(),
            source,
        };
        let file_name = path.file_name().ok_or_else(|| {
            io_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path must include a file name",
            ))
        })?;
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        let text = dir.read_to_string(file_name).map_err(io_error)?;
        Self::from_toml_str(&text)
    }

    /// Applies `ATELIER_*` environment overrides and revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `ATELIER_*` names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.database.url = Some(url);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            self.logging.filter = filter;
        }
        if let Some(raw) = lookup(GENERATION_ENABLED_ENV) {
            self.generation.enabled = parse_flag(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{GENERATION_ENABLED_ENV} must be a boolean, got {raw:?}"))
            })?;
        }
        self.validate()
    }

    /// Checks values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero approval thresholds, a zero
    /// connection limit, or a spawn title template that does not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_settings()?;
        self.title_template()?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns the workflow rules.
    #[must_use]
    pub const fn rules(&self) -> WorkflowRules {
        WorkflowRules::new(self.workflow.resolution, self.workflow.task_approval)
    }

    /// Returns the settings given to projects created without explicit ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a threshold is zero.
    pub fn default_settings(&self) -> Result<ProjectSettings, ConfigError> {
        let threshold = |field: &str, value: u32| {
            ApprovalThreshold::new(value)
                .map_err(|err| ConfigError::Invalid(format!("workflow.{field}: {err}")))
        };
        Ok(ProjectSettings::with_thresholds(
            threshold(
                "default_required_approvals_plan",
                self.workflow.default_required_approvals_plan,
            )?,
            threshold(
                "default_required_approvals_task",
                self.workflow.default_required_approvals_task,
            )?,
        ))
    }

    /// Compiles the spawn title template.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the template does not compile.
    pub fn title_template(&self) -> Result<PlanTitleTemplate, ConfigError> {
        PlanTitleTemplate::new(self.workflow.spawn_plan_title.as_str())
            .map_err(|err| ConfigError::Invalid(format!("workflow.spawn_plan_title: {err}")))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
