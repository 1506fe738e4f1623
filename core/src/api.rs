//! Stable re-exports for consumers (`cli` and any tool-registration layer).
//!
//! Prefer importing from `qcheck_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, DisplayConfig, ExecutorConfig, ToolConfig,
    DEFAULT_CONFIG_FILE,
};
pub use crate::engine::{
    AllChecksArgs, AllChecksOutcome, CheckOutcome, Orchestrator, StyleCheckArgs, TestCheckArgs,
    TypeCheckArgs,
};
pub use crate::error::{ConfigError, LaunchError};
pub use crate::report::{AnalysisReport, DisplayPolicy, ToolKind};
pub use crate::runner::{ExecutionRequest, ExecutionResult, Executor};
