mod capture;
mod executor;
pub mod exit;
mod tee;
pub mod tree;
mod types;

pub use capture::{CaptureBuffer, DEFAULT_CAPTURE_BYTES};
pub use executor::Executor;
pub use tree::{detect_terminator, TerminateError, TreeTerminator};
pub use types::{ExecutionRequest, ExecutionResult, DEFAULT_TIMEOUT_SECS};
