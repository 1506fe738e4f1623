use qcheck_core::api::{ConfigError, LaunchError};
use thiserror::Error;

/// Exit status when the run completed and nothing failed.
pub const EXIT_CLEAN: i32 = 0;
/// Issues were found, a tool failed or a tool timed out.
pub const EXIT_ISSUES: i32 = 1;
/// qcheck itself could not do its job.
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} ({})", .0.hint())]
    Launch(#[from] LaunchError),

    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_failure_carries_its_hint() {
        let err: CliError = LaunchError::new(
            "ruff",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        )
        .into();
        let msg = err.to_string();
        assert!(msg.starts_with("failed to launch"), "{msg}");
        assert!(msg.ends_with("(executable not found; check the tool path in qcheck.toml)"));
    }

    #[test]
    fn config_errors_pass_through() {
        let err: CliError = ConfigError::NotFound("qcheck.toml".into()).into();
        assert_eq!(err.to_string(), "config file not found: qcheck.toml");
    }
}
