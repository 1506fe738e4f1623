use thiserror::Error;

/// The analysis tool could not be started at all.
///
/// This is the only failure that escapes the orchestrator: timeouts, unparsable
/// output and tools that exit non-zero because they found problems are all
/// rendered as text instead.
#[derive(Debug, Error)]
#[error("failed to launch {program}: {source}")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

impl LaunchError {
    pub fn new(program: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            program: program.into(),
            source,
        }
    }

    /// Short hint for the most common causes, suitable for user-facing text.
    pub fn hint(&self) -> &'static str {
        match self.source.kind() {
            std::io::ErrorKind::NotFound => "executable not found; check the tool path in qcheck.toml",
            std::io::ErrorKind::PermissionDenied => "permission denied; check the executable bit",
            _ => "the operating system refused to start the process",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("config read error: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error")]
    Parse(#[source] anyhow::Error),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("env var invalid: {key}")]
    EnvInvalid {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}
