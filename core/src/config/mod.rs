mod load;
mod types;

pub use load::{
    apply_env_overrides, load_default, load_from_path, parse_str, validate, DEFAULT_CONFIG_FILE,
};
pub use types::{
    default_timeout_secs, AppConfig, DisplayConfig, ExecutorConfig, ToolConfig, ToolsConfig,
};
