use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Run pytest, mypy and ruff and print compact reports")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./qcheck.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Show each result with its captured output.
    #[arg(long, default_value_t = false, global = true)]
    pub show_details: bool,

    /// Overrides `display.max_failures`.
    #[arg(long, global = true)]
    pub max_failures: Option<usize>,

    /// Overrides `display.max_output_lines`.
    #[arg(long, global = true)]
    pub max_output_lines: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TestArgs {
    /// pytest marker expression (`-m`).
    #[arg(long, short = 'm')]
    pub markers: Option<String>,

    /// Repeat for more pytest verbosity.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Extra environment variables for pytest (KEY=VALUE).
    /// Can be specified multiple times.
    #[arg(long = "env", action = clap::ArgAction::Append)]
    pub env: Vec<String>,

    /// Passed to pytest unchanged, after `--`.
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TypesArgs {
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Error code to silence. Can be specified multiple times.
    #[arg(long = "disable-error-code", action = clap::ArgAction::Append)]
    pub disable_error_code: Vec<String>,

    /// Files or directories to check.
    pub targets: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Files or directories to lint.
    pub targets: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct AllArgs {
    #[command(flatten)]
    pub test: TestArgs,

    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the test suite.
    Test(TestArgs),
    /// Type-check with mypy.
    Types(TypesArgs),
    /// Lint with ruff.
    Style(StyleArgs),
    /// Run all three concurrently.
    All(AllArgs),
    /// Print the effective configuration.
    Config,
}
