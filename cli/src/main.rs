use clap::Parser;

mod commands;
mod error;
mod logging;

use commands::cli;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    let guard = match logging::init(args.log_file.as_deref()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("qcheck: {e:#}");
            std::process::exit(error::EXIT_USAGE);
        }
    };

    let code = match commands::run::dispatch(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                target: "qcheck.cli",
                exit_code = error::EXIT_USAGE,
                error.kind = "cli",
                error.message = %e,
                "command failed"
            );
            eprintln!("qcheck: {e}");
            error::EXIT_USAGE
        }
    };

    // flush the file sink before exiting
    drop(guard);
    std::process::exit(code);
}
