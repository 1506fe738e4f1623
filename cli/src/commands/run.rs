use std::collections::BTreeMap;

use qcheck_core::api::{
    self as core_api, AllChecksArgs, AppConfig, CheckOutcome, Orchestrator, StyleCheckArgs,
    TestCheckArgs, TypeCheckArgs,
};
use qcheck_core::config;

use crate::error::{CliError, EXIT_CLEAN, EXIT_ISSUES};

use super::cli::{AllArgs, Args, Commands, TestArgs};

/// Runs the selected command, prints its report and returns the exit status.
pub async fn dispatch(args: Args) -> Result<i32, CliError> {
    let cfg = load_config(&args)?;

    if let Commands::Config = args.command {
        let text = toml::to_string_pretty(&cfg)
            .map_err(|e| CliError::InvalidArg(format!("config cannot be printed: {e}")))?;
        print!("{text}");
        return Ok(EXIT_CLEAN);
    }

    let orchestrator = Orchestrator::new(cfg);
    let show_details = args.show_details;
    let policy = orchestrator.policy(show_details);

    match args.command {
        Commands::Test(t) => {
            let outcome = orchestrator.test_check(&test_args(&t, show_details)?).await?;
            Ok(print_outcome(&outcome, &policy))
        }
        Commands::Types(t) => {
            let call = TypeCheckArgs {
                strict: t.strict,
                disabled_codes: t.disable_error_code,
                target_dirs: t.targets,
                show_details,
            };
            let outcome = orchestrator.type_check(&call).await?;
            Ok(print_outcome(&outcome, &policy))
        }
        Commands::Style(s) => {
            let call = StyleCheckArgs {
                target_dirs: s.targets,
                show_details,
            };
            let outcome = orchestrator.style_check(&call).await?;
            Ok(print_outcome(&outcome, &policy))
        }
        Commands::All(a) => {
            let call = all_args(&a, show_details)?;
            let outcome = orchestrator.all_checks(&call).await;
            println!("{}", outcome.render(&policy));
            Ok(if outcome.is_clean() {
                EXIT_CLEAN
            } else {
                EXIT_ISSUES
            })
        }
        Commands::Config => Ok(EXIT_CLEAN),
    }
}

fn load_config(args: &Args) -> Result<AppConfig, CliError> {
    let mut cfg = match &args.config {
        Some(path) => core_api::load_from_path(path)?,
        None => core_api::load_default()?,
    };
    if let Some(n) = args.max_failures {
        cfg.display.max_failures = n;
    }
    if let Some(n) = args.max_output_lines {
        cfg.display.max_output_lines = n;
    }
    config::validate(&cfg)?;
    Ok(cfg)
}

fn print_outcome(outcome: &CheckOutcome, policy: &core_api::DisplayPolicy) -> i32 {
    println!("{}", outcome.render(policy));
    if outcome.is_clean() {
        EXIT_CLEAN
    } else {
        EXIT_ISSUES
    }
}

fn test_args(t: &TestArgs, show_details: bool) -> Result<TestCheckArgs, CliError> {
    Ok(TestCheckArgs {
        markers: t.markers.clone(),
        verbosity: t.verbose,
        extra_args: t.extra_args.clone(),
        env_vars: parse_env_pairs(&t.env)?,
        show_details,
    })
}

fn all_args(a: &AllArgs, show_details: bool) -> Result<AllChecksArgs, CliError> {
    Ok(AllChecksArgs {
        test: test_args(&a.test, show_details)?,
        types: TypeCheckArgs {
            strict: a.strict,
            show_details,
            ..TypeCheckArgs::default()
        },
        style: StyleCheckArgs {
            show_details,
            ..StyleCheckArgs::default()
        },
        show_details,
    })
}

/// `KEY=VALUE` pairs; later duplicates win.
pub fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    let mut out = BTreeMap::new();
    for raw in pairs {
        let Some((k, v)) = raw.split_once('=') else {
            return Err(CliError::InvalidArg(format!(
                "--env expects KEY=VALUE, got {raw:?}"
            )));
        };
        let k = k.trim();
        if k.is_empty() {
            return Err(CliError::InvalidArg(format!("--env has an empty key: {raw:?}")));
        }
        out.insert(k.to_string(), v.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn env_pairs_parse_and_reject_garbage() {
        let ok = parse_env_pairs(&["A=1".into(), "B=x=y".into(), "A=2".into()]).unwrap();
        assert_eq!(ok.get("A").map(String::as_str), Some("2"));
        assert_eq!(ok.get("B").map(String::as_str), Some("x=y"));

        assert!(matches!(
            parse_env_pairs(&["NOEQUALS".into()]),
            Err(CliError::InvalidArg(_))
        ));
        assert!(matches!(
            parse_env_pairs(&["=v".into()]),
            Err(CliError::InvalidArg(_))
        ));
    }
}
