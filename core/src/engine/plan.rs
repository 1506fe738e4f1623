//! Builds the command line for each tool from configuration plus call
//! arguments. Pure; nothing here touches the filesystem.

use std::path::Path;

use crate::config::AppConfig;
use crate::report::ToolKind;
use crate::runner::ExecutionRequest;

use super::types::{StyleCheckArgs, TestCheckArgs, TypeCheckArgs};

pub fn plan_test(cfg: &AppConfig, args: &TestCheckArgs, detail_capture: bool) -> ExecutionRequest {
    let tool = &cfg.tools.pytest;
    let mut argv: Vec<String> = tool.args.clone();

    argv.push("-rA".to_string());
    argv.push("--tb=short".to_string());
    argv.push(if detail_capture {
        "--show-capture=all".to_string()
    } else {
        "--show-capture=no".to_string()
    });

    if let Some(m) = args.markers.as_deref().map(str::trim) {
        if !m.is_empty() {
            argv.push("-m".to_string());
            argv.push(m.to_string());
        }
    }
    for _ in 0..args.verbosity {
        argv.push("-v".to_string());
    }
    argv.extend(args.extra_args.iter().cloned());
    argv.extend(tool.target_dirs.iter().cloned());

    let mut req = base_request(cfg, ToolKind::Test)
        .with_args(argv)
        .with_detail_capture(detail_capture);
    // call-level env wins over configured env
    for (k, v) in &args.env_vars {
        req = req.with_env(k, v);
    }
    req
}

pub fn plan_type(cfg: &AppConfig, args: &TypeCheckArgs) -> ExecutionRequest {
    let tool = &cfg.tools.mypy;
    let mut argv: Vec<String> = tool.args.clone();

    argv.push("--no-color-output".to_string());
    argv.push("--show-error-codes".to_string());
    if args.strict {
        argv.push("--strict".to_string());
    }
    for code in args.disabled_codes.iter().filter(|c| !c.trim().is_empty()) {
        argv.push("--disable-error-code".to_string());
        argv.push(code.trim().to_string());
    }
    argv.extend(targets(&args.target_dirs, &tool.target_dirs));

    base_request(cfg, ToolKind::Type).with_args(argv)
}

pub fn plan_style(cfg: &AppConfig, args: &StyleCheckArgs) -> ExecutionRequest {
    let tool = &cfg.tools.ruff;
    let mut argv: Vec<String> = vec![
        "check".to_string(),
        "--output-format=json".to_string(),
        "--no-fix".to_string(),
    ];
    argv.extend(tool.args.iter().cloned());
    argv.extend(targets(&args.target_dirs, &tool.target_dirs));

    base_request(cfg, ToolKind::Style).with_args(argv)
}

/// Call targets, else configured targets, else the project root.
fn targets(call: &[String], configured: &[String]) -> Vec<String> {
    let pick = if call.is_empty() { configured } else { call };
    if pick.is_empty() {
        vec![".".to_string()]
    } else {
        pick.to_vec()
    }
}

fn base_request(cfg: &AppConfig, kind: ToolKind) -> ExecutionRequest {
    let tool = cfg.tools.get(kind);
    let program = tool.program_or(kind);
    let mut req = ExecutionRequest::new(tool_label(&program, kind), program)
        .with_timeout_secs(tool.timeout_or(kind));
    if let Some(root) = &cfg.project_root {
        req = req.with_cwd(root);
    }
    for (k, v) in &tool.env {
        req = req.with_env(k, v);
    }
    req
}

/// `.venv/bin/pytest` -> `pytest`; falls back to the tool's usual name.
pub fn tool_label(program: &str, kind: ToolKind) -> String {
    Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_program().to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pytest_args_follow_call_and_config() {
        let mut cfg = AppConfig::default();
        cfg.project_root = Some(PathBuf::from("/work"));
        cfg.tools.pytest.args = vec!["-p".into(), "no:cacheprovider".into()];
        cfg.tools.pytest.env.insert("A".into(), "cfg".into());
        let args = TestCheckArgs {
            markers: Some("not slow".into()),
            verbosity: 2,
            extra_args: vec!["-k".into(), "div".into()],
            env_vars: [("A".to_string(), "call".to_string())].into_iter().collect(),
            show_details: true,
        };
        let req = plan_test(&cfg, &args, true);
        assert_eq!(
            req.args,
            vec![
                "-p",
                "no:cacheprovider",
                "-rA",
                "--tb=short",
                "--show-capture=all",
                "-m",
                "not slow",
                "-v",
                "-v",
                "-k",
                "div",
            ]
        );
        assert_eq!(req.program, "pytest");
        assert_eq!(req.tool, "pytest");
        assert_eq!(req.timeout_secs, 600);
        assert_eq!(req.cwd, Some(PathBuf::from("/work")));
        assert_eq!(req.env.get("A").map(String::as_str), Some("call"));
        assert!(req.detail_capture);
    }

    #[test]
    fn pytest_capture_off_without_details() {
        let req = plan_test(&AppConfig::default(), &TestCheckArgs::default(), false);
        assert!(req.args.contains(&"--show-capture=no".to_string()));
        assert!(!req.detail_capture);
    }

    #[test]
    fn mypy_args_and_target_precedence() {
        let mut cfg = AppConfig::default();
        cfg.tools.mypy.target_dirs = vec!["src".into()];
        let args = TypeCheckArgs {
            strict: true,
            disabled_codes: vec!["import-untyped".into(), " ".into()],
            ..TypeCheckArgs::default()
        };
        let req = plan_type(&cfg, &args);
        assert_eq!(
            req.args,
            vec![
                "--no-color-output",
                "--show-error-codes",
                "--strict",
                "--disable-error-code",
                "import-untyped",
                "src",
            ]
        );

        let args = TypeCheckArgs {
            target_dirs: vec!["pkg".into()],
            ..TypeCheckArgs::default()
        };
        assert_eq!(plan_type(&cfg, &args).args.last().map(String::as_str), Some("pkg"));
        assert_eq!(plan_type(&cfg, &args).timeout_secs, 180);
    }

    #[test]
    fn ruff_defaults_to_project_root() {
        let req = plan_style(&AppConfig::default(), &StyleCheckArgs::default());
        assert_eq!(req.args, vec!["check", "--output-format=json", "--no-fix", "."]);
        assert_eq!(req.timeout_secs, 60);
    }

    #[test]
    fn labels_come_from_program_stem() {
        assert_eq!(tool_label(".venv/bin/pytest", ToolKind::Test), "pytest");
        assert_eq!(tool_label("C:/py/Scripts/mypy.exe", ToolKind::Type), "mypy");
        assert_eq!(tool_label("", ToolKind::Style), "ruff");
    }
}
