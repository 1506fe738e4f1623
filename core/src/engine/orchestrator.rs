use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::LaunchError;
use crate::parser;
use crate::report::{DisplayPolicy, ToolKind};
use crate::runner::{ExecutionRequest, Executor};

use super::plan;
use super::types::{
    AllChecksArgs, AllChecksOutcome, CheckOutcome, StyleCheckArgs, TestCheckArgs, TypeCheckArgs,
};

/// Entry point for the three checks. Holds configuration and one executor;
/// every call is independent and may run concurrently with others.
pub struct Orchestrator {
    cfg: AppConfig,
    executor: Executor,
}

impl Orchestrator {
    pub fn new(cfg: AppConfig) -> Self {
        let executor = Executor::new(&cfg.executor);
        Self { cfg, executor }
    }

    pub fn with_executor(cfg: AppConfig, executor: Executor) -> Self {
        Self { cfg, executor }
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn policy(&self, show_details: bool) -> DisplayPolicy {
        DisplayPolicy::from_config(&self.cfg.display, show_details)
    }

    fn detail_capture(&self, show_details: bool) -> bool {
        show_details && self.cfg.display.capture_on_details
    }

    pub async fn run_test_check(&self, args: TestCheckArgs) -> Result<String, LaunchError> {
        let outcome = self.test_check(&args).await?;
        Ok(outcome.render(&self.policy(args.show_details)))
    }

    pub async fn run_type_check(&self, args: TypeCheckArgs) -> Result<String, LaunchError> {
        let outcome = self.type_check(&args).await?;
        Ok(outcome.render(&self.policy(args.show_details)))
    }

    pub async fn run_style_check(&self, args: StyleCheckArgs) -> Result<String, LaunchError> {
        let outcome = self.style_check(&args).await?;
        Ok(outcome.render(&self.policy(args.show_details)))
    }

    /// Every tool named in `run_order`, concurrently. A tool that cannot be
    /// launched gets a line in its own section; the others are unaffected.
    pub async fn run_all(&self, args: AllChecksArgs) -> Result<String, LaunchError> {
        let outcome = self.all_checks(&args).await;
        Ok(outcome.render(&self.policy(args.show_details)))
    }

    pub async fn test_check(&self, args: &TestCheckArgs) -> Result<CheckOutcome, LaunchError> {
        let request = plan::plan_test(&self.cfg, args, self.detail_capture(args.show_details));
        self.check(ToolKind::Test, request).await
    }

    pub async fn type_check(&self, args: &TypeCheckArgs) -> Result<CheckOutcome, LaunchError> {
        self.check(ToolKind::Type, plan::plan_type(&self.cfg, args))
            .await
    }

    pub async fn style_check(&self, args: &StyleCheckArgs) -> Result<CheckOutcome, LaunchError> {
        self.check(ToolKind::Style, plan::plan_style(&self.cfg, args))
            .await
    }

    pub async fn all_checks(&self, args: &AllChecksArgs) -> AllChecksOutcome {
        let mut test = args.test.clone();
        test.show_details = args.show_details;

        // only the kinds named in run_order are launched
        let wants = |k: ToolKind| self.cfg.run_order.contains(&k);
        let (test, types, style) = tokio::join!(
            async {
                if wants(ToolKind::Test) {
                    Some(self.test_check(&test).await)
                } else {
                    None
                }
            },
            async {
                if wants(ToolKind::Type) {
                    Some(self.type_check(&args.types).await)
                } else {
                    None
                }
            },
            async {
                if wants(ToolKind::Style) {
                    Some(self.style_check(&args.style).await)
                } else {
                    None
                }
            },
        );

        let mut slots = [
            (ToolKind::Test, test),
            (ToolKind::Type, types),
            (ToolKind::Style, style),
        ];
        let mut sections = Vec::with_capacity(slots.len());
        for kind in &self.cfg.run_order {
            if let Some((_, slot)) = slots.iter_mut().find(|(k, _)| k == kind) {
                if let Some(result) = slot.take() {
                    sections.push((*kind, result));
                }
            }
        }
        AllChecksOutcome { sections }
    }

    /// Run one planned request and parse what came back.
    pub async fn check(
        &self,
        kind: ToolKind,
        request: ExecutionRequest,
    ) -> Result<CheckOutcome, LaunchError> {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(
            target: "qcheck.orchestrator",
            run_id = %run_id,
            tool = %request.tool,
            kind = %kind,
            program = %request.program,
            args = ?request.args,
            timeout_secs = request.timeout_secs,
            "check started"
        );

        let result = match self.executor.execute(&request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    target: "qcheck.orchestrator",
                    run_id = %run_id,
                    tool = %request.tool,
                    error.kind = "orchestrator.launch",
                    error.message = %e,
                    "check could not start"
                );
                return Err(e);
            }
        };

        let report = parser::parse(&result, kind).with_label(request.tool.clone());

        tracing::info!(
            target: "qcheck.orchestrator",
            run_id = %run_id,
            tool = %request.tool,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            duration_ms = result.duration_ms(),
            collected = report.summary.collected,
            failed = report.summary.failed,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            stdout_dropped_bytes = result.stdout_dropped_bytes,
            "check finished"
        );

        Ok(CheckOutcome {
            report,
            timed_out: result.timed_out,
            timeout_secs: request.timeout_secs,
            exit_code: result.exit_code,
        })
    }
}
