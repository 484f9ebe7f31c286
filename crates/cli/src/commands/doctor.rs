use caio_agent::AgentRuntime;
use caio_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{block_on, escape_json, CommandResult, EXIT_CONFIG, EXIT_FAILURE, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code_for(&report);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match AgentRuntime::from_config(&config) {
                Ok(runtime) => {
                    checks.push(DoctorCheck {
                        name: "agent_runtime",
                        status: CheckStatus::Pass,
                        details: format!(
                            "policy rendered with {} tools for the {} backend",
                            runtime.tools().len(),
                            runtime.llm().name()
                        ),
                    });
                    checks.push(check_model_backend(&runtime));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "agent_runtime",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("model_backend", "agent runtime did not initialize"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("agent_runtime", "configuration did not load"));
            checks.push(skipped("model_backend", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_model_backend(runtime: &AgentRuntime) -> DoctorCheck {
    let backend = runtime.llm().name();
    match block_on(runtime.llm().health_check()) {
        Ok(Ok(())) => DoctorCheck {
            name: "model_backend",
            status: CheckStatus::Pass,
            details: format!("{backend} backend reachable"),
        },
        Ok(Err(error)) => DoctorCheck {
            name: "model_backend",
            status: CheckStatus::Fail,
            details: format!("{backend} backend unreachable: {error}"),
        },
        Err(error) => DoctorCheck { name: "model_backend", status: CheckStatus::Fail, details: error },
    }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn exit_code_for(report: &DoctorReport) -> u8 {
    let config_failed = report
        .checks
        .iter()
        .any(|check| check.name == "config_validation" && check.status == CheckStatus::Fail);
    match report.overall_status {
        CheckStatus::Pass => EXIT_OK,
        _ if config_failed => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
