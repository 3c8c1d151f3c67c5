use junit_report::{Duration, Report, ReportBuilder, TestCase, TestCaseBuilder, TestSuiteBuilder};
use std::fs::File;
use std::path::Path;

use crate::error::ReportError;
use crate::report::{ScenarioReport, StepOutcome, Verdict};

fn test_case(step: &StepOutcome, clock_period_ps: u64) -> TestCase {
    let ticks = match (step.accepted_at, step.completed_at) {
        (Some(a), Some(c)) => c.saturating_sub(a),
        _ => 0,
    };
    // sim time of the step, reported in seconds
    let duration = Duration::seconds_f64(ticks.saturating_mul(clock_period_ps) as f64 * 1e-12);
    let name = step.name();
    match step.verdict {
        Verdict::Passed => TestCaseBuilder::success(&name, duration),
        Verdict::SlaveError | Verdict::Mismatch { .. } => TestCaseBuilder::failure(
            &name,
            duration,
            "failure",
            &step.verdict.to_string(),
        ),
        Verdict::Incomplete(_) => {
            TestCaseBuilder::error(&name, duration, "incomplete", &step.verdict.to_string())
        }
        Verdict::NotRun => TestCaseBuilder::skipped(&name),
    }
    .build()
}

pub fn build_report(report: &ScenarioReport, clock_period_ps: u64) -> Report {
    let test_cases: Vec<TestCase> = report
        .steps
        .iter()
        .map(|s| test_case(s, clock_period_ps))
        .collect();
    let test_suite = TestSuiteBuilder::new(&report.name)
        .add_testcases(test_cases)
        .build();
    ReportBuilder::new().add_testsuite(test_suite).build()
}

pub fn write_junit_xml<P: AsRef<Path>>(
    report: &ScenarioReport,
    clock_period_ps: u64,
    path: P,
) -> Result<(), ReportError> {
    let file = File::create(path)?;
    build_report(report, clock_period_ps)
        .write_xml(file)
        .map_err(|e| ReportError::Junit(format!("{:?}", e)))
}
