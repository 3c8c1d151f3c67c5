pub mod config;
pub mod engine;
pub mod error;
pub mod junit;
pub mod model;
pub mod prelude;
pub mod report;
pub mod scenario;
pub mod scoreboard;
pub mod signal;
pub mod sim_if;
pub mod testbench;
pub mod trace;

use log::{info, warn};

use prelude::*;

/// Runs `scenario` on a fresh engine against `tb`, with tracing, report
/// logging and JUnit output as configured.
pub fn run_scenario<U: DrivenUnit>(
    scenario: &Scenario,
    tb: &mut Testbench<U>,
    cfg: &TbConfig,
) -> ScenarioReport {
    let mut engine = ApbEngine::new();

    if let Some(path) = &cfg.trace_path {
        match VcdTrace::open(path, cfg.clock_period_ps) {
            Ok(trace) => tb.open_trace(Box::new(trace), engine.bus()),
            Err(e) => warn!("Tracing disabled: {}", e),
        }
    }

    let report = scenario.run(&mut engine, tb, &cfg.limits);
    tb.close_trace();

    for line in report.table().to_string().lines() {
        info!("{}", line);
    }
    for line in report.summary_lines(cfg.clock_period_ps, tb.real_time_secs()) {
        info!("{}", line);
    }

    if let Some(path) = &cfg.junit_path {
        if let Err(e) = junit::write_junit_xml(&report, cfg.clock_period_ps, path) {
            warn!("Could not write {}: {}", path.display(), e);
        }
    }
    report
}
