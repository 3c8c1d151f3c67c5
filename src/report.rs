use num_format::{Locale, ToFormattedString};
use prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE;
use prettytable::{Cell, Row, Table};

use crate::scenario::TransactionSpec;
use crate::scoreboard::{Expectation, Scoreboard};
use crate::signal::TransferKind;

/// Which half of a transaction was pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Start,
    Finish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    SlaveError,
    Mismatch { expected: Expectation, received: u32 },
    /// The tick budget ran out with this phase still pending.
    Incomplete(Phase),
    /// Skipped because an earlier step exhausted the budget.
    NotRun,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Passed => write!(f, "passed"),
            Verdict::SlaveError => write!(f, "slave error"),
            Verdict::Mismatch { expected, received } => write!(
                f,
                "mismatch: expected=0x{:08x} (mask 0x{:08x}), received=0x{:08x}",
                expected.value, expected.mask, received
            ),
            Verdict::Incomplete(Phase::Start) => write!(f, "incomplete: never accepted"),
            Verdict::Incomplete(Phase::Finish) => write!(f, "incomplete: never completed"),
            Verdict::NotRun => write!(f, "not run"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub spec: TransactionSpec,
    /// Busy answers before the start was accepted.
    pub start_retries: u64,
    /// NotReady answers before the finish completed.
    pub finish_polls: u64,
    pub accepted_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub slave_error: Option<bool>,
    pub read_data: Option<u32>,
    pub verdict: Verdict,
}

impl StepOutcome {
    pub fn new(index: usize, spec: TransactionSpec) -> Self {
        Self {
            index,
            spec,
            start_retries: 0,
            finish_polls: 0,
            accepted_at: None,
            completed_at: None,
            slave_error: None,
            read_data: None,
            verdict: Verdict::NotRun,
        }
    }

    pub fn name(&self) -> String {
        format!("{}_{}_0x{:x}", self.index, self.spec.kind, self.spec.address)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    BudgetExhausted { step: usize, phase: Phase },
}

#[derive(Clone, Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepOutcome>,
    pub status: RunStatus,
    pub elapsed_ticks: u64,
    pub scoreboard: Scoreboard,
}

impl ScenarioReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
            status: RunStatus::Clean,
            elapsed_ticks: 0,
            scoreboard: Scoreboard::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == RunStatus::Clean
            && !self.steps.is_empty()
            && self.steps.iter().all(|s| s.verdict.is_pass())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.verdict.is_pass())
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(Row::new(
            [
                "#", "kind", "address", "data", "strb", "prot", "busy", "not ready",
                "accepted", "completed", "result",
            ]
            .iter()
            .map(|t| Cell::new(t))
            .collect(),
        ));
        for s in &self.steps {
            let data = match s.spec.kind {
                TransferKind::Write => format!("0x{:08x}", s.spec.data),
                TransferKind::Read => s
                    .read_data
                    .map_or("-".to_string(), |d| format!("0x{:08x}", d)),
            };
            let tick = |t: Option<u64>| t.map_or("-".to_string(), |t| t.to_string());
            table.add_row(Row::new(vec![
                Cell::new(&s.index.to_string()),
                Cell::new(&s.spec.kind.to_string()),
                Cell::new(&format!("0x{:08x}", s.spec.address)),
                Cell::new(&data),
                Cell::new(&format!("{:04b}", s.spec.strobe)),
                Cell::new(&format!("{:03b}", s.spec.protection)),
                Cell::new(&s.start_retries.to_string()),
                Cell::new(&s.finish_polls.to_string()),
                Cell::new(&tick(s.accepted_at)),
                Cell::new(&tick(s.completed_at)),
                Cell::new(&s.verdict.to_string()),
            ]));
        }
        table
    }

    pub fn summary_lines(&self, clock_period_ps: u64, real_time_secs: f64) -> Vec<String> {
        let passed = self.steps.iter().filter(|s| s.verdict.is_pass()).count();
        let status = match self.status {
            RunStatus::Clean => "clean".to_string(),
            RunStatus::BudgetExhausted { step, phase } => {
                format!("tick budget exhausted in step {} ({:?} phase)", step, phase)
            }
        };
        let mut lines = vec![
            format!(
                "SCENARIO {}: Result={}, Steps={}/{} passed, Status={}",
                self.name,
                if self.passed() { "passed" } else { "failed" },
                passed,
                self.steps.len(),
                status
            ),
            format!("Scoreboard: {}", self.scoreboard.result_str()),
            format!(
                "Simulation time: {} ticks ({} ps)",
                self.elapsed_ticks.to_formatted_string(&Locale::en),
                self.elapsed_ticks
                    .saturating_mul(clock_period_ps)
                    .to_formatted_string(&Locale::en)
            ),
        ];
        if real_time_secs > 0.0 {
            lines.push(format!("Real time: {:.3} s", real_time_secs));
            lines.push(format!(
                "Simulation speed: {:.3} ticks/s",
                self.elapsed_ticks as f64 / real_time_secs
            ));
        }
        lines
    }
}
