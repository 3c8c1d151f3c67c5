//! Scenario driver: a fixed list of transactions issued one at a time against
//! an [`ApbEngine`], each retried until it completes or the tick budget is gone.

use log::{error, info, trace, warn};

use crate::engine::{ApbEngine, Busy, NotReady};
use crate::report::{Phase, RunStatus, ScenarioReport, StepOutcome, Verdict};
use crate::scoreboard::{Expectation, ShadowMemory};
use crate::signal::{TransferKind, STROBE_ALL};
use crate::sim_if::ClockStepper;

/// One transaction as the scenario wants it issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionSpec {
    pub kind: TransferKind,
    pub address: u32,
    pub data: u32,
    pub strobe: u8,
    pub protection: u8,
    /// Reads only: what the returned data must hold.
    pub expected: Option<Expectation>,
}

impl TransactionSpec {
    pub fn write(address: u32, data: u32, strobe: u8, protection: u8) -> Self {
        Self {
            kind: TransferKind::Write,
            address,
            data,
            strobe,
            protection,
            expected: None,
        }
    }

    pub fn read(address: u32, protection: u8) -> Self {
        Self {
            kind: TransferKind::Read,
            address,
            data: 0,
            strobe: 0,
            protection,
            expected: None,
        }
    }

    pub fn expecting(mut self, expected: Expectation) -> Self {
        self.expected = Some(expected);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunLimits {
    /// Total ticks after which the run ends, pending transaction or not.
    pub tick_budget: u64,
    /// Ticks advanced after every accepted start and every completion.
    pub settle_ticks: u64,
    /// Ticks with reset asserted, and again after release.
    pub reset_ticks: u64,
    /// Idle the clock up to the budget once the last step is done.
    pub run_out: bool,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            tick_budget: 200,
            settle_ticks: 2,
            reset_ticks: 2,
            run_out: true,
        }
    }
}

pub struct Scenario {
    name: String,
    steps: Vec<TransactionSpec>,
    shadow: ShadowMemory,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
            shadow: ShadowMemory::new(),
        }
    }

    /// Write A, read A, write B over the upper lanes, read B.
    pub fn reference() -> Self {
        let (addr, prot) = (0x100, 0b110);
        Scenario::new("apb_write_read")
            .write(addr, 0x1234_BEEF, STROBE_ALL, prot)
            .read(addr, prot)
            .write(addr, 0xDEAD_5678, 0b1100, prot)
            .read(addr, prot)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[TransactionSpec] {
        &self.steps
    }

    pub fn write(mut self, address: u32, data: u32, strobe: u8, protection: u8) -> Self {
        self.shadow.write(address, data, strobe);
        self.steps
            .push(TransactionSpec::write(address, data, strobe, protection));
        self
    }

    /// Read expecting whatever earlier writes left on the lanes they touched.
    pub fn read(mut self, address: u32, protection: u8) -> Self {
        let mut spec = TransactionSpec::read(address, protection);
        spec.expected = self.shadow.expect(address);
        self.steps.push(spec);
        self
    }

    /// Appends a step as is. Does not update the expected memory image.
    pub fn push(mut self, spec: TransactionSpec) -> Self {
        self.steps.push(spec);
        self
    }

    pub fn run<C: ClockStepper + ?Sized>(
        &self,
        engine: &mut ApbEngine,
        clock: &mut C,
        limits: &RunLimits,
    ) -> ScenarioReport {
        let budget = limits.tick_budget;
        let mut report = ScenarioReport::new(&self.name);
        info!("Starting scenario {} ({} steps)", self.name, self.steps.len());

        clock.set_reset(true);
        advance_within(engine, clock, limits.reset_ticks, budget);
        clock.set_reset(false);
        advance_within(engine, clock, limits.reset_ticks, budget);

        for (index, spec) in self.steps.iter().enumerate() {
            if report.status != RunStatus::Clean {
                report.steps.push(StepOutcome::new(index, *spec));
                continue;
            }
            let outcome = execute_transaction(engine, clock, index, spec, limits);
            log_outcome(&outcome);

            if spec.expected.is_some() {
                report.scoreboard.add_exp();
                if let (Some(exp), Some(data), Some(false)) =
                    (spec.expected, outcome.read_data, outcome.slave_error)
                {
                    report.scoreboard.add_recv(&exp, data);
                }
            }
            if let Verdict::Incomplete(phase) = outcome.verdict {
                report.status = RunStatus::BudgetExhausted { step: index, phase };
            }
            report.steps.push(outcome);
        }

        if limits.run_out {
            while clock.elapsed_ticks() < budget {
                let n = (budget - clock.elapsed_ticks()).min(2);
                engine.ticks(clock, n);
            }
        }
        report.elapsed_ticks = clock.elapsed_ticks();
        report
    }
}

/// Ticks up to `n` times without passing `budget`. False if cut short.
fn advance_within<C: ClockStepper + ?Sized>(
    engine: &mut ApbEngine,
    clock: &mut C,
    n: u64,
    budget: u64,
) -> bool {
    for _ in 0..n {
        if clock.elapsed_ticks() >= budget {
            return false;
        }
        engine.tick(clock);
    }
    true
}

/// Issues one transaction and polls it to completion.
///
/// Busy and NotReady are answered with a single clock tick and an immediate
/// retry. Only the tick budget ends the retrying; the step then reports
/// [`Verdict::Incomplete`] with the phase that was still pending.
pub fn execute_transaction<C: ClockStepper + ?Sized>(
    engine: &mut ApbEngine,
    clock: &mut C,
    index: usize,
    spec: &TransactionSpec,
    limits: &RunLimits,
) -> StepOutcome {
    let budget = limits.tick_budget;
    let mut out = StepOutcome::new(index, *spec);

    loop {
        let started = match spec.kind {
            TransferKind::Write => {
                engine.start_write(spec.address, spec.data, spec.strobe, spec.protection)
            }
            TransferKind::Read => engine.start_read(spec.address, spec.protection),
        };
        match started {
            Ok(_) => break,
            Err(Busy) => {
                trace!(
                    "step {}: start {} busy at tick {}",
                    index,
                    spec.kind,
                    clock.elapsed_ticks()
                );
                out.start_retries += 1;
                if !advance_within(engine, clock, 1, budget) {
                    out.verdict = Verdict::Incomplete(Phase::Start);
                    return out;
                }
            }
        }
    }
    out.accepted_at = Some(clock.elapsed_ticks());
    info!(
        "step {}: {} 0x{:08x} accepted at tick {}",
        index,
        spec.kind,
        spec.address,
        clock.elapsed_ticks()
    );
    advance_within(engine, clock, limits.settle_ticks, budget);

    let (slave_error, read_data) = loop {
        let finished = match spec.kind {
            TransferKind::Write => engine.finish_write().map(|c| (c.slave_error, None)),
            TransferKind::Read => engine
                .finish_read()
                .map(|c| (c.slave_error, Some(c.read_data))),
        };
        match finished {
            Ok(done) => break done,
            Err(NotReady) => {
                trace!(
                    "step {}: finish {} not ready at tick {}",
                    index,
                    spec.kind,
                    clock.elapsed_ticks()
                );
                out.finish_polls += 1;
                if !advance_within(engine, clock, 1, budget) {
                    out.verdict = Verdict::Incomplete(Phase::Finish);
                    return out;
                }
            }
        }
    };
    out.completed_at = Some(clock.elapsed_ticks());
    out.slave_error = Some(slave_error);
    out.read_data = read_data;
    out.verdict = match (slave_error, read_data, spec.expected) {
        (true, _, _) => Verdict::SlaveError,
        (false, Some(received), Some(expected)) if !expected.matches(received) => {
            Verdict::Mismatch { expected, received }
        }
        _ => Verdict::Passed,
    };
    advance_within(engine, clock, limits.settle_ticks, budget);
    out
}

fn log_outcome(out: &StepOutcome) {
    let spec = &out.spec;
    match out.verdict {
        Verdict::Passed => match out.read_data {
            Some(data) => info!(
                "step {}: read 0x{:08x} succeeded, data 0x{:08x}",
                out.index, spec.address, data
            ),
            None => info!("step {}: write 0x{:08x} succeeded", out.index, spec.address),
        },
        Verdict::SlaveError => warn!(
            "step {}: {} 0x{:08x} completed with slave error",
            out.index, spec.kind, spec.address
        ),
        Verdict::Mismatch { expected, received } => error!(
            "step {}: read 0x{:08x} expected 0x{:08x} (mask 0x{:08x}), received 0x{:08x}",
            out.index, spec.address, expected.value, expected.mask, received
        ),
        Verdict::Incomplete(phase) => error!(
            "step {}: {} 0x{:08x} still pending in {:?} phase when the tick budget ran out",
            out.index, spec.kind, spec.address, phase
        ),
        Verdict::NotRun => {}
    }
}
