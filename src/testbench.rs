use log::{debug, warn};
use once_cell::unsync::OnceCell;
use std::time::Instant;

use crate::signal::BusSignals;
use crate::sim_if::{ClockStepper, DrivenUnit};
use crate::trace::TraceRecorder;

/// Clocks a driven unit, counts ticks, and feeds an optional trace.
pub struct Testbench<U: DrivenUnit> {
    unit: U,
    ticks: u64,
    in_reset: bool,
    trace: Option<Box<dyn TraceRecorder>>,
    started: OnceCell<Instant>,
}

impl<U: DrivenUnit> Testbench<U> {
    pub fn new(unit: U) -> Self {
        Self {
            unit,
            ticks: 0,
            in_reset: false,
            trace: None,
            started: OnceCell::new(),
        }
    }

    /// Attaches a recorder and dumps the initial state of `bus` into it.
    pub fn open_trace(&mut self, mut trace: Box<dyn TraceRecorder>, bus: &BusSignals) {
        match trace.flush_initial_state(bus) {
            Ok(()) => self.trace = Some(trace),
            Err(e) => warn!("Tracing disabled: {}", e),
        }
    }

    pub fn close_trace(&mut self) {
        if let Some(mut trace) = self.trace.take() {
            if let Err(e) = trace.close() {
                warn!("Closing trace failed: {}", e);
            }
        }
    }

    pub fn is_tracing(&self) -> bool {
        self.trace.is_some()
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut U {
        &mut self.unit
    }

    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    /// Wall-clock seconds since the first tick.
    pub fn real_time_secs(&self) -> f64 {
        self.started
            .get()
            .map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    fn record(&mut self, bus: &BusSignals) {
        let Some(trace) = self.trace.as_mut() else {
            return;
        };
        if let Err(e) = trace.sample(self.ticks, bus) {
            warn!("Tracing disabled at tick {}: {}", self.ticks, e);
            self.trace = None;
        }
    }
}

impl<U: DrivenUnit> ClockStepper for Testbench<U> {
    fn advance_one_tick(&mut self, bus: &mut BusSignals) {
        self.started.get_or_init(Instant::now);
        let (master, port) = bus.split_mut();
        if self.in_reset {
            self.unit.reset(port);
        } else {
            self.unit.clock_edge(master, port);
        }
        self.ticks += 1;
        self.record(bus);
    }

    fn elapsed_ticks(&self) -> u64 {
        self.ticks
    }

    fn set_reset(&mut self, asserted: bool) {
        if asserted != self.in_reset {
            debug!(
                "reset {} at tick {}",
                if asserted { "asserted" } else { "released" },
                self.ticks
            );
        }
        self.in_reset = asserted;
    }
}

impl<U: DrivenUnit> Drop for Testbench<U> {
    fn drop(&mut self) {
        self.close_trace();
    }
}
