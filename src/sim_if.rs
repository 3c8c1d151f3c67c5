use crate::signal::{BusSignals, MasterPort, UnitPort};

/// The time-advancing side of a simulation.
///
/// Outputs of the driven unit sampled right after `advance_one_tick` reflect
/// exactly one clock edge, after `advance(n)` exactly `n` edges.
pub trait ClockStepper {
    fn advance_one_tick(&mut self, bus: &mut BusSignals);

    fn advance(&mut self, bus: &mut BusSignals, n: u64) {
        for _ in 0..n {
            self.advance_one_tick(bus);
        }
    }

    fn elapsed_ticks(&self) -> u64;

    /// Drives the reset line of the unit. Steppers without one ignore it.
    fn set_reset(&mut self, _asserted: bool) {}
}

/// Anything that can sit behind the request interface and be clocked.
pub trait DrivenUnit {
    /// One rising clock edge: sample the master side, update the unit side.
    fn clock_edge(&mut self, master: &MasterPort, port: &mut UnitPort);

    /// One clock edge with reset asserted.
    fn reset(&mut self, port: &mut UnitPort) {
        *port = UnitPort::default();
    }
}

impl<U: DrivenUnit + ?Sized> DrivenUnit for Box<U> {
    fn clock_edge(&mut self, master: &MasterPort, port: &mut UnitPort) {
        (**self).clock_edge(master, port)
    }
    fn reset(&mut self, port: &mut UnitPort) {
        (**self).reset(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u64,
    }

    impl ClockStepper for Counter {
        fn advance_one_tick(&mut self, _bus: &mut BusSignals) {
            self.ticks += 1;
        }
        fn elapsed_ticks(&self) -> u64 {
            self.ticks
        }
    }

    #[test]
    fn advance_defaults_to_single_ticks() {
        let mut c = Counter { ticks: 0 };
        let mut bus = BusSignals::new();
        c.advance(&mut bus, 5);
        c.advance_one_tick(&mut bus);
        assert_eq!(c.elapsed_ticks(), 6);
    }

    #[test]
    fn default_reset_clears_unit_port() {
        struct Nop;
        impl DrivenUnit for Nop {
            fn clock_edge(&mut self, _master: &MasterPort, _port: &mut UnitPort) {}
        }
        let mut port = UnitPort {
            ready: true,
            done: true,
            slave_error: true,
            rdata: 7,
        };
        Nop.reset(&mut port);
        assert_eq!(port, UnitPort::default());
    }
}
