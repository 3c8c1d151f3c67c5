//! Two-phase, non-blocking transaction protocol.
//!
//! Every transaction is a `start_*` that may be refused with [`Busy`] followed
//! by any number of `finish_*` polls that may answer [`NotReady`]. The engine
//! never waits and never advances time on its own: callers step the clock
//! through [`ApbEngine::tick`] between attempts.

use crate::signal::{BusSignals, TransferKind};
use crate::sim_if::ClockStepper;

/// The unit was not ready to accept a request, or one is already in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("busy")]
pub struct Busy;

/// The in-flight transaction has not completed yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("not ready")]
pub struct NotReady;

/// A start that registered a request on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accepted;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteCompletion {
    pub slave_error: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadCompletion {
    pub slave_error: bool,
    pub read_data: u32,
}

/// The pending bus operation between a successful start and its finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub kind: TransferKind,
    pub address: u32,
    /// Write data. Zero for reads.
    pub data: u32,
    /// Byte lanes of `data`. Zero for reads.
    pub strobe: u8,
    pub protection: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    /// Request asserted, the unit still shows ready-to-accept.
    Requested(TransferKind),
    /// The unit took the request and dropped ready-to-accept.
    InFlight(TransferKind),
    /// Last transaction finished. Equivalent to idle for the next start.
    Completed(TransferKind),
}

impl EngineState {
    pub fn kind(self) -> Option<TransferKind> {
        match self {
            EngineState::Requested(kind) | EngineState::InFlight(kind) => Some(kind),
            EngineState::Idle | EngineState::Completed(_) => None,
        }
    }
}

pub struct ApbEngine {
    bus: BusSignals,
    state: EngineState,
    request: Option<TransactionRequest>,
}

impl Default for ApbEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ApbEngine {
    pub fn new() -> Self {
        Self {
            bus: BusSignals::new(),
            state: EngineState::Idle,
            request: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn in_flight(&self) -> Option<&TransactionRequest> {
        self.request.as_ref()
    }

    pub fn bus(&self) -> &BusSignals {
        &self.bus
    }

    pub fn start_write(
        &mut self,
        address: u32,
        data: u32,
        strobe: u8,
        protection: u8,
    ) -> Result<Accepted, Busy> {
        self.start(TransactionRequest {
            kind: TransferKind::Write,
            address,
            data,
            strobe,
            protection,
        })
    }

    pub fn start_read(&mut self, address: u32, protection: u8) -> Result<Accepted, Busy> {
        self.start(TransactionRequest {
            kind: TransferKind::Read,
            address,
            data: 0,
            strobe: 0,
            protection,
        })
    }

    pub fn finish_write(&mut self) -> Result<WriteCompletion, NotReady> {
        let (slave_error, _) = self.finish(TransferKind::Write)?;
        Ok(WriteCompletion { slave_error })
    }

    pub fn finish_read(&mut self) -> Result<ReadCompletion, NotReady> {
        let (slave_error, read_data) = self.finish(TransferKind::Read)?;
        Ok(ReadCompletion {
            slave_error,
            read_data,
        })
    }

    /// Advances the external clock by one edge with this engine's bus image.
    pub fn tick<C: ClockStepper + ?Sized>(&mut self, clock: &mut C) {
        clock.advance_one_tick(&mut self.bus);
        self.observe();
    }

    pub fn ticks<C: ClockStepper + ?Sized>(&mut self, clock: &mut C, n: u64) {
        for _ in 0..n {
            self.tick(clock);
        }
    }

    fn start(&mut self, request: TransactionRequest) -> Result<Accepted, Busy> {
        if self.request.is_some() || !self.bus.unit.ready {
            return Err(Busy);
        }
        let master = &mut self.bus.master;
        master.address = request.address;
        master.wdata = request.data;
        master.strobe = request.strobe;
        master.prot = request.protection;
        master.write = request.kind.is_write();
        master.request = true;

        self.state = EngineState::Requested(request.kind);
        self.request = Some(request);
        Ok(Accepted)
    }

    fn finish(&mut self, kind: TransferKind) -> Result<(bool, u32), NotReady> {
        match self.request {
            Some(req) if req.kind == kind => {}
            _ => return Err(NotReady),
        }
        let unit = self.bus.unit;
        if !unit.done {
            return Err(NotReady);
        }
        self.bus.master.request = false;
        self.request = None;
        self.state = EngineState::Completed(kind);
        Ok((unit.slave_error, unit.rdata))
    }

    fn observe(&mut self) {
        if let EngineState::Requested(kind) = self.state {
            if !self.bus.unit.ready || self.bus.unit.done {
                self.state = EngineState::InFlight(kind);
            }
        }
    }
}
