use intmap::IntMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

use crate::signal::{lane_mask, MasterPort, UnitPort, PROT_NONSECURE};
use crate::sim_if::DrivenUnit;

/// Wait states the slave inserts into the ACCESS phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStates {
    Fixed(u32),
    /// Uniformly drawn from `0..=max` per transfer.
    Random { max: u32 },
    /// PREADY is never asserted.
    Never,
}

impl Default for WaitStates {
    fn default() -> Self {
        WaitStates::Fixed(0)
    }
}

/// APB phase of the master behind the request interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApbPhase {
    Idle,
    Setup,
    Access { wait: u32 },
    /// Completion is held until the request is dropped.
    Done,
}

#[derive(Clone, Copy, Debug)]
struct Transfer {
    write: bool,
    address: u32,
    wdata: u32,
    strobe: u8,
    prot: u8,
}

/// Reference driven unit: an APB master wired to a word-addressed memory slave.
pub struct ApbMemoryModel {
    phase: ApbPhase,
    transfer: Option<Transfer>,
    mem: IntMap<u32>,
    wait_states: WaitStates,
    accept_delay: u32,
    cooldown: u32,
    error_regions: Vec<Range<u32>>,
    secure_regions: Vec<Range<u32>>,
    rng: StdRng,
    transfers: u64,
}

impl Default for ApbMemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ApbMemoryModel {
    pub fn new() -> Self {
        Self {
            phase: ApbPhase::Idle,
            transfer: None,
            mem: IntMap::new(),
            wait_states: WaitStates::default(),
            accept_delay: 0,
            cooldown: 0,
            error_regions: Vec::new(),
            secure_regions: Vec::new(),
            rng: StdRng::seed_from_u64(0),
            transfers: 0,
        }
    }

    pub fn with_wait_states(mut self, wait_states: WaitStates) -> Self {
        self.wait_states = wait_states;
        self
    }

    /// Edges ready-to-accept stays low after each completed transfer.
    pub fn with_accept_delay(mut self, edges: u32) -> Self {
        self.accept_delay = edges;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Any access inside `region` ends with PSLVERR.
    pub fn with_error_region(mut self, region: Range<u32>) -> Self {
        self.error_regions.push(region);
        self
    }

    /// Non-secure accesses inside `region` end with PSLVERR.
    pub fn with_secure_region(mut self, region: Range<u32>) -> Self {
        self.secure_regions.push(region);
        self
    }

    pub fn phase(&self) -> ApbPhase {
        self.phase
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Backdoor read of the memory word containing `address`.
    pub fn peek(&self, address: u32) -> u32 {
        self.mem.get(word(address)).copied().unwrap_or(0)
    }

    /// Backdoor write, bypassing the bus.
    pub fn poke(&mut self, address: u32, value: u32) {
        self.mem.insert(word(address), value);
    }

    fn draw_wait(&mut self) -> u32 {
        match self.wait_states {
            WaitStates::Fixed(n) => n,
            WaitStates::Random { max } => self.rng.gen_range(0..=max),
            WaitStates::Never => u32::MAX,
        }
    }

    fn is_error(&self, t: &Transfer) -> bool {
        let addr = t.address;
        self.error_regions.iter().any(|r| r.contains(&addr))
            || (t.prot & PROT_NONSECURE != 0
                && self.secure_regions.iter().any(|r| r.contains(&addr)))
    }

    fn complete(&mut self, port: &mut UnitPort) {
        let Some(t) = self.transfer.take() else {
            self.phase = ApbPhase::Idle;
            return;
        };
        let error = self.is_error(&t);
        port.slave_error = error;
        port.rdata = 0;
        if !error {
            if t.write {
                let mask = lane_mask(t.strobe);
                let old = self.peek(t.address);
                self.poke(t.address, (old & !mask) | (t.wdata & mask));
            } else {
                port.rdata = self.peek(t.address);
            }
        }
        port.done = true;
        self.transfers += 1;
        self.phase = ApbPhase::Done;
    }
}

#[inline]
fn word(address: u32) -> u64 {
    (address >> 2) as u64
}

impl DrivenUnit for ApbMemoryModel {
    fn clock_edge(&mut self, master: &MasterPort, port: &mut UnitPort) {
        match self.phase {
            ApbPhase::Idle => {
                if self.cooldown > 0 {
                    self.cooldown -= 1;
                    port.ready = self.cooldown == 0;
                } else if master.request && port.ready {
                    self.transfer = Some(Transfer {
                        write: master.write,
                        address: master.address,
                        wdata: master.wdata,
                        strobe: master.strobe,
                        prot: master.prot,
                    });
                    port.ready = false;
                    self.phase = ApbPhase::Setup;
                } else {
                    port.ready = true;
                }
            }
            ApbPhase::Setup => {
                let wait = self.draw_wait();
                self.phase = ApbPhase::Access { wait };
            }
            ApbPhase::Access { wait } => match self.wait_states {
                WaitStates::Never => {}
                _ if wait > 0 => self.phase = ApbPhase::Access { wait: wait - 1 },
                _ => self.complete(port),
            },
            ApbPhase::Done => {
                if !master.request {
                    port.done = false;
                    port.slave_error = false;
                    self.cooldown = self.accept_delay;
                    port.ready = self.cooldown == 0;
                    self.phase = ApbPhase::Idle;
                }
            }
        }
    }

    fn reset(&mut self, port: &mut UnitPort) {
        *port = UnitPort::default();
        self.phase = ApbPhase::Idle;
        self.transfer = None;
        self.cooldown = 0;
    }
}
