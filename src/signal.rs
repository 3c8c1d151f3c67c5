/// Direction of a bus transfer. Drives the write/read selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferKind {
    Write,
    Read,
}

impl TransferKind {
    pub fn is_write(self) -> bool {
        matches!(self, TransferKind::Write)
    }
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferKind::Write => write!(f, "write"),
            TransferKind::Read => write!(f, "read"),
        }
    }
}

// PPROT bits
pub const PROT_PRIVILEGED: u8 = 0b001;
pub const PROT_NONSECURE: u8 = 0b010;
pub const PROT_INSTRUCTION: u8 = 0b100;

pub const STROBE_ALL: u8 = 0b1111;

/// Expands a byte-lane strobe into a 32 bit data mask.
#[inline]
pub fn lane_mask(strobe: u8) -> u32 {
    (0..4)
        .filter(|lane| strobe & (1 << lane) != 0)
        .fold(0, |mask, lane| mask | (0xFF << (8 * lane)))
}

/// Signals driven by the protocol engine towards the unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MasterPort {
    pub request: bool,
    pub write: bool,
    pub address: u32,
    pub wdata: u32,
    pub strobe: u8,
    pub prot: u8,
}

/// Signals driven by the unit back to the protocol engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitPort {
    pub ready: bool,
    pub done: bool,
    pub slave_error: bool,
    pub rdata: u32,
}

/// The complete signal image of the request interface.
///
/// Owned by the protocol engine. A clock stepper only ever gets it by
/// reference for the duration of one clock edge, and a driven unit only gets
/// write access to its own [`UnitPort`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusSignals {
    pub(crate) master: MasterPort,
    pub(crate) unit: UnitPort,
}

/// One named, sized value of the signal image, as seen by a trace recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    pub name: &'static str,
    pub width: u32,
    pub value: u32,
}

impl BusSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn master(&self) -> &MasterPort {
        &self.master
    }

    pub fn unit(&self) -> &UnitPort {
        &self.unit
    }

    /// Splits the image so a unit can sample the master side while driving its own.
    pub fn split_mut(&mut self) -> (&MasterPort, &mut UnitPort) {
        (&self.master, &mut self.unit)
    }

    pub fn probes(&self) -> [Probe; 10] {
        let m = &self.master;
        let u = &self.unit;
        [
            Probe {
                name: "request",
                width: 1,
                value: m.request as u32,
            },
            Probe {
                name: "write",
                width: 1,
                value: m.write as u32,
            },
            Probe {
                name: "address",
                width: 32,
                value: m.address,
            },
            Probe {
                name: "wdata",
                width: 32,
                value: m.wdata,
            },
            Probe {
                name: "strobe",
                width: 4,
                value: m.strobe as u32,
            },
            Probe {
                name: "prot",
                width: 3,
                value: m.prot as u32,
            },
            Probe {
                name: "ready",
                width: 1,
                value: u.ready as u32,
            },
            Probe {
                name: "done",
                width: 1,
                value: u.done as u32,
            },
            Probe {
                name: "slave_error",
                width: 1,
                value: u.slave_error as u32,
            },
            Probe {
                name: "rdata",
                width: 32,
                value: u.rdata,
            },
        ]
    }
}
