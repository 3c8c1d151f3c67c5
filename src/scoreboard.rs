use intmap::IntMap;

use crate::signal::lane_mask;

/// The value a read should return on the lanes that have been written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expectation {
    pub value: u32,
    pub mask: u32,
}

impl Expectation {
    pub fn exact(value: u32) -> Self {
        Self {
            value,
            mask: u32::MAX,
        }
    }

    pub fn matches(&self, received: u32) -> bool {
        (received ^ self.value) & self.mask == 0
    }
}

/// Tracks what each word should hold after the writes issued so far.
pub struct ShadowMemory {
    words: IntMap<Expectation>,
}

impl Default for ShadowMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowMemory {
    pub fn new() -> Self {
        Self { words: IntMap::new() }
    }

    pub fn write(&mut self, address: u32, data: u32, strobe: u8) {
        let key = (address >> 2) as u64;
        let mask = lane_mask(strobe);
        let old = self
            .words
            .get(key)
            .copied()
            .unwrap_or(Expectation { value: 0, mask: 0 });
        self.words.insert(
            key,
            Expectation {
                value: (old.value & !mask) | (data & mask),
                mask: old.mask | mask,
            },
        );
    }

    /// `None` if no lane of the word was ever written.
    pub fn expect(&self, address: u32) -> Option<Expectation> {
        self.words
            .get((address >> 2) as u64)
            .copied()
            .filter(|e| e.mask != 0)
    }
}

/// Read-back tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub expected: u32,
    pub received: u32,
    pub matched: u32,
    pub errors: u32,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_exp(&mut self) {
        self.expected += 1;
    }

    /// Compares a received value, returns whether it matched.
    pub fn add_recv(&mut self, exp: &Expectation, data: u32) -> bool {
        self.received += 1;
        let ok = exp.matches(data);
        match ok {
            true => self.matched += 1,
            false => self.errors += 1,
        }
        ok
    }

    pub fn passed(&self) -> bool {
        self.received == self.expected && self.matched == self.received && self.errors == 0
    }

    pub fn result_str(&self) -> String {
        format!(
            "expected={}, received={}, matched={}, errors={}",
            self.expected, self.received, self.matched, self.errors
        )
    }
}
