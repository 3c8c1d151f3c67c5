use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::TraceError;
use crate::signal::{BusSignals, Probe};

/// Waveform sink. Carries no protocol semantics; every failure is non-fatal
/// to whoever drives the bus.
pub trait TraceRecorder {
    fn flush_initial_state(&mut self, bus: &BusSignals) -> Result<(), TraceError>;
    fn sample(&mut self, tick: u64, bus: &BusSignals) -> Result<(), TraceError>;
    fn close(&mut self) -> Result<(), TraceError>;
}

/// Value Change Dump writer.
pub struct VcdTrace<W: Write> {
    w: Option<vcd::Writer<W>>,
    ids: Vec<vcd::IdCode>,
    period_ps: u64,
    last: Option<[Probe; 10]>,
}

impl VcdTrace<BufWriter<File>> {
    pub fn open<P: AsRef<Path>>(path: P, period_ps: u64) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let open_err = |source: std::io::Error| TraceError::Open {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(open_err)?;
        }
        let file = File::create(path).map_err(open_err)?;
        Ok(Self::new(BufWriter::new(file), period_ps))
    }
}

impl<W: Write> VcdTrace<W> {
    pub fn new(out: W, period_ps: u64) -> Self {
        Self {
            w: Some(vcd::Writer::new(out)),
            ids: Vec::new(),
            period_ps,
            last: None,
        }
    }

    fn writer(&mut self) -> Result<&mut vcd::Writer<W>, TraceError> {
        self.w.as_mut().ok_or(TraceError::Closed)
    }

    fn define(&mut self, probes: &[Probe]) -> Result<(), TraceError> {
        let w = self.writer()?;
        w.timescale(1, vcd::TimescaleUnit::PS)?;
        w.add_module("apb")?;
        let mut ids = Vec::with_capacity(probes.len());
        for p in probes {
            ids.push(w.add_wire(p.width, p.name)?);
        }
        w.upscope()?;
        w.enddefinitions()?;
        self.ids = ids;
        Ok(())
    }
}

/// MSB first, `width` bits of `value`.
fn bits(value: u32, width: u32) -> Vec<vcd::Value> {
    (0..width)
        .rev()
        .map(|i| match (value >> i) & 1 {
            0 => vcd::Value::V0,
            _ => vcd::Value::V1,
        })
        .collect()
}

fn change<W: Write>(w: &mut vcd::Writer<W>, id: vcd::IdCode, p: &Probe) -> std::io::Result<()> {
    if p.width == 1 {
        w.change_scalar(id, p.value & 1 == 1)
    } else {
        w.change_vector(id, &bits(p.value, p.width))
    }
}

impl<W: Write> TraceRecorder for VcdTrace<W> {
    fn flush_initial_state(&mut self, bus: &BusSignals) -> Result<(), TraceError> {
        let probes = bus.probes();
        self.define(&probes)?;
        let ids = self.ids.clone();
        let w = self.writer()?;
        w.timestamp(0)?;
        for (id, p) in ids.into_iter().zip(probes.iter()) {
            change(w, id, p)?;
        }
        self.last = Some(probes);
        Ok(())
    }

    fn sample(&mut self, tick: u64, bus: &BusSignals) -> Result<(), TraceError> {
        if self.last.is_none() {
            self.flush_initial_state(&BusSignals::new())?;
        }
        let probes = bus.probes();
        let last = self.last.unwrap_or(probes);
        let time = tick.saturating_mul(self.period_ps);
        let ids = self.ids.clone();
        let w = self.writer()?;
        let mut stamped = false;
        for ((id, p), prev) in ids.into_iter().zip(probes.iter()).zip(last.iter()) {
            if p.value != prev.value {
                if !stamped {
                    w.timestamp(time)?;
                    stamped = true;
                }
                change(w, id, p)?;
            }
        }
        self.last = Some(probes);
        Ok(())
    }

    /// Drops the writer, which flushes any buffered output.
    fn close(&mut self) -> Result<(), TraceError> {
        self.w.take().map(drop).ok_or(TraceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    #[test]
    fn header_declares_every_signal() {
        let buf = Shared::default();
        let mut trace = VcdTrace::new(buf.clone(), 10);
        trace.flush_initial_state(&BusSignals::new()).unwrap();
        trace.close().unwrap();
        let vcd = buf.text();
        for name in ["request", "address", "strobe", "ready", "slave_error", "rdata"] {
            assert!(vcd.contains(&format!(" {} $end", name)), "{}", name);
        }
        let (_, body) = vcd.split_once("$enddefinitions $end\n").unwrap();
        assert!(body.starts_with("#0\n0!\n"));
    }

    #[test]
    fn sample_dumps_only_changes() {
        let buf = Shared::default();
        let mut trace = VcdTrace::new(buf.clone(), 10);
        let mut bus = BusSignals::new();
        trace.flush_initial_state(&bus).unwrap();
        trace.sample(1, &bus).unwrap();
        bus.master.request = true;
        bus.master.address = 0x100;
        trace.sample(2, &bus).unwrap();
        let vcd = buf.text();
        assert!(!vcd.contains("#10\n"));
        let tail = vcd.split("#20\n").nth(1).unwrap();
        assert_eq!(tail, "1!\nb00000000000000000000000100000000 #\n");
    }

    #[test]
    fn huge_period_saturates_timestamp() {
        let buf = Shared::default();
        let mut trace = VcdTrace::new(buf.clone(), u64::MAX);
        let mut bus = BusSignals::new();
        trace.flush_initial_state(&bus).unwrap();
        bus.unit.ready = true;
        trace.sample(3, &bus).unwrap();
        assert!(buf.text().contains(&format!("#{}\n", u64::MAX)));
    }

    #[test]
    fn writing_after_close_fails() {
        let mut trace = VcdTrace::new(Shared::default(), 10);
        trace.close().unwrap();
        assert!(matches!(
            trace.sample(1, &BusSignals::new()),
            Err(TraceError::Closed)
        ));
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("apb.vcd");
        let mut trace = VcdTrace::open(&path, 10).unwrap();
        trace.flush_initial_state(&BusSignals::new()).unwrap();
        trace.close().unwrap();
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$timescale"));
        assert!(vcd.contains("$enddefinitions $end"));
    }
}
