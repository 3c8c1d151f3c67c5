pub use crate::config::TbConfig;
pub use crate::engine::{
    Accepted, ApbEngine, Busy, EngineState, NotReady, ReadCompletion, TransactionRequest,
    WriteCompletion,
};
pub use crate::error::{ConfigError, ReportError, TraceError};
pub use crate::model::{ApbMemoryModel, ApbPhase, WaitStates};
pub use crate::report::{Phase, RunStatus, ScenarioReport, StepOutcome, Verdict};
pub use crate::scenario::{execute_transaction, RunLimits, Scenario, TransactionSpec};
pub use crate::scoreboard::{Expectation, Scoreboard, ShadowMemory};
pub use crate::signal::{
    lane_mask, BusSignals, MasterPort, TransferKind, UnitPort, PROT_INSTRUCTION, PROT_NONSECURE,
    PROT_PRIVILEGED, STROBE_ALL,
};
pub use crate::sim_if::{ClockStepper, DrivenUnit};
pub use crate::testbench::Testbench;
pub use crate::trace::{TraceRecorder, VcdTrace};
pub use crate::run_scenario;
