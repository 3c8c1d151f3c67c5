use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::model::{ApbMemoryModel, WaitStates};
use crate::scenario::RunLimits;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TbConfig {
    pub limits: RunLimits,
    pub clock_period_ps: u64,
    pub wait_states: WaitStates,
    pub accept_delay: u32,
    pub seed: u64,
    pub trace_path: Option<PathBuf>,
    pub junit_path: Option<PathBuf>,
}

impl Default for TbConfig {
    fn default() -> Self {
        Self {
            limits: RunLimits::default(),
            clock_period_ps: 10,
            wait_states: WaitStates::Fixed(0),
            accept_delay: 0,
            seed: 0,
            trace_path: None,
            junit_path: Some(PathBuf::from("results.xml")),
        }
    }
}

impl TbConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` knows.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(value) = lookup("APB_TB_CYCLES") {
            let cycles: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "APB_TB_CYCLES",
                value: value.clone(),
            })?;
            if cycles == 0 {
                return Err(ConfigError::Zero { var: "APB_TB_CYCLES" });
            }
            // two ticks per cycle
            cfg.limits.tick_budget = cycles.checked_mul(2).ok_or(ConfigError::Invalid {
                var: "APB_TB_CYCLES",
                value,
            })?;
        }
        if let Some(n) = parse(&lookup, "APB_TB_SETTLE")? {
            cfg.limits.settle_ticks = n;
        }
        if let Some(n) = parse(&lookup, "APB_TB_RESET")? {
            cfg.limits.reset_ticks = n;
        }
        if let Some(b) = parse(&lookup, "APB_TB_RUN_OUT")? {
            cfg.limits.run_out = b;
        }
        if let Some(p) = parse::<u64, _>(&lookup, "APB_TB_PERIOD_PS")? {
            if p == 0 {
                return Err(ConfigError::Zero { var: "APB_TB_PERIOD_PS" });
            }
            cfg.clock_period_ps = p;
        }
        if let Some(value) = lookup("APB_TB_WAIT_STATES") {
            cfg.wait_states = parse_wait_states(&value).ok_or(ConfigError::Invalid {
                var: "APB_TB_WAIT_STATES",
                value,
            })?;
        }
        if let Some(n) = parse(&lookup, "APB_TB_ACCEPT_DELAY")? {
            cfg.accept_delay = n;
        }
        if let Some(n) = parse(&lookup, "APB_TB_SEED")? {
            cfg.seed = n;
        }
        if let Some(path) = lookup("APB_TB_TRACE") {
            cfg.trace_path = Some(path).filter(|p| !p.is_empty()).map(PathBuf::from);
        }
        if let Some(path) = lookup("APB_TB_JUNIT") {
            cfg.junit_path = Some(path).filter(|p| !p.is_empty()).map(PathBuf::from);
        }
        Ok(cfg)
    }

    pub fn model(&self) -> ApbMemoryModel {
        ApbMemoryModel::new()
            .with_wait_states(self.wait_states)
            .with_accept_delay(self.accept_delay)
            .with_seed(self.seed)
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// `N`, `rand:MAX` or `never`.
fn parse_wait_states(s: &str) -> Option<WaitStates> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("never") {
        return Some(WaitStates::Never);
    }
    if let Some(max) = s.strip_prefix("rand:") {
        return max.parse().ok().map(|max| WaitStates::Random { max });
    }
    s.parse().ok().map(WaitStates::Fixed)
}
