//! Simulation run configuration and its TOML loader.
//!
//! ```toml
//! [run]
//! max_time = "10us"
//! max_edges = 100000
//! max_settle_passes = 16
//!
//! [clocks.sys]
//! frequency = "125MHz"
//! ```

use crate::error::ConfigError;
use crate::time::SimTime;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tessera_common::Frequency;
use tessera_ir::{Circuit, ClockId, ClockRate};

/// Default bound on settle passes per settle.
pub const DEFAULT_MAX_SETTLE_PASSES: u32 = 16;

/// Budgets that end a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Edges later than this are not processed.
    pub max_time: Option<SimTime>,
    /// Number of edge instants after which a run stops.
    pub max_edges: Option<u64>,
}

/// Settings for one simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Run budgets.
    pub limits: RunLimits,
    /// Upper bound on repeated settle passes caused by asynchronous resets.
    pub max_settle_passes: u32,
    /// Frequency overrides of absolute clocks, by clock name.
    pub clock_frequencies: BTreeMap<String, Frequency>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            limits: RunLimits::default(),
            max_settle_passes: DEFAULT_MAX_SETTLE_PASSES,
            clock_frequencies: BTreeMap::new(),
        }
    }
}

impl SimConfig {
    /// Maps the frequency overrides onto clocks of `circuit`.
    ///
    /// Fails for names the circuit does not have and for derived clocks,
    /// whose frequency follows their parent.
    pub fn frequency_overrides(
        &self,
        circuit: &Circuit,
    ) -> Result<HashMap<ClockId, Frequency>, ConfigError> {
        self.clock_frequencies
            .iter()
            .map(|(name, freq)| {
                let id = circuit
                    .find_clock(name)
                    .ok_or_else(|| ConfigError::UnknownClock(name.clone()))?;
                if let ClockRate::Derived { .. } = circuit.clock(id).rate {
                    return Err(ConfigError::ValidationError(format!(
                        "clock '{name}' is derived and cannot be given a frequency"
                    )));
                }
                Ok((id, *freq))
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    run: RawRun,
    #[serde(default)]
    clocks: BTreeMap<String, RawClock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRun {
    max_time: Option<String>,
    max_edges: Option<u64>,
    max_settle_passes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClock {
    frequency: String,
}

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<SimConfig, ConfigError> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(raw)
}

fn validate_config(raw: RawConfig) -> Result<SimConfig, ConfigError> {
    let max_time = raw
        .run
        .max_time
        .map(|s| {
            s.parse::<SimTime>()
                .map_err(|e| ConfigError::ValidationError(format!("run.max_time: {e}")))
        })
        .transpose()?;
    let max_settle_passes = raw.run.max_settle_passes.unwrap_or(DEFAULT_MAX_SETTLE_PASSES);
    if max_settle_passes == 0 {
        return Err(ConfigError::ValidationError(
            "run.max_settle_passes must be at least 1".to_string(),
        ));
    }
    let clock_frequencies = raw
        .clocks
        .into_iter()
        .map(|(name, clock)| {
            let freq = clock.frequency.parse::<Frequency>().map_err(|e| {
                ConfigError::ValidationError(format!("clocks.{name}.frequency: {e}"))
            })?;
            Ok((name, freq))
        })
        .collect::<Result<_, ConfigError>>()?;
    Ok(SimConfig {
        limits: RunLimits {
            max_time,
            max_edges: raw.run.max_edges,
        },
        max_settle_passes,
        clock_frequencies,
    })
}
