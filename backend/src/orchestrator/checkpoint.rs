//! Checkpoint - Save/Load Engine State
//!
//! Enables serialization and deserialization of complete engine state
//! for pause/resume of long multi-year runs.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored engine fed the same inputs produces the
//!   same releases and events as the original
//! - **Config Matching**: state can only be loaded with matching config

use crate::groundwater::GroundwaterLicensing;
use crate::models::event::Event;
use crate::models::state::PolicyState;
use crate::orchestrator::SimulationError;
use crate::scheduler::SeasonScheduler;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete engine state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Surface-water policy state (zones, ledgers, reserves, clocks)
    pub state: PolicyState,

    /// Seasonal scheduler position
    pub scheduler: SeasonScheduler,

    /// Groundwater licensing state
    pub groundwater: GroundwaterLicensing,

    /// Event log up to the snapshot
    pub events: Vec<Event>,

    /// SHA256 hash of original config (for validation)
    pub config_hash: String,
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
