//! Orchestrator - the per-date policy engine
//!
//! Ties the scheduler, allocation ledger, environmental evaluator, dam
//! release calculator and groundwater state machine into a single
//! `run_model` call per calendar date.
//!
//! See `engine.rs` for the tick flow and `checkpoint.rs` for save/load.

pub mod checkpoint;
pub mod engine;

use chrono::NaiveDate;
use thiserror::Error;

// Re-export main types for convenience
pub use engine::{
    EngineConfig, EnvironmentConfig, PolicyEngine, RecreationConfig, TickInput, TickOutcome, TickResult,
    ZoneAvailability,
};

// Re-export checkpoint types
pub use checkpoint::{compute_config_hash, StateSnapshot};

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors, surfaced when the engine is constructed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown allocation scenario: {0:?} (expected high, median or low)")]
    UnknownScenario(String),

    #[error("{tables} trigger-bore tables supplied but zones reference {referenced} distinct bores")]
    BoreCountMismatch { tables: usize, referenced: usize },

    #[error("zone {zone} references trigger bore {bore} with no lookup tables")]
    UnknownBore { zone: String, bore: String },

    #[error("duplicate zone id: {0}")]
    DuplicateZone(String),

    #[error("environmental zone {0} is not among the configured zones")]
    MissingEnvironmentZone(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that abort a policy run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "allocation overrun in zone {zone_id} at time step {time_step} on {date}: \
         requested {requested} ML, available {available} ML"
    )]
    AllocationOverrun {
        zone_id: String,
        requested: f64,
        available: f64,
        time_step: usize,
        date: NaiveDate,
    },

    #[error("reserve series index {index} beyond capacity {capacity}; increase num_years")]
    ReserveHorizonExceeded { index: usize, capacity: usize },

    #[error("invalid tick input: {0}")]
    InvalidInput(String),

    #[error("unknown zone: {0}")]
    UnknownZone(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("checkpoint config mismatch: expected {expected}, got {actual}")]
    ConfigMismatch { expected: String, actual: String },
}
