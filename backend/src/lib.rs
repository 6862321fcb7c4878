//! Catchment Policy Core - Rust Engine
//!
//! Water-allocation policy engine for a regulated river catchment with a
//! single storage dam, deterministic and driven one calendar date at a time.
//!
//! # Architecture
//!
//! - **core**: Calendar table and numeric tolerance
//! - **models**: Domain types (Zone, ledgers, PolicyState, events)
//! - **allocation**: Seasonal allocation ledger, carryover, reserves,
//!   interstate-transfer regimes
//! - **environment**: Environmental flow rules
//! - **release**: Dam release calculator
//! - **scheduler**: Seasonal tick clock
//! - **groundwater**: Annual groundwater licensing
//! - **indicators**: Recreational index and historical extractions
//! - **orchestrator**: Per-date engine loop and checkpointing
//!
//! # Critical Invariants
//!
//! 1. Volumes are f64 megalitres compared with explicit tolerances
//! 2. Allocation never exceeds entitlement; pools never go negative
//! 3. The same inputs always produce the same releases and events

// Module declarations
pub mod allocation;
pub mod core;
pub mod environment;
pub mod groundwater;
pub mod indicators;
pub mod models;
pub mod orchestrator;
pub mod release;
pub mod scheduler;

// Re-exports for convenience
pub use allocation::cascade::subtract;
pub use allocation::interstate::AllocationScenario;
pub use allocation::{AllocationConfig, OverrunPolicy};
pub use core::time::{CalendarEvent, MonthDay};
pub use models::{
    event::{Event, EventLog},
    state::PolicyState,
    zone::{ZoneConfig, ZoneKind},
};
pub use orchestrator::{
    ConfigError, EngineConfig, PolicyEngine, SimulationError, TickInput, TickOutcome, TickResult, ZoneAvailability,
};
