//! Domain models for the catchment policy engine

pub mod environment;
pub mod event;
pub mod reserve;
pub mod state;
pub mod system;
pub mod zone;

// Re-exports
pub use environment::EnvironmentState;
pub use event::{Event, EventLog};
pub use reserve::{ReserveSeries, ReserveVolumes};
pub use state::PolicyState;
pub use system::{ClassVolumes, Reliability, SystemLedger, WaterSystem};
pub use zone::{Zone, ZoneConfig, ZoneKind};
