//! Event logging for audit and replay comparison.
//!
//! Every significant policy decision is captured as a typed [`Event`].
//! Events enable:
//! - Replay comparison (two runs with the same inputs log identical events)
//! - Debugging (which rule fired on which date)
//! - Auditing (allocation announcements, releases and carryover grants)
//!
//! # Event Types
//!
//! Events are categorized by policy component:
//! - **Season**: season start and end, carryover rollover
//! - **Allocation**: announced percentages and tolerated overruns
//! - **Environment**: environmental water orders
//! - **Release**: daily dam release and negative-release corrections
//! - **Groundwater**: annual licensing and year close
//!
//! # Example
//!
//! ```rust
//! use catchment_policy_core_rs::models::Event;
//! use chrono::NaiveDate;
//!
//! let event = Event::EnvironmentalOrder {
//!     date: NaiveDate::from_ymd_opt(2030, 7, 1).unwrap(),
//!     time_step: 1,
//!     water_order: 40.0,
//!     season_order: 40.0,
//! };
//!
//! assert_eq!(event.event_type(), "EnvironmentalOrder");
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::groundwater::ProportionTable;
use crate::models::system::ClassVolumes;

/// Policy event capturing a state change.
///
/// All events carry the calendar date they occurred on.
/// Events are logged in the order they occur within a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Scheduler entered a new season
    SeasonStarted { date: NaiveDate, year: usize, season_end: NaiveDate },

    /// Allocation pass completed
    AllocationComputed {
        date: NaiveDate,
        time_step: usize,
        shared_pool: f64,
        local_percentage: ClassVolumes,
        transfer_percentage: f64,
    },

    /// A zone ordered more than it held; tolerated under `OverrunPolicy::Warn`
    AllocationOverrun {
        date: NaiveDate,
        time_step: usize,
        zone_id: String,
        requested: f64,
        available: f64,
    },

    /// Environmental water order computed
    EnvironmentalOrder {
        date: NaiveDate,
        time_step: usize,
        water_order: f64,
        season_order: f64,
    },

    /// Daily dam release computed
    DamRelease { date: NaiveDate, time_step: usize, release: f64, minimum_flow: f64 },

    /// Negative release total clamped to zero
    NegativeReleaseClamped { date: NaiveDate, computed: f64 },

    /// Carryover granted to a zone at season end
    CarryoverRolledOver { date: NaiveDate, zone_id: String, carryover: ClassVolumes },

    /// Season closed and year count advanced
    SeasonEnded { date: NaiveDate, closed_year: usize },

    /// Groundwater licences issued for a new year
    GroundwaterLicensed {
        date: NaiveDate,
        year: usize,
        table: ProportionTable,
        drought_count: u32,
        total_licensed: f64,
    },

    /// Groundwater year closed with carryover computed
    GroundwaterYearClosed { date: NaiveDate, year: usize, total_carryover: f64 },
}

impl Event {
    /// Get the date when this event occurred
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::SeasonStarted { date, .. } => *date,
            Event::AllocationComputed { date, .. } => *date,
            Event::AllocationOverrun { date, .. } => *date,
            Event::EnvironmentalOrder { date, .. } => *date,
            Event::DamRelease { date, .. } => *date,
            Event::NegativeReleaseClamped { date, .. } => *date,
            Event::CarryoverRolledOver { date, .. } => *date,
            Event::SeasonEnded { date, .. } => *date,
            Event::GroundwaterLicensed { date, .. } => *date,
            Event::GroundwaterYearClosed { date, .. } => *date,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::SeasonStarted { .. } => "SeasonStarted",
            Event::AllocationComputed { .. } => "AllocationComputed",
            Event::AllocationOverrun { .. } => "AllocationOverrun",
            Event::EnvironmentalOrder { .. } => "EnvironmentalOrder",
            Event::DamRelease { .. } => "DamRelease",
            Event::NegativeReleaseClamped { .. } => "NegativeReleaseClamped",
            Event::CarryoverRolledOver { .. } => "CarryoverRolledOver",
            Event::SeasonEnded { .. } => "SeasonEnded",
            Event::GroundwaterLicensed { .. } => "GroundwaterLicensed",
            Event::GroundwaterYearClosed { .. } => "GroundwaterYearClosed",
        }
    }

    /// Get zone ID if event relates to a specific zone
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            Event::AllocationOverrun { zone_id, .. } => Some(zone_id),
            Event::CarryoverRolledOver { zone_id, .. } => Some(zone_id),
            _ => None,
        }
    }
}

/// Event log for storing and querying policy events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific date
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.events.iter().filter(|e| e.date() == date).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific zone
    pub fn events_for_zone(&self, zone_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.zone_id() == Some(zone_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Drop every event logged after the first `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 7, d).unwrap()
    }

    #[test]
    fn test_event_date_and_type() {
        let event = Event::NegativeReleaseClamped { date: day(3), computed: -4.0 };
        assert_eq!(event.date(), day(3));
        assert_eq!(event.event_type(), "NegativeReleaseClamped");
        assert_eq!(event.zone_id(), None);
    }

    #[test]
    fn test_log_queries() {
        let mut log = EventLog::new();
        log.log(Event::SeasonStarted { date: day(1), year: 1, season_end: day(1) });
        log.log(Event::CarryoverRolledOver {
            date: day(1),
            zone_id: "FARM_1".to_string(),
            carryover: ClassVolumes::new(10.0, 5.0),
        });
        log.log(Event::SeasonEnded { date: day(2), closed_year: 1 });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_on(day(1)).len(), 2);
        assert_eq!(log.events_of_type("SeasonEnded").len(), 1);
        assert_eq!(log.events_for_zone("FARM_1").len(), 1);
    }
}
