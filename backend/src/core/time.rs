//! Calendar handling for the policy engine
//!
//! The engine advances one calendar date at a time. Most business rules are
//! keyed on a year-agnostic (month, day) pair, so this module provides
//! [`MonthDay`] plus the explicit table that maps special calendar dates to
//! the named environmental-flow events evaluated on them.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A year-agnostic calendar date
///
/// # Example
/// ```
/// use catchment_policy_core_rs::MonthDay;
/// use chrono::NaiveDate;
///
/// let season_start = MonthDay::new(7, 1);
/// let date = NaiveDate::from_ymd_opt(2031, 7, 1).unwrap();
/// assert!(season_start.matches(date));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    /// Month/day of a concrete date
    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.month(), date.day())
    }

    /// True if `date` falls on this month/day in any year
    pub fn matches(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }

    /// Most recent occurrence of this month/day on or before `date`
    ///
    /// Used to resolve lookback windows such as "since 1 December" when the
    /// current date is in February of the following calendar year. Returns
    /// `None` only for dates that do not exist in either candidate year
    /// (29 February in two consecutive non-leap years).
    pub fn last_on_or_before(&self, date: NaiveDate) -> Option<NaiveDate> {
        let this_year = NaiveDate::from_ymd_opt(date.year(), self.month, self.day);
        match this_year {
            Some(d) if d <= date => Some(d),
            _ => NaiveDate::from_ymd_opt(date.year() - 1, self.month, self.day),
        }
    }
}

/// Date exactly one year after `date` (29 February clamps to 28 February)
pub fn one_year_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(12)).unwrap_or(date)
}

// ============================================================================
// Environmental calendar
// ============================================================================

/// Named calendar events that drive the environmental flow rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarEvent {
    /// 1 July: winter-low deficit is ordered unconditionally
    WinterLowReset,
    /// 25 August: late-winter fresh check
    LateWinterFresh,
    /// 25 November: spring fresh check
    SpringFresh,
    /// 1 February: summer low-flow fresh check
    SummerFresh,
    /// 16 March: autumn low-flow fresh check
    AutumnFresh,
    /// 1 May: wet-year winter fresh check
    WetWinterFresh,
}

/// Parameters of a scheduled consecutive-flow-event check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreshCheck {
    /// Start of the lookback window (most recent occurrence before the check)
    pub window_start: MonthDay,
    /// Number of consecutive days above target that make one event
    pub block_days: usize,
    /// Target flow rate (ML/day)
    pub target: f64,
    /// Only evaluated when the dam-volume climate is wet
    pub wet_only: bool,
}

/// (month, day) → event table consumed by the scheduler and the
/// environmental evaluator
pub const ENVIRONMENTAL_CALENDAR: [(MonthDay, CalendarEvent); 6] = [
    (MonthDay::new(7, 1), CalendarEvent::WinterLowReset),
    (MonthDay::new(8, 25), CalendarEvent::LateWinterFresh),
    (MonthDay::new(11, 25), CalendarEvent::SpringFresh),
    (MonthDay::new(2, 1), CalendarEvent::SummerFresh),
    (MonthDay::new(3, 16), CalendarEvent::AutumnFresh),
    (MonthDay::new(5, 1), CalendarEvent::WetWinterFresh),
];

impl CalendarEvent {
    /// Look up the event scheduled for `date`, if any
    pub fn on(date: NaiveDate) -> Option<CalendarEvent> {
        let md = MonthDay::of(date);
        ENVIRONMENTAL_CALENDAR
            .iter()
            .find(|(day, _)| *day == md)
            .map(|(_, event)| *event)
    }

    /// True for the events that force an extra scheduler tick
    pub fn forces_tick(&self) -> bool {
        self.fresh_check().is_some()
    }

    /// Consecutive-flow check performed on this date, if any
    pub fn fresh_check(&self) -> Option<FreshCheck> {
        match self {
            CalendarEvent::WinterLowReset => None,
            CalendarEvent::LateWinterFresh => Some(FreshCheck {
                window_start: MonthDay::new(7, 1),
                block_days: 4,
                target: 1500.0,
                wet_only: false,
            }),
            CalendarEvent::SpringFresh => Some(FreshCheck {
                window_start: MonthDay::new(8, 26),
                block_days: 4,
                target: 1500.0,
                wet_only: false,
            }),
            CalendarEvent::SummerFresh => Some(FreshCheck {
                window_start: MonthDay::new(12, 1),
                block_days: 6,
                target: 100.0,
                wet_only: false,
            }),
            CalendarEvent::AutumnFresh => Some(FreshCheck {
                window_start: MonthDay::new(2, 2),
                block_days: 6,
                target: 100.0,
                wet_only: false,
            }),
            CalendarEvent::WetWinterFresh => Some(FreshCheck {
                window_start: MonthDay::new(3, 17),
                block_days: 4,
                target: 1500.0,
                wet_only: true,
            }),
        }
    }
}
