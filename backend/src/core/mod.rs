//! Calendar handling and numeric tolerance helpers

pub mod tolerance;
pub mod time;

pub use time::{CalendarEvent, FreshCheck, MonthDay};
