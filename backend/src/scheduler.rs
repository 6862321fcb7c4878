//! Seasonal Allocation Scheduler
//!
//! Decides, for each calendar date, whether the surface-water policy runs.
//!
//! # States
//!
//! ```text
//! Uninitialized ──(date matches season start)──▶ Ticking
//! Ticking ──(date ≥ next tick | fresh-check date)──▶ Ticking (time step + 1)
//! Ticking ──(date ≥ season end)──▶ Uninitialized   (caller rolls carryover)
//! ```
//!
//! Season end falls exactly one year after season start, i.e. on the next
//! season-start date, so a season-end decision is normally followed by a
//! season-start decision for the same date. A date that has already been
//! processed never fires again.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::time::{one_year_after, CalendarEvent, MonthDay};

/// Why the scheduler fired on a ticking date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickReason {
    /// Regular periodic tick
    Scheduled,
    /// Environmental fresh-check date
    Calendar(CalendarEvent),
}

/// Decision for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Nothing to do today
    Idle,
    /// First tick of a new season (time step 1)
    SeasonStart { season_end: NaiveDate },
    /// A later tick within the season
    Tick { time_step: usize, reason: TickReason },
    /// The season closed today; carryover must be rolled before advancing again
    SeasonEnd,
}

/// Scheduler state
///
/// # Example
/// ```
/// use catchment_policy_core_rs::scheduler::{ScheduleDecision, SeasonScheduler};
/// use catchment_policy_core_rs::MonthDay;
/// use chrono::NaiveDate;
///
/// let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
/// let start = NaiveDate::from_ymd_opt(2030, 7, 1).unwrap();
/// assert!(matches!(scheduler.advance(start), ScheduleDecision::SeasonStart { .. }));
/// assert_eq!(scheduler.advance(start), ScheduleDecision::Idle);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonScheduler {
    season_start: MonthDay,
    interval_days: u32,
    /// Date of the next periodic tick; `None` while uninitialized
    next_run: Option<NaiveDate>,
    season_end: Option<NaiveDate>,
    last_run: Option<NaiveDate>,
    time_step: usize,
}

impl SeasonScheduler {
    pub fn new(season_start: MonthDay, interval_days: u32) -> Self {
        Self {
            season_start,
            interval_days: interval_days.max(1),
            next_run: None,
            season_end: None,
            last_run: None,
            time_step: 1,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.next_run.is_some()
    }

    pub fn next_run(&self) -> Option<NaiveDate> {
        self.next_run
    }

    pub fn season_end(&self) -> Option<NaiveDate> {
        self.season_end
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Days until the next periodic tick, counted from `date`
    pub fn days_until_next(&self, date: NaiveDate) -> Option<i64> {
        self.next_run.map(|next| (next - date).num_days())
    }

    fn schedule_next(&mut self, date: NaiveDate) {
        self.next_run = Some(date + Duration::days(i64::from(self.interval_days)));
        self.last_run = Some(date);
    }

    /// Decide what happens on `date`
    pub fn advance(&mut self, date: NaiveDate) -> ScheduleDecision {
        if self.last_run == Some(date) {
            return ScheduleDecision::Idle;
        }

        let Some(next_run) = self.next_run else {
            if !self.season_start.matches(date) {
                return ScheduleDecision::Idle;
            }
            let season_end = one_year_after(date);
            self.time_step = 1;
            self.season_end = Some(season_end);
            self.schedule_next(date);
            debug!(%date, %season_end, "season started");
            return ScheduleDecision::SeasonStart { season_end };
        };

        if self.season_end.map_or(false, |end| date >= end) {
            self.reset();
            debug!(%date, "season ended");
            return ScheduleDecision::SeasonEnd;
        }

        let reason = if date >= next_run {
            TickReason::Scheduled
        } else {
            match CalendarEvent::on(date) {
                Some(event) if event.forces_tick() => TickReason::Calendar(event),
                _ => return ScheduleDecision::Idle,
            }
        };

        self.time_step += 1;
        self.schedule_next(date);
        debug!(%date, time_step = self.time_step, ?reason, "policy tick");
        ScheduleDecision::Tick {
            time_step: self.time_step,
            reason,
        }
    }

    /// Return to the uninitialized state
    fn reset(&mut self) {
        self.next_run = None;
        self.season_end = None;
        self.time_step = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_idle_until_season_start() {
        let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
        assert_eq!(scheduler.advance(date(2030, 6, 30)), ScheduleDecision::Idle);
        assert!(!scheduler.is_ticking());
        assert_eq!(
            scheduler.advance(date(2030, 7, 1)),
            ScheduleDecision::SeasonStart { season_end: date(2031, 7, 1) }
        );
        assert_eq!(scheduler.next_run(), Some(date(2030, 7, 8)));
    }

    #[test]
    fn test_weekly_ticks() {
        let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
        scheduler.advance(date(2030, 7, 1));
        for d in 2..8 {
            assert_eq!(scheduler.advance(date(2030, 7, d)), ScheduleDecision::Idle);
        }
        assert_eq!(
            scheduler.advance(date(2030, 7, 8)),
            ScheduleDecision::Tick { time_step: 2, reason: TickReason::Scheduled }
        );
    }

    #[test]
    fn test_fresh_check_date_forces_tick_and_reschedules() {
        let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
        scheduler.advance(date(2030, 7, 1));
        let mut d = date(2030, 7, 2);
        while d < date(2030, 8, 25) {
            scheduler.advance(d);
            d = d.succ_opt().unwrap();
        }
        let decision = scheduler.advance(date(2030, 8, 25));
        assert_eq!(
            decision,
            ScheduleDecision::Tick {
                time_step: scheduler.time_step(),
                reason: TickReason::Calendar(CalendarEvent::LateWinterFresh),
            }
        );
        assert_eq!(scheduler.next_run(), Some(date(2030, 9, 1)));
    }

    #[test]
    fn test_season_end_resets_then_restarts() {
        let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
        scheduler.advance(date(2030, 7, 1));
        let mut d = date(2030, 7, 2);
        while d < date(2031, 7, 1) {
            scheduler.advance(d);
            d = d.succ_opt().unwrap();
        }
        assert_eq!(scheduler.advance(date(2031, 7, 1)), ScheduleDecision::SeasonEnd);
        assert_eq!(scheduler.time_step(), 1);
        assert!(matches!(
            scheduler.advance(date(2031, 7, 1)),
            ScheduleDecision::SeasonStart { .. }
        ));
    }
}
