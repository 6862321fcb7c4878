//! Environmental Flow Rule Evaluator
//!
//! Decides the environmental water order on each scheduler tick from the
//! reference-gauge flow record, the calendar and the dam's climate state.
//!
//! # Rules
//!
//! 1. **Winter low** (June to November): top the reference gauge up to
//!    120 ML/day after other releases. On 1 July the full deficit is ordered
//!    unconditionally; on other dates it is capped at the holder's available
//!    water once season orders exceed the fixed annual losses.
//! 2. **Fresh checks** on five fixed dates: if the lookback window holds no
//!    block of consecutive days above the target rate, order enough water to
//!    make up one block's shortfall. The 1 May check only applies in wet years.
//! 3. The final order is clamped to [0, available HR + LR] and accumulated
//!    into the season order.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::time::{CalendarEvent, FreshCheck};
use crate::models::environment::EnvironmentState;

/// Flow the reference gauge is topped up to in winter (ML/day)
pub const WINTER_LOW_TARGET: f64 = 120.0;

/// Dam volume at or below which the year is classed dry (ML)
pub const DRY_VOLUME: f64 = 200_000.0;

/// Dam volume at or below which the year is classed median (ML)
pub const MEDIAN_VOLUME: f64 = 250_000.0;

/// Daily flow record at the reference gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeRecord {
    start: NaiveDate,
    flows: Vec<f64>,
}

impl GaugeRecord {
    /// Record whose first value is the flow on `start` (ML/day)
    pub fn new(start: NaiveDate, flows: Vec<f64>) -> Self {
        Self { start, flows }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Flow on `date`, if recorded
    pub fn flow_on(&self, date: NaiveDate) -> Option<f64> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        self.flows.get(offset as usize).copied()
    }

    /// Flows from `from` to `to` inclusive; unrecorded days read as zero
    pub fn flows_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<f64> {
        from.iter_days()
            .take_while(|d| *d <= to)
            .map(|d| self.flow_on(d).unwrap_or(0.0))
            .collect()
    }
}

/// Climate state inferred from dam volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Climate {
    Dry,
    Median,
    Wet,
}

impl Climate {
    pub fn from_dam_volume(dam_volume: f64) -> Self {
        if dam_volume <= DRY_VOLUME {
            Climate::Dry
        } else if dam_volume <= MEDIAN_VOLUME {
            Climate::Median
        } else {
            Climate::Wet
        }
    }
}

/// Inputs to one evaluation
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentalInputs<'a> {
    pub date: NaiveDate,
    pub gauge: &'a GaugeRecord,
    /// Other-system releases passing the gauge (ML/day)
    pub other_releases: f64,
    pub dam_volume: f64,
    /// Environmental HR + LR still available (ML)
    pub available: f64,
}

/// Count blocks of `block_days` consecutive `true` values
///
/// Each maximal run counts once as soon as it reaches `block_days`, however
/// long it continues; a run still open at the end of the window counts the
/// same way.
///
/// # Example
/// ```
/// use catchment_policy_core_rs::environment::count_consecutive_events;
///
/// let above = [true, true, true, true, false, true, true, true, true, true, true];
/// assert_eq!(count_consecutive_events(&above, 4), 2);
/// assert_eq!(count_consecutive_events(&above, 6), 1);
/// ```
pub fn count_consecutive_events(above: &[bool], block_days: usize) -> usize {
    if block_days == 0 {
        return 0;
    }
    let mut events = 0;
    let mut run = 0;
    for &is_above in above {
        if is_above {
            run += 1;
            if run == block_days {
                events += 1;
            }
        } else {
            run = 0;
        }
    }
    events
}

/// Winter-low deficit at the reference gauge (ML)
pub fn winter_low_deficit(flow: f64, other_releases: f64) -> f64 {
    (WINTER_LOW_TARGET - flow - other_releases).max(0.0)
}

/// Release needed to lift the last `block_days` days to the target
fn fresh_shortfall(gauge: &GaugeRecord, date: NaiveDate, check: &FreshCheck) -> f64 {
    let from = date - Duration::days(check.block_days.saturating_sub(1) as i64);
    gauge
        .flows_between(from, date)
        .iter()
        .map(|flow| (check.target - flow).max(0.0))
        .sum()
}

/// Evaluate a fresh check; zero if the window already holds an event
pub fn fresh_check_order(gauge: &GaugeRecord, date: NaiveDate, check: &FreshCheck, climate: Climate) -> f64 {
    if check.wet_only && climate != Climate::Wet {
        return 0.0;
    }
    let Some(from) = check.window_start.last_on_or_before(date) else {
        return 0.0;
    };
    let above: Vec<bool> = gauge
        .flows_between(from, date)
        .iter()
        .map(|flow| *flow > check.target)
        .collect();

    if count_consecutive_events(&above, check.block_days) == 0 {
        fresh_shortfall(gauge, date, check)
    } else {
        0.0
    }
}

/// Compute this tick's environmental order and update the accumulators
///
/// # Example
/// ```
/// use catchment_policy_core_rs::environment::{evaluate_order, EnvironmentalInputs, GaugeRecord};
/// use catchment_policy_core_rs::models::EnvironmentState;
/// use chrono::NaiveDate;
///
/// let july_first = NaiveDate::from_ymd_opt(2030, 7, 1).unwrap();
/// let gauge = GaugeRecord::new(july_first, vec![80.0]);
/// let mut env = EnvironmentState::new("ENV", 5_000.0, 1_000.0, 0.0);
///
/// let order = evaluate_order(&mut env, &EnvironmentalInputs {
///     date: july_first,
///     gauge: &gauge,
///     other_releases: 0.0,
///     dam_volume: 150_000.0,
///     available: 5_000.0,
/// });
/// assert_eq!(order, 40.0);
/// assert_eq!(env.season_order, 40.0);
/// ```
pub fn evaluate_order(env: &mut EnvironmentState, inputs: &EnvironmentalInputs<'_>) -> f64 {
    let date = inputs.date;
    let available = inputs.available.max(0.0);
    let flow = inputs.gauge.flow_on(date).unwrap_or(0.0);
    let deficit = winter_low_deficit(flow, inputs.other_releases);
    let event = CalendarEvent::on(date);

    let mut order = 0.0;
    if event == Some(CalendarEvent::WinterLowReset) {
        order = deficit;
    } else if (6..=11).contains(&date.month()) && deficit > 0.0 {
        order = if env.season_order <= env.annual_losses {
            deficit
        } else {
            deficit.min(available)
        };
    }

    if let Some(check) = event.and_then(|e| e.fresh_check()) {
        let climate = Climate::from_dam_volume(inputs.dam_volume);
        let top_up = fresh_check_order(inputs.gauge, date, &check, climate);
        order += top_up.min((available - order).max(0.0));
    }

    let order = order.clamp(0.0, available);
    env.water_order = order;
    env.season_order += order;
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_climate_bands() {
        assert_eq!(Climate::from_dam_volume(200_000.0), Climate::Dry);
        assert_eq!(Climate::from_dam_volume(200_001.0), Climate::Median);
        assert_eq!(Climate::from_dam_volume(250_001.0), Climate::Wet);
    }

    #[test]
    fn test_run_reaching_block_counts_once() {
        assert_eq!(count_consecutive_events(&[true; 12], 4), 1);
        assert_eq!(count_consecutive_events(&[true, true, true], 4), 0);
        assert_eq!(count_consecutive_events(&[], 4), 0);
    }

    #[test]
    fn test_gauge_window_fills_gaps_with_zero() {
        let gauge = GaugeRecord::new(date(2030, 7, 2), vec![5.0, 6.0]);
        assert_eq!(gauge.flow_on(date(2030, 7, 1)), None);
        assert_eq!(
            gauge.flows_between(date(2030, 7, 1), date(2030, 7, 4)),
            vec![0.0, 5.0, 6.0, 0.0]
        );
    }

    #[test]
    fn test_summer_check_orders_shortfall_when_no_event() {
        // 1 Dec .. 1 Feb at 90 ML/day: no 6-day block above 100
        let start = date(2030, 12, 1);
        let days = (date(2031, 2, 1) - start).num_days() as usize + 1;
        let gauge = GaugeRecord::new(start, vec![90.0; days]);
        let check = CalendarEvent::SummerFresh.fresh_check().unwrap();

        let order = fresh_check_order(&gauge, date(2031, 2, 1), &check, Climate::Dry);
        assert_eq!(order, 60.0);
    }

    #[test]
    fn test_wet_only_check_skipped_in_dry_year() {
        let start = date(2031, 3, 17);
        let gauge = GaugeRecord::new(start, vec![0.0; 60]);
        let check = CalendarEvent::WetWinterFresh.fresh_check().unwrap();
        assert_eq!(fresh_check_order(&gauge, date(2031, 5, 1), &check, Climate::Median), 0.0);
        assert!(fresh_check_order(&gauge, date(2031, 5, 1), &check, Climate::Wet) > 0.0);
    }

    #[test]
    fn test_winter_order_capped_after_losses_used() {
        let day = date(2030, 8, 3);
        let gauge = GaugeRecord::new(day, vec![20.0]);
        let mut env = EnvironmentState::new("ENV", 1_000.0, 0.0, 50.0);
        env.season_order = 60.0;

        let order = evaluate_order(
            &mut env,
            &EnvironmentalInputs {
                date: day,
                gauge: &gauge,
                other_releases: 0.0,
                dam_volume: 100_000.0,
                available: 30.0,
            },
        );
        assert_eq!(order, 30.0);
        assert_eq!(env.season_order, 90.0);
    }

    #[test]
    fn test_no_order_outside_winter_window() {
        let day = date(2031, 1, 10);
        let gauge = GaugeRecord::new(day, vec![0.0]);
        let mut env = EnvironmentState::new("ENV", 1_000.0, 0.0, 0.0);
        let order = evaluate_order(
            &mut env,
            &EnvironmentalInputs {
                date: day,
                gauge: &gauge,
                other_releases: 0.0,
                dam_volume: 100_000.0,
                available: 500.0,
            },
        );
        assert_eq!(order, 0.0);
    }
}
