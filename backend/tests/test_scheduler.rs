//! Seasonal Scheduler Tests
//!
//! Critical invariants tested:
//! - Seasonal reset idempotence: a date never fires twice
//! - Weekly cadence plus forced fresh-check ticks
//! - Season end exactly one year after season start

use catchment_policy_core_rs::scheduler::{ScheduleDecision, SeasonScheduler, TickReason};
use catchment_policy_core_rs::{CalendarEvent, MonthDay};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Run the scheduler over [from, to) and collect every non-idle decision
fn run(scheduler: &mut SeasonScheduler, from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, ScheduleDecision)> {
    from.iter_days()
        .take_while(|d| *d < to)
        .map(|d| (d, scheduler.advance(d)))
        .filter(|(_, decision)| *decision != ScheduleDecision::Idle)
        .collect()
}

#[test]
fn test_season_start_not_applied_twice() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
    let start = date(2030, 7, 1);

    assert!(matches!(scheduler.advance(start), ScheduleDecision::SeasonStart { .. }));
    assert_eq!(scheduler.advance(start), ScheduleDecision::Idle);
    assert_eq!(scheduler.advance(start), ScheduleDecision::Idle);
    assert_eq!(scheduler.time_step(), 1);
}

#[test]
fn test_full_season_cadence() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
    let decisions = run(&mut scheduler, date(2030, 7, 1), date(2031, 7, 1));

    let calendar: Vec<NaiveDate> = decisions
        .iter()
        .filter(|(_, d)| matches!(d, ScheduleDecision::Tick { reason: TickReason::Calendar(_), .. }))
        .map(|(day, _)| *day)
        .collect();

    // 25 August falls between weekly ticks
    assert!(calendar.contains(&date(2030, 8, 25)));
    assert!(decisions.iter().all(|(_, d)| *d != ScheduleDecision::SeasonEnd));

    // Time steps increase by one per firing
    let steps: Vec<usize> = decisions
        .iter()
        .filter_map(|(_, d)| match d {
            ScheduleDecision::SeasonStart { .. } => Some(1),
            ScheduleDecision::Tick { time_step, .. } => Some(*time_step),
            _ => None,
        })
        .collect();
    assert!(steps.windows(2).all(|pair| pair[1] == pair[0] + 1));
    assert!(steps.len() > 52);
}

#[test]
fn test_fresh_check_dates_always_fire() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
    let decisions = run(&mut scheduler, date(2030, 7, 1), date(2031, 7, 1));
    let fired: Vec<NaiveDate> = decisions.iter().map(|(day, _)| *day).collect();

    for check in [date(2030, 8, 25), date(2030, 11, 25), date(2031, 2, 1), date(2031, 3, 16), date(2031, 5, 1)] {
        assert!(fired.contains(&check), "{} did not fire", check);
        assert!(CalendarEvent::on(check).unwrap().forces_tick());
    }
}

#[test]
fn test_season_end_then_restart_same_day() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
    run(&mut scheduler, date(2030, 7, 1), date(2031, 7, 1));

    assert_eq!(scheduler.season_end(), Some(date(2031, 7, 1)));
    assert_eq!(scheduler.advance(date(2031, 7, 1)), ScheduleDecision::SeasonEnd);
    assert!(!scheduler.is_ticking());
    assert_eq!(
        scheduler.advance(date(2031, 7, 1)),
        ScheduleDecision::SeasonStart { season_end: date(2032, 7, 1) }
    );
    assert_eq!(scheduler.advance(date(2031, 7, 1)), ScheduleDecision::Idle);
}

#[test]
fn test_idle_before_first_season() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 7);
    assert!(run(&mut scheduler, date(2030, 1, 1), date(2030, 7, 1)).is_empty());
    assert_eq!(scheduler.next_run(), None);
}

#[test]
fn test_days_until_next() {
    let mut scheduler = SeasonScheduler::new(MonthDay::new(7, 1), 14);
    scheduler.advance(date(2030, 7, 1));
    assert_eq!(scheduler.days_until_next(date(2030, 7, 3)), Some(12));
}
