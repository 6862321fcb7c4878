//! Environmental Flow Rule Tests
//!
//! Covers the winter-low top-up, the fresh checks and the consecutive-event
//! counter.

use approx::assert_relative_eq;
use catchment_policy_core_rs::environment::{
    count_consecutive_events, evaluate_order, fresh_check_order, Climate, EnvironmentalInputs, GaugeRecord,
};
use catchment_policy_core_rs::models::EnvironmentState;
use catchment_policy_core_rs::CalendarEvent;
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn evaluate(env: &mut EnvironmentState, day: NaiveDate, gauge: &GaugeRecord, other: f64, available: f64) -> f64 {
    evaluate_order(
        env,
        &EnvironmentalInputs {
            date: day,
            gauge,
            other_releases: other,
            dam_volume: 150_000.0,
            available,
        },
    )
}

#[test]
fn test_july_first_orders_full_deficit() {
    let day = date(2030, 7, 1);
    let gauge = GaugeRecord::new(day, vec![80.0]);
    let mut env = EnvironmentState::new("ENV", 5_000.0, 1_000.0, 0.0);

    let order = evaluate(&mut env, day, &gauge, 0.0, 5_000.0);

    assert_eq!(order, 40.0);
    assert_eq!(env.water_order, 40.0);
    assert_eq!(env.season_order, 40.0);
}

#[test]
fn test_other_releases_reduce_deficit() {
    let day = date(2030, 7, 1);
    let gauge = GaugeRecord::new(day, vec![80.0]);
    let mut env = EnvironmentState::new("ENV", 5_000.0, 1_000.0, 0.0);
    assert_eq!(evaluate(&mut env, day, &gauge, 25.0, 5_000.0), 15.0);
}

#[test]
fn test_winter_order_uncapped_until_losses_used() {
    let day = date(2030, 9, 10);
    let gauge = GaugeRecord::new(day, vec![0.0]);
    let mut env = EnvironmentState::new("ENV", 5_000.0, 0.0, 500.0);
    env.season_order = 100.0;

    // Season orders still within annual losses: full deficit, then clamp to available
    assert_eq!(evaluate(&mut env, day, &gauge, 0.0, 1_000.0), 120.0);
    assert_eq!(env.season_order, 220.0);
}

#[test]
fn test_accumulates_across_ticks() {
    let start = date(2030, 7, 1);
    let gauge = GaugeRecord::new(start, vec![100.0; 20]);
    let mut env = EnvironmentState::new("ENV", 5_000.0, 0.0, 0.0);

    evaluate(&mut env, start, &gauge, 0.0, 5_000.0);
    evaluate(&mut env, date(2030, 7, 8), &gauge, 0.0, 5_000.0);

    assert_eq!(env.water_order, 20.0);
    assert_eq!(env.season_order, 40.0);
}

#[test]
fn test_spring_fresh_satisfied_by_event() {
    let start = date(2030, 8, 26);
    let mut flows = vec![500.0; 92];
    for flow in flows.iter_mut().skip(30).take(5) {
        *flow = 2_000.0;
    }
    let gauge = GaugeRecord::new(start, flows);
    let check = CalendarEvent::SpringFresh.fresh_check().unwrap();

    assert_eq!(fresh_check_order(&gauge, date(2030, 11, 25), &check, Climate::Median), 0.0);
}

#[test]
fn test_spring_fresh_orders_shortfall_without_event() {
    let start = date(2030, 8, 26);
    let gauge = GaugeRecord::new(start, vec![1_000.0; 92]);
    let check = CalendarEvent::SpringFresh.fresh_check().unwrap();

    // Four days of (1500 - 1000)
    assert_relative_eq!(fresh_check_order(&gauge, date(2030, 11, 25), &check, Climate::Median), 2_000.0);
}

#[test]
fn test_fresh_top_up_capped_by_available() {
    let day = date(2031, 2, 1);
    let gauge = GaugeRecord::new(date(2030, 12, 1), vec![0.0; 63]);
    let mut env = EnvironmentState::new("ENV", 5_000.0, 0.0, 0.0);

    let order = evaluate(&mut env, day, &gauge, 0.0, 250.0);
    assert_eq!(order, 250.0);
}

#[test]
fn test_consecutive_runs() {
    let above = [true, true, true, true, true, true, true, true, false, true, true, true, true];
    assert_eq!(count_consecutive_events(&above, 4), 2);
    assert_eq!(count_consecutive_events(&above, 8), 1);
    assert_eq!(count_consecutive_events(&above, 9), 0);
}
