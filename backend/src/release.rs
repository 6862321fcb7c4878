//! Dam Release Calculator
//!
//! Converts the orders accumulated over a release window into a daily dam
//! release.
//!
//! # Release Composition
//!
//! ```text
//! release = Σ regulation-zone orders / window
//!         + (other + environmental orders) / window
//!         + transmission loss   (4% of the transmission zone's daily order)
//!         + weir loss           (10% of the weir zone's daily order)
//!         + downstream supply   (1.178 ML/day)
//!         + minimum passing flow funded from the passing-flow allocation
//! ```
//!
//! Negative totals (possible when callers feed back negative order
//! corrections) are clamped to zero and reported, never treated as fatal.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Fixed downstream supply released every day (ML/day)
pub const DOWNSTREAM_SUPPLY: f64 = 1.178;

/// Transmission loss as a share of the transmission zone's daily order
pub const TRANSMISSION_LOSS_RATE: f64 = 0.04;

/// Weir operational loss as a share of the weir zone's daily order
pub const WEIR_LOSS_RATE: f64 = 0.10;

/// Names the regulation zones whose orders attract channel losses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Regulation zone charged the transmission loss
    pub transmission_zone: String,
    /// Regulation zone charged the weir operational loss
    pub weir_zone: String,
    /// Zone whose allocation funds minimum passing flows; unfunded if `None`
    #[serde(default)]
    pub passing_flow_zone: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            transmission_zone: "zone_1a".to_string(),
            weir_zone: "zone_2".to_string(),
            passing_flow_zone: None,
        }
    }
}

/// Transient inputs for one release computation
#[derive(Debug, Clone, PartialEq)]
pub struct DamReleaseContext {
    pub date: NaiveDate,
    /// Orders over the window per regulation zone (ML)
    pub zone_orders: BTreeMap<String, f64>,
    /// Other-system plus environmental orders over the window (ML)
    pub other_orders: f64,
    pub dam_volume: f64,
    /// Projected inflow over the window (ML)
    pub inflow: f64,
    /// Release window length (days)
    pub window_days: u32,
    /// Allocation available to fund minimum passing flows (ML); `None` means
    /// passing flows are released without drawing on an allocation
    pub passing_flow_allocation: Option<f64>,
}

/// Minimum passing-flow targets (ML/day)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassingFlows {
    /// Passing flow below the dam
    pub meps: f64,
    /// Passing flow at the downstream compliance site
    pub mcs: f64,
}

impl PassingFlows {
    pub fn total(&self) -> f64 {
        self.meps + self.mcs
    }
}

/// Breakdown of a computed release (ML/day unless noted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamRelease {
    pub zone_orders: f64,
    pub other_orders: f64,
    pub transmission_loss: f64,
    pub weir_loss: f64,
    pub downstream_supply: f64,
    /// Passing-flow targets after capping to inflow
    pub targets: PassingFlows,
    /// Passing flow actually released
    pub minimum_flow: f64,
    /// Passing-flow volume drawn from the funding allocation over the window (ML)
    pub minimum_flow_volume: f64,
    /// Sum before clamping
    pub unclamped: f64,
    /// Final daily release (never negative)
    pub release: f64,
}

impl DamRelease {
    pub fn was_clamped(&self) -> bool {
        self.unclamped < 0.0
    }
}

/// Passing-flow targets for a dam volume and month
///
/// # Example
/// ```
/// use catchment_policy_core_rs::release::minimum_passing_flows;
///
/// let flows = minimum_passing_flows(180_000.0, 7);
/// assert_eq!((flows.meps, flows.mcs), (50.0, 35.0));
/// ```
pub fn minimum_passing_flows(dam_volume: f64, month: u32) -> PassingFlows {
    let (meps, mcs) = if dam_volume <= 150_000.0 {
        (10.0, 35.0)
    } else if dam_volume <= 200_000.0 {
        (50.0, 35.0)
    } else if dam_volume <= 250_000.0 {
        (80.0, 70.0)
    } else {
        match month {
            7..=10 => (150.0, 70.0),
            11 | 12 => (100.0, 70.0),
            1..=4 => (80.0, 70.0),
            _ => (120.0, 70.0),
        }
    };
    PassingFlows { meps, mcs }
}

/// Passing flow the funding allocation can cover over the window
///
/// Both targets if affordable, otherwise the larger single target that is,
/// otherwise nothing.
fn funded_passing_flow(targets: PassingFlows, allocation: Option<f64>, window_days: f64) -> f64 {
    let Some(allocation) = allocation else {
        return targets.total();
    };
    let affordable = |daily: f64| daily * window_days <= allocation;
    if affordable(targets.total()) {
        targets.total()
    } else {
        let larger = targets.meps.max(targets.mcs);
        let smaller = targets.meps.min(targets.mcs);
        if affordable(larger) {
            larger
        } else if affordable(smaller) {
            smaller
        } else {
            0.0
        }
    }
}

/// Compute the daily dam release
///
/// Returns the release breakdown; a negative total is clamped to zero with
/// a warning.
pub fn calc_release(context: &DamReleaseContext, config: &ReleaseConfig) -> DamRelease {
    let window = f64::from(context.window_days.max(1));
    let daily = |volume: f64| volume / window;

    let zone_orders: f64 = context.zone_orders.values().map(|v| daily(*v)).sum();
    let other_orders = daily(context.other_orders);
    let transmission_loss = TRANSMISSION_LOSS_RATE
        * context
            .zone_orders
            .get(&config.transmission_zone)
            .map(|v| daily(*v))
            .unwrap_or(0.0);
    let weir_loss = WEIR_LOSS_RATE
        * context
            .zone_orders
            .get(&config.weir_zone)
            .map(|v| daily(*v))
            .unwrap_or(0.0);

    let inflow_rate = daily(context.inflow).max(0.0);
    let banded = minimum_passing_flows(context.dam_volume, context.date.month());
    let targets = PassingFlows {
        meps: banded.meps.min(inflow_rate),
        mcs: banded.mcs.min(inflow_rate),
    };
    let minimum_flow = funded_passing_flow(targets, context.passing_flow_allocation, window);

    let unclamped = zone_orders
        + other_orders
        + transmission_loss
        + weir_loss
        + DOWNSTREAM_SUPPLY
        + minimum_flow;

    if unclamped < 0.0 {
        warn!(
            date = %context.date,
            computed = unclamped,
            "negative dam release clamped to zero"
        );
    }

    DamRelease {
        zone_orders,
        other_orders,
        transmission_loss,
        weir_loss,
        downstream_supply: DOWNSTREAM_SUPPLY,
        targets,
        minimum_flow,
        minimum_flow_volume: minimum_flow * window,
        unclamped,
        release: unclamped.max(0.0),
    }
}
