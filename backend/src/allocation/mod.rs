//! Allocation Ledger
//!
//! Computes seasonal surface-water allocations from the shared pool and
//! charges zone orders against them.
//!
//! # Allocation Flow
//!
//! ```text
//! usable dam volume = max(0, dam volume - minimum operating volume - river losses)
//! shared pool       = shared-utility share × (projected inflow + usable dam volume)
//!
//! first tick of season → first_allocation (HR only, LR reset to zero)
//! later ticks          → later_allocation:
//!                          1. orders drawn from transfer allocation first
//!                          2. incremental HR top-up
//!                          3. LR allocation once HR and reserves are secure
//! every tick           → residual orders charged: carryover → LR → HR
//! ```
//!
//! # Critical Invariants
//!
//! - **Bounded**: cumulative allocation never exceeds entitlement per class
//! - **Proportional**: every increment is split by entitlement share
//! - **Non-negative**: charging an order never drives a pool below zero;
//!   demand beyond the zone's holdings is an allocation overrun

pub mod carryover;
pub mod cascade;
pub mod interstate;
pub mod reserve;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::core::tolerance::{approx_eq, approx_ge, clamp_unit, definitely_lt, safe_ratio, ABS_TOL};
use crate::models::reserve::ReserveVolumes;
use crate::models::state::PolicyState;
use crate::models::system::ClassVolumes;
use crate::orchestrator::SimulationError;
use cascade::charge_order;

/// Storage parameters that turn dam volume into a shared pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Dead storage below which water cannot be released (ML)
    pub min_operating_volume: f64,
    /// Aggregate river losses set aside before allocation (ML)
    pub river_losses: f64,
    /// Fraction of inflow plus usable storage owned by the allocating utility
    pub shared_utility_share: f64,
    /// Operational reserve target for next season (ML)
    pub worst_case_loss: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_operating_volume: 0.0,
            river_losses: 0.0,
            shared_utility_share: 1.0,
            worst_case_loss: 0.0,
        }
    }
}

/// What to do when a zone orders more than it holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrunPolicy {
    /// Abort the tick with `SimulationError::AllocationOverrun`
    #[default]
    Fail,
    /// Empty the zone's pools, log a warning and continue
    Warn,
}

/// A zone order that exceeded the zone's holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overrun {
    pub zone_id: String,
    pub requested: f64,
    pub available: f64,
}

/// Result of one allocation pass
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub usable_dam_volume: f64,
    pub shared_pool: f64,
    /// Local percentage of entitlement after this pass
    pub local_percentage: ClassVolumes,
    /// Transfer-system percentage announced this pass
    pub transfer_percentage: f64,
    /// Reserves recorded this pass (zero on first ticks)
    pub reserves: ReserveVolumes,
    /// Overruns tolerated under `OverrunPolicy::Warn`
    pub overruns: Vec<Overrun>,
}

/// Dam volume available for allocation after dead storage and losses
pub fn usable_dam_volume(dam_volume: f64, config: &AllocationConfig) -> f64 {
    (dam_volume - config.min_operating_volume - config.river_losses).max(0.0)
}

/// Shared-pool volume for this tick
pub fn shared_pool(projected_inflow: f64, usable_dam_volume: f64, config: &AllocationConfig) -> f64 {
    config.shared_utility_share * (projected_inflow + usable_dam_volume)
}

/// Run one allocation pass and charge `orders` against the result
///
/// # Arguments
///
/// * `state` - Policy state; its time step must already be set for this tick
/// * `config` - Storage parameters
/// * `orders` - Surface-water orders per zone id for this tick (ML)
/// * `dam_volume` - Current dam volume (ML)
/// * `projected_inflow` - Projected inflow for this tick (ML)
/// * `first_tick` - True on the season's first scheduler tick
/// * `policy` - Overrun handling
/// * `date` - Current date (for diagnostics)
///
/// # Errors
///
/// - `AllocationOverrun` under `OverrunPolicy::Fail`
/// - `ReserveHorizonExceeded` if the run outlives the reserve series
/// - `UnknownZone` for orders naming a zone that does not exist
///
/// On error `state` is left exactly as it was before the call.
#[allow(clippy::too_many_arguments)]
pub fn calc_allocation(
    state: &mut PolicyState,
    config: &AllocationConfig,
    orders: &BTreeMap<String, f64>,
    dam_volume: f64,
    projected_inflow: f64,
    first_tick: bool,
    policy: OverrunPolicy,
    date: NaiveDate,
) -> Result<AllocationOutcome, SimulationError> {
    for zone_id in orders.keys() {
        if !state.contains_zone(zone_id) {
            return Err(SimulationError::UnknownZone(zone_id.clone()));
        }
    }

    let checkpoint = state.clone();
    let result = allocate_and_charge(
        state,
        config,
        orders,
        dam_volume,
        projected_inflow,
        first_tick,
        policy,
        date,
    );
    if result.is_err() {
        *state = checkpoint;
    }
    result
}

#[allow(clippy::too_many_arguments)]
fn allocate_and_charge(
    state: &mut PolicyState,
    config: &AllocationConfig,
    orders: &BTreeMap<String, f64>,
    dam_volume: f64,
    projected_inflow: f64,
    first_tick: bool,
    policy: OverrunPolicy,
    date: NaiveDate,
) -> Result<AllocationOutcome, SimulationError> {
    let usable = usable_dam_volume(dam_volume, config);
    let pool = shared_pool(projected_inflow, usable, config);

    let (transfer_percentage, reserves, residuals) = if first_tick {
        let transfer = first_allocation(state, pool);
        let residuals = draw_transfer_first(state, orders);
        (transfer, ReserveVolumes::default(), residuals)
    } else {
        later_allocation(state, config, orders, pool)?
    };

    let overruns = charge_orders(state, &residuals, policy, date)?;
    state.refresh_ledgers();

    Ok(AllocationOutcome {
        usable_dam_volume: usable,
        shared_pool: pool,
        local_percentage: state.local_percentage(),
        transfer_percentage,
        reserves,
        overruns,
    })
}

/// Open the season: announce HR from the shared pool, reset LR to zero
///
/// Returns the transfer-system percentage announced.
pub fn first_allocation(state: &mut PolicyState, shared_pool: f64) -> f64 {
    let entitlement = state.total_entitlement();
    let year = state.year();
    let step = state.global_step();
    let time_step = state.time_step();

    let prior_reserve = if year > 1 {
        state.reserves().yearly(year).hr
    } else {
        0.0
    };
    let hr = (shared_pool + prior_reserve).max(0.0).min(entitlement.hr);
    state.set_allocated(ClassVolumes::new(hr, 0.0));

    for zone in state.zones_mut() {
        let share = zone.share().hr;
        zone.begin_season(share * hr);
    }

    let hr_full = approx_ge(hr, entitlement.hr);
    let transfer = state.transfer_mut();
    transfer.reset_season();
    let percentage = transfer.advance(hr_full, time_step);
    announce_transfer(state, percentage);

    state.reserves_mut().record_weekly(step, ReserveVolumes::default());
    percentage
}

/// Top up HR, then LR, and return the residual local orders
fn later_allocation(
    state: &mut PolicyState,
    config: &AllocationConfig,
    orders: &BTreeMap<String, f64>,
    shared_pool: f64,
) -> Result<(f64, ReserveVolumes, BTreeMap<String, f64>), SimulationError> {
    // Phase 1: transfer allocation absorbs orders before local storage
    let residuals = draw_transfer_first(state, orders);

    let entitlement = state.total_entitlement();
    let orders_to_date = state.orders_to_date();
    let mut allocated = state.allocated();

    // Phase 2: incremental HR
    if definitely_lt(allocated.hr, entitlement.hr) {
        let held = allocated.hr - orders_to_date;
        let increment = (shared_pool - held)
            .max(0.0)
            .min((entitlement.hr - allocated.hr).max(0.0));
        if increment > 0.0 {
            for zone in state.zones_mut() {
                let share = zone.share().hr;
                zone.grant(ClassVolumes::new(share * increment, 0.0));
            }
            allocated.hr += increment;
            if approx_eq(allocated.hr, entitlement.hr) {
                allocated.hr = entitlement.hr;
            }
        }
        state.set_allocated(allocated);
    }

    let reserves = reserve::project_reserves(state, shared_pool, config.worst_case_loss)?;

    // Phase 3: LR once HR and next season's guarantees are secure
    let hr_full = approx_ge(allocated.hr, entitlement.hr);
    let reserves_met = approx_ge(reserves.hr, entitlement.hr)
        && approx_ge(reserves.operational, config.worst_case_loss);
    if hr_full && reserves_met && definitely_lt(allocated.lr, entitlement.lr) {
        let held = allocated.total() - orders_to_date;
        let increment = (shared_pool - reserves.operational - reserves.hr - held)
            .max(0.0)
            .min((entitlement.lr - allocated.lr).max(0.0));
        if increment > 0.0 {
            for zone in state.zones_mut() {
                let share = zone.share().lr;
                zone.grant(ClassVolumes::new(0.0, share * increment));
            }
            allocated.lr += increment;
            if approx_eq(allocated.lr, entitlement.lr) {
                allocated.lr = entitlement.lr;
            }
            state.set_allocated(allocated);
        }
    }

    let time_step = state.time_step();
    let percentage = state.transfer_mut().advance(hr_full, time_step);
    announce_transfer(state, percentage);

    Ok((percentage, reserves, residuals))
}

/// Push the transfer percentage out to every irrigation-area zone
fn announce_transfer(state: &mut PolicyState, percentage: f64) {
    let percentage = clamp_unit(percentage);
    for zone in state.zones_mut() {
        if zone.is_irrigation_area() {
            zone.set_transfer_percentage(percentage);
        }
    }
}

/// Satisfy orders from transfer allocation; return what local storage owes
fn draw_transfer_first(
    state: &mut PolicyState,
    orders: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut residuals = BTreeMap::new();
    for (zone_id, &volume) in orders {
        if let Some(zone) = state.zone_mut(zone_id) {
            let residual = if zone.is_irrigation_area() {
                zone.draw_transfer(volume.max(0.0))
            } else {
                volume.max(0.0)
            };
            residuals.insert(zone_id.clone(), residual);
        }
    }
    residuals
}

/// Charge residual local orders: carryover, then LR, then HR
///
/// Charges are computed for every zone before any pool is mutated. Only the
/// satisfied part of an order is recorded against the zone.
fn charge_orders(
    state: &mut PolicyState,
    residuals: &BTreeMap<String, f64>,
    policy: OverrunPolicy,
    date: NaiveDate,
) -> Result<Vec<Overrun>, SimulationError> {
    let time_step = state.time_step();
    let mut charges = Vec::with_capacity(residuals.len());
    let mut overruns = Vec::new();

    for (zone_id, &demand) in residuals {
        let Some(zone) = state.zone(zone_id) else {
            continue;
        };
        let charged = charge_order(zone.carryover(), zone.allocation(), demand);
        if charged.unmet > ABS_TOL {
            let available = zone.available_local();
            if policy == OverrunPolicy::Fail {
                return Err(SimulationError::AllocationOverrun {
                    zone_id: zone_id.clone(),
                    requested: demand,
                    available,
                    time_step,
                    date,
                });
            }
            warn!(
                zone = %zone_id,
                requested = demand,
                available,
                time_step,
                %date,
                "order exceeds zone holdings; pools emptied"
            );
            overruns.push(Overrun {
                zone_id: zone_id.clone(),
                requested: demand,
                available,
            });
        }
        charges.push((zone_id.clone(), demand, charged));
    }

    for (zone_id, demand, charged) in charges {
        if let Some(zone) = state.zone_mut(&zone_id) {
            zone.record_order(time_step, demand - charged.unmet);
            zone.set_pools(charged.carryover, charged.allocation);
        }
    }

    Ok(overruns)
}

/// Charge a single zone order outside the farm-order pass
///
/// Used for the environmental order and minimum-flow releases, which are
/// always pre-capped to the zone's holdings.
pub fn charge_zone(state: &mut PolicyState, zone_id: &str, demand: f64) -> f64 {
    let time_step = state.time_step();
    let Some(zone) = state.zone_mut(zone_id) else {
        return demand;
    };
    let charged = charge_order(zone.carryover(), zone.allocation(), demand);
    zone.record_order(time_step, demand - charged.unmet);
    zone.set_pools(charged.carryover, charged.allocation);
    charged.unmet
}

/// Percentage of local HR entitlement allocated so far this season
pub fn hr_percentage(state: &PolicyState) -> f64 {
    clamp_unit(safe_ratio(state.allocated().hr, state.total_entitlement().hr))
}
