//! Next-season reserve projection
//!
//! Once the local HR entitlement is fully allocated, water left in the shared
//! pool is withheld so next season can open with a guaranteed position:
//! operational reserve first (up to the worst-case loss), then HR reserve
//! (up to the full HR entitlement). Reserve levels never fall within a
//! season. Each week's levels are also written to the `year + 1` slot so the
//! following season's first allocation can draw on them.

use crate::core::tolerance::{approx_ge, definitely_lt};
use crate::models::reserve::ReserveVolumes;
use crate::models::state::PolicyState;
use crate::orchestrator::SimulationError;

/// Compute and record this tick's reserves
///
/// # Arguments
///
/// * `state` - Policy state; its global step and year select the slots written
/// * `shared_pool` - Shared-pool volume available this tick (ML)
/// * `worst_case_loss` - Operational reserve target (ML)
///
/// # Errors
///
/// `ReserveHorizonExceeded` if the `year + 1` slot lies beyond the
/// pre-sized yearly series.
pub fn project_reserves(
    state: &mut PolicyState,
    shared_pool: f64,
    worst_case_loss: f64,
) -> Result<ReserveVolumes, SimulationError> {
    let step = state.global_step();
    let year = state.year();
    let entitlement_hr = state.total_entitlement().hr;
    let allocated_hr = state.allocated().hr;

    let reserves = if !approx_ge(allocated_hr, entitlement_hr) {
        ReserveVolumes::default()
    } else {
        let last = state.reserves().weekly(step.saturating_sub(1));
        if definitely_lt(last.hr_plus_operational(), entitlement_hr + worst_case_loss) {
            let committed = allocated_hr - state.orders_to_date();
            let mut spare = (shared_pool - committed).max(0.0);

            let operational = spare.min(worst_case_loss);
            spare -= operational;
            let hr = spare.min(entitlement_hr);

            ReserveVolumes {
                hr: last.hr.max(hr),
                lr: last.lr,
                operational: last.operational.max(operational),
            }
        } else {
            last
        }
    };

    let series = state.reserves_mut();
    series.record_weekly(step, reserves);
    series.record_yearly(year + 1, reserves)?;
    Ok(reserves)
}
