//! End-of-season carryover rollover
//!
//! 95% of a zone's unused allocation is carried into next season, filling the
//! LR class first (up to LR entitlement) with the remainder held as HR.
//! Carryover left unused from the closing season is forfeited. Zones with no
//! entitlement at all, or flagged carryover-exempt, carry nothing.

use crate::models::state::PolicyState;
use crate::models::system::ClassVolumes;

/// Share of unused allocation that survives into next season
pub const CARRYOVER_FRACTION: f64 = 0.95;

/// Carryover earned by a single zone
pub fn zone_carryover(unused: f64, entitlement: ClassVolumes) -> ClassVolumes {
    let carried = CARRYOVER_FRACTION * unused.max(0.0);
    let lr = carried.min(entitlement.lr);
    ClassVolumes::new(carried - lr, lr)
}

/// Roll every zone's unused allocation into next year's carryover
///
/// Must run before the state closes the year: the grant is stored at
/// `year + 1` in each zone's history and becomes the zone's active carryover.
/// Returns the grant per zone id in zone order.
pub fn roll_over(state: &mut PolicyState) -> Vec<(String, ClassVolumes)> {
    let next_year = state.year() + 1;
    let mut grants = Vec::with_capacity(state.num_zones());

    for zone in state.zones_mut() {
        let entitlement = zone.entitlement();
        let grant = if entitlement.is_zero() || zone.is_carryover_exempt() {
            ClassVolumes::ZERO
        } else {
            zone_carryover(zone.allocation().total(), entitlement)
        };
        zone.install_carryover(next_year, grant);
        grants.push((zone.id().to_string(), grant));
    }

    grants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lr_filled_first() {
        let carry = zone_carryover(200.0, ClassVolumes::new(1000.0, 100.0));
        assert_eq!(carry.lr, 100.0);
        assert!((carry.hr - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_unused_all_lr() {
        let carry = zone_carryover(40.0, ClassVolumes::new(1000.0, 100.0));
        assert_eq!(carry, ClassVolumes::new(0.0, 38.0));
    }
}
