//! Cascading subtraction
//!
//! Demand is drawn from a low-priority pool first and only spills into the
//! high-priority pool once the low pool is exhausted. Whatever neither pool
//! can cover is reported as unmet. Near-zero remainders snap to exactly zero
//! so repeated proportional redistribution cannot leave dust behind.

use crate::core::tolerance::snap_zero;
use crate::models::system::ClassVolumes;

/// Subtract `demand` from `low` then `high`
///
/// Returns `(remaining_low, remaining_high, unmet_demand)`; all three are
/// non-negative and `remaining_low + remaining_high + (demand - unmet)`
/// equals `low + high`.
///
/// # Example
/// ```
/// use catchment_policy_core_rs::allocation::cascade::subtract;
///
/// assert_eq!(subtract(100.0, 50.0, 80.0), (20.0, 50.0, 0.0));
/// assert_eq!(subtract(30.0, 50.0, 60.0), (0.0, 20.0, 0.0));
/// assert_eq!(subtract(30.0, 20.0, 60.0), (0.0, 0.0, 10.0));
/// ```
pub fn subtract(low: f64, high: f64, demand: f64) -> (f64, f64, f64) {
    let low = low.max(0.0);
    let high = high.max(0.0);
    let demand = demand.max(0.0);
    let reference = low + high + demand;

    if demand <= low {
        return (snap_zero(low - demand, reference), high, 0.0);
    }

    let shortfall = demand - low;
    if shortfall <= high {
        return (0.0, snap_zero(high - shortfall, reference), 0.0);
    }

    (0.0, 0.0, snap_zero(shortfall - high, reference))
}

/// Remaining pools of a zone after an order has been charged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargedOrder {
    pub carryover: ClassVolumes,
    pub allocation: ClassVolumes,
    pub unmet: f64,
}

/// Charge an order against carryover first, then LR, then HR allocation
pub fn charge_order(carryover: ClassVolumes, allocation: ClassVolumes, demand: f64) -> ChargedOrder {
    let (carry_lr, carry_hr, spill) = subtract(carryover.lr, carryover.hr, demand);
    let (alloc_lr, alloc_hr, unmet) = subtract(allocation.lr, allocation.hr, spill);
    ChargedOrder {
        carryover: ClassVolumes::new(carry_hr, carry_lr),
        allocation: ClassVolumes::new(alloc_hr, alloc_lr),
        unmet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtract_exact_exhaustion() {
        assert_eq!(subtract(30.0, 20.0, 50.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_subtract_snaps_dust() {
        let (low, high, unmet) = subtract(0.1 + 0.2, 10.0, 0.3);
        assert_eq!(low, 0.0);
        assert_eq!(high, 10.0);
        assert_eq!(unmet, 0.0);
    }

    #[test]
    fn test_negative_demand_is_ignored() {
        assert_eq!(subtract(5.0, 5.0, -3.0), (5.0, 5.0, 0.0));
    }

    #[test]
    fn test_charge_order_priority() {
        let charged = charge_order(
            ClassVolumes::new(10.0, 5.0),
            ClassVolumes::new(100.0, 20.0),
            40.0,
        );
        // carryover LR (5) + carryover HR (10) + allocation LR (20) + 5 HR
        assert_eq!(charged.carryover, ClassVolumes::ZERO);
        assert_eq!(charged.allocation, ClassVolumes::new(95.0, 0.0));
        assert_eq!(charged.unmet, 0.0);
    }

    #[test]
    fn test_charge_order_overrun() {
        let charged = charge_order(ClassVolumes::ZERO, ClassVolumes::new(10.0, 0.0), 12.0);
        assert_eq!(charged.allocation, ClassVolumes::ZERO);
        assert_eq!(charged.unmet, 2.0);
    }
}
