//! Water systems, reliability classes and per-system ledgers
//!
//! Every entitlement in the catchment belongs to one water system and one
//! reliability class. High-reliability (HR) water is always allocated before
//! low-reliability (LR) water.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

use crate::core::tolerance::{clamp_unit, safe_ratio};

/// Delivery system an entitlement is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterSystem {
    /// Local catchment storage (farm zones)
    LocalCatchment,
    /// Interstate transfer system (irrigation-area zones only)
    InterstateTransfer,
    /// Environmental water holder
    Environment,
    /// Other delivery obligations (towns, stock and domestic)
    OtherDelivery,
}

impl WaterSystem {
    pub const ALL: [WaterSystem; 4] = [
        WaterSystem::LocalCatchment,
        WaterSystem::InterstateTransfer,
        WaterSystem::Environment,
        WaterSystem::OtherDelivery,
    ];
}

/// Reliability class of an entitlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    High,
    Low,
}

/// A pair of volumes (ML), one per reliability class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassVolumes {
    pub hr: f64,
    pub lr: f64,
}

impl ClassVolumes {
    pub const ZERO: ClassVolumes = ClassVolumes { hr: 0.0, lr: 0.0 };

    pub fn new(hr: f64, lr: f64) -> Self {
        Self { hr, lr }
    }

    pub fn total(&self) -> f64 {
        self.hr + self.lr
    }

    pub fn get(&self, class: Reliability) -> f64 {
        match class {
            Reliability::High => self.hr,
            Reliability::Low => self.lr,
        }
    }

    pub fn get_mut(&mut self, class: Reliability) -> &mut f64 {
        match class {
            Reliability::High => &mut self.hr,
            Reliability::Low => &mut self.lr,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.hr == 0.0 && self.lr == 0.0
    }
}

impl Add for ClassVolumes {
    type Output = ClassVolumes;

    fn add(self, rhs: ClassVolumes) -> ClassVolumes {
        ClassVolumes::new(self.hr + rhs.hr, self.lr + rhs.lr)
    }
}

impl AddAssign for ClassVolumes {
    fn add_assign(&mut self, rhs: ClassVolumes) {
        self.hr += rhs.hr;
        self.lr += rhs.lr;
    }
}

impl Sub for ClassVolumes {
    type Output = ClassVolumes;

    fn sub(self, rhs: ClassVolumes) -> ClassVolumes {
        ClassVolumes::new(self.hr - rhs.hr, self.lr - rhs.lr)
    }
}

/// Aggregate accounting for one water system
///
/// # Invariants
///
/// - `available` is never negative
/// - `perc_entitlement` and `adjusted_perc` lie in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemLedger {
    /// Nominal entitlement volumes
    pub entitlement: ClassVolumes,
    /// Allocation still available to be ordered
    pub available: ClassVolumes,
    /// Allocation announced so far this season
    pub cumulative: ClassVolumes,
    /// Carryover held in this system at the start of the season
    pub carryover: ClassVolumes,
    /// `cumulative / entitlement`
    pub perc_entitlement: ClassVolumes,
    /// `(cumulative + carryover) / (entitlement + carryover)`
    pub adjusted_perc: ClassVolumes,
}

impl SystemLedger {
    /// Recompute both percentage pairs from the volume fields
    pub fn refresh_percentages(&mut self) {
        for class in [Reliability::High, Reliability::Low] {
            let ent = self.entitlement.get(class);
            let cum = self.cumulative.get(class);
            let carry = self.carryover.get(class);
            *self.perc_entitlement.get_mut(class) = clamp_unit(safe_ratio(cum, ent));
            *self.adjusted_perc.get_mut(class) = clamp_unit(safe_ratio(cum + carry, ent + carry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_percentages_includes_carryover() {
        let mut ledger = SystemLedger {
            entitlement: ClassVolumes::new(10_000.0, 5_000.0),
            cumulative: ClassVolumes::new(6_000.0, 0.0),
            carryover: ClassVolumes::new(0.0, 1_000.0),
            ..Default::default()
        };
        ledger.refresh_percentages();
        assert_eq!(ledger.perc_entitlement.hr, 0.6);
        assert_eq!(ledger.perc_entitlement.lr, 0.0);
        assert!((ledger.adjusted_perc.lr - 1_000.0 / 6_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentages_clamp_overshoot() {
        let mut ledger = SystemLedger {
            entitlement: ClassVolumes::new(100.0, 0.0),
            cumulative: ClassVolumes::new(100.0 + 1e-10, 0.0),
            ..Default::default()
        };
        ledger.refresh_percentages();
        assert_eq!(ledger.perc_entitlement.hr, 1.0);
    }
}
