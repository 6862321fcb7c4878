//! Zone model
//!
//! A zone is a demand unit holding surface-water entitlements: a farm, the
//! environmental water holder, or an "other" delivery obligation. Each zone
//! carries:
//! - Entitlements split by water system and reliability class
//! - Available and cumulative allocation for the current season
//! - Season-to-date orders indexed by time step
//! - Within-season carryover (consumed first, never topped up mid-season)
//! - Multi-year carryover history
//!
//! All volumes are megalitres (ML).

use serde::{Deserialize, Serialize};

use crate::core::tolerance::snap_zero;
use crate::models::system::{ClassVolumes, WaterSystem};

/// Kind of demand unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Farm,
    Environmental,
    Other,
}

impl ZoneKind {
    /// Water system the zone's local entitlement is accounted under
    pub fn system(&self) -> WaterSystem {
        match self {
            ZoneKind::Farm => WaterSystem::LocalCatchment,
            ZoneKind::Environmental => WaterSystem::Environment,
            ZoneKind::Other => WaterSystem::OtherDelivery,
        }
    }
}

/// Static description of a zone, assembled from reference tables by the
/// caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: String,
    pub kind: ZoneKind,
    /// Local-catchment entitlement
    pub entitlement: ClassVolumes,
    /// Interstate-transfer entitlement (ignored unless `irrigation_area`)
    #[serde(default)]
    pub transfer_entitlement: ClassVolumes,
    /// Regulation zone used for dam-release order aggregation
    #[serde(default)]
    pub regulation_zone: Option<String>,
    /// Member of the irrigation area that receives transfer allocation
    #[serde(default)]
    pub irrigation_area: bool,
    /// Never accrues carryover
    #[serde(default)]
    pub carryover_exempt: bool,
}

impl ZoneConfig {
    /// Farm zone with local entitlements only
    pub fn farm(id: &str, hr: f64, lr: f64) -> Self {
        Self {
            id: id.to_string(),
            kind: ZoneKind::Farm,
            entitlement: ClassVolumes::new(hr, lr),
            transfer_entitlement: ClassVolumes::ZERO,
            regulation_zone: None,
            irrigation_area: false,
            carryover_exempt: false,
        }
    }

    pub fn with_kind(mut self, kind: ZoneKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_regulation_zone(mut self, regulation_zone: &str) -> Self {
        self.regulation_zone = Some(regulation_zone.to_string());
        self
    }

    /// Mark as an irrigation-area zone with the given transfer entitlement
    pub fn with_transfer(mut self, hr: f64, lr: f64) -> Self {
        self.irrigation_area = true;
        self.transfer_entitlement = ClassVolumes::new(hr, lr);
        self
    }

    pub fn carryover_exempt(mut self) -> Self {
        self.carryover_exempt = true;
        self
    }
}

/// A zone's mutable surface-water account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    id: String,
    kind: ZoneKind,
    regulation_zone: Option<String>,
    irrigation_area: bool,
    carryover_exempt: bool,

    /// Local-catchment entitlement
    entitlement: ClassVolumes,

    /// Interstate-transfer entitlement
    transfer_entitlement: ClassVolumes,

    /// Proportion of the total local entitlement held by this zone, per class
    share: ClassVolumes,

    /// Local allocation still available this season
    allocation: ClassVolumes,

    /// Local allocation announced to this zone this season
    cumulative: ClassVolumes,

    /// Transfer-system HR allocation still available
    transfer_available: f64,

    /// Transfer-system HR water used this season
    transfer_used: f64,

    /// Active carryover; only ever decreases within a season
    carryover: ClassVolumes,

    /// Carryover granted at the start of each year (index = year count)
    carryover_history: Vec<ClassVolumes>,

    /// Local orders per time step this season (index 0 unused)
    orders: Vec<f64>,
}

impl Zone {
    /// Build a zone from its static description
    pub fn new(config: &ZoneConfig) -> Self {
        let transfer_entitlement = if config.irrigation_area {
            config.transfer_entitlement
        } else {
            ClassVolumes::ZERO
        };
        Self {
            id: config.id.clone(),
            kind: config.kind,
            regulation_zone: config.regulation_zone.clone(),
            irrigation_area: config.irrigation_area,
            carryover_exempt: config.carryover_exempt,
            entitlement: config.entitlement,
            transfer_entitlement,
            share: ClassVolumes::ZERO,
            allocation: ClassVolumes::ZERO,
            cumulative: ClassVolumes::ZERO,
            transfer_available: 0.0,
            transfer_used: 0.0,
            carryover: ClassVolumes::ZERO,
            carryover_history: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn regulation_zone(&self) -> Option<&str> {
        self.regulation_zone.as_deref()
    }

    pub fn is_irrigation_area(&self) -> bool {
        self.irrigation_area
    }

    pub fn is_carryover_exempt(&self) -> bool {
        self.carryover_exempt
    }

    pub fn entitlement(&self) -> ClassVolumes {
        self.entitlement
    }

    pub fn transfer_entitlement(&self) -> ClassVolumes {
        self.transfer_entitlement
    }

    pub fn share(&self) -> ClassVolumes {
        self.share
    }

    pub fn allocation(&self) -> ClassVolumes {
        self.allocation
    }

    pub fn cumulative(&self) -> ClassVolumes {
        self.cumulative
    }

    pub fn transfer_available(&self) -> f64 {
        self.transfer_available
    }

    pub fn transfer_used(&self) -> f64 {
        self.transfer_used
    }

    pub fn carryover(&self) -> ClassVolumes {
        self.carryover
    }

    pub fn carryover_history(&self) -> &[ClassVolumes] {
        &self.carryover_history
    }

    pub fn orders(&self) -> &[f64] {
        &self.orders
    }

    /// Local orders placed so far this season
    pub fn season_orders(&self) -> f64 {
        self.orders.iter().fold(0.0, |total, order| total + order)
    }

    /// Everything the zone could still order from local storage
    pub fn available_local(&self) -> f64 {
        self.allocation.total() + self.carryover.total()
    }

    pub(crate) fn set_share(&mut self, share: ClassVolumes) {
        self.share = share;
    }

    // ========================================================================
    // Allocation mutation
    // ========================================================================

    /// Start a new season with a fresh HR allocation and no LR
    pub(crate) fn begin_season(&mut self, hr_allocation: f64) {
        self.allocation = ClassVolumes::new(hr_allocation, 0.0);
        self.cumulative = ClassVolumes::new(hr_allocation, 0.0);
        self.orders.clear();
        self.transfer_used = 0.0;
        self.transfer_available = 0.0;
    }

    /// Announce additional allocation to this zone
    pub(crate) fn grant(&mut self, increment: ClassVolumes) {
        self.allocation += increment;
        self.cumulative += increment;
    }

    /// Set the transfer-system allocation from the announced percentage
    pub(crate) fn set_transfer_percentage(&mut self, fraction: f64) {
        let announced = self.transfer_entitlement.hr * fraction;
        self.transfer_available = (announced - self.transfer_used).max(0.0);
    }

    /// Satisfy as much of `demand` as possible from the transfer system,
    /// returning the residual demand on local storage
    pub(crate) fn draw_transfer(&mut self, demand: f64) -> f64 {
        let drawn = demand.min(self.transfer_available).max(0.0);
        self.transfer_available = snap_zero(self.transfer_available - drawn, self.transfer_entitlement.hr);
        self.transfer_used += drawn;
        demand - drawn
    }

    pub(crate) fn set_pools(&mut self, carryover: ClassVolumes, allocation: ClassVolumes) {
        debug_assert!(carryover.hr <= self.carryover.hr && carryover.lr <= self.carryover.lr);
        self.carryover = carryover;
        self.allocation = allocation;
    }

    /// Record the local order for `time_step`
    pub(crate) fn record_order(&mut self, time_step: usize, volume: f64) {
        if self.orders.len() <= time_step {
            self.orders.resize(time_step + 1, 0.0);
        }
        self.orders[time_step] += volume;
    }

    /// Install the carryover granted for `year`
    pub(crate) fn install_carryover(&mut self, year: usize, carryover: ClassVolumes) {
        if self.carryover_history.len() <= year {
            self.carryover_history.resize(year + 1, ClassVolumes::ZERO);
        }
        self.carryover_history[year] = carryover;
        self.carryover = carryover;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_only_for_irrigation_area() {
        let mut config = ZoneConfig::farm("Z1", 100.0, 50.0);
        config.transfer_entitlement = ClassVolumes::new(40.0, 0.0);
        let zone = Zone::new(&config);
        assert_eq!(zone.transfer_entitlement(), ClassVolumes::ZERO);

        let zone = Zone::new(&ZoneConfig::farm("Z2", 100.0, 50.0).with_transfer(40.0, 0.0));
        assert_eq!(zone.transfer_entitlement().hr, 40.0);
    }

    #[test]
    fn test_draw_transfer_returns_residual() {
        let mut zone = Zone::new(&ZoneConfig::farm("Z", 100.0, 0.0).with_transfer(50.0, 0.0));
        zone.set_transfer_percentage(0.5);
        assert_eq!(zone.transfer_available(), 25.0);

        let residual = zone.draw_transfer(30.0);
        assert_eq!(residual, 5.0);
        assert_eq!(zone.transfer_available(), 0.0);
        assert_eq!(zone.transfer_used(), 25.0);

        // Raising the percentage only releases the unused remainder
        zone.set_transfer_percentage(1.0);
        assert_eq!(zone.transfer_available(), 25.0);
    }

    #[test]
    fn test_record_order_grows_series() {
        let mut zone = Zone::new(&ZoneConfig::farm("Z", 100.0, 0.0));
        zone.record_order(3, 12.5);
        zone.record_order(3, 2.5);
        assert_eq!(zone.orders(), &[0.0, 0.0, 0.0, 15.0]);
        assert_eq!(zone.season_orders(), 15.0);
    }

    #[test]
    fn test_no_orders_is_positive_zero() {
        let zone = Zone::new(&ZoneConfig::farm("Z", 100.0, 0.0));
        assert!(zone.season_orders().is_sign_positive());
    }
}
