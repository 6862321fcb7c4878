//! Policy State
//!
//! The single aggregate owning every piece of mutable surface-water policy
//! state: zone accounts, per-system ledgers, the environmental accumulator,
//! reserve series and the interstate-transfer regime state.
//!
//! # Critical Invariants
//!
//! 1. **Zone Uniqueness**: each zone id appears exactly once
//! 2. **Share Consistency**: zone shares of the total local entitlement sum to 1
//!    per class (or are all zero when the class has no entitlement)
//! 3. **Bounded Allocation**: cumulative allocation never exceeds entitlement,
//!    so every percentage lies in [0, 1]
//! 4. **Non-negative Pools**: no zone pool is ever negative

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::allocation::interstate::{AllocationScenario, TransferState};
use crate::core::tolerance::{clamp_unit, safe_ratio};
use crate::models::environment::EnvironmentState;
use crate::models::reserve::ReserveSeries;
use crate::models::system::{ClassVolumes, SystemLedger, WaterSystem};
use crate::models::zone::{Zone, ZoneConfig, ZoneKind};
use crate::orchestrator::ConfigError;

/// Complete surface-water policy state
///
/// # Example
///
/// ```rust
/// use catchment_policy_core_rs::models::{PolicyState, ZoneConfig, ZoneKind};
/// use catchment_policy_core_rs::AllocationScenario;
///
/// let zones = vec![
///     ZoneConfig::farm("FARM_1", 8_000.0, 4_000.0),
///     ZoneConfig::farm("ENV", 2_000.0, 1_000.0).with_kind(ZoneKind::Environmental),
/// ];
/// let state = PolicyState::new(&zones, "ENV", 0.0, AllocationScenario::Median, 10).unwrap();
/// assert_eq!(state.num_zones(), 2);
/// assert_eq!(state.total_entitlement().hr, 10_000.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyState {
    /// Zone accounts in configuration order
    zones: Vec<Zone>,

    /// Zone id → position in `zones`
    index: HashMap<String, usize>,

    /// Aggregates per water system, refreshed after every mutation pass
    ledgers: BTreeMap<WaterSystem, SystemLedger>,

    /// Total local-storage entitlement across all zones
    total_entitlement: ClassVolumes,

    /// Local-storage allocation announced so far this season
    allocated: ClassVolumes,

    environment: EnvironmentState,

    reserves: ReserveSeries,

    transfer: TransferState,

    /// Year count (1-based, not the calendar year)
    year: usize,

    /// Time step within the season (1 on the first tick)
    time_step: usize,

    /// Time step across the whole run
    global_step: usize,
}

impl PolicyState {
    /// Assemble the state from zone tables
    ///
    /// `environment_zone` must name a zone of kind
    /// [`ZoneKind::Environmental`]; its HR entitlement is reduced by
    /// `annual_losses` before shares are computed.
    pub fn new(
        zone_configs: &[ZoneConfig],
        environment_zone: &str,
        annual_losses: f64,
        scenario: AllocationScenario,
        num_years: usize,
    ) -> Result<Self, ConfigError> {
        let mut zones = Vec::with_capacity(zone_configs.len());
        let mut index = HashMap::new();
        let mut environment = None;

        for config in zone_configs {
            if index.contains_key(&config.id) {
                return Err(ConfigError::DuplicateZone(config.id.clone()));
            }
            let mut config = config.clone();
            if config.id == environment_zone {
                if config.kind != ZoneKind::Environmental {
                    return Err(ConfigError::Invalid(format!(
                        "environmental zone {} is not of kind environmental",
                        config.id
                    )));
                }
                let env = EnvironmentState::new(
                    &config.id,
                    config.entitlement.hr,
                    config.entitlement.lr,
                    annual_losses,
                );
                config.entitlement.hr = env.hr_entitlement;
                environment = Some(env);
            }
            index.insert(config.id.clone(), zones.len());
            zones.push(Zone::new(&config));
        }

        let environment = environment
            .ok_or_else(|| ConfigError::MissingEnvironmentZone(environment_zone.to_string()))?;

        let total_entitlement = zones
            .iter()
            .fold(ClassVolumes::ZERO, |acc, zone| acc + zone.entitlement());

        for zone in zones.iter_mut() {
            let ent = zone.entitlement();
            zone.set_share(ClassVolumes::new(
                safe_ratio(ent.hr, total_entitlement.hr),
                safe_ratio(ent.lr, total_entitlement.lr),
            ));
        }

        let mut state = Self {
            zones,
            index,
            ledgers: BTreeMap::new(),
            total_entitlement,
            allocated: ClassVolumes::ZERO,
            environment,
            reserves: ReserveSeries::new(num_years),
            transfer: TransferState::new(scenario),
            year: 1,
            time_step: 0,
            global_step: 0,
        };
        state.refresh_ledgers();
        Ok(state)
    }

    // ========================================================================
    // Zone access
    // ========================================================================

    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub(crate) fn zones_mut(&mut self) -> &mut [Zone] {
        &mut self.zones
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    pub(crate) fn zone_mut(&mut self, id: &str) -> Option<&mut Zone> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.zones[i]),
            None => None,
        }
    }

    pub fn contains_zone(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    pub fn total_entitlement(&self) -> ClassVolumes {
        self.total_entitlement
    }

    pub fn allocated(&self) -> ClassVolumes {
        self.allocated
    }

    pub(crate) fn set_allocated(&mut self, allocated: ClassVolumes) {
        self.allocated = allocated;
    }

    /// Fraction of total local entitlement announced, per class
    pub fn local_percentage(&self) -> ClassVolumes {
        ClassVolumes::new(
            clamp_unit(safe_ratio(self.allocated.hr, self.total_entitlement.hr)),
            clamp_unit(safe_ratio(self.allocated.lr, self.total_entitlement.lr)),
        )
    }

    /// Local orders placed by all zones so far this season
    pub fn orders_to_date(&self) -> f64 {
        self.zones.iter().fold(0.0, |total, zone| total + zone.season_orders())
    }

    pub fn ledger(&self, system: WaterSystem) -> &SystemLedger {
        &self.ledgers[&system]
    }

    pub fn ledgers(&self) -> &BTreeMap<WaterSystem, SystemLedger> {
        &self.ledgers
    }

    /// Rebuild the per-system ledgers from the zone accounts
    pub fn refresh_ledgers(&mut self) {
        let mut ledgers: BTreeMap<WaterSystem, SystemLedger> = WaterSystem::ALL
            .iter()
            .map(|system| (*system, SystemLedger::default()))
            .collect();

        for zone in &self.zones {
            let local = ledgers.entry(zone.kind().system()).or_default();
            local.entitlement += zone.entitlement();
            local.available += zone.allocation() + zone.carryover();
            local.cumulative += zone.cumulative();
            local.carryover += zone.carryover_history().get(self.year).copied().unwrap_or_default();

            if zone.is_irrigation_area() {
                let transfer = ledgers.entry(WaterSystem::InterstateTransfer).or_default();
                transfer.entitlement += zone.transfer_entitlement();
                transfer.available.hr += zone.transfer_available();
                transfer.cumulative.hr += zone.transfer_available() + zone.transfer_used();
            }
        }

        for ledger in ledgers.values_mut() {
            ledger.available.hr = ledger.available.hr.max(0.0);
            ledger.available.lr = ledger.available.lr.max(0.0);
            ledger.refresh_percentages();
        }
        self.ledgers = ledgers;
    }

    // ========================================================================
    // Environment, reserves and clocks
    // ========================================================================

    pub fn environment(&self) -> &EnvironmentState {
        &self.environment
    }

    pub(crate) fn environment_mut(&mut self) -> &mut EnvironmentState {
        &mut self.environment
    }

    /// HR + LR still available to the environmental water holder
    pub fn environment_available(&self) -> f64 {
        self.zone(&self.environment.zone_id)
            .map(Zone::available_local)
            .unwrap_or(0.0)
    }

    pub fn reserves(&self) -> &ReserveSeries {
        &self.reserves
    }

    pub(crate) fn reserves_mut(&mut self) -> &mut ReserveSeries {
        &mut self.reserves
    }

    pub fn transfer(&self) -> &TransferState {
        &self.transfer
    }

    pub(crate) fn transfer_mut(&mut self) -> &mut TransferState {
        &mut self.transfer
    }

    pub fn year(&self) -> usize {
        self.year
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    /// Move to the next scheduler tick
    ///
    /// Every call also advances the run-wide step used to index the weekly
    /// reserve series.
    pub fn set_time_step(&mut self, time_step: usize) {
        self.time_step = time_step;
        self.global_step += 1;
    }

    /// Close the year: bump the year count and zero the season accumulators
    pub(crate) fn close_year(&mut self) {
        self.year += 1;
        self.time_step = 0;
        self.allocated = ClassVolumes::ZERO;
        self.environment.reset_season();
    }
}
