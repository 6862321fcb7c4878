//! Groundwater Licensing & Restriction State Machine
//!
//! Runs on its own annual clock, keyed on the groundwater season start and
//! end month/day, independent of the weekly surface-water scheduler.
//!
//! # Annual Cycle
//!
//! ```text
//! season start: read trigger bores → pick proportion table → look up
//!               proportion per zone → licence = entitlement × proportion + carryover
//! any tick:     supplied groundwater orders accumulate into used volume
//! season end:   carryover = min(25% of licence, licence − used); counters reset;
//!               year count advances
//! ```
//!
//! In drought-aware mode the surface-water HR percentage feeds a drought
//! counter that selects between the `drought` and `nondrought` tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

use crate::core::time::MonthDay;
use crate::core::tolerance::snap_zero;
use crate::orchestrator::ConfigError;

/// Share of the licence that may be carried into the next year
pub const GROUNDWATER_CARRYOVER_CAP: f64 = 0.25;

/// Which depth→proportion table applies this year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProportionTable {
    Current,
    Drought,
    NonDrought,
}

/// Licensing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroundwaterMode {
    /// Always use the `current` table
    #[default]
    Default,
    /// Switch tables on a surface-water drought counter
    DroughtAware {
        /// Surface-water HR percentage below which a year counts as drought
        drought_threshold: f64,
        /// Drought years during which the `drought` table applies
        max_drought_years: u32,
    },
}

impl GroundwaterMode {
    pub fn drought_aware() -> Self {
        GroundwaterMode::DroughtAware {
            drought_threshold: 0.3,
            max_drought_years: 3,
        }
    }
}

/// Depth → allocation proportion lookup
///
/// Points are kept sorted by depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthProportionTable {
    points: Vec<(f64, f64)>,
}

impl DepthProportionTable {
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Proportion at the nearest tabulated depth at or below `level`,
    /// falling back to the nearest depth above; zero for an empty table
    ///
    /// # Example
    /// ```
    /// use catchment_policy_core_rs::groundwater::DepthProportionTable;
    ///
    /// let table = DepthProportionTable::new(vec![(5.0, 1.0), (10.0, 0.7), (15.0, 0.4)]);
    /// assert_eq!(table.lookup(12.0), 0.7);
    /// assert_eq!(table.lookup(15.0), 0.4);
    /// assert_eq!(table.lookup(2.0), 1.0);
    /// ```
    pub fn lookup(&self, level: f64) -> f64 {
        let below = self.points.iter().rev().find(|(depth, _)| *depth <= level);
        let above = self.points.iter().find(|(depth, _)| *depth > level);
        below.or(above).map(|(_, proportion)| *proportion).unwrap_or(0.0)
    }
}

/// The three lookup regimes of one trigger bore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoreTables {
    pub current: DepthProportionTable,
    pub drought: DepthProportionTable,
    pub nondrought: DepthProportionTable,
}

impl BoreTables {
    pub fn table(&self, which: ProportionTable) -> &DepthProportionTable {
        match which {
            ProportionTable::Current => &self.current,
            ProportionTable::Drought => &self.drought,
            ProportionTable::NonDrought => &self.nondrought,
        }
    }
}

/// Static description of a groundwater zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterZoneConfig {
    pub zone_id: String,
    pub bore_id: String,
    pub entitlement: f64,
}

/// Groundwater configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterConfig {
    #[serde(default)]
    pub mode: GroundwaterMode,
    pub season_start: MonthDay,
    pub season_end: MonthDay,
    pub zones: Vec<GroundwaterZoneConfig>,
    /// Lookup tables per trigger bore id
    pub bores: BTreeMap<String, BoreTables>,
}

impl Default for GroundwaterConfig {
    fn default() -> Self {
        Self {
            mode: GroundwaterMode::Default,
            season_start: MonthDay::new(7, 1),
            season_end: MonthDay::new(6, 30),
            zones: Vec::new(),
            bores: BTreeMap::new(),
        }
    }
}

/// Per-zone groundwater account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterZoneRecord {
    pub zone_id: String,
    pub bore_id: String,
    pub entitlement: f64,
    /// Trigger-bore level used for this year's lookup
    pub trigger_level: f64,
    pub proportion: f64,
    /// Licensed volume for the year (ML)
    pub licence: f64,
    /// Carryover into the current year (ML)
    pub carryover: f64,
    /// Volume used this year (ML)
    pub used: f64,
    /// Volume used over the whole run (ML)
    pub cumulative_used: f64,
}

impl GroundwaterZoneRecord {
    /// Licence volume not yet used
    pub fn remaining(&self) -> f64 {
        (self.licence - self.used).max(0.0)
    }
}

/// Outcome of a groundwater clock step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundwaterStep {
    Idle,
    YearClosed { year: usize, total_carryover: f64 },
    Licensed { year: usize, table: ProportionTable, drought_count: u32, total_licensed: f64 },
}

/// Groundwater licensing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterLicensing {
    mode: GroundwaterMode,
    season_start: MonthDay,
    season_end: MonthDay,
    bores: BTreeMap<String, BoreTables>,
    /// Latest observed level per trigger bore
    bore_levels: BTreeMap<String, f64>,
    zones: Vec<GroundwaterZoneRecord>,
    index: HashMap<String, usize>,
    table: ProportionTable,
    drought_count: u32,
    year: usize,
}

impl GroundwaterLicensing {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// - `BoreCountMismatch` if the number of bore tables differs from the
    ///   number of distinct bores referenced by zones
    /// - `UnknownBore` if a zone references a bore without tables
    /// - `DuplicateZone` for repeated zone ids
    pub fn new(config: &GroundwaterConfig) -> Result<Self, ConfigError> {
        let referenced: BTreeSet<&str> = config.zones.iter().map(|z| z.bore_id.as_str()).collect();
        if referenced.len() != config.bores.len() {
            return Err(ConfigError::BoreCountMismatch {
                tables: config.bores.len(),
                referenced: referenced.len(),
            });
        }

        let mut zones = Vec::with_capacity(config.zones.len());
        let mut index = HashMap::new();
        for zone in &config.zones {
            if !config.bores.contains_key(&zone.bore_id) {
                return Err(ConfigError::UnknownBore {
                    zone: zone.zone_id.clone(),
                    bore: zone.bore_id.clone(),
                });
            }
            if index.insert(zone.zone_id.clone(), zones.len()).is_some() {
                return Err(ConfigError::DuplicateZone(zone.zone_id.clone()));
            }
            zones.push(GroundwaterZoneRecord {
                zone_id: zone.zone_id.clone(),
                bore_id: zone.bore_id.clone(),
                entitlement: zone.entitlement,
                trigger_level: 0.0,
                proportion: 0.0,
                licence: 0.0,
                carryover: 0.0,
                used: 0.0,
                cumulative_used: 0.0,
            });
        }

        Ok(Self {
            mode: config.mode,
            season_start: config.season_start,
            season_end: config.season_end,
            bores: config.bores.clone(),
            bore_levels: BTreeMap::new(),
            zones,
            index,
            table: ProportionTable::Current,
            drought_count: 0,
            year: 1,
        })
    }

    pub fn zones(&self) -> &[GroundwaterZoneRecord] {
        &self.zones
    }

    pub fn zone(&self, zone_id: &str) -> Option<&GroundwaterZoneRecord> {
        self.index.get(zone_id).map(|&i| &self.zones[i])
    }

    pub fn year(&self) -> usize {
        self.year
    }

    pub fn drought_count(&self) -> u32 {
        self.drought_count
    }

    pub fn table(&self) -> ProportionTable {
        self.table
    }

    /// Accumulate supplied groundwater orders
    ///
    /// Orders for zones without a groundwater licence are ignored; negative
    /// orders are treated as zero.
    pub fn record_orders(&mut self, orders: &BTreeMap<String, f64>) {
        for (zone_id, volume) in orders {
            if let Some(&i) = self.index.get(zone_id) {
                let volume = volume.max(0.0);
                self.zones[i].used += volume;
                self.zones[i].cumulative_used += volume;
            }
        }
    }

    /// Advance the annual clock for `date`
    ///
    /// `hr_percentage` is the HR percentage of entitlement reached by the
    /// last surface-water season, consulted only in drought-aware mode.
    /// `None` before any season has run; the drought counter is then left
    /// alone.
    pub fn advance(
        &mut self,
        date: NaiveDate,
        bore_levels: &BTreeMap<String, f64>,
        hr_percentage: Option<f64>,
    ) -> GroundwaterStep {
        if self.season_end.matches(date) {
            return self.close_year(date);
        }
        if self.season_start.matches(date) {
            return self.start_year(date, bore_levels, hr_percentage);
        }
        GroundwaterStep::Idle
    }

    fn select_table(&mut self, hr_percentage: Option<f64>) -> ProportionTable {
        match self.mode {
            GroundwaterMode::Default => ProportionTable::Current,
            GroundwaterMode::DroughtAware {
                drought_threshold,
                max_drought_years,
            } => {
                if hr_percentage.is_some_and(|hr| hr < drought_threshold) {
                    self.drought_count += 1;
                }
                if self.drought_count > 0 && self.drought_count <= max_drought_years {
                    ProportionTable::Drought
                } else {
                    ProportionTable::NonDrought
                }
            }
        }
    }

    fn start_year(
        &mut self,
        date: NaiveDate,
        bore_levels: &BTreeMap<String, f64>,
        hr_percentage: Option<f64>,
    ) -> GroundwaterStep {
        for (bore, level) in bore_levels {
            if self.bores.contains_key(bore) {
                self.bore_levels.insert(bore.clone(), *level);
            }
        }

        let table = self.select_table(hr_percentage);
        self.table = table;

        let mut total_licensed = 0.0;
        for zone in self.zones.iter_mut() {
            let level = self.bore_levels.get(&zone.bore_id).copied().unwrap_or(0.0);
            let proportion = self
                .bores
                .get(&zone.bore_id)
                .map(|tables| tables.table(table).lookup(level))
                .unwrap_or(0.0);
            zone.trigger_level = level;
            zone.proportion = proportion;
            zone.licence = zone.entitlement * proportion + zone.carryover;
            total_licensed += zone.licence;
        }

        info!(
            %date,
            year = self.year,
            ?table,
            drought_count = self.drought_count,
            total_licensed,
            "groundwater licences issued"
        );
        GroundwaterStep::Licensed {
            year: self.year,
            table,
            drought_count: self.drought_count,
            total_licensed,
        }
    }

    fn close_year(&mut self, date: NaiveDate) -> GroundwaterStep {
        let closed = self.year;
        let mut total_carryover = 0.0;
        for zone in self.zones.iter_mut() {
            let licence = zone.entitlement * zone.proportion + zone.carryover;
            let carry = (GROUNDWATER_CARRYOVER_CAP * licence).min(licence - zone.used);
            zone.carryover = snap_zero(carry, licence).max(0.0);
            zone.licence = 0.0;
            zone.used = 0.0;
            zone.proportion = 0.0;
            total_carryover += zone.carryover;
        }
        self.year += 1;

        info!(%date, year = closed, total_carryover, "groundwater year closed");
        GroundwaterStep::YearClosed {
            year: closed,
            total_carryover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(points: &[(f64, f64)]) -> DepthProportionTable {
        DepthProportionTable::new(points.to_vec())
    }

    #[test]
    fn test_lookup_prefers_depth_below() {
        let t = table(&[(15.0, 0.4), (5.0, 1.0), (10.0, 0.7)]);
        assert_eq!(t.lookup(9.99), 1.0);
        assert_eq!(t.lookup(10.0), 0.7);
        assert_eq!(t.lookup(100.0), 0.4);
        assert_eq!(t.lookup(0.0), 1.0);
        assert_eq!(DepthProportionTable::default().lookup(3.0), 0.0);
    }

    #[test]
    fn test_bore_count_mismatch() {
        let config = GroundwaterConfig {
            zones: vec![
                GroundwaterZoneConfig { zone_id: "A".into(), bore_id: "B1".into(), entitlement: 10.0 },
                GroundwaterZoneConfig { zone_id: "B".into(), bore_id: "B2".into(), entitlement: 10.0 },
            ],
            bores: [("B1".to_string(), BoreTables::default())].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(
            GroundwaterLicensing::new(&config),
            Err(ConfigError::BoreCountMismatch { tables: 1, referenced: 2 })
        );
    }
}
