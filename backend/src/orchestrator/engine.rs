//! Policy Engine
//!
//! Main per-date loop integrating all policy components:
//! - Groundwater licensing (annual clock)
//! - Seasonal scheduling (weekly clock plus fresh-check dates)
//! - Surface-water allocation and order charging
//! - Environmental flow rules
//! - Dam release
//! - Event logging (complete run history)
//!
//! # Architecture
//!
//! ```text
//! For each date d:
//! 1. Record groundwater orders; advance the groundwater clock
//! 2. Ask the scheduler whether the policy runs today
//!    - season end: roll carryover, close the year, ask again
//!    - idle: report availability only, outcome NotRun
//! 3. Allocation pass and order charging
//! 4. Environmental order, charged to the environmental zone
//! 5. Dam release, funding passing flows from the nominated zone
//! 6. Report per-zone availability and ancillary indicators
//! ```
//!
//! # Example
//!
//! ```rust
//! use catchment_policy_core_rs::environment::GaugeRecord;
//! use catchment_policy_core_rs::models::{ZoneConfig, ZoneKind};
//! use catchment_policy_core_rs::orchestrator::{EngineConfig, PolicyEngine, TickInput, TickOutcome};
//! use chrono::NaiveDate;
//!
//! let config = EngineConfig::new(
//!     vec![
//!         ZoneConfig::farm("FARM_1", 8_000.0, 4_000.0).with_regulation_zone("zone_1a"),
//!         ZoneConfig::farm("ENV", 2_000.0, 1_000.0).with_kind(ZoneKind::Environmental),
//!     ],
//!     "ENV",
//! );
//! let mut engine = PolicyEngine::new(config).unwrap();
//!
//! let start = NaiveDate::from_ymd_opt(2030, 7, 1).unwrap();
//! let gauge = GaugeRecord::new(start, vec![200.0; 30]);
//! let result = engine.run_model(&TickInput::new(start, &gauge, 150_000.0, 0.0)).unwrap();
//! assert!(matches!(result.outcome, TickOutcome::Released(_)));
//!
//! let next = engine.run_model(&TickInput::new(start.succ_opt().unwrap(), &gauge, 150_000.0, 0.0)).unwrap();
//! assert_eq!(next.outcome, TickOutcome::NotRun);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::allocation::{self, carryover, AllocationConfig, OverrunPolicy};
use crate::allocation::interstate::AllocationScenario;
use crate::core::time::MonthDay;
use crate::environment::{self, EnvironmentalInputs, GaugeRecord};
use crate::groundwater::{GroundwaterConfig, GroundwaterLicensing, GroundwaterStep};
use crate::indicators::{recreational_index, ExtractionSchedule, DEFAULT_DAM_CAPACITY, DEFAULT_RECREATION_THRESHOLD};
use crate::models::event::{Event, EventLog};
use crate::models::state::PolicyState;
use crate::models::zone::{ZoneConfig, ZoneKind};
use crate::orchestrator::checkpoint::{compute_config_hash, StateSnapshot};
use crate::orchestrator::{ConfigError, SimulationError};
use crate::release::{self, DamReleaseContext, ReleaseConfig};
use crate::scheduler::{ScheduleDecision, SeasonScheduler};

// ============================================================================
// Configuration Types
// ============================================================================

/// Environmental water holder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Zone id of the environmental water holder (must be a configured zone)
    pub zone_id: String,
    /// Fixed annual losses deducted from its HR entitlement (ML)
    pub annual_losses: f64,
}

/// Recreational index parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecreationConfig {
    pub capacity: f64,
    pub threshold: f64,
}

impl Default for RecreationConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_DAM_CAPACITY,
            threshold: DEFAULT_RECREATION_THRESHOLD,
        }
    }
}

/// Complete engine configuration
///
/// Serializable so an external loader can read it from JSON; the engine
/// itself never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Month/day the surface-water season opens
    pub season_start: MonthDay,

    /// Days between regular scheduler ticks
    pub tick_interval_days: u32,

    /// Run horizon in years (sizes the reserve series)
    pub num_years: usize,

    /// Interstate-transfer inflow outlook
    pub scenario: AllocationScenario,

    /// Zone entitlement tables
    pub zones: Vec<ZoneConfig>,

    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub allocation: AllocationConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub groundwater: GroundwaterConfig,

    #[serde(default)]
    pub overrun_policy: OverrunPolicy,

    #[serde(default)]
    pub extraction: ExtractionSchedule,

    #[serde(default)]
    pub recreation: RecreationConfig,
}

impl EngineConfig {
    /// Configuration with default settings for everything but the zone tables
    pub fn new(zones: Vec<ZoneConfig>, environment_zone: &str) -> Self {
        Self {
            season_start: MonthDay::new(7, 1),
            tick_interval_days: 7,
            num_years: 10,
            scenario: AllocationScenario::Median,
            zones,
            environment: EnvironmentConfig {
                zone_id: environment_zone.to_string(),
                annual_losses: 0.0,
            },
            allocation: AllocationConfig::default(),
            release: ReleaseConfig::default(),
            groundwater: GroundwaterConfig::default(),
            overrun_policy: OverrunPolicy::default(),
            extraction: ExtractionSchedule::default(),
            recreation: RecreationConfig::default(),
        }
    }
}

// ============================================================================
// Tick Types
// ============================================================================

/// Inputs for one calendar date
#[derive(Debug, Clone)]
pub struct TickInput<'a> {
    pub date: NaiveDate,
    /// Surface-water orders per zone id (ML)
    pub orders: BTreeMap<String, f64>,
    /// Groundwater orders per zone id (ML)
    pub groundwater_orders: BTreeMap<String, f64>,
    pub dam_volume: f64,
    /// Three-year rolling average dam level
    pub rolling_dam_level: f64,
    /// Reference-gauge flow record
    pub gauge: &'a GaugeRecord,
    /// Projected inflow for this tick (ML)
    pub projected_inflow: f64,
    /// Observed level per trigger bore
    pub bore_levels: BTreeMap<String, f64>,
    /// Release window length (days)
    pub window_days: u32,
}

impl<'a> TickInput<'a> {
    /// Input with no orders, no bore readings and a weekly release window
    pub fn new(date: NaiveDate, gauge: &'a GaugeRecord, dam_volume: f64, projected_inflow: f64) -> Self {
        Self {
            date,
            orders: BTreeMap::new(),
            groundwater_orders: BTreeMap::new(),
            dam_volume,
            rolling_dam_level: 0.0,
            gauge,
            projected_inflow,
            bore_levels: BTreeMap::new(),
            window_days: 7,
        }
    }

    pub fn with_order(mut self, zone_id: &str, volume: f64) -> Self {
        self.orders.insert(zone_id.to_string(), volume);
        self
    }

    pub fn with_groundwater_order(mut self, zone_id: &str, volume: f64) -> Self {
        self.groundwater_orders.insert(zone_id.to_string(), volume);
        self
    }

    pub fn with_bore_level(mut self, bore_id: &str, level: f64) -> Self {
        self.bore_levels.insert(bore_id.to_string(), level);
        self
    }
}

/// Whether the policy ran on a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// The scheduler did not fire
    NotRun,
    /// The policy ran; daily dam release (ML/day)
    Released(f64),
}

impl TickOutcome {
    pub fn release(&self) -> Option<f64> {
        match self {
            TickOutcome::NotRun => None,
            TickOutcome::Released(volume) => Some(*volume),
        }
    }
}

/// Water a zone may order next tick (ML)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneAvailability {
    pub sw_hr: f64,
    pub sw_lr: f64,
    pub gw_hr: f64,
    pub gw_lr: f64,
}

/// Result of one `run_model` call
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub date: NaiveDate,
    pub outcome: TickOutcome,
    /// Availability per zone id (surface and groundwater zones)
    pub allocations: BTreeMap<String, ZoneAvailability>,
    /// Historical extraction scheduled for this date (ML)
    pub historic_extraction: f64,
    pub recreation_index: f64,
}

// ============================================================================
// Engine
// ============================================================================

/// Catchment policy engine
pub struct PolicyEngine {
    config: EngineConfig,
    state: PolicyState,
    scheduler: SeasonScheduler,
    groundwater: GroundwaterLicensing,
    event_log: EventLog,
}

impl PolicyEngine {
    /// Create a new engine from configuration
    ///
    /// # Errors
    ///
    /// Any `ConfigError` found while validating the configuration, wrapped in
    /// `SimulationError::Config`.
    pub fn new(config: EngineConfig) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let state = PolicyState::new(
            &config.zones,
            &config.environment.zone_id,
            config.environment.annual_losses,
            config.scenario,
            config.num_years,
        )?;
        let scheduler = SeasonScheduler::new(config.season_start, config.tick_interval_days);
        let groundwater = GroundwaterLicensing::new(&config.groundwater)?;

        Ok(Self {
            config,
            state,
            scheduler,
            groundwater,
            event_log: EventLog::new(),
        })
    }

    /// Validate configuration
    fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
        if config.tick_interval_days == 0 {
            return Err(ConfigError::Invalid("tick_interval_days must be > 0".to_string()));
        }

        if config.num_years == 0 {
            return Err(ConfigError::Invalid("num_years must be > 0".to_string()));
        }

        if config.zones.is_empty() {
            return Err(ConfigError::Invalid("Must have at least one zone".to_string()));
        }

        let mut ids = HashSet::new();
        for zone in &config.zones {
            if !ids.insert(zone.id.as_str()) {
                return Err(ConfigError::DuplicateZone(zone.id.clone()));
            }
        }

        if let Some(zone) = &config.release.passing_flow_zone {
            if !ids.contains(zone.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "passing-flow zone {} is not a configured zone",
                    zone
                )));
            }
        }

        let share = config.allocation.shared_utility_share;
        if !(0.0..=1.0).contains(&share) {
            return Err(ConfigError::Invalid(format!(
                "shared_utility_share must be within [0, 1], got {}",
                share
            )));
        }

        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &PolicyState {
        &self.state
    }

    pub fn scheduler(&self) -> &SeasonScheduler {
        &self.scheduler
    }

    pub fn groundwater(&self) -> &GroundwaterLicensing {
        &self.groundwater
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    fn log_event(&mut self, event: Event) {
        self.event_log.log(event);
    }

    /// Current availability for every surface and groundwater zone
    pub fn allocations(&self) -> BTreeMap<String, ZoneAvailability> {
        let mut allocations: BTreeMap<String, ZoneAvailability> = self
            .state
            .zones()
            .iter()
            .map(|zone| {
                let held = zone.allocation() + zone.carryover();
                (
                    zone.id().to_string(),
                    ZoneAvailability {
                        sw_hr: held.hr,
                        sw_lr: held.lr,
                        ..Default::default()
                    },
                )
            })
            .collect();

        for record in self.groundwater.zones() {
            let entry = allocations.entry(record.zone_id.clone()).or_default();
            entry.gw_hr = record.remaining();
        }
        allocations
    }

    // ========================================================================
    // Tick Loop Implementation
    // ========================================================================

    /// Advance the engine by one calendar date
    ///
    /// A failed date leaves the engine exactly as it was before the call, so
    /// the same date can be retried with corrected inputs.
    ///
    /// # Returns
    ///
    /// * `Ok(TickResult)` - `outcome` is `NotRun` unless the scheduler fired
    /// * `Err(SimulationError)` - invalid input, an overrun under
    ///   `OverrunPolicy::Fail`, or a run longer than `num_years`
    pub fn run_model(&mut self, input: &TickInput<'_>) -> Result<TickResult, SimulationError> {
        Self::validate_input(input)?;

        let state = self.state.clone();
        let scheduler = self.scheduler.clone();
        let groundwater = self.groundwater.clone();
        let logged = self.event_log.len();

        let result = self.run_date(input);
        if result.is_err() {
            self.state = state;
            self.scheduler = scheduler;
            self.groundwater = groundwater;
            self.event_log.truncate(logged);
        }
        result
    }

    fn run_date(&mut self, input: &TickInput<'_>) -> Result<TickResult, SimulationError> {
        let date = input.date;

        // STEP 1: GROUNDWATER
        // The drought counter reads the HR percentage of the season just run;
        // before the first surface-water tick there is no such season
        let prior_hr = (self.state.global_step() > 0).then(|| allocation::hr_percentage(&self.state));
        self.groundwater.record_orders(&input.groundwater_orders);
        match self.groundwater.advance(date, &input.bore_levels, prior_hr) {
            GroundwaterStep::Idle => {}
            GroundwaterStep::Licensed {
                year,
                table,
                drought_count,
                total_licensed,
            } => self.log_event(Event::GroundwaterLicensed {
                date,
                year,
                table,
                drought_count,
                total_licensed,
            }),
            GroundwaterStep::YearClosed { year, total_carryover } => {
                self.log_event(Event::GroundwaterYearClosed {
                    date,
                    year,
                    total_carryover,
                })
            }
        }

        // STEP 2: SCHEDULER
        let mut decision = self.scheduler.advance(date);
        if decision == ScheduleDecision::SeasonEnd {
            self.close_season(date);
            decision = self.scheduler.advance(date);
        }

        let (time_step, first_tick) = match decision {
            ScheduleDecision::Idle | ScheduleDecision::SeasonEnd => {
                return Ok(self.tick_result(input, TickOutcome::NotRun));
            }
            ScheduleDecision::SeasonStart { season_end } => {
                info!(%date, %season_end, year = self.state.year(), "surface-water season opened");
                self.log_event(Event::SeasonStarted {
                    date,
                    year: self.state.year(),
                    season_end,
                });
                (1, true)
            }
            ScheduleDecision::Tick { time_step, .. } => (time_step, false),
        };
        self.state.set_time_step(time_step);

        // STEP 3: ALLOCATION
        let outcome = allocation::calc_allocation(
            &mut self.state,
            &self.config.allocation,
            &input.orders,
            input.dam_volume,
            input.projected_inflow,
            first_tick,
            self.config.overrun_policy,
            date,
        )?;
        for overrun in &outcome.overruns {
            self.log_event(Event::AllocationOverrun {
                date,
                time_step,
                zone_id: overrun.zone_id.clone(),
                requested: overrun.requested,
                available: overrun.available,
            });
        }
        self.log_event(Event::AllocationComputed {
            date,
            time_step,
            shared_pool: outcome.shared_pool,
            local_percentage: outcome.local_percentage,
            transfer_percentage: outcome.transfer_percentage,
        });

        // STEP 4: ENVIRONMENTAL ORDER
        let window = f64::from(input.window_days);
        let other_orders = self.orders_of_kind(&input.orders, ZoneKind::Other);
        let env_order = self.environmental_order(input, other_orders / window);

        // STEP 5: DAM RELEASE
        let release = self.dam_release(input, other_orders + env_order);

        self.state.refresh_ledgers();
        Ok(self.tick_result(input, TickOutcome::Released(release)))
    }

    fn validate_input(input: &TickInput<'_>) -> Result<(), SimulationError> {
        if input.window_days == 0 {
            return Err(SimulationError::InvalidInput("window_days must be > 0".to_string()));
        }
        if !input.dam_volume.is_finite() || input.dam_volume < 0.0 {
            return Err(SimulationError::InvalidInput(format!(
                "dam volume must be finite and non-negative, got {}",
                input.dam_volume
            )));
        }
        if !input.projected_inflow.is_finite() {
            return Err(SimulationError::InvalidInput(format!(
                "projected inflow must be finite, got {}",
                input.projected_inflow
            )));
        }
        Ok(())
    }

    /// Roll carryover forward and close the year
    fn close_season(&mut self, date: NaiveDate) {
        let grants = carryover::roll_over(&mut self.state);
        for (zone_id, grant) in grants {
            if !grant.is_zero() {
                self.log_event(Event::CarryoverRolledOver {
                    date,
                    zone_id,
                    carryover: grant,
                });
            }
        }

        let closed_year = self.state.year();
        self.state.close_year();
        self.state.refresh_ledgers();
        info!(%date, closed_year, "surface-water season closed");
        self.log_event(Event::SeasonEnded { date, closed_year });
    }

    fn orders_of_kind(&self, orders: &BTreeMap<String, f64>, kind: ZoneKind) -> f64 {
        orders
            .iter()
            .filter(|(zone_id, _)| self.state.zone(zone_id).map(|z| z.kind()) == Some(kind))
            .map(|(_, volume)| volume.max(0.0))
            .sum()
    }

    /// Evaluate and charge the environmental order
    fn environmental_order(&mut self, input: &TickInput<'_>, other_releases: f64) -> f64 {
        let available = self.state.environment_available();
        let inputs = EnvironmentalInputs {
            date: input.date,
            gauge: input.gauge,
            other_releases,
            dam_volume: input.dam_volume,
            available,
        };
        let order = environment::evaluate_order(self.state.environment_mut(), &inputs);

        let zone_id = self.state.environment().zone_id.clone();
        allocation::charge_zone(&mut self.state, &zone_id, order);

        let time_step = self.state.time_step();
        let season_order = self.state.environment().season_order;
        self.log_event(Event::EnvironmentalOrder {
            date: input.date,
            time_step,
            water_order: order,
            season_order,
        });
        order
    }

    /// Compute the daily release and charge passing flows
    fn dam_release(&mut self, input: &TickInput<'_>, other_orders: f64) -> f64 {
        let mut zone_orders: BTreeMap<String, f64> = BTreeMap::new();
        for (zone_id, volume) in &input.orders {
            let Some(zone) = self.state.zone(zone_id) else {
                continue;
            };
            if zone.kind() != ZoneKind::Farm {
                continue;
            }
            let group = zone.regulation_zone().unwrap_or(zone_id.as_str()).to_string();
            *zone_orders.entry(group).or_insert(0.0) += volume;
        }

        let passing_flow_zone = self.config.release.passing_flow_zone.clone();
        let passing_flow_allocation = passing_flow_zone
            .as_deref()
            .and_then(|id| self.state.zone(id))
            .map(|zone| zone.available_local());

        let context = DamReleaseContext {
            date: input.date,
            zone_orders,
            other_orders,
            dam_volume: input.dam_volume,
            inflow: input.projected_inflow,
            window_days: input.window_days,
            passing_flow_allocation,
        };
        let release = release::calc_release(&context, &self.config.release);

        if let (Some(zone_id), Some(available)) = (passing_flow_zone, passing_flow_allocation) {
            let drawn = release.minimum_flow_volume.min(available);
            if drawn > 0.0 {
                allocation::charge_zone(&mut self.state, &zone_id, drawn);
            }
        }

        if release.was_clamped() {
            self.log_event(Event::NegativeReleaseClamped {
                date: input.date,
                computed: release.unclamped,
            });
        }
        let time_step = self.state.time_step();
        self.log_event(Event::DamRelease {
            date: input.date,
            time_step,
            release: release.release,
            minimum_flow: release.minimum_flow,
        });
        release.release
    }

    fn tick_result(&self, input: &TickInput<'_>, outcome: TickOutcome) -> TickResult {
        TickResult {
            date: input.date,
            outcome,
            allocations: self.allocations(),
            historic_extraction: self.config.extraction.extraction_on(input.date),
            recreation_index: recreational_index(
                input.rolling_dam_level,
                self.config.recreation.capacity,
                self.config.recreation.threshold,
            ),
        }
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Serialize the complete mutable state to JSON
    pub fn save_state(&self) -> Result<String, SimulationError> {
        let snapshot = StateSnapshot {
            state: self.state.clone(),
            scheduler: self.scheduler.clone(),
            groundwater: self.groundwater.clone(),
            events: self.event_log.events().to_vec(),
            config_hash: compute_config_hash(&self.config)?,
        };
        serde_json::to_string(&snapshot)
            .map_err(|e| SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e)))
    }

    /// Restore an engine from a snapshot taken under the same configuration
    ///
    /// # Errors
    ///
    /// - `ConfigMismatch` if the snapshot was taken under another configuration
    /// - `SerializationError` if the JSON cannot be parsed
    pub fn load_state(config: EngineConfig, json: &str) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let snapshot: StateSnapshot = serde_json::from_str(json)
            .map_err(|e| SimulationError::SerializationError(format!("Snapshot parse failed: {}", e)))?;

        let expected = compute_config_hash(&config)?;
        if snapshot.config_hash != expected {
            return Err(SimulationError::ConfigMismatch {
                expected,
                actual: snapshot.config_hash,
            });
        }

        let mut event_log = EventLog::new();
        for event in snapshot.events {
            event_log.log(event);
        }

        Ok(Self {
            config,
            state: snapshot.state,
            scheduler: snapshot.scheduler,
            groundwater: snapshot.groundwater,
            event_log,
        })
    }
}
