//! Environmental water holder state

use serde::{Deserialize, Serialize};

/// Running state of the environmental water holder
///
/// The environmental zone's HR entitlement is reduced by fixed annual losses
/// before it enters the allocation ledger; both the raw losses and the
/// adjusted entitlements are kept here for the flow-rule evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// Zone id of the environmental water holder
    pub zone_id: String,
    /// Orders placed so far this season (ML)
    pub season_order: f64,
    /// Order computed on the most recent evaluated tick (ML)
    pub water_order: f64,
    /// Fixed annual losses subtracted from HR entitlement (ML)
    pub annual_losses: f64,
    /// HR entitlement after losses (ML)
    pub hr_entitlement: f64,
    /// LR entitlement (ML)
    pub lr_entitlement: f64,
}

impl EnvironmentState {
    pub fn new(zone_id: &str, raw_hr: f64, lr: f64, annual_losses: f64) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            season_order: 0.0,
            water_order: 0.0,
            annual_losses,
            hr_entitlement: (raw_hr - annual_losses).max(0.0),
            lr_entitlement: lr,
        }
    }

    /// Zero the running accumulators at season start
    pub fn reset_season(&mut self) {
        self.season_order = 0.0;
        self.water_order = 0.0;
    }
}
