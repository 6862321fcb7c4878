//! Reserve time series
//!
//! Reserves withheld for next season's guarantees are recorded per
//! simulation step (weekly series) and per year count (yearly series). The
//! yearly series is sized for the whole run up front: writing the
//! `year + 1` slot past the configured horizon is an error rather than a
//! silent reallocation.

use serde::{Deserialize, Serialize};

use crate::orchestrator::SimulationError;

/// Reserve volumes withheld at one point in time (ML)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReserveVolumes {
    pub hr: f64,
    pub lr: f64,
    pub operational: f64,
}

impl ReserveVolumes {
    pub fn hr_plus_operational(&self) -> f64 {
        self.hr + self.operational
    }
}

/// Weekly and yearly reserve accumulators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveSeries {
    /// Indexed by global simulation step
    weekly: Vec<ReserveVolumes>,
    /// Indexed by year count (1-based; slot 0 unused)
    yearly: Vec<ReserveVolumes>,
}

impl ReserveSeries {
    /// Pre-size for a run of `num_years` years
    pub fn new(num_years: usize) -> Self {
        Self {
            weekly: vec![ReserveVolumes::default()],
            yearly: vec![ReserveVolumes::default(); num_years + 2],
        }
    }

    pub fn weekly(&self, step: usize) -> ReserveVolumes {
        self.weekly.get(step).copied().unwrap_or_default()
    }

    pub fn yearly(&self, year: usize) -> ReserveVolumes {
        self.yearly.get(year).copied().unwrap_or_default()
    }

    pub fn yearly_capacity(&self) -> usize {
        self.yearly.len()
    }

    pub fn record_weekly(&mut self, step: usize, reserves: ReserveVolumes) {
        if self.weekly.len() <= step {
            self.weekly.resize(step + 1, ReserveVolumes::default());
        }
        self.weekly[step] = reserves;
    }

    pub fn record_yearly(&mut self, year: usize, reserves: ReserveVolumes) -> Result<(), SimulationError> {
        let capacity = self.yearly.len();
        match self.yearly.get_mut(year) {
            Some(slot) => {
                *slot = reserves;
                Ok(())
            }
            None => Err(SimulationError::ReserveHorizonExceeded { index: year, capacity }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yearly_bounds() {
        let mut series = ReserveSeries::new(2);
        let r = ReserveVolumes { hr: 1.0, lr: 0.0, operational: 2.0 };
        assert!(series.record_yearly(3, r).is_ok());
        assert_eq!(series.yearly(3), r);
        assert_eq!(
            series.record_yearly(4, r),
            Err(SimulationError::ReserveHorizonExceeded { index: 4, capacity: 4 })
        );
    }

    #[test]
    fn test_weekly_defaults_to_zero() {
        let series = ReserveSeries::new(1);
        assert_eq!(series.weekly(17), ReserveVolumes::default());
    }
}
