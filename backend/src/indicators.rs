//! Ancillary indicators reported alongside each tick

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage capacity used to normalise the rolling dam level
pub const DEFAULT_DAM_CAPACITY: f64 = 204.0;

/// Level fraction at or above which recreation is considered viable
pub const DEFAULT_RECREATION_THRESHOLD: f64 = 0.3;

/// Recreational amenity index: 1.0 when `level / capacity >= threshold`
///
/// # Example
/// ```
/// use catchment_policy_core_rs::indicators::recreational_index;
///
/// assert_eq!(recreational_index(61.2, 204.0, 0.3), 1.0);
/// assert_eq!(recreational_index(60.0, 204.0, 0.3), 0.0);
/// ```
pub fn recreational_index(level: f64, capacity: f64, threshold: f64) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    if level / capacity >= threshold {
        1.0
    } else {
        0.0
    }
}

/// Historical dam extractions not explained by modelled discharge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionSchedule {
    volumes: BTreeMap<NaiveDate, f64>,
}

impl ExtractionSchedule {
    pub fn new(volumes: BTreeMap<NaiveDate, f64>) -> Self {
        Self { volumes }
    }

    /// Extraction on `date` (ML); zero when the date is not in the schedule
    pub fn extraction_on(&self, date: NaiveDate) -> f64 {
        self.volumes.get(&date).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl FromIterator<(NaiveDate, f64)> for ExtractionSchedule {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
