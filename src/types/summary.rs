//! Open-interest aggregate types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Volume, OI and OI change for calls and puts, for one strike or summed
/// over a set of strikes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub ce_volume: i64,
    pub pe_volume: i64,
    pub ce_oi: i64,
    pub pe_oi: i64,
    pub ce_oi_change: i64,
    pub pe_oi_change: i64,
}

impl AggregateBucket {
    pub fn add(&mut self, f: &AggregateBucket) {
        self.ce_volume += f.ce_volume;
        self.pe_volume += f.pe_volume;
        self.ce_oi += f.ce_oi;
        self.pe_oi += f.pe_oi;
        self.ce_oi_change += f.ce_oi_change;
        self.pe_oi_change += f.pe_oi_change;
    }
}

/// One run's summary row: the three buckets plus the run's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub server_name: String,
    pub underlying: String,
    pub underlying_ltp: f64,
    pub expiry_date: String,
    pub datetime: DateTime<Utc>,
    /// Every strike.
    pub total: AggregateBucket,
    /// Strikes strictly above the underlying LTP.
    pub above_underlying: AggregateBucket,
    /// Strikes strictly below the underlying LTP.
    pub below_underlying: AggregateBucket,
}
