//! OI-delta computation and bucket aggregation. Pure; no I/O.

use std::collections::HashMap;

use crate::types::{AggregateBucket, ChainEntry, OptionLeg};

/// Most recently persisted OI per trading symbol, for one leg side.
pub type PreviousOi = HashMap<String, i64>;

/// The three buckets of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub total: AggregateBucket,
    pub above_underlying: AggregateBucket,
    pub below_underlying: AggregateBucket,
}

/// Current OI minus the last persisted OI for the leg's symbol.
/// A symbol never persisted before counts as previous OI 0.
pub fn oi_change(leg: &OptionLeg, previous: &PreviousOi) -> i64 {
    let prior = leg
        .symbol
        .as_deref()
        .and_then(|s| previous.get(s))
        .copied()
        .unwrap_or(0);
    leg.oi - prior
}

/// Volume, OI and OI change of one strike. A missing leg contributes zeros.
pub fn strike_figures(entry: &ChainEntry, prev_ce: &PreviousOi, prev_pe: &PreviousOi) -> AggregateBucket {
    let mut f = AggregateBucket::default();
    if let Some(ce) = &entry.ce {
        f.ce_volume = ce.volume;
        f.ce_oi = ce.oi;
        f.ce_oi_change = oi_change(ce, prev_ce);
    }
    if let Some(pe) = &entry.pe {
        f.pe_volume = pe.volume;
        f.pe_oi = pe.oi;
        f.pe_oi_change = oi_change(pe, prev_pe);
    }
    f
}

/// Sum every strike into `total`, and into `above`/`below` by strict
/// comparison with `underlying_ltp`. A strike equal to the LTP lands in
/// `total` only.
pub fn aggregate(
    entries: &[ChainEntry],
    underlying_ltp: f64,
    prev_ce: &PreviousOi,
    prev_pe: &PreviousOi,
) -> Aggregates {
    let mut agg = Aggregates::default();
    for entry in entries {
        let figures = strike_figures(entry, prev_ce, prev_pe);
        agg.total.add(&figures);

        if entry.strike > underlying_ltp {
            agg.above_underlying.add(&figures);
        } else if entry.strike < underlying_ltp {
            agg.below_underlying.add(&figures);
        }
    }
    agg
}
