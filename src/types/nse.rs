//! NSE option-chain payload (`/api/option-chain-v3`) and its conversion to
//! the typed [`OptionChain`].

use chrono::NaiveDate;
use serde::Deserialize;

use crate::types::option_chain::{
    ChainEntry, OptionChain, OptionLeg, Side, lenient_f64, lenient_opt_f64, null_as_default,
};

/// Top-level NSE option-chain response. Only `records` is needed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NseOptionChain {
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: NseRecords,
}

/// The `records` section: underlying level and per-strike rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NseRecords {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub underlying_value: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<NseStrikeRow>,
}

/// One strike with its call (`CE`) and put (`PE`) sides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NseStrikeRow {
    #[serde(default, rename = "strikePrice", deserialize_with = "lenient_f64")]
    pub strike_price: f64,
    #[serde(default, rename = "CE")]
    pub call: Option<NseLeg>,
    #[serde(default, rename = "PE")]
    pub put: Option<NseLeg>,
}

/// One side of an NSE strike row.
///
/// NSE has shipped the top-of-book under several names over time and some
/// payloads carry more than one; each is kept and [`NseLeg::bid`] /
/// [`NseLeg::ask`] pick the first present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NseLeg {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_interest: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_traded_volume: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub last_price: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub change: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub bid_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub bidprice: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub buy_price1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub ask_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub sell_price1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub underlying_value: Option<f64>,
}

impl NseLeg {
    pub fn bid(&self) -> f64 {
        self.bid_price.or(self.bidprice).or(self.buy_price1).unwrap_or(0.0)
    }

    pub fn ask(&self) -> f64 {
        self.ask_price.or(self.sell_price1).unwrap_or(0.0)
    }
}

/// Analytics-service trading symbol: `NIFTY03FEB2625000CE`.
///
/// Whole strikes print without a decimal point; fractional ones keep theirs
/// (`82.25`).
pub fn derivative_symbol(underlying: &str, expiry: NaiveDate, strike: f64, side: &str) -> String {
    format!(
        "{}{}{}{}",
        underlying.to_uppercase(),
        expiry.format("%d%b%y").to_string().to_uppercase(),
        strike,
        side
    )
}

impl NseOptionChain {
    /// Number of strike rows in the payload.
    pub fn len(&self) -> usize {
        self.records.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.data.is_empty()
    }

    /// Convert to the typed chain, preserving row order.
    ///
    /// When `expiry` is known, leg symbols use the analytics service's format;
    /// otherwise the NSE `identifier` is kept.
    pub fn into_chain(self, underlying: &str, expiry: Option<NaiveDate>, expiry_label: &str) -> OptionChain {
        let underlying_ltp = self
            .records
            .underlying_value
            .or_else(|| {
                self.records
                    .data
                    .iter()
                    .filter_map(|row| row.call.as_ref().or(row.put.as_ref()))
                    .find_map(|leg| leg.underlying_value)
            })
            .unwrap_or(0.0);

        let chain: Vec<ChainEntry> = self
            .records
            .data
            .into_iter()
            .map(|row| {
                let strike = row.strike_price;
                let leg = |nse: NseLeg, side: Side| {
                    let symbol = match expiry {
                        Some(date) => Some(derivative_symbol(underlying, date, strike, side.code())),
                        None => nse.identifier.clone(),
                    };
                    OptionLeg {
                        symbol,
                        label: Some(side.code().to_owned()),
                        ltp: nse.last_price,
                        bid: nse.bid(),
                        ask: nse.ask(),
                        prev_close: nse.last_price - nse.change,
                        volume: nse.total_traded_volume as i64,
                        oi: nse.open_interest as i64,
                        ..OptionLeg::default()
                    }
                };
                ChainEntry {
                    strike,
                    ce: row.call.map(|l| leg(l, Side::Call)),
                    pe: row.put.map(|l| leg(l, Side::Put)),
                    ..ChainEntry::default()
                }
            })
            .collect();

        let atm_strike = chain
            .iter()
            .min_by(|a, b| {
                let da = (a.strike - underlying_ltp).abs();
                let db = (b.strike - underlying_ltp).abs();
                da.total_cmp(&db)
            })
            .map(|e| e.strike)
            .unwrap_or(0.0);

        OptionChain {
            status: Some("success".into()),
            underlying: Some(underlying.to_owned()),
            underlying_ltp,
            expiry_date: Some(expiry_label.to_owned()),
            atm_strike,
            chain,
            ..OptionChain::default()
        }
    }
}
