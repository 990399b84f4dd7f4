#![allow(missing_docs)]
//! Option chain types — strikes, legs, greeks, analytics responses.
//!
//! These mirror the analytics service's JSON. Fields the pipeline does not
//! model are kept in `extra` so a cached snapshot round-trips the payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Lenient number decoding
// ---------------------------------------------------------------------------

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts integers, floats, numeric strings and null (as 0).
pub(crate) fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .and_then(|v| v.as_i64().or_else(|| number_as_f64(v).map(|f| f as i64)))
        .unwrap_or(0))
}

/// Accepts floats, integers, numeric strings and null (as 0.0).
pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(lenient_opt_f64(d)?.unwrap_or(0.0))
}

/// Like [`lenient_f64`], but null and non-numeric values stay `None`.
pub(crate) fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(number_as_f64))
}

/// Null decodes as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Call or put leg of a strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Call,
    Put,
}

impl Side {
    /// `CE` / `PE`, as used in trading symbols.
    pub fn code(self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }

    /// Column prefix of this leg's group in a persisted row.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::Call => "ce",
            Self::Put => "pe",
        }
    }
}

// ---------------------------------------------------------------------------
// Greeks
// ---------------------------------------------------------------------------

/// Option greeks for one leg. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vega: Option<f64>,
}

impl Greeks {
    pub fn is_empty(&self) -> bool {
        self.delta.is_none() && self.gamma.is_none() && self.theta.is_none() && self.vega.is_none()
    }
}

// ---------------------------------------------------------------------------
// Option Leg (per CE/PE)
// ---------------------------------------------------------------------------

/// A call or put at one strike.
///
/// The analytics fields (`spot_price` through `greeks`) are `None` until
/// enrichment fills them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ltp: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bid: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ask: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub high: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub low: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub prev_close: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub volume: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub oi: i64,
    #[serde(default, rename = "lotsize", skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implied_volatility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_expiry: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeks: Option<Greeks>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptionLeg {
    /// Trading symbol, if present and non-blank.
    pub fn trading_symbol(&self) -> Option<&str> {
        self.symbol.as_deref().filter(|s| !s.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Chain Entry
// ---------------------------------------------------------------------------

/// Call and put at one strike. Either, both or (rarely) neither may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub strike: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ce: Option<OptionLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe: Option<OptionLeg>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Option Chain
// ---------------------------------------------------------------------------

/// A full option chain for one underlying and expiry.
///
/// Returned by `AnalyticsProvider::option_chain` and produced from the NSE
/// payload by [`NseOptionChain::into_chain`](crate::types::nse::NseOptionChain::into_chain).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub underlying_ltp: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub underlying_prev_close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub atm_strike: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chain: Vec<ChainEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptionChain {
    /// The service-reported error, if any (`error` wins over `message`).
    ///
    /// A `message` alongside `status: "success"` is informational only.
    pub fn reported_error(&self) -> Option<&str> {
        if let Some(e) = self.error.as_deref() {
            return Some(e);
        }
        let succeeded = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("success"));
        match self.message.as_deref() {
            Some(m) if !succeeded => Some(m),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Greeks Response
// ---------------------------------------------------------------------------

/// Response from the analytics service's per-symbol greeks endpoint.
///
/// Greeks may arrive nested under `greeks` or flat at the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreeksResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub spot_price: Option<f64>,
    #[serde(default)]
    pub option_price: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub days_to_expiry: Option<f64>,
    #[serde(default)]
    pub greeks: Option<Greeks>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GreeksResponse {
    /// Whether any recognizable analytics field is present.
    pub fn has_analytics(&self) -> bool {
        self.greeks.is_some()
            || self.spot_price.is_some()
            || self.option_price.is_some()
            || self.delta.is_some()
            || self.gamma.is_some()
    }

    /// Whether the service flagged the call as successful.
    pub fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("success"))
    }

    /// Greeks from the nested object, else from flat top-level fields.
    pub fn resolved_greeks(&self) -> Option<Greeks> {
        if let Some(nested) = &self.greeks {
            return Some(nested.clone());
        }
        let flat = Greeks {
            delta: self.delta,
            gamma: self.gamma,
            theta: self.theta,
            vega: self.vega,
        };
        (!flat.is_empty()).then_some(flat)
    }
}
