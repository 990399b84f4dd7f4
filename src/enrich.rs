//! Greeks enrichment of an option chain.
//!
//! Every leg with a trading symbol gets one analytics call, CE before PE,
//! strikes in chain order. Calls are strictly sequential and each is followed
//! by a pause so the service's rate limit is respected. A failed or empty
//! response leaves that leg untouched and the loop carries on.

use std::time::Duration;

use crate::analytics::AnalyticsProvider;
use crate::types::{GreeksResponse, OptionChain, OptionLeg};

/// Exchange code the greeks endpoint expects for a chain's exchange.
///
/// ```
/// use nse_feed::enrich::map_exchange_for_greeks;
///
/// assert_eq!(map_exchange_for_greeks("NSE_INDEX"), "NFO");
/// assert_eq!(map_exchange_for_greeks("bse_index"), "BFO");
/// assert_eq!(map_exchange_for_greeks(""), "NFO");
/// ```
pub fn map_exchange_for_greeks(exchange: &str) -> &'static str {
    let upper = exchange.trim().to_ascii_uppercase();
    if upper.contains("NSE") {
        "NFO"
    } else if upper.contains("BSE") || upper == "BFO" {
        "BFO"
    } else if upper.contains("CDS") {
        "CDS"
    } else if upper.contains("MCX") {
        "MCX"
    } else {
        "NFO"
    }
}

/// Merge analytics fields from `resp` into `leg`.
///
/// Returns `false` (leg untouched) when the response carries neither
/// analytics fields nor a success status.
pub fn merge_greeks(leg: &mut OptionLeg, resp: &GreeksResponse) -> bool {
    if !resp.has_analytics() && !resp.is_success() {
        return false;
    }

    if resp.spot_price.is_some() {
        leg.spot_price = resp.spot_price;
    }
    if resp.option_price.is_some() {
        leg.option_price = resp.option_price;
    }
    if resp.implied_volatility.is_some() {
        leg.implied_volatility = resp.implied_volatility;
    }
    if resp.days_to_expiry.is_some() {
        leg.days_to_expiry = resp.days_to_expiry;
    }
    if let Some(greeks) = resp.resolved_greeks() {
        leg.greeks = Some(greeks);
    }
    true
}

/// Counters for one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    /// Legs with a symbol, i.e. calls attempted.
    pub total: usize,
    pub enriched: usize,
    /// Responses with nothing usable.
    pub skipped: usize,
    pub errors: usize,
}

/// Enrich every leg of `chain` in place, sleeping `pause` after each call.
pub async fn enrich_chain(
    provider: &dyn AnalyticsProvider,
    chain: &mut OptionChain,
    exchange: &str,
    pause: Duration,
) -> EnrichmentStats {
    let greeks_exchange = map_exchange_for_greeks(exchange);
    let mut stats = EnrichmentStats::default();

    tracing::info!(
        strikes = chain.chain.len(),
        exchange = greeks_exchange,
        pause_ms = pause.as_millis() as u64,
        "enriching chain with greeks"
    );

    for entry in &mut chain.chain {
        for (side, leg) in [("CE", entry.ce.as_mut()), ("PE", entry.pe.as_mut())] {
            let Some(leg) = leg else { continue };
            let Some(symbol) = leg.symbol.clone() else { continue };
            stats.total += 1;

            match provider.option_greeks(&symbol, greeks_exchange).await {
                Ok(resp) if merge_greeks(leg, &resp) => stats.enriched += 1,
                Ok(resp) => {
                    tracing::warn!(
                        %symbol,
                        side,
                        status = resp.status.as_deref().unwrap_or("missing"),
                        "greeks response carried no analytics"
                    );
                    stats.skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(%symbol, side, error = %err, "greeks call failed");
                    stats.errors += 1;
                }
            }

            tokio::time::sleep(pause).await;
        }
    }

    tracing::info!(
        total = stats.total,
        enriched = stats.enriched,
        skipped = stats.skipped,
        errors = stats.errors,
        "greeks enrichment complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Greeks;

    #[test]
    fn exchange_families_map_to_derivative_segments() {
        assert_eq!(map_exchange_for_greeks("NSE_INDEX"), "NFO");
        assert_eq!(map_exchange_for_greeks("NSE"), "NFO");
        assert_eq!(map_exchange_for_greeks("NFO"), "NFO");
        assert_eq!(map_exchange_for_greeks("BSE_INDEX"), "BFO");
        assert_eq!(map_exchange_for_greeks("BFO"), "BFO");
        assert_eq!(map_exchange_for_greeks("cds"), "CDS");
        assert_eq!(map_exchange_for_greeks("MCX"), "MCX");
        assert_eq!(map_exchange_for_greeks("XYZ"), "NFO");
    }

    #[test]
    fn flat_greeks_are_collected_into_an_object() {
        let mut leg = OptionLeg::default();
        let resp = GreeksResponse {
            spot_price: Some(21_512.5),
            implied_volatility: Some(13.2),
            delta: Some(0.52),
            theta: Some(-11.0),
            ..Default::default()
        };
        assert!(merge_greeks(&mut leg, &resp));
        assert_eq!(leg.spot_price, Some(21_512.5));
        assert_eq!(leg.implied_volatility, Some(13.2));
        assert_eq!(leg.option_price, None);
        assert_eq!(
            leg.greeks,
            Some(Greeks { delta: Some(0.52), gamma: None, theta: Some(-11.0), vega: None })
        );
    }

    #[test]
    fn nested_greeks_win_over_flat_fields() {
        let mut leg = OptionLeg::default();
        let nested = Greeks { delta: Some(-0.4), gamma: Some(0.001), theta: None, vega: Some(9.0) };
        let resp = GreeksResponse {
            status: Some("success".into()),
            greeks: Some(nested.clone()),
            delta: Some(0.9),
            ..Default::default()
        };
        assert!(merge_greeks(&mut leg, &resp));
        assert_eq!(leg.greeks, Some(nested));
    }

    #[test]
    fn empty_failed_response_leaves_leg_untouched() {
        let mut leg = OptionLeg { ltp: 101.5, ..Default::default() };
        let resp = GreeksResponse {
            status: Some("error".into()),
            message: Some("symbol not found".into()),
            ..Default::default()
        };
        assert!(!merge_greeks(&mut leg, &resp));
        assert_eq!(leg, OptionLeg { ltp: 101.5, ..Default::default() });
    }
}
