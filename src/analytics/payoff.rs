use crate::analytics::linspace;
use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::intrinsic_value;
use crate::models::OptionKind;

/// Number of underlying prices sampled across the range.
pub const PAYOFF_POINTS: usize = 101;

pub const DEFAULT_PRICE_RANGE: (f64, f64) = (50.0, 150.0);

/// One option leg in a strategy. Negative `qty` is a short leg.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct PayoffLeg {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub strike: f64,
    pub premium: f64,
    pub qty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PayoffPoint {
    pub stock_price: f64,
    pub payoff: f64,
}

/// Net expiry payoff of all legs, summed, at each sampled underlying price.
/// Per leg: qty * (intrinsic(S_T) - premium).
pub fn aggregate_payoff(legs: &[PayoffLeg], price_range: (f64, f64)) -> EngineResult<Vec<PayoffPoint>> {
    let (lo, hi) = price_range;
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(EngineError::InvalidInput(format!(
            "price_range must satisfy low < high, got [{lo}, {hi}]"
        )));
    }

    let points = linspace(lo, hi, PAYOFF_POINTS)
        .into_iter()
        .map(|s| PayoffPoint {
            stock_price: s,
            payoff: legs
                .iter()
                .map(|leg| leg.qty * (intrinsic_value(s, leg.strike, leg.kind) - leg.premium))
                .sum(),
        })
        .collect();

    Ok(points)
}
