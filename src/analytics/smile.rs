use crate::analytics::linspace;
use crate::errors::{EngineError, EngineResult};
use crate::models::implied_vol::{solve, SolverConfig};
use crate::models::black_scholes::BlackScholesMerton;
use crate::models::OptionParams;

pub const CURVE_STRIKES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct StrikeVol {
    pub strike: f64,
    /// `None` where the solve did not converge.
    pub volatility: Option<f64>,
}

/// Re-solve IV for the same quoted price across a strike range.
/// Shows how the implied vol of a fixed quote moves with strike.
pub fn iv_by_strike(
    params: &OptionParams,
    market_price: f64,
    strike_range: (f64, f64),
    config: &SolverConfig,
) -> EngineResult<Vec<StrikeVol>> {
    let (lo, hi) = strike_range;
    if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo < hi) {
        return Err(EngineError::InvalidInput(format!(
            "strike range must satisfy 0 < min < max, got [{lo}, {hi}]"
        )));
    }

    let curve = linspace(lo, hi, CURVE_STRIKES)
        .into_iter()
        .map(|strike| {
            let at_strike = OptionParams { strike, ..*params };
            let res = solve(&BlackScholesMerton, &at_strike, market_price, config);
            StrikeVol {
                strike,
                volatility: res.converged_volatility(),
            }
        })
        .collect();

    Ok(curve)
}
