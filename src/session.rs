use crate::analytics::heatmap::{self, GridSpec, PnlGrid};
use crate::errors::{EngineError, EngineResult};
use crate::models::implied_vol::{self, SolveResult, SolverConfig};
use crate::models::black_scholes::BlackScholesMerton;
use crate::models::{OptionKind, OptionParams};
use chrono::NaiveDate;

/// Caller-owned context for the profit calculator flow.
///
/// Holds the current inputs, the last successful IV solve and the last valid
/// heatmap spot range. The pricing core never sees this: it only receives
/// the scalars pulled out of it.
#[derive(Debug, Clone)]
pub struct Session {
    pub params: OptionParams,
    pub market_price: f64,
    pub days: u32,
    solved: Option<Solved>,
    probability_of_profit: Option<f64>,
    spot_range: (f64, f64),
}

/// A converged solve together with the inputs it was solved for.
#[derive(Debug, Clone)]
struct Solved {
    result: SolveResult,
    params: OptionParams,
    market_price: f64,
    days: u32,
}

impl Session {
    pub fn new(params: OptionParams, market_price: f64, days: u32) -> Self {
        Self {
            spot_range: heatmap::default_spot_range(params.spot),
            params: OptionParams {
                time_years: days_to_years(days),
                ..params
            },
            market_price,
            days,
            solved: None,
            probability_of_profit: None,
        }
    }

    /// Profit calculator defaults: 97.50 ATM call, 14 days, quoted at 2.33.
    pub fn with_defaults(rate: f64, dividend_yield: f64) -> Self {
        let params = OptionParams::from_days(97.5, 97.5, rate, dividend_yield, 14.0, OptionKind::Call);
        Self::new(params, 2.33, 14)
    }

    pub fn set_days(&mut self, days: u32) {
        self.days = days;
        self.params.time_years = days_to_years(days);
    }

    /// Solve IV for the current inputs. On success the result and its
    /// probability of profit replace the stored ones; on failure the previous
    /// results are kept and the solver's message is returned as an error.
    pub fn calculate(&mut self, config: &SolverConfig) -> EngineResult<&SolveResult> {
        self.params.validate()?;

        let result = implied_vol::solve(&BlackScholesMerton, &self.params, self.market_price, config);
        let vol = match result.converged_volatility() {
            Some(v) => v,
            None => {
                tracing::warn!(message = %result.message, "IV solve failed");
                return Err(EngineError::Solver(result.message));
            }
        };

        self.probability_of_profit = Some(self.params.probability_of_profit(vol));
        let solved = self.solved.insert(Solved {
            result,
            params: self.params,
            market_price: self.market_price,
            days: self.days,
        });
        Ok(&solved.result)
    }

    pub fn last_solve(&self) -> Option<&SolveResult> {
        self.solved.as_ref().map(|s| &s.result)
    }

    pub fn implied_volatility(&self) -> Option<f64> {
        self.last_solve().and_then(SolveResult::converged_volatility)
    }

    pub fn probability_of_profit(&self) -> Option<f64> {
        self.probability_of_profit
    }

    /// Adopt a live spot quote and recenter the heatmap range on it.
    pub fn apply_live_spot(&mut self, price: f64) {
        self.params.spot = price;
        self.spot_range = heatmap::default_spot_range(price);
    }

    /// Accept `[min, max]` if valid, otherwise keep the last good range.
    /// Returns the range now in effect.
    pub fn update_spot_range(&mut self, min: f64, max: f64) -> (f64, f64) {
        match heatmap::validate_spot_range(min, max) {
            Ok(()) => self.spot_range = (min, max),
            Err(e) => tracing::debug!(error = %e, "keeping previous spot range"),
        }
        self.spot_range
    }

    pub fn spot_range(&self) -> (f64, f64) {
        self.spot_range
    }

    /// P/L grid for the last successful solve over the current spot range.
    /// Uses the inputs captured at that solve, not any edited since.
    pub fn heatmap(&self, start: NaiveDate) -> EngineResult<PnlGrid> {
        let solved = self
            .solved
            .as_ref()
            .ok_or_else(|| EngineError::InvalidInput("calculate implied volatility first".into()))?;
        let volatility = solved
            .result
            .converged_volatility()
            .ok_or_else(|| EngineError::InvalidInput("calculate implied volatility first".into()))?;
        let (spot_min, spot_max) = self.spot_range;
        heatmap::pnl_grid(
            &GridSpec {
                params: solved.params,
                entry_price: solved.market_price,
                volatility,
                days: solved.days,
                spot_min,
                spot_max,
            },
            start,
        )
    }
}

#[inline]
fn days_to_years(days: u32) -> f64 {
    f64::from(days) / crate::models::DAYS_PER_YEAR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_stores_result_and_probability() {
        let mut session = Session::with_defaults(0.04, 0.0);
        let res = session.calculate(&SolverConfig::default()).unwrap();
        assert!(res.converged);
        let vol = session.implied_volatility().unwrap();
        assert!((vol - 0.296_215).abs() < 1e-5, "vol={vol}");
        let p = session.probability_of_profit().unwrap();
        assert!(p > 0.4 && p < 0.6, "ATM prob={p}");
    }

    #[test]
    fn test_failed_calculate_keeps_previous_result() {
        let mut session = Session::with_defaults(0.04, 0.0);
        session.calculate(&SolverConfig::default()).unwrap();
        let before = session.implied_volatility();

        session.market_price = 500.0;
        let err = session.calculate(&SolverConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Solver(ref m) if m.contains("outside theoretical bounds")));
        assert_eq!(session.implied_volatility(), before);
    }

    #[test]
    fn test_invalid_inputs_rejected_before_solve() {
        let mut session = Session::with_defaults(0.04, 0.0);
        session.params.strike = 0.0;
        assert!(matches!(
            session.calculate(&SolverConfig::default()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_spot_range_fallback() {
        let mut session = Session::with_defaults(0.04, 0.0);
        assert_eq!(session.spot_range(), (95.5, 99.5));
        assert_eq!(session.update_spot_range(90.0, 100.0), (90.0, 100.0));
        assert_eq!(session.update_spot_range(100.0, 90.0), (90.0, 100.0));
        session.apply_live_spot(120.0);
        assert_eq!(session.params.spot, 120.0);
        assert_eq!(session.spot_range(), (118.0, 122.0));
    }

    #[test]
    fn test_heatmap_requires_solve() {
        let mut session = Session::with_defaults(0.04, 0.0);
        let start = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(session.heatmap(start).is_err());
        session.calculate(&SolverConfig::default()).unwrap();
        let grid = session.heatmap(start).unwrap();
        assert_eq!(grid.dates.len(), 15);
        assert_eq!(grid.dates[0], "Oct 18");
    }

    #[test]
    fn test_heatmap_uses_inputs_of_last_successful_solve() {
        let mut session = Session::with_defaults(0.04, 0.0);
        let start = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        session.calculate(&SolverConfig::default()).unwrap();
        let before = session.heatmap(start).unwrap();

        session.market_price = 500.0;
        session.params.strike = 150.0;
        session.set_days(30);
        assert!(session.calculate(&SolverConfig::default()).is_err());

        let after = session.heatmap(start).unwrap();
        assert_eq!(after.dates.len(), 15);
        assert_eq!(after.pnl, before.pnl);
        // Deep OTM row at expiry loses exactly the 2.33 premium
        assert!((after.pnl[0][14] + 2.33).abs() < 1e-12, "pnl={}", after.pnl[0][14]);
    }

    #[test]
    fn test_set_days_updates_time() {
        let mut session = Session::with_defaults(0.04, 0.0);
        session.set_days(73);
        assert!((session.params.time_years - 0.2).abs() < 1e-12);
    }
}
