use crate::models::black_scholes::BlackScholesMerton;
use crate::models::{OptionKind, OptionParams, PricingModel};

/// Absolute slack allowed outside the theoretical price band.
const BOUNDS_EPSILON: f64 = 1e-12;

/// Search settings for the bisection solver.
///
/// Defaults bracket 0%..500% annualized vol, which contains any realistic
/// market IV; the bracket is widened only if it fails to straddle the root.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolverConfig {
    pub low: f64,
    pub high: f64,
    /// Tolerance on |model price - market price|, not on volatility.
    pub tol: f64,
    pub max_iter: u32,
    pub max_bracket_expansions: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            low: 1e-6,
            high: 5.0,
            tol: 1e-8,
            max_iter: 100,
            max_bracket_expansions: 10,
        }
    }
}

/// How a solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Converged,
    OutOfBounds,
    BracketFailed,
    MaxIterations,
}

/// Outcome of one IV solve. Built once and returned, never mutated.
///
/// `volatility` is `Some` on convergence and also on `MaxIterations`, where it
/// carries the last bisection midpoint as a best-effort estimate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SolveResult {
    pub volatility: Option<f64>,
    pub converged: bool,
    pub iterations: u32,
    pub message: String,
    pub status: SolveStatus,
}

impl SolveResult {
    fn rejected(status: SolveStatus, message: String) -> Self {
        Self {
            volatility: None,
            converged: false,
            iterations: 0,
            message,
            status,
        }
    }

    /// Volatility only when the solve converged.
    #[inline]
    pub fn converged_volatility(&self) -> Option<f64> {
        if self.converged {
            self.volatility
        } else {
            None
        }
    }
}

/// Solve for the Black-Scholes-Merton volatility reproducing `market_price`.
#[allow(clippy::too_many_arguments)]
pub fn solve_iv(
    market_price: f64,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    time_years: f64,
    kind: OptionKind,
    config: &SolverConfig,
) -> SolveResult {
    let params = OptionParams::new(spot, strike, rate, dividend_yield, time_years, kind);
    solve(&BlackScholesMerton, &params, market_price, config)
}

/// Invert `model.price` against `market_price` by bracketed bisection.
///
/// 1. reject prices outside the model's no-arbitrage band
/// 2. evaluate f(v) = price(v) - market at both bracket ends
/// 3. while f(low), f(high) share a sign: halve low, double high (bounded)
/// 4. bisect until |f(mid)| < tol or the iteration budget is spent
///
/// Price is monotone increasing in vol for T > 0, so f has at most one root.
pub fn solve<M: PricingModel + ?Sized>(
    model: &M,
    params: &OptionParams,
    market_price: f64,
    config: &SolverConfig,
) -> SolveResult {
    let (min_theory, max_theory) = model.bounds(params);
    if market_price < min_theory - BOUNDS_EPSILON || market_price > max_theory + BOUNDS_EPSILON {
        tracing::debug!(
            model = model.name(),
            market_price,
            min_theory,
            max_theory,
            "market price outside theoretical bounds"
        );
        return SolveResult::rejected(
            SolveStatus::OutOfBounds,
            format!("market price outside theoretical bounds [{min_theory:.6}, {max_theory:.6}]"),
        );
    }

    let objective = |vol: f64| model.price(params, vol) - market_price;

    let mut low = config.low;
    let mut high = config.high;
    let mut f_low = objective(low);
    let mut f_high = objective(high);

    let mut expansions: u32 = 0;
    while f_low * f_high > 0.0 && expansions < config.max_bracket_expansions {
        low *= 0.5;
        high *= 2.0;
        f_low = objective(low);
        f_high = objective(high);
        expansions += 1;
    }

    if f_low * f_high > 0.0 {
        tracing::debug!(
            model = model.name(),
            market_price,
            low,
            high,
            expansions,
            "failed to bracket implied vol"
        );
        return SolveResult::rejected(
            SolveStatus::BracketFailed,
            "failed to bracket root for volatility".into(),
        );
    }

    if expansions > 0 {
        tracing::debug!(low, high, expansions, "bracket expanded");
    }

    for i in 0..config.max_iter {
        let mid = 0.5 * (low + high);
        let f_mid = objective(mid);
        if f_mid.abs() < config.tol {
            return SolveResult {
                volatility: Some(mid),
                converged: true,
                iterations: i + 1,
                message: "ok".into(),
                status: SolveStatus::Converged,
            };
        }
        // Keep the sign change inside [low, high]
        if f_low * f_mid <= 0.0 {
            high = mid;
        } else {
            low = mid;
            f_low = f_mid;
        }
    }

    let estimate = 0.5 * (low + high);
    tracing::debug!(
        model = model.name(),
        market_price,
        estimate,
        max_iter = config.max_iter,
        "implied vol hit iteration cap"
    );
    SolveResult {
        volatility: Some(estimate),
        converged: false,
        iterations: config.max_iter,
        message: "max iterations reached".into(),
        status: SolveStatus::MaxIterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::{price, theoretical_bounds};

    const T30: f64 = 30.0 / 365.0;

    #[test]
    fn test_recovers_atm_vol() {
        let p = price(100.0, 100.0, 0.04, 0.0, 0.25, T30, OptionKind::Call);
        let res = solve_iv(p, 100.0, 100.0, 0.04, 0.0, T30, OptionKind::Call, &SolverConfig::default());
        assert!(res.converged, "should converge: {}", res.message);
        assert_eq!(res.status, SolveStatus::Converged);
        assert_eq!(res.message, "ok");
        let vol = res.volatility.unwrap();
        assert!((vol - 0.25).abs() < 1e-6, "vol={vol}");
        assert!(res.iterations > 0 && res.iterations <= 100, "iterations={}", res.iterations);
    }

    #[test]
    fn test_quoted_market_price() {
        let res = solve_iv(2.33, 100.0, 100.0, 0.04, 0.0, T30, OptionKind::Call, &SolverConfig::default());
        assert!(res.converged);
        let vol = res.volatility.unwrap();
        assert!((vol - 0.189_357_6).abs() < 1e-6, "vol={vol}");
        let repriced = price(100.0, 100.0, 0.04, 0.0, vol, T30, OptionKind::Call);
        assert!((repriced - 2.33).abs() < 1e-8, "repriced={repriced}");
    }

    #[test]
    fn test_round_trip_grid() {
        let cfg = SolverConfig::default();
        let cases = [
            (100.0, 100.0, 0.04, 0.0, 0.5),
            (100.0, 80.0, 0.02, 0.01, 1.0),
            (100.0, 120.0, 0.05, 0.03, 2.0),
            (50.0, 55.0, 0.0, 0.0, 0.25),
        ];
        for kind in [OptionKind::Call, OptionKind::Put] {
            for &(s, k, r, q, t) in &cases {
                for sigma in [0.05, 0.2, 0.6, 1.5, 2.9] {
                    let p = price(s, k, r, q, sigma, t, kind);
                    let res = solve_iv(p, s, k, r, q, t, kind, &cfg);
                    assert!(res.converged, "{kind} S={s} K={k} sigma={sigma}: {}", res.message);
                    let vol = res.volatility.unwrap();
                    assert!(
                        (vol - sigma).abs() < 1e-4,
                        "{kind} S={s} K={k} T={t}: sigma={sigma} solved={vol}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_round_trip_low_vol_at_the_forward() {
        // Forward equals strike, so vega stays near S*sqrt(T)/sqrt(2pi) even as sigma -> 0
        let cfg = SolverConfig::default();
        for kind in [OptionKind::Call, OptionKind::Put] {
            for &(r, q, t) in &[(0.0, 0.0, 1.0), (0.03, 0.03, 2.0)] {
                for sigma in [1e-4, 1e-3, 5e-3] {
                    let p = price(100.0, 100.0, r, q, sigma, t, kind);
                    let res = solve_iv(p, 100.0, 100.0, r, q, t, kind, &cfg);
                    assert!(res.converged, "{kind} T={t} sigma={sigma}: {}", res.message);
                    let vol = res.volatility.unwrap();
                    assert!((vol - sigma).abs() < 1e-8, "{kind} T={t}: sigma={sigma} solved={vol}");
                }
            }
        }
    }

    #[test]
    fn test_above_upper_bound_rejected() {
        let (_, hi) = theoretical_bounds(100.0, 100.0, 0.04, 0.0, T30, OptionKind::Call);
        let res = solve_iv(hi + 1.0, 100.0, 100.0, 0.04, 0.0, T30, OptionKind::Call, &SolverConfig::default());
        assert!(!res.converged);
        assert!(res.volatility.is_none());
        assert_eq!(res.iterations, 0);
        assert_eq!(res.status, SolveStatus::OutOfBounds);
        assert!(res.message.starts_with("market price outside theoretical bounds"), "{}", res.message);
    }

    #[test]
    fn test_below_lower_bound_rejected() {
        // Deep ITM put: lower bound is K e^-rT - S e^-qT
        let (lo, _) = theoretical_bounds(80.0, 100.0, 0.04, 0.0, 0.5, OptionKind::Put);
        let res = solve_iv(lo - 0.5, 80.0, 100.0, 0.04, 0.0, 0.5, OptionKind::Put, &SolverConfig::default());
        assert_eq!(res.status, SolveStatus::OutOfBounds);
        assert!(res.volatility.is_none());
    }

    #[test]
    fn test_narrow_bracket_expands() {
        // Initial bracket [0.30, 0.35] misses sigma = 0.9 until it is widened.
        let cfg = SolverConfig { low: 0.30, high: 0.35, ..SolverConfig::default() };
        let p = price(100.0, 100.0, 0.03, 0.0, 0.9, 1.0, OptionKind::Call);
        let res = solve_iv(p, 100.0, 100.0, 0.03, 0.0, 1.0, OptionKind::Call, &cfg);
        assert!(res.converged, "{}", res.message);
        assert!((res.volatility.unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_bracket_failure_when_expansion_disabled() {
        let cfg = SolverConfig {
            low: 0.30,
            high: 0.35,
            max_bracket_expansions: 0,
            ..SolverConfig::default()
        };
        let p = price(100.0, 100.0, 0.03, 0.0, 0.9, 1.0, OptionKind::Call);
        let res = solve_iv(p, 100.0, 100.0, 0.03, 0.0, 1.0, OptionKind::Call, &cfg);
        assert!(!res.converged);
        assert!(res.volatility.is_none());
        assert_eq!(res.iterations, 0);
        assert_eq!(res.status, SolveStatus::BracketFailed);
        assert_eq!(res.message, "failed to bracket root for volatility");
    }

    #[test]
    fn test_iteration_cap_returns_estimate() {
        let cfg = SolverConfig { max_iter: 3, ..SolverConfig::default() };
        let p = price(100.0, 100.0, 0.04, 0.0, 0.25, T30, OptionKind::Call);
        let res = solve_iv(p, 100.0, 100.0, 0.04, 0.0, T30, OptionKind::Call, &cfg);
        assert!(!res.converged);
        assert_eq!(res.iterations, 3);
        assert_eq!(res.status, SolveStatus::MaxIterations);
        assert_eq!(res.message, "max iterations reached");
        let est = res.volatility.expect("best-effort estimate");
        assert!(est > 0.0 && est < 5.0, "estimate={est}");
        assert!(res.converged_volatility().is_none());
    }

    struct LinearModel;

    impl PricingModel for LinearModel {
        fn name(&self) -> &'static str {
            "linear"
        }
        fn price(&self, _params: &OptionParams, vol: f64) -> f64 {
            10.0 * vol
        }
        fn bounds(&self, _params: &OptionParams) -> (f64, f64) {
            (0.0, f64::INFINITY)
        }
    }

    #[test]
    fn test_solver_is_model_agnostic() {
        let params = OptionParams::new(1.0, 1.0, 0.0, 0.0, 1.0, OptionKind::Call);
        let res = solve(&LinearModel, &params, 3.0, &SolverConfig::default());
        assert!(res.converged);
        assert!((res.volatility.unwrap() - 0.3).abs() < 1e-8);
    }
}
