use crate::models::{OptionKind, OptionParams, PricingModel};
use statrs::function::erf::erf;
use std::f64::consts::{PI, SQRT_2};

/// Black-Scholes-Merton European option pricing with continuous dividend yield.
///
/// d1 = (ln(S/K) + (r - q + sigma^2/2) * T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// call = S e^(-qT) Phi(d1) - K e^(-rT) Phi(d2)
/// put  = K e^(-rT) Phi(-d2) - S e^(-qT) Phi(-d1)
///
/// Pure functions, no allocations, no I/O. Inputs are not re-validated:
/// callers guarantee S > 0, K > 0, T >= 0, sigma >= 0.
pub struct BlackScholesMerton;

impl PricingModel for BlackScholesMerton {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes-Merton"
    }

    #[inline]
    fn price(&self, params: &OptionParams, vol: f64) -> f64 {
        params.price(vol)
    }

    #[inline]
    fn bounds(&self, params: &OptionParams) -> (f64, f64) {
        params.bounds()
    }
}

/// Sensitivities per unit of the underlying quantity (not per percent).
/// Theta is per year.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}

/// Standard normal CDF via the error function: Phi(x) = (1 + erf(x / sqrt(2))) / 2.
/// Stays accurate in the tails where a series expansion loses precision.
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal density.
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

#[inline]
fn d1(spot: f64, strike: f64, rate: f64, dividend_yield: f64, vol: f64, time_years: f64) -> f64 {
    ((spot / strike).ln() + (rate - dividend_yield + 0.5 * vol * vol) * time_years)
        / (vol * time_years.sqrt())
}

/// Discounted spot and strike: (S e^(-qT), K e^(-rT)).
#[inline]
fn discounted(spot: f64, strike: f64, rate: f64, dividend_yield: f64, time_years: f64) -> (f64, f64) {
    (
        spot * (-dividend_yield * time_years).exp(),
        strike * (-rate * time_years).exp(),
    )
}

/// Payoff if exercised now.
#[inline]
pub fn intrinsic_value(spot: f64, strike: f64, kind: OptionKind) -> f64 {
    match kind {
        OptionKind::Call => (spot - strike).max(0.0),
        OptionKind::Put => (strike - spot).max(0.0),
    }
}

pub fn price(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    time_years: f64,
    kind: OptionKind,
) -> f64 {
    // At expiry: checked before anything divides by sqrt(T)
    if time_years <= 0.0 {
        return intrinsic_value(spot, strike, kind);
    }

    let (se_qt, ke_rt) = discounted(spot, strike, rate, dividend_yield, time_years);

    // Deterministic forward: checked before anything divides by sigma
    if vol <= 0.0 {
        return match kind {
            OptionKind::Call => (se_qt - ke_rt).max(0.0),
            OptionKind::Put => (ke_rt - se_qt).max(0.0),
        };
    }

    let d1 = d1(spot, strike, rate, dividend_yield, vol, time_years);
    let d2 = d1 - vol * time_years.sqrt();

    match kind {
        OptionKind::Call => se_qt * norm_cdf(d1) - ke_rt * norm_cdf(d2),
        OptionKind::Put => ke_rt * norm_cdf(-d2) - se_qt * norm_cdf(-d1),
    }
}

pub fn greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    time_years: f64,
    kind: OptionKind,
) -> Greeks {
    if time_years <= 0.0 || vol <= 0.0 {
        // Limits as T -> 0 or sigma -> 0: everything vanishes except delta,
        // which becomes a step in moneyness (half-step exactly at the money).
        let step = match kind {
            OptionKind::Call if spot > strike => 1.0,
            OptionKind::Call if spot < strike => 0.0,
            OptionKind::Call => 0.5,
            OptionKind::Put if spot < strike => -1.0,
            OptionKind::Put if spot > strike => 0.0,
            OptionKind::Put => -0.5,
        };
        return Greeks {
            delta: step * (-dividend_yield * time_years.max(0.0)).exp(),
            ..Greeks::default()
        };
    }

    let (se_qt, ke_rt) = discounted(spot, strike, rate, dividend_yield, time_years);
    let sqrt_t = time_years.sqrt();
    let d1 = d1(spot, strike, rate, dividend_yield, vol, time_years);
    let d2 = d1 - vol * sqrt_t;
    let pdf_d1 = norm_pdf(d1);
    let div_factor = (-dividend_yield * time_years).exp();

    // Shared by call and put
    let gamma = div_factor * pdf_d1 / (spot * vol * sqrt_t);
    let vega = se_qt * pdf_d1 * sqrt_t;
    let decay = -(se_qt * pdf_d1 * vol) / (2.0 * sqrt_t);

    match kind {
        OptionKind::Call => Greeks {
            delta: div_factor * norm_cdf(d1),
            gamma,
            vega,
            theta: decay - rate * ke_rt * norm_cdf(d2) + dividend_yield * se_qt * norm_cdf(d1),
            rho: time_years * ke_rt * norm_cdf(d2),
        },
        OptionKind::Put => Greeks {
            delta: -div_factor * norm_cdf(-d1),
            gamma,
            vega,
            theta: decay + rate * ke_rt * norm_cdf(-d2) - dividend_yield * se_qt * norm_cdf(-d1),
            rho: -time_years * ke_rt * norm_cdf(-d2),
        },
    }
}

pub fn price_and_greeks(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    time_years: f64,
    kind: OptionKind,
) -> (f64, Greeks) {
    (
        price(spot, strike, rate, dividend_yield, vol, time_years, kind),
        greeks(spot, strike, rate, dividend_yield, vol, time_years, kind),
    )
}

/// No-arbitrage price band `(min, max)` over all volatilities in (0, inf).
/// call: [max(Se^-qT - Ke^-rT, 0), Se^-qT]
/// put:  [max(Ke^-rT - Se^-qT, 0), Ke^-rT]
pub fn theoretical_bounds(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    time_years: f64,
    kind: OptionKind,
) -> (f64, f64) {
    let (se_qt, ke_rt) = discounted(spot, strike, rate, dividend_yield, time_years);
    match kind {
        OptionKind::Call => ((se_qt - ke_rt).max(0.0), se_qt),
        OptionKind::Put => ((ke_rt - se_qt).max(0.0), ke_rt),
    }
}
