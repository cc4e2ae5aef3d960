use crate::models::black_scholes::norm_cdf;
use crate::models::OptionKind;

/// Risk-neutral probability the option finishes in the money.
///
/// call: P(S_T > K) = Phi(d2)
/// put:  P(S_T < K) = Phi(-d2)
///
/// where d2 = (ln(S/K) + (r - q - sigma^2/2) * T) / (sigma * sqrt(T)).
/// This ignores the premium paid, matching how the profit calculator reports it.
pub fn probability_of_profit(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    time_years: f64,
    kind: OptionKind,
) -> f64 {
    let sigma_sqrt_t = vol * time_years.max(0.0).sqrt();

    // No diffusion left: outcome is already decided by moneyness
    if time_years <= 0.0 || sigma_sqrt_t < 1e-12 {
        let in_the_money = match kind {
            OptionKind::Call => spot > strike,
            OptionKind::Put => spot < strike,
        };
        return if in_the_money { 1.0 } else { 0.0 };
    }

    let d2 = ((spot / strike).ln() + (rate - dividend_yield - 0.5 * vol * vol) * time_years)
        / sigma_sqrt_t;

    match kind {
        OptionKind::Call => norm_cdf(d2),
        OptionKind::Put => norm_cdf(-d2),
    }
}
