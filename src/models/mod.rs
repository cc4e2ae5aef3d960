pub mod black_scholes;
pub mod implied_vol;
pub mod probability;

use crate::errors::{EngineError, EngineResult};
use black_scholes::Greeks;

/// Days-per-year convention used when callers quote expiry in days.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// European option kind. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

impl std::str::FromStr for OptionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            other => Err(EngineError::InvalidInput(format!("unknown option kind: {other}"))),
        }
    }
}

/// A pricing model the IV solver can invert.
/// Both methods must be pure: deterministic output from inputs only.
/// Send + Sync required for use across tokio tasks.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical price at volatility `vol`. Never panics for valid params.
    fn price(&self, params: &OptionParams, vol: f64) -> f64;

    /// Volatility-independent no-arbitrage band `(min, max)`.
    fn bounds(&self, params: &OptionParams) -> (f64, f64);
}

/// Market parameters for a single European option, everything except volatility.
///
/// Invariants (enforced by `validate`, not by the engine): spot and strike
/// strictly positive, time non-negative. `time_years == 0` means at expiry.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionParams {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub time_years: f64,
    pub kind: OptionKind,
}

impl OptionParams {
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        dividend_yield: f64,
        time_years: f64,
        kind: OptionKind,
    ) -> Self {
        Self {
            spot,
            strike,
            rate,
            dividend_yield,
            time_years,
            kind,
        }
    }

    /// Same as `new` but with expiry quoted in calendar days.
    pub fn from_days(
        spot: f64,
        strike: f64,
        rate: f64,
        dividend_yield: f64,
        days: f64,
        kind: OptionKind,
    ) -> Self {
        Self::new(spot, strike, rate, dividend_yield, days / DAYS_PER_YEAR, kind)
    }

    /// Caller-side precondition check. The engine itself never re-validates.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.spot.is_finite() && self.spot > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "spot must be positive, got {}",
                self.spot
            )));
        }
        if !(self.strike.is_finite() && self.strike > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if !(self.time_years.is_finite() && self.time_years >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "time to expiry must be non-negative, got {}",
                self.time_years
            )));
        }
        if !self.rate.is_finite() || !self.dividend_yield.is_finite() {
            return Err(EngineError::InvalidInput(
                "rate and dividend yield must be finite".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn price(&self, vol: f64) -> f64 {
        black_scholes::price(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            vol,
            self.time_years,
            self.kind,
        )
    }

    #[inline]
    pub fn greeks(&self, vol: f64) -> Greeks {
        black_scholes::greeks(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            vol,
            self.time_years,
            self.kind,
        )
    }

    #[inline]
    pub fn bounds(&self) -> (f64, f64) {
        black_scholes::theoretical_bounds(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            self.time_years,
            self.kind,
        )
    }

    #[inline]
    pub fn probability_of_profit(&self, vol: f64) -> f64 {
        probability::probability_of_profit(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            vol,
            self.time_years,
            self.kind,
        )
    }

    /// Price, Greeks and the intrinsic/time-value split at volatility `vol`.
    pub fn report(&self, vol: f64) -> PricingReport {
        let (price, greeks) = black_scholes::price_and_greeks(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            vol,
            self.time_years,
            self.kind,
        );
        let intrinsic = black_scholes::intrinsic_value(self.spot, self.strike, self.kind);
        PricingReport {
            price,
            greeks,
            moneyness: Moneyness::of(self.spot, self.strike, self.kind),
            intrinsic_value: intrinsic,
            time_value: price - intrinsic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Atm,
    Otm,
}

impl Moneyness {
    pub fn of(spot: f64, strike: f64, kind: OptionKind) -> Self {
        if spot == strike {
            return Self::Atm;
        }
        let in_the_money = match kind {
            OptionKind::Call => spot > strike,
            OptionKind::Put => spot < strike,
        };
        if in_the_money {
            Self::Itm
        } else {
            Self::Otm
        }
    }
}

impl std::fmt::Display for Moneyness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Itm => write!(f, "ITM"),
            Self::Atm => write!(f, "ATM"),
            Self::Otm => write!(f, "OTM"),
        }
    }
}

/// Everything the pricing page shows for one option.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PricingReport {
    pub price: f64,
    pub greeks: Greeks,
    pub moneyness: Moneyness,
    pub intrinsic_value: f64,
    pub time_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("CALL".parse::<OptionKind>().unwrap(), OptionKind::Call);
        assert_eq!(" put ".parse::<OptionKind>().unwrap(), OptionKind::Put);
        assert!("straddle".parse::<OptionKind>().is_err());
        assert_eq!(OptionKind::Put.to_string(), "put");
        assert_eq!(serde_json::to_string(&OptionKind::Call).unwrap(), "\"call\"");
    }

    #[test]
    fn test_validate_rejects_bad_inputs() {
        let ok = OptionParams::from_days(100.0, 100.0, 0.04, 0.0, 30.0, OptionKind::Call);
        assert!(ok.validate().is_ok());

        let mut bad = ok;
        bad.spot = 0.0;
        assert!(matches!(bad.validate(), Err(EngineError::InvalidInput(_))));

        let mut bad = ok;
        bad.strike = -5.0;
        assert!(bad.validate().is_err());

        let mut bad = ok;
        bad.time_years = -0.1;
        assert!(bad.validate().is_err());

        let mut bad = ok;
        bad.rate = f64::NAN;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_moneyness() {
        assert_eq!(Moneyness::of(105.0, 100.0, OptionKind::Call), Moneyness::Itm);
        assert_eq!(Moneyness::of(105.0, 100.0, OptionKind::Put), Moneyness::Otm);
        assert_eq!(Moneyness::of(95.0, 100.0, OptionKind::Put), Moneyness::Itm);
        assert_eq!(Moneyness::of(100.0, 100.0, OptionKind::Put), Moneyness::Atm);
    }

    #[test]
    fn test_report_splits_time_value() {
        let params = OptionParams::from_days(110.0, 100.0, 0.04, 0.0, 30.0, OptionKind::Call);
        let report = params.report(0.25);
        assert!((report.intrinsic_value - 10.0).abs() < 1e-12);
        assert!(report.time_value > 0.0, "time value={} should be positive", report.time_value);
        assert!((report.price - report.intrinsic_value - report.time_value).abs() < 1e-12);
        assert_eq!(report.moneyness, Moneyness::Itm);
    }
}
