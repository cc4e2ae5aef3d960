use crate::analytics::linspace;
use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::intrinsic_value;
use crate::models::{OptionParams, DAYS_PER_YEAR};
use chrono::{Days, NaiveDate};

/// Fixed number of spot rows in the grid.
pub const SPOT_STEPS: usize = 41;

/// Longest horizon a grid may span; one column is built per day.
pub const MAX_GRID_DAYS: u32 = 3650;

/// Estimated P/L of a long option across spot levels and calendar days.
///
/// `pnl[row][col]` is the value at `spot_prices[row]` on `dates[col]` minus
/// the entry price. The last column is expiry, valued at intrinsic.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PnlGrid {
    pub spot_prices: Vec<f64>,
    pub dates: Vec<String>,
    pub days_remaining: Vec<u32>,
    pub pnl: Vec<Vec<f64>>,
}

/// Inputs for a P/L grid. `params.time_years` is ignored: the horizon comes
/// from `days` so that every column lands on a whole calendar day.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub params: OptionParams,
    pub entry_price: f64,
    pub volatility: f64,
    pub days: u32,
    pub spot_min: f64,
    pub spot_max: f64,
}

/// Default spot window around the current spot.
#[inline]
pub fn default_spot_range(spot: f64) -> (f64, f64) {
    (spot - 2.0, spot + 2.0)
}

pub fn validate_spot_range(spot_min: f64, spot_max: f64) -> EngineResult<()> {
    if !spot_min.is_finite() || !spot_max.is_finite() || spot_min >= spot_max {
        return Err(EngineError::InvalidInput(format!(
            "spot range must satisfy min < max, got [{spot_min}, {spot_max}]"
        )));
    }
    if spot_min <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "spot range must be positive, got min {spot_min}"
        )));
    }
    Ok(())
}

pub fn validate_days(days: u32) -> EngineResult<()> {
    if days > MAX_GRID_DAYS {
        return Err(EngineError::InvalidInput(format!(
            "heatmap horizon must be at most {MAX_GRID_DAYS} days, got {days}"
        )));
    }
    Ok(())
}

pub fn pnl_grid(spec: &GridSpec, start: NaiveDate) -> EngineResult<PnlGrid> {
    validate_spot_range(spec.spot_min, spec.spot_max)?;
    validate_days(spec.days)?;

    let spot_prices: Vec<f64> = linspace(spec.spot_min, spec.spot_max, SPOT_STEPS)
        .into_iter()
        .map(|s| (s * 100.0).round() / 100.0)
        .collect();

    let mut dates = Vec::with_capacity(spec.days as usize + 1);
    let mut days_remaining = Vec::with_capacity(spec.days as usize + 1);
    for i in 0..=spec.days {
        let date = start
            .checked_add_days(Days::new(u64::from(i)))
            .ok_or_else(|| EngineError::InvalidInput(format!("date overflow at day {i}")))?;
        dates.push(date.format("%b %d").to_string());
        days_remaining.push(spec.days - i);
    }

    let p = &spec.params;
    let pnl = spot_prices
        .iter()
        .map(|&spot| {
            days_remaining
                .iter()
                .map(|&left| {
                    let value = if left == 0 {
                        intrinsic_value(spot, p.strike, p.kind)
                    } else {
                        let at_spot = OptionParams {
                            spot,
                            time_years: f64::from(left) / DAYS_PER_YEAR,
                            ..*p
                        };
                        at_spot.price(spec.volatility)
                    };
                    value - spec.entry_price
                })
                .collect()
        })
        .collect();

    Ok(PnlGrid {
        spot_prices,
        dates,
        days_remaining,
        pnl,
    })
}
