use crate::errors::{EngineError, EngineResult};
use crate::models::implied_vol::SolverConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Finnhub token for live spot quotes. Optional: pricing works without it.
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,
    pub default_rate: f64,
    pub default_dividend_yield: f64,
    pub solver: SolverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            finnhub_api_key: None,
            finnhub_base_url: "https://finnhub.io/api/v1".into(),
            default_rate: 0.04,
            default_dividend_yield: 0.0,
            solver: SolverConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let solver_defaults = SolverConfig::default();

        let server_port = parse_or(&lookup, "SERVER_PORT", defaults.server_port)?;
        let default_rate = parse_or(&lookup, "DEFAULT_RATE", defaults.default_rate)?;
        let default_dividend_yield =
            parse_or(&lookup, "DEFAULT_DIVIDEND_YIELD", defaults.default_dividend_yield)?;

        let solver = SolverConfig {
            low: parse_or(&lookup, "IV_LOW", solver_defaults.low)?,
            high: parse_or(&lookup, "IV_HIGH", solver_defaults.high)?,
            tol: parse_or(&lookup, "IV_TOL", solver_defaults.tol)?,
            max_iter: parse_or(&lookup, "IV_MAX_ITER", solver_defaults.max_iter)?,
            max_bracket_expansions: parse_or(
                &lookup,
                "IV_MAX_BRACKET_EXPANSIONS",
                solver_defaults.max_bracket_expansions,
            )?,
        };
        validate_solver(&solver)?;

        let finnhub_api_key = ["FINNHUB_API_KEY", "FINNHUB_TOKEN"]
            .iter()
            .filter_map(|k| lookup(*k))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        Ok(Self {
            server_port,
            finnhub_api_key,
            finnhub_base_url: lookup("FINNHUB_BASE_URL").unwrap_or(defaults.finnhub_base_url),
            default_rate,
            default_dividend_yield,
            solver,
        })
    }
}

fn validate_solver(s: &SolverConfig) -> EngineResult<()> {
    if !(s.low > 0.0 && s.low.is_finite()) {
        return Err(EngineError::Config(format!("IV_LOW must be positive, got {}", s.low)));
    }
    if !(s.high > s.low && s.high.is_finite()) {
        return Err(EngineError::Config(format!(
            "IV_HIGH must exceed IV_LOW, got [{}, {}]",
            s.low, s.high
        )));
    }
    if s.tol.is_nan() || s.tol <= 0.0 {
        return Err(EngineError::Config(format!("IV_TOL must be positive, got {}", s.tol)));
    }
    if s.max_iter == 0 {
        return Err(EngineError::Config("IV_MAX_ITER must be at least 1".into()));
    }
    Ok(())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> EngineResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}
