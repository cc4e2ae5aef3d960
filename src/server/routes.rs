use crate::analytics::heatmap::{self, GridSpec, PnlGrid};
use crate::analytics::payoff::{self, PayoffLeg, PayoffPoint, DEFAULT_PRICE_RANGE};
use crate::analytics::smile::{self, StrikeVol};
use crate::errors::EngineError;
use crate::feeds::finnhub;
use crate::models::black_scholes::BlackScholesMerton;
use crate::models::implied_vol::{self, SolveResult};
use crate::models::{OptionKind, OptionParams, PricingReport};
use crate::state::{AppState, CounterSnapshot, PerfCounters};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<serde_json::Value>)>;

#[derive(Debug, serde::Deserialize)]
pub struct PriceRequest {
    pub kind: OptionKind,
    pub spot: f64,
    pub strike: f64,
    pub volatility: f64,
    pub days: u32,
    pub rate: Option<f64>,
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct IvRequest {
    pub kind: OptionKind,
    pub market_price: f64,
    pub spot: f64,
    pub strike: f64,
    pub days: u32,
    pub rate: Option<f64>,
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
pub struct IvCurveRequest {
    #[serde(flatten)]
    pub option: IvRequest,
    pub strike_min: f64,
    pub strike_max: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct HeatmapRequest {
    #[serde(flatten)]
    pub option: IvRequest,
    pub spot_min: Option<f64>,
    pub spot_max: Option<f64>,
    /// First column date; defaults to today (UTC).
    pub start_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, serde::Deserialize)]
pub struct PayoffRequest {
    #[serde(default)]
    pub legs: Vec<PayoffLeg>,
    pub price_range: Option<(f64, f64)>,
}

#[derive(serde::Deserialize)]
pub struct QuoteQuery {
    pub symbol: String,
}

#[derive(Debug, serde::Serialize)]
pub struct IvResponse {
    #[serde(flatten)]
    pub result: SolveResult,
    pub theoretical_price: Option<f64>,
    pub price_difference: Option<f64>,
    pub probability_of_profit: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct HeatmapResponse {
    pub implied_volatility: f64,
    pub probability_of_profit: f64,
    #[serde(flatten)]
    pub grid: PnlGrid,
}

#[derive(Debug, serde::Serialize)]
pub struct QuoteResponse {
    pub symbol: String,
    pub price: f64,
}

impl IvRequest {
    fn params(&self, state: &AppState) -> Result<OptionParams, EngineError> {
        let params = OptionParams::from_days(
            self.spot,
            self.strike,
            self.rate.unwrap_or(state.config.default_rate),
            self.dividend_yield.unwrap_or(state.config.default_dividend_yield),
            f64::from(self.days),
            self.kind,
        );
        params.validate()?;
        if !self.market_price.is_finite() {
            return Err(EngineError::InvalidInput("market price must be finite".into()));
        }
        Ok(params)
    }
}

fn reject(state: &AppState, e: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    PerfCounters::bump(&state.counters.errors_returned);
    let status = match e {
        EngineError::InvalidInput(_) | EngineError::Parse(_) => StatusCode::BAD_REQUEST,
        EngineError::Solver(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::PriceFeed(_) | EngineError::Network(_) => StatusCode::BAD_GATEWAY,
        EngineError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(error = %e, status = status.as_u16(), "request rejected");
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

/// POST /api/price -- price, Greeks, moneyness, intrinsic/time value
pub async fn post_price(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PriceRequest>,
) -> ApiResult<PricingReport> {
    let params = OptionParams::from_days(
        req.spot,
        req.strike,
        req.rate.unwrap_or(state.config.default_rate),
        req.dividend_yield.unwrap_or(state.config.default_dividend_yield),
        f64::from(req.days),
        req.kind,
    );
    params.validate().map_err(|e| reject(&state, e))?;
    if !(req.volatility.is_finite() && req.volatility >= 0.0) {
        return Err(reject(
            &state,
            EngineError::InvalidInput(format!("volatility must be non-negative, got {}", req.volatility)),
        ));
    }

    PerfCounters::bump(&state.counters.prices_computed);
    Ok(Json(params.report(req.volatility)))
}

/// POST /api/iv -- solve implied vol for one quote
pub async fn post_iv(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IvRequest>,
) -> ApiResult<IvResponse> {
    let params = req.params(&state).map_err(|e| reject(&state, e))?;

    let result = implied_vol::solve(&BlackScholesMerton, &params, req.market_price, &state.config.solver);
    PerfCounters::bump(&state.counters.iv_solves);
    if !result.converged {
        PerfCounters::bump(&state.counters.iv_failures);
    }

    let theoretical_price = result.converged_volatility().map(|v| params.price(v));
    Ok(Json(IvResponse {
        theoretical_price,
        price_difference: theoretical_price.map(|p| (req.market_price - p).abs()),
        probability_of_profit: result.converged_volatility().map(|v| params.probability_of_profit(v)),
        result,
    }))
}

/// POST /api/iv/curve -- implied vol of the same quote across strikes
pub async fn post_iv_curve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IvCurveRequest>,
) -> ApiResult<Vec<StrikeVol>> {
    let params = req.option.params(&state).map_err(|e| reject(&state, e))?;
    let curve = smile::iv_by_strike(
        &params,
        req.option.market_price,
        (req.strike_min, req.strike_max),
        &state.config.solver,
    )
    .map_err(|e| reject(&state, e))?;
    let failures = curve.iter().filter(|p| p.volatility.is_none()).count();
    PerfCounters::add(&state.counters.iv_solves, curve.len() as u64);
    PerfCounters::add(&state.counters.iv_failures, failures as u64);
    Ok(Json(curve))
}

/// POST /api/heatmap -- solve IV, then the P/L grid over spot x date
pub async fn post_heatmap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HeatmapRequest>,
) -> ApiResult<HeatmapResponse> {
    let params = req.option.params(&state).map_err(|e| reject(&state, e))?;
    heatmap::validate_days(req.option.days).map_err(|e| reject(&state, e))?;

    let result = implied_vol::solve(
        &BlackScholesMerton,
        &params,
        req.option.market_price,
        &state.config.solver,
    );
    PerfCounters::bump(&state.counters.iv_solves);
    let volatility = match result.converged_volatility() {
        Some(v) => v,
        None => {
            PerfCounters::bump(&state.counters.iv_failures);
            return Err(reject(&state, EngineError::Solver(result.message)));
        }
    };

    let (default_min, default_max) = heatmap::default_spot_range(params.spot);
    let spec = GridSpec {
        params,
        entry_price: req.option.market_price,
        volatility,
        days: req.option.days,
        spot_min: req.spot_min.unwrap_or(default_min),
        spot_max: req.spot_max.unwrap_or(default_max),
    };
    let start = req
        .start_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let grid = heatmap::pnl_grid(&spec, start).map_err(|e| reject(&state, e))?;

    PerfCounters::bump(&state.counters.heatmaps_built);
    Ok(Json(HeatmapResponse {
        implied_volatility: volatility,
        probability_of_profit: params.probability_of_profit(volatility),
        grid,
    }))
}

/// POST /api/payoff -- summed expiry payoff of option legs
pub async fn post_payoff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PayoffRequest>,
) -> ApiResult<Vec<PayoffPoint>> {
    let range = req.price_range.unwrap_or(DEFAULT_PRICE_RANGE);
    let points = payoff::aggregate_payoff(&req.legs, range).map_err(|e| reject(&state, e))?;
    PerfCounters::bump(&state.counters.payoffs_built);
    Ok(Json(points))
}

/// GET /api/quote?symbol= -- live spot from Finnhub
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<QuoteResponse> {
    let price = finnhub::fetch_spot(
        &state.http,
        &state.config.finnhub_base_url,
        state.config.finnhub_api_key.as_deref(),
        &q.symbol,
    )
    .await
    .map_err(|e| reject(&state, e))?;

    PerfCounters::bump(&state.counters.quotes_fetched);
    Ok(Json(QuoteResponse {
        symbol: q.symbol.trim().to_ascii_uppercase(),
        price,
    }))
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}
