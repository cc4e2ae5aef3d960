//! European option pricing (Black-Scholes-Merton with continuous dividend
//! yield) and implied-volatility calibration, plus the thin callers that
//! drive them: an HTTP JSON API, an interactive console and a live spot feed.
//!
//! The core lives in [`models`]: `black_scholes` for price, Greeks and
//! no-arbitrage bounds; `implied_vol` for the bracketed bisection solver.
//! Everything else only passes scalars in and serializes results out.

pub mod analytics;
pub mod config;
pub mod console;
pub mod errors;
pub mod feeds;
pub mod models;
pub mod server;
pub mod session;
pub mod state;

pub use crate::errors::{EngineError, EngineResult};
pub use crate::models::black_scholes::{greeks, price, price_and_greeks, theoretical_bounds, Greeks};
pub use crate::models::implied_vol::{solve_iv, SolveResult, SolveStatus, SolverConfig};
pub use crate::models::{OptionKind, OptionParams};
