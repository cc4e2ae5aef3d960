use crate::config::AppConfig;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Request Counters (lock-free) ──

pub struct PerfCounters {
    pub prices_computed: AtomicU64,
    pub iv_solves: AtomicU64,
    pub iv_failures: AtomicU64,
    pub heatmaps_built: AtomicU64,
    pub payoffs_built: AtomicU64,
    pub quotes_fetched: AtomicU64,
    pub errors_returned: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            prices_computed: AtomicU64::new(0),
            iv_solves: AtomicU64::new(0),
            iv_failures: AtomicU64::new(0),
            heatmaps_built: AtomicU64::new(0),
            payoffs_built: AtomicU64::new(0),
            quotes_fetched: AtomicU64::new(0),
            errors_returned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CounterSnapshot {
    pub prices_computed: u64,
    pub iv_solves: u64,
    pub iv_failures: u64,
    pub heatmaps_built: u64,
    pub payoffs_built: u64,
    pub quotes_fetched: u64,
    pub errors_returned: u64,
}

impl PerfCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        use portable_atomic::Ordering::Relaxed;
        CounterSnapshot {
            prices_computed: self.prices_computed.load(Relaxed),
            iv_solves: self.iv_solves.load(Relaxed),
            iv_failures: self.iv_failures.load(Relaxed),
            heatmaps_built: self.heatmaps_built.load(Relaxed),
            payoffs_built: self.payoffs_built.load(Relaxed),
            quotes_fetched: self.quotes_fetched.load(Relaxed),
            errors_returned: self.errors_returned.load(Relaxed),
        }
    }
}

// ── Application shared state (no locks) ──
// Pricing is stateless per request; the only shared pieces are config,
// the HTTP client for quote lookups and the counters.

pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            http: crate::feeds::finnhub::build_client(),
            counters: PerfCounters::new(),
        })
    }
}
