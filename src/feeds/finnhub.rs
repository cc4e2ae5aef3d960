use crate::errors::{EngineError, EngineResult};
use reqwest::Client;

/// Finnhub REST quote lookup. One-shot, no polling: the caller fetches a spot
/// when the user asks for it and feeds the scalar into the pricing core.
pub fn build_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap_or_default()
}

// Finnhub /quote response format:
// {
//   "c": 261.74,      current price
//   "d": 0.97,        change
//   "dp": 0.3718,     percent change
//   "h": 263.31,      high of day
//   "l": 260.68,      low of day
//   "o": 261.07,      open
//   "pc": 260.77,     previous close
//   "t": 1727467200   timestamp (0 when the symbol is unknown)
// }

#[derive(serde::Deserialize)]
struct QuoteResponse {
    c: Option<f64>,
    t: Option<i64>,
}

/// Latest traded price for `symbol` (uppercased before the request).
pub async fn fetch_spot(
    client: &Client,
    base_url: &str,
    api_key: Option<&str>,
    symbol: &str,
) -> EngineResult<f64> {
    let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
        EngineError::Config(
            "Finnhub API key not found. Set FINNHUB_API_KEY (or FINNHUB_TOKEN) in the environment or .env".into(),
        )
    })?;

    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(EngineError::InvalidInput(
            "enter a ticker symbol to fetch its latest price".into(),
        ));
    }

    let url = format!("{}/quote", base_url.trim_end_matches('/'));

    let resp = client
        .get(&url)
        .query(&[("symbol", symbol.as_str()), ("token", api_key)])
        .send()
        .await
        .map_err(|e| EngineError::PriceFeed(format!("request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EngineError::PriceFeed(format!("HTTP {status}: {body}")));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| EngineError::PriceFeed(format!("read body: {e}")))?;

    let price = parse_quote(&body, &symbol)?;
    tracing::info!(symbol = %symbol, price, "fetched live spot");
    Ok(price)
}

fn parse_quote(body: &str, symbol: &str) -> EngineResult<f64> {
    let quote: QuoteResponse = serde_json::from_str(body)
        .map_err(|e| EngineError::PriceFeed(format!("parse: {e}")))?;

    match (quote.c, quote.t) {
        (Some(price), Some(ts)) if ts != 0 => {
            if price <= 0.0 || !price.is_finite() {
                return Err(EngineError::PriceFeed(format!("invalid price for {symbol}: {price}")));
            }
            Ok(price)
        }
        _ => Err(EngineError::PriceFeed(format!("no price available for {symbol}"))),
    }
}
