//! Cache key conventions for the response cache.
//!
//! Keys are built as `{provider_tool}:{instrument}` (klines append the
//! interval) so that the cache's category substring match can discriminate
//! freshness windows without any explicit type tagging:
//!
//! - Ticker: `binance.get_ticker:BTCUSDT`
//! - Orderbook: `binance.orderbook_l1:BTCUSDT`
//! - Klines: `binance.get_klines:BTCUSDT:1h`

/// Build a response cache key for a provider tool and instrument symbol.
pub fn response_key(provider_tool: &str, instrument: &str) -> String {
    format!("{provider_tool}:{instrument}")
}

/// Klines variant: different intervals must never share an entry.
pub fn klines_key(provider_tool: &str, instrument: &str, interval: &str) -> String {
    format!("{provider_tool}:{instrument}:{interval}")
}
