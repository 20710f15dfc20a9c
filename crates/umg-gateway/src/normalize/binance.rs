//! Binance transform set.
//!
//! Field names follow the Binance REST conventions (`bidPrice`, `origQty`,
//! `isBuyerMaker`, ...). Every transform is a pure function from the raw
//! payload to the unified field set; numeric strings are coerced to f64.

use serde_json::{json, Map, Value};

use super::{
    num_field, opt_num_field, str_field, value_to_f64, value_to_i64, now_millis, DataType,
    NormalizeError, SchemaNormalizer,
};

/// Register the full Binance transform set.
pub(super) fn register(normalizer: &mut SchemaNormalizer) {
    normalizer.register("binance", DataType::Ticker, ticker);
    normalizer.register("binance", DataType::OrderbookL1, orderbook_l1);
    normalizer.register("binance", DataType::OrderbookL2, orderbook_l2);
    normalizer.register("binance", DataType::Klines, klines);
    normalizer.register("binance", DataType::Order, order);
    normalizer.register("binance", DataType::Account, account);
    normalizer.register("binance", DataType::Trade, trade);
    normalizer.register("binance", DataType::RecentTrades, recent_trades);
    normalizer.register("binance", DataType::ExchangeInfo, exchange_info);
    normalizer.register("binance", DataType::OrderbookHealth, orderbook_health);
    normalizer.register("binance", DataType::VolumeProfile, volume_profile);
    normalizer.register("binance", DataType::MarketAnomalies, market_anomalies);
    normalizer.register(
        "binance",
        DataType::MicrostructureHealth,
        microstructure_health,
    );
}

fn mid_and_spread_bps(bid: f64, ask: f64) -> (f64, f64) {
    let mid = (bid + ask) / 2.0;
    let spread_bps = if mid > 0.0 {
        (ask - bid) / mid * 10_000.0
    } else {
        0.0
    };
    (mid, spread_bps)
}

/// 24hr ticker -> `{bid, ask, mid, spread_bps, volume, timestamp, venue_symbol, ...}`.
fn ticker(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let bid = num_field(raw, "bidPrice")?;
    let ask = num_field(raw, "askPrice")?;
    let (mid, spread_bps) = mid_and_spread_bps(bid, ask);

    let mut normalized = Map::new();
    normalized.insert("bid".to_string(), json!(bid));
    normalized.insert("ask".to_string(), json!(ask));
    normalized.insert("mid".to_string(), json!(mid));
    normalized.insert("spread_bps".to_string(), json!(spread_bps));
    normalized.insert("volume".to_string(), json!(num_field(raw, "volume")?));
    normalized.insert(
        "timestamp".to_string(),
        json!(raw
            .get("closeTime")
            .and_then(value_to_i64)
            .unwrap_or_else(now_millis)),
    );
    normalized.insert("venue_symbol".to_string(), json!(str_field(raw, "symbol")?));

    if let Some(last) = opt_num_field(raw, "lastPrice")? {
        normalized.insert("last".to_string(), json!(last));
    }
    if let Some(quote_volume) = opt_num_field(raw, "quoteVolume")? {
        normalized.insert("quote_volume".to_string(), json!(quote_volume));
    }
    if let Some(change) = opt_num_field(raw, "priceChangePercent")? {
        normalized.insert("price_change_percent".to_string(), json!(change));
    }

    Ok(normalized)
}

/// Parse one `[price, quantity]` depth level.
fn depth_level(level: &Value, side: &'static str) -> Result<(f64, f64), NormalizeError> {
    let pair = level
        .as_array()
        .ok_or_else(|| NormalizeError::Malformed(format!("{side} level is not a [price, quantity] pair")))?;
    if pair.len() < 2 {
        return Err(NormalizeError::Malformed(format!(
            "{side} level has fewer than two elements"
        )));
    }
    Ok((value_to_f64(&pair[0], side)?, value_to_f64(&pair[1], side)?))
}

fn depth_side<'a>(raw: &'a Value, side: &'static str) -> Result<&'a Vec<Value>, NormalizeError> {
    let levels = raw
        .get(side)
        .and_then(Value::as_array)
        .ok_or(NormalizeError::MissingField(side))?;
    if levels.is_empty() {
        return Err(NormalizeError::Malformed(format!(
            "orderbook has no {side}"
        )));
    }
    Ok(levels)
}

/// Depth snapshot -> unified top-of-book.
fn orderbook_l1(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let bids = depth_side(raw, "bids")?;
    let asks = depth_side(raw, "asks")?;

    let (bid_price, bid_quantity) = depth_level(&bids[0], "bids")?;
    let (ask_price, ask_quantity) = depth_level(&asks[0], "asks")?;

    let (mid, spread_bps) = mid_and_spread_bps(bid_price, ask_price);
    let total_quantity = bid_quantity + ask_quantity;
    let imbalance_ratio = if total_quantity > 0.0 {
        bid_quantity / total_quantity
    } else {
        0.5
    };

    let mut normalized = Map::new();
    normalized.insert("bid_price".to_string(), json!(bid_price));
    normalized.insert("bid_quantity".to_string(), json!(bid_quantity));
    normalized.insert("ask_price".to_string(), json!(ask_price));
    normalized.insert("ask_quantity".to_string(), json!(ask_quantity));
    normalized.insert("mid".to_string(), json!(mid));
    normalized.insert("spread_bps".to_string(), json!(spread_bps));
    normalized.insert("spread_absolute".to_string(), json!(ask_price - bid_price));
    normalized.insert("imbalance_ratio".to_string(), json!(imbalance_ratio));
    // Binance depth snapshots carry no timestamp of their own.
    normalized.insert("timestamp".to_string(), json!(now_millis()));

    if let Some(update_id) = raw.get("lastUpdateId").and_then(value_to_i64) {
        normalized.insert("update_id".to_string(), json!(update_id));
    }

    Ok(normalized)
}

/// Depth snapshot -> full-depth unified book with per-level objects.
fn orderbook_l2(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let parse_side = |side: &'static str| -> Result<Vec<Value>, NormalizeError> {
        depth_side(raw, side)?
            .iter()
            .map(|level| {
                let (price, quantity) = depth_level(level, side)?;
                Ok(json!({"price": price, "quantity": quantity}))
            })
            .collect()
    };

    let bids = parse_side("bids")?;
    let asks = parse_side("asks")?;

    let bid_price = bids[0]["price"].as_f64().unwrap_or(0.0);
    let ask_price = asks[0]["price"].as_f64().unwrap_or(0.0);
    let (mid, spread_bps) = mid_and_spread_bps(bid_price, ask_price);

    let mut normalized = Map::new();
    normalized.insert("bids".to_string(), Value::Array(bids));
    normalized.insert("asks".to_string(), Value::Array(asks));
    normalized.insert("mid".to_string(), json!(mid));
    normalized.insert("spread_bps".to_string(), json!(spread_bps));
    normalized.insert("timestamp".to_string(), json!(now_millis()));

    if let Some(update_id) = raw.get("lastUpdateId").and_then(value_to_i64) {
        normalized.insert("update_id".to_string(), json!(update_id));
    }

    Ok(normalized)
}

/// Positional kline layout: `[open_time, open, high, low, close, volume, close_time, ...]`.
/// Missing trailing fields default to zero.
fn positional_kline(entry: &[Value]) -> Result<Value, NormalizeError> {
    let time_at = |idx: usize| entry.get(idx).and_then(value_to_i64).unwrap_or(0);
    let num_at = |idx: usize, field: &'static str| -> Result<f64, NormalizeError> {
        match entry.get(idx) {
            None => Ok(0.0),
            Some(value) => value_to_f64(value, field),
        }
    };

    Ok(json!({
        "open_time": time_at(0),
        "open": num_at(1, "open")?,
        "high": num_at(2, "high")?,
        "low": num_at(3, "low")?,
        "close": num_at(4, "close")?,
        "volume": num_at(5, "volume")?,
        "close_time": time_at(6),
    }))
}

/// Object kline layout, accepting underscore and camel field names.
fn named_kline(entry: &Value) -> Result<Value, NormalizeError> {
    let field = |snake: &'static str, camel: &'static str| {
        entry.get(snake).or_else(|| entry.get(camel))
    };
    let time_of = |snake: &'static str, camel: &'static str| {
        field(snake, camel).and_then(value_to_i64).unwrap_or(0)
    };
    let num_of = |name: &'static str| -> Result<f64, NormalizeError> {
        match entry.get(name) {
            None => Ok(0.0),
            Some(value) => value_to_f64(value, name),
        }
    };

    Ok(json!({
        "open_time": time_of("open_time", "openTime"),
        "open": num_of("open")?,
        "high": num_of("high")?,
        "low": num_of("low")?,
        "close": num_of("close")?,
        "volume": num_of("volume")?,
        "close_time": time_of("close_time", "closeTime"),
    }))
}

/// Klines: the payload may be the array itself or wrapped under
/// `klines`/`data`; entries may be positional arrays or named objects.
fn klines(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let entries = raw
        .as_array()
        .or_else(|| raw.get("klines").and_then(Value::as_array))
        .or_else(|| raw.get("data").and_then(Value::as_array))
        .ok_or(NormalizeError::MissingField("klines"))?;

    let normalized_entries: Vec<Value> = entries
        .iter()
        .map(|entry| match entry.as_array() {
            Some(positional) => positional_kline(positional),
            None if entry.is_object() => named_kline(entry),
            None => Err(NormalizeError::Malformed(
                "kline entry is neither an array nor an object".to_string(),
            )),
        })
        .collect::<Result<_, _>>()?;

    let mut normalized = Map::new();
    normalized.insert("count".to_string(), json!(normalized_entries.len()));
    normalized.insert("klines".to_string(), Value::Array(normalized_entries));
    Ok(normalized)
}

/// Order status -> unified order with derived remaining quantity.
fn order(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let original_quantity = num_field(raw, "origQty")?;
    let filled_quantity = num_field(raw, "executedQty")?;

    let mut normalized = Map::new();
    normalized.insert("symbol".to_string(), json!(str_field(raw, "symbol")?));
    normalized.insert(
        "order_id".to_string(),
        json!(raw
            .get("orderId")
            .and_then(value_to_i64)
            .ok_or(NormalizeError::MissingField("orderId"))?),
    );
    normalized.insert("original_quantity".to_string(), json!(original_quantity));
    normalized.insert("filled_quantity".to_string(), json!(filled_quantity));
    normalized.insert(
        "remaining_quantity".to_string(),
        json!(original_quantity - filled_quantity),
    );

    if let Some(price) = opt_num_field(raw, "price")? {
        normalized.insert("price".to_string(), json!(price));
    }
    // Average price only means something once set and non-zero.
    if let Some(average_price) = opt_num_field(raw, "avgPrice")? {
        if average_price != 0.0 {
            normalized.insert("average_price".to_string(), json!(average_price));
        }
    }
    for (source, target) in [("status", "status"), ("side", "side"), ("type", "order_type")] {
        if let Some(value) = raw.get(source).and_then(Value::as_str) {
            normalized.insert(target.to_string(), json!(value));
        }
    }
    if let Some(time) = raw.get("time").and_then(value_to_i64) {
        normalized.insert("timestamp".to_string(), json!(time));
    }

    Ok(normalized)
}

/// Account snapshot -> non-zero balances with derived totals.
fn account(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let balances = raw
        .get("balances")
        .and_then(Value::as_array)
        .ok_or(NormalizeError::MissingField("balances"))?;

    let mut normalized_balances = Vec::new();
    for balance in balances {
        let free = num_field(balance, "free")?;
        let locked = num_field(balance, "locked")?;
        let total = free + locked;
        if total == 0.0 {
            continue;
        }
        normalized_balances.push(json!({
            "asset": str_field(balance, "asset")?,
            "free": free,
            "locked": locked,
            "total": total,
        }));
    }

    let mut normalized = Map::new();
    normalized.insert("count".to_string(), json!(normalized_balances.len()));
    normalized.insert("balances".to_string(), Value::Array(normalized_balances));
    Ok(normalized)
}

fn trade_record(
    raw: &Value,
    side: &'static str,
) -> Result<Map<String, Value>, NormalizeError> {
    let mut normalized = Map::new();
    normalized.insert("side".to_string(), json!(side));
    normalized.insert("price".to_string(), json!(num_field(raw, "price")?));
    normalized.insert("quantity".to_string(), json!(num_field(raw, "qty")?));

    if let Some(id) = raw.get("id").and_then(value_to_i64) {
        normalized.insert("trade_id".to_string(), json!(id));
    }
    if let Some(order_id) = raw.get("orderId").and_then(value_to_i64) {
        normalized.insert("order_id".to_string(), json!(order_id));
    }
    if let Some(symbol) = raw.get("symbol").and_then(Value::as_str) {
        normalized.insert("symbol".to_string(), json!(symbol));
    }
    if let Some(quote_quantity) = opt_num_field(raw, "quoteQty")? {
        normalized.insert("quote_quantity".to_string(), json!(quote_quantity));
    }
    if let Some(commission) = opt_num_field(raw, "commission")? {
        normalized.insert("commission".to_string(), json!(commission));
    }
    if let Some(asset) = raw.get("commissionAsset").and_then(Value::as_str) {
        normalized.insert("commission_asset".to_string(), json!(asset));
    }
    if let Some(time) = raw.get("time").and_then(value_to_i64) {
        normalized.insert("timestamp".to_string(), json!(time));
    }

    Ok(normalized)
}

/// My-trade record: `isBuyer: true` means we bought.
fn trade(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let is_buyer = raw
        .get("isBuyer")
        .and_then(Value::as_bool)
        .ok_or(NormalizeError::MissingField("isBuyer"))?;
    let side = if is_buyer { "BUY" } else { "SELL" };
    trade_record(raw, side)
}

/// Public trade tape, one record or a list.
///
/// `isBuyerMaker: true` means the resting order was the buyer, so the
/// aggressor sold: the derived side is the inverse of the my-trade
/// convention. Intentional; the two flags mean different things.
fn recent_trades(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let records: Vec<&Value> = match raw.as_array() {
        Some(list) => list.iter().collect(),
        None => vec![raw],
    };

    let mut normalized_trades = Vec::new();
    for record in records {
        let is_buyer_maker = record
            .get("isBuyerMaker")
            .and_then(Value::as_bool)
            .ok_or(NormalizeError::MissingField("isBuyerMaker"))?;
        let side = if is_buyer_maker { "SELL" } else { "BUY" };
        normalized_trades.push(Value::Object(trade_record(record, side)?));
    }

    let mut normalized = Map::new();
    normalized.insert("count".to_string(), json!(normalized_trades.len()));
    normalized.insert("trades".to_string(), Value::Array(normalized_trades));
    Ok(normalized)
}

/// Symbol metadata with the price and lot-size filters flattened out.
/// All other filter types are ignored.
fn exchange_info(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut normalized = Map::new();
    normalized.insert("symbol".to_string(), json!(str_field(raw, "symbol")?));
    for (source, target) in [
        ("status", "status"),
        ("baseAsset", "base_asset"),
        ("quoteAsset", "quote_asset"),
    ] {
        if let Some(value) = raw.get(source).and_then(Value::as_str) {
            normalized.insert(target.to_string(), json!(value));
        }
    }

    let filters = raw.get("filters").and_then(Value::as_array);
    for filter in filters.into_iter().flatten() {
        match filter.get("filterType").and_then(Value::as_str) {
            Some("PRICE_FILTER") => {
                normalized.insert("min_price".to_string(), json!(num_field(filter, "minPrice")?));
                normalized.insert("max_price".to_string(), json!(num_field(filter, "maxPrice")?));
                normalized.insert(
                    "price_tick_size".to_string(),
                    json!(num_field(filter, "tickSize")?),
                );
            }
            Some("LOT_SIZE") => {
                normalized.insert(
                    "min_quantity".to_string(),
                    json!(num_field(filter, "minQty")?),
                );
                normalized.insert(
                    "max_quantity".to_string(),
                    json!(num_field(filter, "maxQty")?),
                );
                normalized.insert(
                    "quantity_step_size".to_string(),
                    json!(num_field(filter, "stepSize")?),
                );
            }
            _ => {}
        }
    }

    Ok(normalized)
}

/// Pass-through for analytics payloads that are already unified-shaped.
/// Non-object payloads are carried under a `data` key so routing metadata
/// still has somewhere to live.
fn passthrough(raw: &Value) -> Map<String, Value> {
    match raw.as_object() {
        Some(map) => map.clone(),
        None => {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), raw.clone());
            wrapped
        }
    }
}

fn orderbook_health(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut normalized = passthrough(raw);
    let health_score = opt_num_field(raw, "health_score")?.unwrap_or(0.5);
    let spread_bps = opt_num_field(raw, "spread_bps")?.unwrap_or(0.0);
    normalized.insert("health_score".to_string(), json!(health_score));
    normalized.insert("spread_bps".to_string(), json!(spread_bps));
    Ok(normalized)
}

fn volume_profile(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    Ok(passthrough(raw))
}

fn market_anomalies(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    Ok(passthrough(raw))
}

fn microstructure_health(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut normalized = passthrough(raw);
    let health_score = opt_num_field(raw, "health_score")?.unwrap_or(0.5);
    normalized.insert("health_score".to_string(), json!(health_score));
    Ok(normalized)
}
