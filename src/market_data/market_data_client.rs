use std::sync::Arc;

use log::{debug, info};
use serde::Deserialize;

use crate::error::ExchangeError;
use crate::types::SymbolMeta;
use crate::utils::connection_util::RestConnection;
use crate::utils::message_util::decimal_places;

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub quantity_precision: u32,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    PriceFilter { tick_size: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    pub mark_price: String,
}

/// Public market data endpoints: exchange rules and mark price.
pub struct MarketDataClient {
    connection: Arc<RestConnection>,
}

impl MarketDataClient {
    pub fn new(connection: Arc<RestConnection>) -> Self {
        Self { connection }
    }

    pub async fn fetch_symbol_meta(&self, symbol: &str) -> Result<SymbolMeta, ExchangeError> {
        let info: ExchangeInfo = self
            .connection
            .get_public("/fapi/v1/exchangeInfo", &[])
            .await?;
        let meta = symbol_meta_from(&info, symbol)?;
        info!(
            "Symbol loaded: {} | Quantity precision = {} | Tick size = {}",
            symbol, meta.quantity_precision, meta.tick_size
        );
        Ok(meta)
    }

    pub async fn fetch_mark_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        let index: PremiumIndex = self
            .connection
            .get_public("/fapi/v1/premiumIndex", &[("symbol", symbol.to_string())])
            .await?;
        let price = parse_price(&index.mark_price)?;
        debug!("Mark price {} = {}", index.symbol, price);
        Ok(price)
    }
}

pub fn symbol_meta_from(info: &ExchangeInfo, symbol: &str) -> Result<SymbolMeta, ExchangeError> {
    let symbol_info = info
        .symbols
        .iter()
        .find(|s| s.symbol == symbol)
        .ok_or_else(|| ExchangeError::SymbolNotFound(symbol.to_string()))?;

    let tick = symbol_info
        .filters
        .iter()
        .find_map(|f| match f {
            SymbolFilter::PriceFilter { tick_size } => Some(tick_size.as_str()),
            SymbolFilter::Other => None,
        })
        .ok_or_else(|| ExchangeError::MissingPriceFilter(symbol.to_string()))?;

    let tick_size = parse_price(tick)?;

    Ok(SymbolMeta {
        quantity_precision: symbol_info.quantity_precision,
        tick_size,
        price_precision: decimal_places(tick),
    })
}

fn parse_price(raw: &str) -> Result<f64, ExchangeError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ExchangeError::Decode(format!("invalid price {:?}", raw))),
    }
}
