use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExchangeError;
use crate::execution::order_execution_client::OrderExecutionClient;
use crate::market_data::market_data_client::MarketDataClient;
use crate::types::{AccountSnapshot, OrderResult, Side, SymbolMeta, TimeInForce};
use crate::utils::connection_util::RestConnection;

/// Everything the ladder needs from a venue.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn authenticate(&self) -> Result<AccountSnapshot, ExchangeError>;

    async fn symbol_meta(&self, symbol: &str) -> Result<SymbolMeta, ExchangeError>;

    async fn mark_price(&self, symbol: &str) -> Result<f64, ExchangeError>;

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
    ) -> Result<OrderResult, ExchangeError>;

    async fn submit_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
        time_in_force: TimeInForce,
    ) -> Result<OrderResult, ExchangeError>;
}

/// Binance USDⓈ-M futures over REST.
pub struct BinanceFutures {
    market_data: MarketDataClient,
    execution: OrderExecutionClient,
}

impl BinanceFutures {
    pub fn new(connection: RestConnection) -> Self {
        let connection = Arc::new(connection);
        Self {
            market_data: MarketDataClient::new(Arc::clone(&connection)),
            execution: OrderExecutionClient::new(connection),
        }
    }
}

#[async_trait]
impl Exchange for BinanceFutures {
    async fn authenticate(&self) -> Result<AccountSnapshot, ExchangeError> {
        self.execution.authenticate().await
    }

    async fn symbol_meta(&self, symbol: &str) -> Result<SymbolMeta, ExchangeError> {
        self.market_data.fetch_symbol_meta(symbol).await
    }

    async fn mark_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        self.market_data.fetch_mark_price(symbol).await
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
    ) -> Result<OrderResult, ExchangeError> {
        self.execution.place_market_order(symbol, side, quantity).await
    }

    async fn submit_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
        time_in_force: TimeInForce,
    ) -> Result<OrderResult, ExchangeError> {
        self.execution
            .place_limit_order(symbol, side, price, quantity, time_in_force)
            .await
    }
}
