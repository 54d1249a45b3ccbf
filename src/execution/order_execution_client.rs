use std::sync::Arc;

use log::{debug, info};
use reqwest::Method;
use serde::Deserialize;

use crate::error::ExchangeError;
use crate::types::{AccountSnapshot, OrderResult, Side, TimeInForce};
use crate::utils::connection_util::RestConnection;
use crate::utils::message_util::{build_limit_order_params, build_market_order_params};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub can_trade: bool,
    pub total_wallet_balance: String,
    pub available_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub client_order_id: String,
    pub status: String,
}

impl From<OrderResponse> for OrderResult {
    fn from(r: OrderResponse) -> Self {
        OrderResult {
            order_id: r.order_id,
            client_order_id: r.client_order_id,
            status: r.status,
        }
    }
}

/// Signed account and order-entry endpoints.
pub struct OrderExecutionClient {
    connection: Arc<RestConnection>,
}

impl OrderExecutionClient {
    pub fn new(connection: Arc<RestConnection>) -> Self {
        Self { connection }
    }

    /// Verifies the key by reading the futures account.
    pub async fn authenticate(&self) -> Result<AccountSnapshot, ExchangeError> {
        let account: AccountResponse = self
            .connection
            .send_signed(Method::GET, "/fapi/v2/account", &[])
            .await?;
        debug!("Account: canTrade = {}", account.can_trade);

        Ok(AccountSnapshot {
            can_trade: account.can_trade,
            total_wallet_balance: account.total_wallet_balance,
            available_balance: account.available_balance,
        })
    }

    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
    ) -> Result<OrderResult, ExchangeError> {
        let params = build_market_order_params(symbol, side, quantity);
        let response: OrderResponse = self
            .connection
            .send_signed(Method::POST, "/fapi/v1/order", &params)
            .await?;
        debug!("Market order ack: {:?}", response);
        info!("{} MARKET order placed: Qty {} | OrderID = {}", side, quantity, response.order_id);
        Ok(response.into())
    }

    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
        time_in_force: TimeInForce,
    ) -> Result<OrderResult, ExchangeError> {
        let params = build_limit_order_params(symbol, side, price, quantity, time_in_force);
        let response: OrderResponse = self
            .connection
            .send_signed(Method::POST, "/fapi/v1/order", &params)
            .await?;
        debug!("Limit order ack: {:?}", response);
        info!(
            "{} LIMIT order at {} for {} | OrderID = {}",
            side, price, quantity, response.order_id
        );
        Ok(response.into())
    }
}
