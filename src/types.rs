use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    /// Good till cancelled
    Gtc,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// Exchange rules for the traded symbol, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMeta {
    pub quantity_precision: u32,
    pub tick_size: f64,
    /// Decimal places of `tick_size`, used to strip float noise after snapping.
    pub price_precision: u32,
}

/// Immutable strategy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub symbol: String,
    pub base_investment: f64,
    pub progression_factor: f64,
    pub step_size: f64,
    pub leverage: u32,
    pub max_steps: Option<u32>,
    pub max_investment: Option<f64>,
}

/// Per-side step counters and reference prices.
///
/// Counters only move forward through [`LadderState::advance`], which the
/// engine calls once an order has been confirmed by the exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LadderState {
    pub buy_step_count: u32,
    pub sell_step_count: u32,
    pub last_buy_price: f64,
    pub last_sell_price: f64,
}

impl LadderState {
    pub fn starting_at(price: f64) -> Self {
        Self {
            buy_step_count: 0,
            sell_step_count: 0,
            last_buy_price: price,
            last_sell_price: price,
        }
    }

    pub fn step_count(&self, side: Side) -> u32 {
        match side {
            Side::Buy => self.buy_step_count,
            Side::Sell => self.sell_step_count,
        }
    }

    pub fn reference_price(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.last_buy_price,
            Side::Sell => self.last_sell_price,
        }
    }

    pub fn advance(&mut self, side: Side, fill_price: f64) {
        match side {
            Side::Buy => {
                self.last_buy_price = fill_price;
                self.buy_step_count += 1;
            }
            Side::Sell => {
                self.last_sell_price = fill_price;
                self.sell_step_count += 1;
            }
        }
    }
}

/// Acknowledgement returned by the exchange for a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub order_id: i64,
    pub client_order_id: String,
    pub status: String,
}

/// Account summary returned by the authentication check.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub can_trade: bool,
    pub total_wallet_balance: String,
    pub available_balance: String,
}
