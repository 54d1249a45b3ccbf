//! Ladder arithmetic: rounding, trigger prices and geometric sizing.
//!
//! All rounding goes through `f64::round`, which breaks exact ties away from
//! zero. Decimal ties such as `1999.995` are usually not exact in binary, so
//! they land on whichever side the stored value falls: `1999.995` snaps to
//! `1999.99` while `2000.005` snaps to `2000.01`. Prices are snapped to the
//! tick grid and then re-rounded to the tick's decimal places so that values
//! such as `1999.0000000000002` never reach the exchange.

use crate::error::StrategyError;
use crate::types::{Side, StrategyConfig, SymbolMeta};

/// `base * factor^step`. Unbounded in `step`.
pub fn next_investment(base: f64, progression_factor: f64, step_count: u32) -> f64 {
    base * progression_factor.powi(step_count as i32)
}

fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Odd multiple of the step size used for the `step_count`-th trigger: 1, 3, 5, ...
fn ladder_offset(step_size: f64, step_count: u32) -> f64 {
    step_size * (2.0 * step_count as f64 - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    base_investment: f64,
    progression_factor: f64,
    step_size: f64,
    max_steps: Option<u32>,
    max_investment: Option<f64>,
    meta: SymbolMeta,
}

impl Ladder {
    pub fn new(config: &StrategyConfig, meta: SymbolMeta) -> Self {
        Self {
            base_investment: config.base_investment,
            progression_factor: config.progression_factor,
            step_size: config.step_size,
            max_steps: config.max_steps,
            max_investment: config.max_investment,
            meta,
        }
    }

    pub fn base_investment(&self) -> f64 {
        self.base_investment
    }

    pub fn round_price(&self, price: f64) -> f64 {
        let tick = self.meta.tick_size;
        let snapped = (price / tick).round() * tick;
        round_to_decimals(snapped, self.meta.price_precision)
    }

    pub fn round_quantity(&self, quantity: f64) -> f64 {
        round_to_decimals(quantity, self.meta.quantity_precision)
    }

    pub fn calculate_quantity(&self, notional: f64, price: f64) -> Result<f64, StrategyError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(StrategyError::InvalidPrice(price));
        }
        let quantity = self.round_quantity(notional / price);
        if quantity <= 0.0 {
            return Err(StrategyError::ZeroQuantity { notional, price });
        }
        Ok(quantity)
    }

    /// Notional for the given step, clamped by `max_investment` when configured.
    pub fn investment_for(&self, step_count: u32) -> f64 {
        let raw = next_investment(self.base_investment, self.progression_factor, step_count);
        match self.max_investment {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }

    pub fn next_buy_price(&self, last_price: f64, step_count: u32) -> f64 {
        self.round_price(last_price - ladder_offset(self.step_size, step_count))
    }

    pub fn next_sell_price(&self, last_price: f64, step_count: u32) -> f64 {
        self.round_price(last_price + ladder_offset(self.step_size, step_count))
    }

    pub fn trigger_price(&self, side: Side, last_price: f64, step_count: u32) -> f64 {
        match side {
            Side::Buy => self.next_buy_price(last_price, step_count),
            Side::Sell => self.next_sell_price(last_price, step_count),
        }
    }

    pub fn is_triggered(&self, side: Side, current_price: f64, last_price: f64, step_count: u32) -> bool {
        let trigger = self.trigger_price(side, last_price, step_count);
        match side {
            Side::Buy => current_price <= trigger,
            Side::Sell => current_price >= trigger,
        }
    }

    pub fn at_max_depth(&self, step_count: u32) -> bool {
        self.max_steps.is_some_and(|max| step_count >= max)
    }
}
