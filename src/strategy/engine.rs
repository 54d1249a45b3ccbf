use std::fmt;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::BotError;
use crate::exchange::Exchange;
use crate::strategy::ladder::Ladder;
use crate::types::{LadderState, OrderResult, Side, StrategyConfig, TimeInForce};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

/// Result of one fired trigger. Only `Placed` advances the ladder.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Placed {
        side: Side,
        step: u32,
        price: f64,
        investment: f64,
        quantity: f64,
        order: OrderResult,
    },
    Rejected {
        side: Side,
        step: u32,
        reason: String,
    },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Placed {
                side,
                step,
                price,
                investment,
                quantity,
                order,
            } => write!(
                f,
                "{} step {} placed: {} @ {} ({:.2} USDT) | OrderID = {}",
                side, step, quantity, price, investment, order.order_id
            ),
            StepOutcome::Rejected { side, step, reason } => {
                write!(f, "{} step {} rejected: {}", side, step, reason)
            }
        }
    }
}

/// Runs both sides of the ladder against one polled price, buy first.
pub async fn evaluate<E: Exchange + ?Sized>(
    exchange: &E,
    symbol: &str,
    ladder: &Ladder,
    state: &mut LadderState,
    current_price: f64,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(2);
    for side in [Side::Buy, Side::Sell] {
        if let Some(outcome) = evaluate_side(exchange, symbol, ladder, state, side, current_price).await {
            outcomes.push(outcome);
        }
    }
    outcomes
}

async fn evaluate_side<E: Exchange + ?Sized>(
    exchange: &E,
    symbol: &str,
    ladder: &Ladder,
    state: &mut LadderState,
    side: Side,
    current_price: f64,
) -> Option<StepOutcome> {
    let step = state.step_count(side);
    let reference = state.reference_price(side);

    if !ladder.is_triggered(side, current_price, reference, step) {
        return None;
    }
    if ladder.at_max_depth(step) {
        debug!("{} ladder at max depth ({} steps), trigger ignored", side, step);
        return None;
    }

    let investment = ladder.investment_for(step);
    let quantity = match ladder.calculate_quantity(investment, current_price) {
        Ok(q) => q,
        Err(e) => {
            warn!("{} Step {} skipped: {}", side, step, e);
            return Some(StepOutcome::Rejected {
                side,
                step,
                reason: e.to_string(),
            });
        }
    };

    let limit_price = ladder.round_price(current_price);
    match exchange
        .submit_limit_order(symbol, side, limit_price, quantity, TimeInForce::Gtc)
        .await
    {
        Ok(order) => {
            info!(
                "{} Step {}: {:.2} USDT at {} | ClOrdID = {} | Status = {}",
                side, step, investment, current_price, order.client_order_id, order.status
            );
            state.advance(side, current_price);
            Some(StepOutcome::Placed {
                side,
                step,
                price: limit_price,
                investment,
                quantity,
                order,
            })
        }
        Err(e) => {
            warn!("Failed to place {} LIMIT order, step {} kept: {}", side, step, e);
            Some(StepOutcome::Rejected {
                side,
                step,
                reason: e.to_string(),
            })
        }
    }
}

pub struct LadderEngine<E> {
    exchange: E,
    symbol: String,
    ladder: Ladder,
    state: LadderState,
    timing: LoopTiming,
}

impl<E: Exchange> LadderEngine<E> {
    /// Authenticates, loads symbol rules and opens the hedged pair at market.
    /// Opening orders not yet sent when `shutdown` fires are skipped.
    pub async fn start(
        exchange: E,
        config: &StrategyConfig,
        timing: LoopTiming,
        shutdown: &CancellationToken,
    ) -> Result<Self, BotError> {
        let account = exchange.authenticate().await.map_err(BotError::Auth)?;
        if !account.can_trade {
            warn!("Futures account reports canTrade = false; orders will be rejected");
        }
        info!(
            "Authenticated | Wallet balance: {} | Available: {}",
            account.total_wallet_balance, account.available_balance
        );

        let meta = exchange
            .symbol_meta(&config.symbol)
            .await
            .map_err(BotError::SymbolMeta)?;
        info!(
            "Trading {} | Base investment: {} USDT | Factor: {} | Step: {} | Leverage: {}x",
            config.symbol, config.base_investment, config.progression_factor, config.step_size, config.leverage
        );
        let ladder = Ladder::new(config, meta);

        let opening_price = exchange
            .mark_price(&config.symbol)
            .await
            .map_err(BotError::OpeningPrice)?;
        let mut state = LadderState::starting_at(opening_price);

        for side in [Side::Buy, Side::Sell] {
            if shutdown.is_cancelled() {
                warn!("Stop requested, opening {} order not sent", side);
                continue;
            }
            let opened = open_side(&exchange, &config.symbol, &ladder, side, opening_price).await;
            if opened {
                state.advance(side, opening_price);
            }
        }
        info!(
            "Initial orders done at {} | Buy step: {} | Sell step: {}",
            opening_price, state.buy_step_count, state.sell_step_count
        );

        Ok(Self {
            exchange,
            symbol: config.symbol.clone(),
            ladder,
            state,
            timing,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &LadderState {
        &self.state
    }

    #[cfg(test)]
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// One poll-decide-act cycle.
    pub async fn poll_once(&mut self) -> Result<Vec<StepOutcome>, BotError> {
        let current_price = self
            .exchange
            .mark_price(&self.symbol)
            .await
            .map_err(BotError::Poll)?;
        debug!("Polled {} = {}", self.symbol, current_price);

        Ok(evaluate(&self.exchange, &self.symbol, &self.ladder, &mut self.state, current_price).await)
    }

    /// Polls until `shutdown` fires. Per-iteration errors are logged and retried after the backoff.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            "Polling {} every {:?} (error backoff {:?})",
            self.symbol, self.timing.poll_interval, self.timing.error_backoff
        );

        while !shutdown.is_cancelled() {
            let pause = match self.poll_once().await {
                Ok(outcomes) => {
                    for outcome in &outcomes {
                        debug!("{}", outcome);
                    }
                    self.timing.poll_interval
                }
                Err(e) => {
                    error!("Error in loop: {}", e);
                    self.timing.error_backoff
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        warn!(
            "Bot manually stopped. Buy steps: {} | Sell steps: {}",
            self.state.buy_step_count, self.state.sell_step_count
        );
    }
}

/// Opening market order for one side. A failure leaves the side at step 0.
async fn open_side<E: Exchange + ?Sized>(
    exchange: &E,
    symbol: &str,
    ladder: &Ladder,
    side: Side,
    price: f64,
) -> bool {
    let quantity = match ladder.calculate_quantity(ladder.base_investment(), price) {
        Ok(q) => q,
        Err(e) => {
            warn!("Opening {} order skipped: {}", side, e);
            return false;
        }
    };
    match exchange.submit_market_order(symbol, side, quantity).await {
        Ok(order) => {
            info!("Opening {} MARKET order accepted | Qty {} | OrderID = {}", side, quantity, order.order_id);
            true
        }
        Err(e) => {
            warn!("Failed to place opening {} MARKET order: {}", side, e);
            false
        }
    }
}
