use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::ledger::TokenLedger;
use crate::{PnLError, Result, Trade, TradeLeg};

/// Realized PnL for the wallet's full trade history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletPnLReport {
    /// Wallet address analyzed
    pub wallet_address: String,

    /// `total_gain / total_investment`, or `None` when no cost basis was
    /// ever realized (nothing to measure return against)
    pub wallet_pnl: Option<Decimal>,

    /// Realized gain summed over every sell leg of every token
    pub total_gain_usd: Decimal,

    /// Cost basis consumed, summed over every sell leg of every token
    pub total_investment_usd: Decimal,

    /// Per-token realized totals, sorted by token id
    pub token_breakdown: Vec<TokenPnLSummary>,

    /// Number of trades folded into this report
    pub trades_processed: u32,

    /// Number of distinct tokens touched by either trade leg
    pub tokens_seen: u32,

    /// When this report was generated
    pub generated_at: DateTime<Utc>,
}

/// Realized totals for a single token across the whole history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPnLSummary {
    /// Token identifier
    pub token_id: String,

    /// Realized gain across all of this token's sell legs
    pub realized_gain_usd: Decimal,

    /// Cost basis consumed across all of this token's sell legs
    pub realized_investment_usd: Decimal,

    /// Total quantity bought
    pub total_bought: Decimal,

    /// Total quantity sold after clamping to recorded holdings
    pub total_sold_adjusted: Decimal,

    /// Number of buy legs touching this token
    pub buy_count: u32,

    /// Number of sell legs touching this token
    pub sell_count: u32,

    /// Balance held after the last trade
    pub ending_balance: Decimal,

    /// Weighted-average cost of the ending balance, if any was ever held
    pub ending_avg_cost: Option<Decimal>,
}

/// Weighted-average-cost PnL engine: folds an ordered trade history into
/// per-token ledgers and aggregates realized gain and investment into a
/// single portfolio return ratio.
pub struct PnLEngine {
    wallet_address: String,
}

impl PnLEngine {
    /// Create an engine for a specific wallet.
    pub fn new(wallet_address: String) -> Self {
        Self { wallet_address }
    }

    /// Calculate the wallet's realized PnL from its ordered trade history.
    pub fn calculate_wallet_pnl(&self, trades: &[Trade]) -> Result<WalletPnLReport> {
        let (report, _ledgers) = self.calculate_wallet_pnl_with_ledgers(trades)?;
        Ok(report)
    }

    /// Same as [`calculate_wallet_pnl`](Self::calculate_wallet_pnl), but
    /// also returns the full per-token ledgers so every per-trade gain and
    /// investment figure stays individually inspectable.
    pub fn calculate_wallet_pnl_with_ledgers(
        &self,
        trades: &[Trade],
    ) -> Result<(WalletPnLReport, HashMap<String, TokenLedger>)> {
        info!(
            "Starting realized PnL calculation for wallet {} with {} trades",
            self.wallet_address,
            trades.len()
        );

        let mut ledgers: HashMap<String, TokenLedger> = HashMap::new();

        for (trade_index, trade) in trades.iter().enumerate() {
            Self::validate_trade(trade_index, trade)?;

            debug!(
                "Trade {}: sell {} {} / buy {} {} for ${}",
                trade_index,
                trade.sell_amount,
                trade.sell_token_id,
                trade.buy_amount,
                trade.buy_token_id,
                trade.usd_value
            );

            // Sell leg first, then buy leg. The two legs always name
            // distinct tokens, so each leg sees the latest state of its
            // own ledger.
            ledgers
                .entry(trade.sell_token_id.clone())
                .or_insert_with(|| TokenLedger::new(trade.sell_token_id.clone()))
                .apply_sell(trade.timestamp, trade.sell_amount, trade.usd_value);

            ledgers
                .entry(trade.buy_token_id.clone())
                .or_insert_with(|| TokenLedger::new(trade.buy_token_id.clone()))
                .apply_buy(trade.timestamp, trade.buy_amount, trade.usd_value);
        }

        let mut token_breakdown: Vec<TokenPnLSummary> =
            ledgers.values().map(Self::summarize_ledger).collect();
        token_breakdown.sort_by(|a, b| a.token_id.cmp(&b.token_id));

        let total_gain_usd: Decimal = token_breakdown.iter().map(|t| t.realized_gain_usd).sum();
        let total_investment_usd: Decimal = token_breakdown
            .iter()
            .map(|t| t.realized_investment_usd)
            .sum();

        let wallet_pnl = if total_investment_usd > Decimal::ZERO {
            Some(total_gain_usd / total_investment_usd)
        } else {
            None
        };

        let report = WalletPnLReport {
            wallet_address: self.wallet_address.clone(),
            wallet_pnl,
            total_gain_usd,
            total_investment_usd,
            token_breakdown,
            trades_processed: trades.len() as u32,
            tokens_seen: ledgers.len() as u32,
            generated_at: Utc::now(),
        };

        match report.wallet_pnl {
            Some(pnl) => info!(
                "PnL calculation completed for wallet {}: gain ${}, investment ${}, pnl {}",
                self.wallet_address, report.total_gain_usd, report.total_investment_usd, pnl
            ),
            None => info!(
                "PnL calculation completed for wallet {}: no realized investment, pnl undefined",
                self.wallet_address
            ),
        }

        Ok((report, ledgers))
    }

    /// A zero-amount leg makes the unit price undefined; that is malformed
    /// input, not a trading edge case, and aborts the whole computation
    /// before any ledger for this trade is touched.
    fn validate_trade(trade_index: usize, trade: &Trade) -> Result<()> {
        if trade.sell_amount <= Decimal::ZERO {
            return Err(PnLError::ZeroAmountLeg {
                trade_index,
                leg: TradeLeg::Sell,
                token_id: trade.sell_token_id.clone(),
                amount: trade.sell_amount,
            });
        }
        if trade.buy_amount <= Decimal::ZERO {
            return Err(PnLError::ZeroAmountLeg {
                trade_index,
                leg: TradeLeg::Buy,
                token_id: trade.buy_token_id.clone(),
                amount: trade.buy_amount,
            });
        }
        Ok(())
    }

    /// Sum realized gain and investment over a ledger's entries, treating
    /// buy-leg and seed entries (unset fields) as zero.
    fn summarize_ledger(ledger: &TokenLedger) -> TokenPnLSummary {
        let mut realized_gain_usd = Decimal::ZERO;
        let mut realized_investment_usd = Decimal::ZERO;
        let mut total_bought = Decimal::ZERO;
        let mut total_sold_adjusted = Decimal::ZERO;
        let mut buy_count = 0u32;
        let mut sell_count = 0u32;

        for entry in ledger.entries() {
            realized_gain_usd += entry.gain.unwrap_or(Decimal::ZERO);
            realized_investment_usd += entry.investment.unwrap_or(Decimal::ZERO);
            total_bought += entry.bought_amount;
            total_sold_adjusted += entry.sold_amount_adjusted;
            if entry.bought_amount > Decimal::ZERO {
                buy_count += 1;
            }
            if entry.sale_price.is_some() {
                sell_count += 1;
            }
        }

        let latest = ledger.latest();

        TokenPnLSummary {
            token_id: ledger.token_id().to_string(),
            realized_gain_usd,
            realized_investment_usd,
            total_bought,
            total_sold_adjusted,
            buy_count,
            sell_count,
            ending_balance: latest.token_balance,
            ending_avg_cost: latest.avg_cost,
        }
    }
}
