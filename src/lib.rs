pub mod engine;
pub mod ledger;


// Re-export the engine entry points and ledger types
pub use engine::{PnLEngine, TokenPnLSummary, WalletPnLReport};
pub use ledger::{LedgerEntry, TokenLedger};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PnLError {
    #[error("trade {trade_index}: {leg} leg for token {token_id} has non-positive amount {amount}, unit price is undefined")]
    ZeroAmountLeg {
        trade_index: usize,
        leg: TradeLeg,
        token_id: String,
        amount: Decimal,
    },
}

pub type Result<T> = std::result::Result<T, PnLError>;

/// One side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeLeg {
    Buy,
    Sell,
}

impl fmt::Display for TradeLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeLeg::Buy => write!(f, "buy"),
            TradeLeg::Sell => write!(f, "sell"),
        }
    }
}

/// A single swap performed by the wallet: one token bought, funded by
/// selling another, with a USD-equivalent value attached to the trade.
/// Trades are supplied already ordered chronologically; the engine never
/// re-sorts them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Token acquired by this trade
    pub buy_token_id: String,

    /// Token given up to fund this trade
    pub sell_token_id: String,

    /// Quantity of the bought token (must be > 0)
    pub buy_amount: Decimal,

    /// Quantity of the sold token (must be > 0)
    pub sell_amount: Decimal,

    /// USD value attributed to the trade; serves as both the buy-side
    /// cost and the sell-side proceeds
    pub usd_value: Decimal,

    /// Block time of the trade, carried for traceability
    pub timestamp: DateTime<Utc>,
}
