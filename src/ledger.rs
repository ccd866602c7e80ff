use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One row of a token's accounting history. A new entry is appended for
/// every trade leg touching the token; entries are never mutated after
/// the append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    /// Block time of the trade producing this entry; `None` for the
    /// seed entry
    pub timestamp: Option<DateTime<Utc>>,

    /// Token quantity held after this entry (never negative)
    pub token_balance: Decimal,

    /// Weighted-average cost per unit of the held balance; `None` iff
    /// the balance is (and has always been) zero up to this point
    pub avg_cost: Option<Decimal>,

    /// Quantity bought this trade (zero on sell-leg and seed entries)
    pub bought_amount: Decimal,

    /// Quantity the trade claims was sold this trade
    pub sold_amount: Decimal,

    /// Portion of `sold_amount` actually backed by recorded holdings
    pub sold_amount_adjusted: Decimal,

    /// Realized USD price per unit sold; `None` on buy-leg and seed
    /// entries
    pub sale_price: Option<Decimal>,

    /// Realized profit for this sell leg; `None` on buy-leg and seed
    /// entries
    pub gain: Option<Decimal>,

    /// Cost basis consumed by this sell leg; `None` on buy-leg and seed
    /// entries
    pub investment: Option<Decimal>,
}

impl LedgerEntry {
    /// The zero/unset entry every ledger starts from.
    fn seed() -> Self {
        Self {
            timestamp: None,
            token_balance: Decimal::ZERO,
            avg_cost: None,
            bought_amount: Decimal::ZERO,
            sold_amount: Decimal::ZERO,
            sold_amount_adjusted: Decimal::ZERO,
            sale_price: None,
            gain: None,
            investment: None,
        }
    }
}

/// Running balance and weighted-average cost history for one token.
/// Only the latest entry is consulted when the next trade leg arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    token_id: String,
    entries: Vec<LedgerEntry>,
}

impl TokenLedger {
    /// Create a ledger seeded with an initial zero-balance, unset-average
    /// entry.
    pub fn new(token_id: String) -> Self {
        debug!("Opening ledger for token {}", token_id);
        Self {
            token_id,
            entries: vec![LedgerEntry::seed()],
        }
    }

    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Full entry history, seed entry first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// The latest entry. The seed entry guarantees there always is one.
    pub fn latest(&self) -> &LedgerEntry {
        self.entries.last().expect("ledger is seeded at creation")
    }

    /// Apply a sell leg. `sell_amount` must be positive (validated by the
    /// engine before any ledger is touched). A sale is clamped to the
    /// recorded balance: the wallet cannot realize a sale of tokens it is
    /// not known to hold, so the excess carries no cost basis and no gain.
    pub fn apply_sell(
        &mut self,
        timestamp: DateTime<Utc>,
        sell_amount: Decimal,
        usd_value: Decimal,
    ) -> &LedgerEntry {
        let prior = self.latest();
        let prior_balance = prior.token_balance;

        let sold_amount_adjusted = sell_amount.min(prior_balance);
        if sold_amount_adjusted < sell_amount {
            warn!(
                "Token {}: sell of {} exceeds recorded balance {}, clamping {} units to zero effect",
                self.token_id,
                sell_amount,
                prior_balance,
                sell_amount - sold_amount_adjusted
            );
        }

        let sale_price = usd_value / sell_amount;

        // Selling from an empty position resets cost-basis context; a sell
        // backed by holdings never changes the average cost of what remains.
        let avg_cost = if prior_balance == Decimal::ZERO {
            None
        } else {
            prior.avg_cost
        };

        let investment = match avg_cost {
            Some(avg) => sold_amount_adjusted * avg,
            None => Decimal::ZERO,
        };
        let gain = sold_amount_adjusted * sale_price - investment;
        let token_balance = prior_balance - sold_amount_adjusted;

        debug!(
            "Token {}: sold {} (adjusted {}) @ {} => gain {}, investment {}, balance {}",
            self.token_id, sell_amount, sold_amount_adjusted, sale_price, gain, investment, token_balance
        );

        self.entries.push(LedgerEntry {
            timestamp: Some(timestamp),
            token_balance,
            avg_cost,
            bought_amount: Decimal::ZERO,
            sold_amount: sell_amount,
            sold_amount_adjusted,
            sale_price: Some(sale_price),
            gain: Some(gain),
            investment: Some(investment),
        });
        self.latest()
    }

    /// Apply a buy leg. `buy_amount` must be positive (validated by the
    /// engine). Blends the purchase into the weighted-average cost of the
    /// position.
    pub fn apply_buy(
        &mut self,
        timestamp: DateTime<Utc>,
        buy_amount: Decimal,
        usd_value: Decimal,
    ) -> &LedgerEntry {
        let prior = self.latest();
        let prior_balance = prior.token_balance;

        let buy_price = usd_value / buy_amount;
        let token_balance = prior_balance + buy_amount;

        let avg_cost = match prior.avg_cost {
            Some(prior_avg) => {
                (buy_amount * buy_price + prior_balance * prior_avg) / token_balance
            }
            None => buy_price,
        };

        debug!(
            "Token {}: bought {} @ {} => avg cost {}, balance {}",
            self.token_id, buy_amount, buy_price, avg_cost, token_balance
        );

        self.entries.push(LedgerEntry {
            timestamp: Some(timestamp),
            token_balance,
            avg_cost: Some(avg_cost),
            bought_amount: buy_amount,
            sold_amount: Decimal::ZERO,
            sold_amount_adjusted: Decimal::ZERO,
            sale_price: None,
            gain: None,
            investment: None,
        });
        self.latest()
    }
}
