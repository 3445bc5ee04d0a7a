use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::PortfolioError;

use super::{CoinRegistry, Portfolio, Transaction};

/* Title-cased exchange name, as used in snapshot file names (`BinanceBalance.json`) */
pub fn exchange_title(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/* Transactions read from one exchange */
#[derive(Debug, Clone)]
pub struct CryptoExchange {
    name: String,
    transactions: Vec<Arc<Transaction>>,
}

impl CryptoExchange {
    pub fn new(name: &str, transactions: Vec<Transaction>) -> Result<Self, PortfolioError> {
        if transactions.is_empty() {
            return Err(PortfolioError::EmptyExchange(name.to_string()));
        }
        Ok(CryptoExchange {
            name: name.to_string(),
            transactions: transactions.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> String {
        exchange_title(&self.name)
    }

    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    pub fn transactions_count(&self) -> usize {
        self.transactions.len()
    }

    /* Earliest transaction; the first one read wins a tie */
    pub fn first_transaction(&self) -> Option<&Transaction> {
        self.transactions
            .iter()
            .reduce(|first, t| if t.date < first.date { t } else { first })
            .map(|t| t.as_ref())
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.transactions
            .iter()
            .reduce(|last, t| if t.date > last.date { t } else { last })
            .map(|t| t.as_ref())
    }

    /* Transactions in [since, until] */
    pub fn transactions_between(&self, since: &DateTime<Utc>, until: &DateTime<Utc>) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.date >= *since && t.date <= *until)
            .map(|t| t.as_ref())
            .collect()
    }

    /* Transactions touching the coin known as `symbol` (aliases included) */
    pub fn transactions_with(&self, symbol: &str, registry: &CoinRegistry) -> Vec<&Transaction> {
        let coin = registry.resolve(symbol);
        self.transactions
            .iter()
            .filter(|t| t.involves(&coin))
            .map(|t| t.as_ref())
            .collect()
    }

    /* One wallet per coin traded, sharing this exchange's transactions */
    pub fn build_wallets(&self, registry: &CoinRegistry) -> Portfolio {
        Portfolio::from_transactions(self.transactions.iter().cloned(), registry, Some(&self.name))
    }
}
