use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;

use crate::{
    api::PriceFetcher,
    utils::{nan_sum, relative_delta, relative_percentage, share_percentage},
};

use super::{Coin, CoinRegistry, PriceTables, Snapshot, Transaction, Wallet};

/* One line of the current balance: how much of a coin is held and what it is worth now */
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceEntry {
    pub symbol: String,
    pub balance: Decimal,
    pub fiat_value: f64, // NaN when no live price is known
    pub price: f64,
    pub percentage: f64,
}

/* Current balance plus the comparison with the previous report, if any */
#[derive(Debug, Clone)]
pub struct BalanceReport {
    pub entries: Vec<BalanceEntry>,
    pub total: f64,
    pub last_total: Option<f64>,
    pub last_time: Option<DateTime<Utc>>,
    pub delta: Option<f64>,
    pub pct_delta: Option<f64>,
}

/* Value of the portfolio over time, split between crypto and fiat wallets */
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoFiatSeries {
    pub dates: Vec<DateTime<Utc>>,
    pub crypto: Vec<f64>,
    pub fiat: Vec<f64>,
}

impl CryptoFiatSeries {
    pub fn net(&self) -> Vec<f64> {
        self.crypto
            .iter()
            .zip(self.fiat.iter())
            .map(|(crypto, fiat)| crypto + fiat)
            .collect()
    }
}

/* Wallets held by one user (one exchange or all of them), keyed by canonical coin symbol */
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    name: Option<String>,
    wallets: HashMap<String, Wallet>,
}

impl Portfolio {
    pub fn new(wallets: Vec<Wallet>, name: Option<&str>) -> Self {
        let wallets = wallets
            .into_iter()
            .map(|w| (w.symbol().to_string(), w))
            .collect();
        Portfolio {
            name: name.map(|n| n.to_string()),
            wallets,
        }
    }

    /* Every transaction goes to the wallet of each coin it touches (failed ones included,
    wallets skip them when computing balances) */
    pub fn from_transactions<I>(transactions: I, registry: &CoinRegistry, name: Option<&str>) -> Self
    where
        I: IntoIterator<Item = Arc<Transaction>>,
    {
        let mut wallets: HashMap<String, Wallet> = HashMap::new();
        for transaction in transactions {
            for coin in transaction.coins() {
                wallets
                    .entry(coin.symbol.clone())
                    .or_insert_with(|| Wallet::new(coin.clone(), registry.is_crypto(coin)))
                    .add(Arc::clone(&transaction));
            }
        }
        Portfolio {
            name: name.map(|n| n.to_string()),
            wallets,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn wallet(&self, symbol: &str) -> Option<&Wallet> {
        self.wallets.get(symbol)
    }

    /* Wallets ordered by symbol */
    pub fn wallets(&self) -> Vec<&Wallet> {
        let mut wallets: Vec<&Wallet> = self.wallets.values().collect();
        wallets.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        return wallets;
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /* Sorted instants at which any wallet changed, without duplicates */
    pub fn transactions_dates(&self) -> Vec<DateTime<Utc>> {
        let mut dates: Vec<DateTime<Utc>> = self.wallets.values().flat_map(|w| w.dates()).collect();
        dates.sort();
        dates.dedup();
        return dates;
    }

    /* Coins held now with their live value in `fiat`. Empty or negative wallets are
    dropped before pricing, the prices of the others are asked for in one batch. Rows are
    sorted by value, unknown values last. */
    pub fn current_balance(&self, fiat: &str, fetcher: &dyn PriceFetcher) -> Vec<BalanceEntry> {
        let held: Vec<&Wallet> = self
            .wallets()
            .into_iter()
            .filter(|wallet| wallet.balance() > dec!(0))
            .collect();
        let coins: Vec<&Coin> = held.iter().map(|wallet| wallet.coin()).collect();
        let prices = fetcher.fetch_prices_now(&coins, fiat);

        let mut entries: Vec<BalanceEntry> = held
            .into_iter()
            .map(|wallet| BalanceEntry {
                symbol: wallet.symbol().to_string(),
                balance: wallet.balance(),
                fiat_value: wallet.value_at(prices.get(wallet.symbol()).copied()),
                price: 0.0,
                percentage: 0.0,
            })
            .collect();

        let total = nan_sum(entries.iter().map(|e| e.fiat_value));
        for entry in entries.iter_mut() {
            entry.price = match entry.balance.to_f64() {
                Some(balance) => entry.fiat_value / balance,
                None => f64::NAN,
            };
            entry.percentage = share_percentage(entry.fiat_value, total);
        }

        entries.sort_by(|a, b| compare_values_desc(a.fiat_value, b.fiat_value).then_with(|| a.symbol.cmp(&b.symbol)));
        return entries;
    }

    /* Value of crypto wallets and of fiat wallets at every transaction date */
    pub fn crypto_fiat_balance(&self, fiat: &str, tables: &PriceTables) -> CryptoFiatSeries {
        let dates = self.transactions_dates();
        let mut crypto = vec![0.0; dates.len()];
        let mut fiat_values = vec![0.0; dates.len()];

        for wallet in self.wallets() {
            let balances = wallet.balance_array_by_date(&dates, fiat, tables);
            let series = if wallet.is_crypto() { &mut crypto } else { &mut fiat_values };
            for (total, value) in series.iter_mut().zip(balances) {
                *total += value;
            }
        }
        CryptoFiatSeries {
            dates,
            crypto,
            fiat: fiat_values,
        }
    }

    pub fn crypto_net_balance(&self, fiat: &str, tables: &PriceTables) -> (Vec<DateTime<Utc>>, Vec<f64>) {
        let series = self.crypto_fiat_balance(fiat, tables);
        let net = series.net();
        return (series.dates, net);
    }

    pub fn balance_report(&self, fiat: &str, fetcher: &dyn PriceFetcher, last: Option<&Snapshot>) -> BalanceReport {
        let entries = self.current_balance(fiat, fetcher);
        let total = nan_sum(entries.iter().map(|e| e.fiat_value));
        let mut report = BalanceReport {
            entries,
            total,
            last_total: None,
            last_time: None,
            delta: None,
            pct_delta: None,
        };
        if let Some(last) = last {
            let last_total = last.total();
            report.last_total = Some(last_total);
            report.last_time = Some(last.datetime);
            report.delta = Some(relative_delta(Some(total), Some(last_total)));
            report.pct_delta = Some(relative_percentage(Some(total), Some(last_total)));
        }
        return report;
    }
}

/* Descending order with NaN after every number */
fn compare_values_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
