use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;

use crate::api::PriceFetcher;

use super::{Coin, PriceTables, Transaction};

/* Change (or running balance) of the wallet coin caused by one transaction */
#[derive(Debug, Clone)]
pub struct WalletDelta {
    pub transaction: Arc<Transaction>,
    pub value: Decimal,
}

/* Balance of the wallet at an externally chosen date */
#[derive(Debug, Clone, PartialEq)]
pub struct DatedBalance {
    pub date: DateTime<Utc>,
    pub value: Decimal,
}

/* A wallet is the ledger of one coin: every transaction touching the coin, ordered by date.
It only grows; balances and values are derived from the transactions on demand.

Transactions are shared between the wallets of their coins (a trade with a commission in a third
coin lives in three wallets). */
#[derive(Debug, Clone)]
pub struct Wallet {
    coin: Coin,
    is_crypto: bool,
    transactions: Vec<Arc<Transaction>>,
}

impl Wallet {
    pub fn new(coin: Coin, is_crypto: bool) -> Self {
        Wallet {
            coin,
            is_crypto,
            transactions: Vec::new(),
        }
    }

    pub fn coin(&self) -> &Coin {
        &self.coin
    }

    pub fn symbol(&self) -> &str {
        &self.coin.symbol
    }

    pub fn is_crypto(&self) -> bool {
        self.is_crypto
    }

    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    /* Appends keeping the ledger sorted; equal dates keep insertion (parse) order */
    pub fn add(&mut self, transaction: Arc<Transaction>) {
        let index = self
            .transactions
            .partition_point(|t| t.date <= transaction.date);
        self.transactions.insert(index, transaction);
    }

    pub fn dates(&self) -> Vec<DateTime<Utc>> {
        self.transactions.iter().map(|t| t.date).collect()
    }

    /* Non-zero changes of successful transactions */
    pub fn delta_by_transaction(&self) -> Vec<WalletDelta> {
        self.transactions
            .iter()
            .filter(|t| t.successful)
            .filter_map(|t| {
                let value = t.amount(&self.coin);
                (value != dec!(0)).then(|| WalletDelta {
                    transaction: Arc::clone(t),
                    value,
                })
            })
            .collect()
    }

    /* Running balance after each delta */
    pub fn balance_by_transaction(&self) -> Vec<WalletDelta> {
        let mut total = dec!(0);
        self.delta_by_transaction()
            .into_iter()
            .map(|delta| {
                total += delta.value;
                WalletDelta {
                    transaction: delta.transaction,
                    value: total,
                }
            })
            .collect()
    }

    /* Coin balance up to the last transaction */
    pub fn balance(&self) -> Decimal {
        self.balance_by_transaction()
            .last()
            .map(|b| b.value)
            .unwrap_or(dec!(0))
    }

    /* Balance converted to `currency` at the date of the last transaction */
    pub fn balance_in(&self, currency: &str, tables: &PriceTables) -> f64 {
        match self.balance_by_transaction().last() {
            Some(last) => self.convert_to(tables, &last.transaction.date, currency, last.value),
            None => 0.0,
        }
    }

    /* Balance converted to `currency` at the current live price. A price the fetcher
    cannot give is NaN, so totals can leave this wallet out. */
    pub fn balance_now(&self, currency: &str, fetcher: &dyn PriceFetcher) -> f64 {
        self.value_at(fetcher.fetch_price(&self.coin, currency))
    }

    /* Balance times `price`, NaN without a price */
    pub fn value_at(&self, price: Option<f64>) -> f64 {
        let total = self.balance().to_f64().unwrap_or(f64::NAN);
        match price {
            Some(price) => price * total,
            None => f64::NAN,
        }
    }

    /* Value of `amount` coins in `currency` at `date`. Without a price close enough to
    the date this is 0, so aggregates still add up. */
    pub fn convert_to(&self, tables: &PriceTables, date: &DateTime<Utc>, currency: &str, amount: Decimal) -> f64 {
        match tables.get_value_on(&self.coin, currency, date) {
            Some(price) => price * amount.to_f64().unwrap_or(0.0),
            None => {
                log::debug!("No {currency} price for {} on {date}", self.coin);
                0.0
            }
        }
    }

    pub fn price_on(&self, tables: &PriceTables, dates: &[DateTime<Utc>], currency: &str) -> Vec<f64> {
        dates
            .iter()
            .map(|date| self.convert_to(tables, date, currency, dec!(1)))
            .collect()
    }

    /* Step function of the running balance sampled at `dates`: 0 before the first
    transaction, then the balance of the last transaction at or before each date. */
    pub fn balance_by_date(&self, dates: &[DateTime<Utc>]) -> Vec<DatedBalance> {
        let balances = self.balance_by_transaction();
        dates
            .iter()
            .map(|date| {
                let index = balances.partition_point(|b| b.transaction.date <= *date);
                let value = match index {
                    0 => dec!(0),
                    i => balances[i - 1].value,
                };
                DatedBalance { date: *date, value }
            })
            .collect()
    }

    /* Same as balance_by_date, each point valued at the price of its query date */
    pub fn balance_by_date_in(&self, dates: &[DateTime<Utc>], currency: &str, tables: &PriceTables) -> Vec<f64> {
        self.balance_by_date(dates)
            .into_iter()
            .map(|b| self.convert_to(tables, &b.date, currency, b.value))
            .collect()
    }

    /* balance_by_date_in with unknown values counted as 0 */
    pub fn balance_array_by_date(&self, dates: &[DateTime<Utc>], currency: &str, tables: &PriceTables) -> Vec<f64> {
        self.balance_by_date_in(dates, currency, tables)
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use hashbrown::HashMap;

    use crate::structs::{CoinAmount, CoinPricesTable};

    use super::*;

    struct FixedPrice(Option<f64>);

    impl PriceFetcher for FixedPrice {
        fn fetch_price(&self, _coin: &Coin, _currency: &str) -> Option<f64> {
            self.0
        }
    }

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn btc(amount: Decimal) -> CoinAmount {
        CoinAmount::new(Coin::new("BTC"), amount)
    }

    fn wallet() -> Wallet {
        let mut wallet = Wallet::new(Coin::new("BTC"), true);
        // Added out of order on purpose
        wallet.add(Arc::new(Transaction::withdrawal(btc(dec!(0.3)), hour(10)).unwrap()));
        wallet.add(Arc::new(Transaction::deposit(btc(dec!(1)), hour(0)).unwrap()));
        wallet.add(Arc::new(
            Transaction::deposit(btc(dec!(5)), hour(5)).unwrap().with_successful(false),
        ));
        wallet.add(Arc::new(
            Transaction::trade(btc(dec!(0.5)), CoinAmount::new(Coin::new("USD"), dec!(5000)), hour(20)).unwrap(),
        ));
        wallet
    }

    fn usd_table() -> PriceTables {
        let mut tables = PriceTables::new();
        tables.insert(CoinPricesTable::new(
            "USD",
            vec![
                (hour(0), HashMap::from([("BTC".to_string(), 10000.0)])),
                (hour(20), HashMap::from([("BTC".to_string(), 12000.0)])),
            ],
        ));
        tables
    }

    #[test]
    fn test_dates_are_sorted() {
        assert_eq!(wallet().dates(), vec![hour(0), hour(5), hour(10), hour(20)]);
    }

    #[test]
    fn test_balance_skips_failed_transactions() {
        let wallet = wallet();
        assert_eq!(wallet.transactions().len(), 4);

        let deltas: Vec<Decimal> = wallet.delta_by_transaction().iter().map(|d| d.value).collect();
        assert_eq!(deltas, vec![dec!(1), dec!(-0.3), dec!(0.5)]);

        let balances: Vec<Decimal> = wallet.balance_by_transaction().iter().map(|d| d.value).collect();
        assert_eq!(balances, vec![dec!(1), dec!(0.7), dec!(1.2)]);
        assert_eq!(wallet.balance(), dec!(1.2));
    }

    #[test]
    fn test_empty_wallet() {
        let wallet = Wallet::new(Coin::new("ETH"), true);
        assert_eq!(wallet.balance(), dec!(0));
        assert_eq!(wallet.balance_in("USD", &usd_table()), 0.0);
        assert!(wallet.balance_by_transaction().is_empty());
    }

    #[test]
    fn test_balance_by_date_step_function() {
        let wallet = wallet();
        let dates = [hour(-1), hour(0), hour(3), hour(10), hour(15), hour(30)];
        let values: Vec<Decimal> = wallet.balance_by_date(&dates).into_iter().map(|b| b.value).collect();
        assert_eq!(values, vec![dec!(0), dec!(1), dec!(1), dec!(0.7), dec!(0.7), dec!(1.2)]);
    }

    #[test]
    fn test_balance_by_date_in_uses_query_date_price() {
        let wallet = wallet();
        let tables = usd_table();
        let values = wallet.balance_by_date_in(&[hour(1), hour(19), hour(12)], "USD", &tables);
        assert_eq!(values, vec![10000.0, 0.7 * 12000.0, 0.0]);
    }

    #[test]
    fn test_balance_in_uses_last_transaction_date() {
        let wallet = wallet();
        assert_eq!(wallet.balance_in("USD", &usd_table()), 1.2 * 12000.0);
    }

    #[test]
    fn test_convert_to_miss_is_zero() {
        let wallet = wallet();
        let tables = usd_table();
        assert_eq!(wallet.convert_to(&tables, &hour(-20), "USD", dec!(1)), 0.0);
        assert_eq!(wallet.convert_to(&tables, &hour(0), "EUR", dec!(1)), 0.0);
        assert_eq!(wallet.price_on(&tables, &[hour(0), hour(-20)], "USD"), vec![10000.0, 0.0]);
    }

    #[test]
    fn test_balance_now() {
        let wallet = wallet();
        assert_eq!(wallet.balance_now("USD", &FixedPrice(Some(20000.0))), 24000.0);
        assert!(wallet.balance_now("USD", &FixedPrice(None)).is_nan());
    }
}
