/* Balance report of each exchange: current holdings valued in fiat, compared with the
report saved by the previous run */

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{
    api::PriceFetcher,
    errors::PortfolioError,
    structs::{exchange_title, BalanceReport, CoinRegistry, CryptoExchange, Snapshot},
    utils::{datetime_to_str, nan_sum, num_to_str, relative_delta, relative_percentage},
};

pub const BALANCE_FILE_SUFFIX: &str = "Balance.json";

const HEADERS: [&str; 7] = ["symbol", "balance", "$ value", "$ price per coin", "%", "$ delta", "% delta"];

/* `<folder>/BinanceBalance.json` for the exchange `binance` */
pub fn snapshot_path(folder: &Path, exchange_name: &str) -> PathBuf {
    folder.join(format!("{}{BALANCE_FILE_SUFFIX}", exchange_title(exchange_name)))
}

/* Report of one exchange with the snapshot it was compared to */
#[derive(Debug, Clone)]
pub struct ExchangeBalance {
    pub title: String,
    pub report: BalanceReport,
    pub last: Option<Snapshot>,
}

impl ExchangeBalance {
    pub fn format(&self) -> String {
        let mut lines = vec![format!("{} ({})", self.title, datetime_to_str(&Utc::now())), format_row(&HEADERS)];
        for entry in self.report.entries.iter() {
            let last_val = self
                .last
                .as_ref()
                .and_then(|last| last.entries.get(&entry.symbol))
                .map(|e| e.val);
            let (delta, pct_delta) = match last_val {
                Some(last_val) => (
                    num_to_str(Some(relative_delta(Some(entry.fiat_value), Some(last_val)))),
                    num_to_str(Some(relative_percentage(Some(entry.fiat_value), Some(last_val)))),
                ),
                None => (String::new(), String::new()),
            };
            lines.push(format_row(&[
                entry.symbol.clone(),
                entry.balance.normalize().to_string(),
                num_to_str(Some(entry.fiat_value)),
                num_to_str(Some(entry.price)),
                num_to_str(Some(entry.percentage)),
                delta,
                pct_delta,
            ]));
        }
        lines.push(format_total("Total", self.report.total, self.report.last_total, self.report.last_time));
        lines.join("\n")
    }
}

fn format_row<S: AsRef<str>>(columns: &[S]) -> String {
    let mut row = format!("{:<8}", columns.first().map(|c| c.as_ref()).unwrap_or_default());
    for column in columns.iter().skip(1) {
        row.push_str(&format!("{:>18}", column.as_ref()));
    }
    row
}

/* `Total: 12500.000 $ (+2500.000 $, 25.000 % since 2018-01-01 00:00:00 +0000)` */
pub fn format_total(label: &str, total: f64, last_total: Option<f64>, last_time: Option<DateTime<Utc>>) -> String {
    let mut line = format!("{label}: {} $", num_to_str(Some(total)));
    if let Some(last_total) = last_total {
        let delta = relative_delta(Some(total), Some(last_total));
        let pct_delta = relative_percentage(Some(total), Some(last_total));
        line.push_str(&format!(" ({delta:+.3} $, {pct_delta:.3} %"));
        if let Some(last_time) = last_time {
            line.push_str(&format!(" since {}", datetime_to_str(&last_time)));
        }
        line.push(')');
    }
    line
}

/* Builds the report of one exchange against `<snapshots>/<Title>Balance.json`, then
replaces that file with the new report unless `save` is false. An unreadable snapshot
stops the run. */
pub fn exchange_balance(
    exchange: &CryptoExchange,
    registry: &CoinRegistry,
    fiat: &str,
    fetcher: &dyn PriceFetcher,
    snapshots: &Path,
    save: bool,
) -> Result<ExchangeBalance, PortfolioError> {
    let path = snapshot_path(snapshots, exchange.name());
    let last = Snapshot::read(&path)?;
    let portfolio = exchange.build_wallets(registry);
    let report = portfolio.balance_report(fiat, fetcher, last.as_ref());
    log::debug!(
        "{}: {} wallets, {} coins held, total {}",
        exchange.title(),
        portfolio.len(),
        report.entries.len(),
        report.total
    );

    if save {
        Snapshot::from_entries(&report.entries, Utc::now()).write(&path)?;
    }
    Ok(ExchangeBalance {
        title: exchange.title(),
        report,
        last,
    })
}

/* Sum over every exchange, with the sum of the previous snapshots when at least one exists */
pub fn grand_total(balances: &[ExchangeBalance]) -> (f64, Option<f64>) {
    let total = nan_sum(balances.iter().map(|b| b.report.total));
    let last_totals: Vec<f64> = balances.iter().filter_map(|b| b.report.last_total).collect();
    if last_totals.is_empty() {
        return (total, None);
    }
    (total, Some(nan_sum(last_totals)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use crate::structs::{Coin, CoinAmount, SnapshotEntry, Transaction};

    use super::*;

    struct Prices;

    impl PriceFetcher for Prices {
        fn fetch_price(&self, coin: &Coin, _currency: &str) -> Option<f64> {
            match coin.symbol.as_str() {
                "BTC" => Some(10000.0),
                "USD" => Some(1.0),
                _ => None,
            }
        }
    }

    fn exchange() -> CryptoExchange {
        let date = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let transactions = vec![
            Transaction::deposit(CoinAmount::new(Coin::new("BTC"), dec!(1.25)), date).unwrap(),
            Transaction::deposit(CoinAmount::new(Coin::new("XRP"), dec!(10)), date).unwrap(),
        ];
        CryptoExchange::new("binance", transactions).unwrap()
    }

    fn last_snapshot() -> Snapshot {
        let mut entries = BTreeMap::new();
        entries.insert(
            "BTC".to_string(),
            SnapshotEntry {
                balance: 1.0,
                val: 10000.0,
                price: 10000.0,
                percentage: 100.0,
            },
        );
        Snapshot::new(Utc.with_ymd_and_hms(2017, 12, 31, 0, 0, 0).unwrap(), entries)
    }

    #[test]
    fn test_snapshot_path() {
        assert_eq!(snapshot_path(Path::new("data"), "binance"), PathBuf::from("data/BinanceBalance.json"));
        assert_eq!(snapshot_path(Path::new("data"), "GDAX"), PathBuf::from("data/GdaxBalance.json"));
    }

    #[test]
    fn test_exchange_balance_saves_snapshot() {
        let registry = CoinRegistry::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), "binance");
        last_snapshot().write(&path).unwrap();

        let balance = exchange_balance(&exchange(), &registry, "USD", &Prices, dir.path(), true).unwrap();
        assert_eq!(balance.title, "Binance");
        assert_eq!(balance.report.total, 12500.0);
        assert_eq!(balance.report.delta, Some(2500.0));
        assert_eq!(balance.report.pct_delta, Some(25.0));

        // XRP has no price and is not written
        let saved = Snapshot::read(&path).unwrap().unwrap();
        assert_eq!(saved.entries.keys().collect::<Vec<_>>(), vec!["BTC"]);
        assert_eq!(saved.total(), 12500.0);
    }

    #[test]
    fn test_exchange_balance_no_save() {
        let registry = CoinRegistry::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let balance = exchange_balance(&exchange(), &registry, "USD", &Prices, dir.path(), false).unwrap();
        assert!(balance.last.is_none());
        assert!(balance.report.delta.is_none());
        assert!(!snapshot_path(dir.path(), "binance").exists());
    }

    #[test]
    fn test_invalid_snapshot_is_fatal() {
        let registry = CoinRegistry::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(snapshot_path(dir.path(), "binance"), "{not json").unwrap();
        let result = exchange_balance(&exchange(), &registry, "USD", &Prices, dir.path(), true);
        assert!(matches!(result, Err(PortfolioError::Snapshot(_))));
    }

    #[test]
    fn test_format() {
        let registry = CoinRegistry::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        last_snapshot().write(&snapshot_path(dir.path(), "binance")).unwrap();
        let balance = exchange_balance(&exchange(), &registry, "USD", &Prices, dir.path(), false).unwrap();

        let text = balance.format();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("symbol"));
        assert!(lines[2].starts_with("BTC"));
        assert!(lines[2].contains("12500.000"));
        assert!(lines[2].contains("2500.000"));
        assert!(lines[3].starts_with("XRP"));
        assert!(lines[3].contains("NaN"));
        assert!(lines[4].starts_with("Total: 12500.000 $ (+2500.000 $, 25.000 % since 2017-12-31"));
    }

    #[test]
    fn test_grand_total() {
        let registry = CoinRegistry::bundled().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let first = exchange_balance(&exchange(), &registry, "USD", &Prices, dir.path(), false).unwrap();
        assert_eq!(grand_total(&[first.clone()]), (12500.0, None));

        let mut second = first.clone();
        second.report.last_total = Some(5000.0);
        assert_eq!(grand_total(&[first, second]), (25000.0, Some(5000.0)));
        assert_eq!(format_total("Grand total", 25000.0, Some(5000.0), None), "Grand total: 25000.000 $ (+20000.000 $, 400.000 %)");
    }
}
