use std::path::Path;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde_json::Value;

use crate::{
    errors::IoError,
    utils::{file_exists, parse_datetime, read_file, SECONDS_IN_HOUR},
};

use super::Coin;

pub const DATE_TIME_KEY: &str = "datetime";
pub const VALUE_KEY: &str = "val";

pub const MARKET_CAP_MAX_ERROR: i64 = 3 * SECONDS_IN_HOUR;
pub const COIN_PRICES_MAX_ERROR: i64 = 6 * SECONDS_IN_HOUR;

/* Date-indexed records searched by nearest neighbour. A lookup further than
`max_error` seconds from both neighbours finds nothing. */
#[derive(Debug, Clone)]
pub struct DatetimeTable<T> {
    dates: Vec<DateTime<Utc>>,
    values: Vec<T>,
    max_error: i64,
}

impl<T> DatetimeTable<T> {
    pub fn new(mut records: Vec<(DateTime<Utc>, T)>, max_error: i64) -> Self {
        records.sort_by_key(|(date, _)| *date);
        let (dates, values) = records.into_iter().unzip();
        DatetimeTable {
            dates,
            values,
            max_error,
        }
    }

    pub fn empty(max_error: i64) -> Self {
        Self::new(Vec::new(), max_error)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn max_error(&self) -> i64 {
        self.max_error
    }

    pub fn dates(&self) -> &[DateTime<Utc>] {
        &self.dates
    }

    /* Record nearest to `date`; on a tie the earlier one wins */
    pub fn get_values_on(&self, date: &DateTime<Utc>) -> Option<&T> {
        let insert = self.dates.partition_point(|d| d <= date);
        let low = insert.checked_sub(1);
        let high = (insert < self.dates.len()).then_some(insert);

        let err_low = low.map(|i| (*date - self.dates[i]).num_seconds());
        let err_high = high.map(|i| (self.dates[i] - *date).num_seconds());

        let nearest = match (err_low, err_high) {
            (Some(l), Some(h)) if h < l => high.map(|i| (i, h)),
            (Some(l), _) => low.map(|i| (i, l)),
            (None, Some(h)) => high.map(|i| (i, h)),
            (None, None) => None,
        };
        match nearest {
            Some((i, error)) if error <= self.max_error => Some(&self.values[i]),
            _ => None,
        }
    }

    pub fn get_values_on_dates<'a>(
        &'a self,
        dates: &'a [DateTime<Utc>],
    ) -> impl Iterator<Item = Option<&'a T>> + 'a {
        dates.iter().map(|date| self.get_values_on(date))
    }

    pub fn get_values_between<'a>(
        &'a self,
        since: &'a DateTime<Utc>,
        until: &'a DateTime<Utc>,
    ) -> impl Iterator<Item = (&'a DateTime<Utc>, &'a T)> + 'a {
        self.dates
            .iter()
            .zip(self.values.iter())
            .filter(move |(date, _)| *date >= since && *date <= until)
    }

    pub fn last(&self) -> Option<(&DateTime<Utc>, &T)> {
        self.dates.last().zip(self.values.last())
    }
}

/* Reads a JSON array of objects carrying a `datetime` key. A missing file is an empty
table; records without a readable date are skipped. */
fn load_records(path: &Path) -> Result<Vec<(DateTime<Utc>, serde_json::Map<String, Value>)>, IoError> {
    if !file_exists(path) {
        log::debug!("No table at {}", path.display());
        return Ok(Vec::new());
    }
    let content = read_file(path)?;
    let raw: Vec<serde_json::Map<String, Value>> = serde_json::from_str(&content)?;
    let mut records = Vec::with_capacity(raw.len());
    for mut item in raw {
        let date = item
            .remove(DATE_TIME_KEY)
            .and_then(|d| d.as_str().and_then(parse_datetime));
        match date {
            Some(date) => records.push((date, item)),
            None => log::warn!("Skipping record without a valid {DATE_TIME_KEY} in {}", path.display()),
        }
    }
    Ok(records)
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/* Historical total market cap, records `{datetime, val}` */
#[derive(Debug, Clone)]
pub struct MarketCapTable {
    table: DatetimeTable<f64>,
}

impl MarketCapTable {
    pub fn new(records: Vec<(DateTime<Utc>, f64)>) -> Self {
        MarketCapTable {
            table: DatetimeTable::new(records, MARKET_CAP_MAX_ERROR),
        }
    }

    pub fn load(path: &Path) -> Result<Self, IoError> {
        let records = load_records(path)?
            .into_iter()
            .filter_map(|(date, item)| item.get(VALUE_KEY).and_then(as_price).map(|v| (date, v)))
            .collect();
        Ok(Self::new(records))
    }

    pub fn get_value_on(&self, date: &DateTime<Utc>) -> Option<f64> {
        self.table.get_values_on(date).copied()
    }

    pub fn table(&self) -> &DatetimeTable<f64> {
        &self.table
    }
}

/* Historical prices of many coins in one base currency: records
`{datetime, <SYMBOL>: price, ...}` */
#[derive(Debug, Clone)]
pub struct CoinPricesTable {
    base_currency: String,
    table: DatetimeTable<HashMap<String, f64>>,
}

impl CoinPricesTable {
    pub fn new(base_currency: &str, records: Vec<(DateTime<Utc>, HashMap<String, f64>)>) -> Self {
        Self::with_max_error(base_currency, records, COIN_PRICES_MAX_ERROR)
    }

    pub fn with_max_error(
        base_currency: &str,
        records: Vec<(DateTime<Utc>, HashMap<String, f64>)>,
        max_error: i64,
    ) -> Self {
        CoinPricesTable {
            base_currency: base_currency.to_uppercase(),
            table: DatetimeTable::new(records, max_error),
        }
    }

    pub fn load(base_currency: &str, path: &Path) -> Result<Self, IoError> {
        let records = load_records(path)?
            .into_iter()
            .map(|(date, item)| {
                let prices = item
                    .iter()
                    .filter_map(|(symbol, value)| as_price(value).map(|p| (symbol.to_uppercase(), p)))
                    .collect();
                (date, prices)
            })
            .collect();
        Ok(Self::new(base_currency, records))
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn table(&self) -> &DatetimeTable<HashMap<String, f64>> {
        &self.table
    }

    /* Price of one `coin` in the base currency. Columns are matched by canonical
    symbol first, then by any alias of the coin. */
    pub fn get_value_on(&self, coin: &Coin, date: &DateTime<Utc>) -> Option<f64> {
        if *coin == *self.base_currency {
            return Some(1.0);
        }
        let prices = self.table.get_values_on(date)?;
        find_price(prices, coin)
    }

    /* Newest known price of `coin`, whatever its age */
    pub fn latest_value(&self, coin: &Coin) -> Option<f64> {
        if *coin == *self.base_currency {
            return Some(1.0);
        }
        self.table.last().and_then(|(_, prices)| find_price(prices, coin))
    }
}

fn find_price(prices: &HashMap<String, f64>, coin: &Coin) -> Option<f64> {
    if let Some(price) = prices.get(&coin.symbol) {
        return Some(*price);
    }
    coin.aliases()
        .find_map(|alias| prices.get(&alias.to_uppercase()))
        .copied()
}

/* All the historical tables of a run: one coin price table per base currency, plus the
market cap. Built once, read-only afterwards. */
#[derive(Debug, Clone, Default)]
pub struct PriceTables {
    coin_prices: HashMap<String, CoinPricesTable>,
    market_cap: Option<MarketCapTable>,
}

impl PriceTables {
    pub fn new() -> Self {
        Self::default()
    }

    /* Loads `<folder>/<currency>.json` for each currency and `<folder>/market_cap.json`.
    A table that cannot be read is replaced by an empty one: lookups then miss. */
    pub fn load(folder: &Path, currencies: &[&str]) -> Self {
        let mut tables = Self::new();
        for currency in currencies {
            let path = folder.join(format!("{}.json", currency.to_lowercase()));
            let table = CoinPricesTable::load(currency, &path).unwrap_or_else(|e| {
                log::warn!("Cannot read price table {}: {e}", path.display());
                CoinPricesTable::new(currency, Vec::new())
            });
            tables.insert(table);
        }
        let path = folder.join("market_cap.json");
        match MarketCapTable::load(&path) {
            Ok(table) => tables.market_cap = Some(table),
            Err(e) => log::warn!("Cannot read market cap table {}: {e}", path.display()),
        }
        tables
    }

    pub fn insert(&mut self, table: CoinPricesTable) {
        self.coin_prices.insert(table.base_currency().to_string(), table);
    }

    pub fn with_market_cap(mut self, table: MarketCapTable) -> Self {
        self.market_cap = Some(table);
        self
    }

    pub fn coin_prices(&self, currency: &str) -> Option<&CoinPricesTable> {
        self.coin_prices.get(&currency.to_uppercase())
    }

    pub fn market_cap(&self) -> Option<&MarketCapTable> {
        self.market_cap.as_ref()
    }

    pub fn get_value_on(&self, coin: &Coin, currency: &str, date: &DateTime<Utc>) -> Option<f64> {
        self.coin_prices(currency)?.get_value_on(coin, date)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_nearest_neighbour_within_tolerance() {
        let table = DatetimeTable::new(vec![(hour(10), 10), (hour(0), 0), (hour(20), 20)], 6 * 3600);

        assert_eq!(table.get_values_on(&hour(0)), Some(&0));
        assert_eq!(table.get_values_on(&hour(4)), Some(&0));
        assert_eq!(table.get_values_on(&hour(6)), Some(&10));
        assert_eq!(table.get_values_on(&hour(16)), Some(&20));
        assert_eq!(table.get_values_on(&hour(26)), Some(&20));
        assert_eq!(table.get_values_on(&hour(-6)), Some(&0));
    }

    #[test]
    fn test_tie_picks_earlier_record() {
        let table = DatetimeTable::new(vec![(hour(0), "low"), (hour(10), "high")], 6 * 3600);
        assert_eq!(table.get_values_on(&hour(5)), Some(&"low"));
    }

    #[test]
    fn test_miss_outside_tolerance() {
        let table = DatetimeTable::new(vec![(hour(0), 0), (hour(20), 20)], 3 * 3600);
        assert_eq!(table.get_values_on(&hour(10)), None);
        assert_eq!(table.get_values_on(&hour(27)), None);
        assert_eq!(table.get_values_on(&hour(-4)), None);
        assert_eq!(DatetimeTable::<i32>::empty(3600).get_values_on(&hour(0)), None);
    }

    #[test]
    fn test_values_between() {
        let table = DatetimeTable::new(vec![(hour(0), 0), (hour(10), 10), (hour(20), 20)], 3600);
        let values: Vec<i32> = table.get_values_between(&hour(5), &hour(20)).map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn test_coin_price_base_currency_and_alias() {
        let table = CoinPricesTable::new("usd", vec![(hour(0), prices(&[("IOTA", 2.5), ("BTC", 10000.0)]))]);
        let iot = Coin::crypto("IOT", None, &["iota"]);

        assert_eq!(table.get_value_on(&Coin::new("USD"), &hour(100)), Some(1.0));
        assert_eq!(table.get_value_on(&Coin::new("BTC"), &hour(1)), Some(10000.0));
        assert_eq!(table.get_value_on(&iot, &hour(1)), Some(2.5));
        assert_eq!(table.get_value_on(&Coin::new("ETH"), &hour(1)), None);
        assert_eq!(table.get_value_on(&Coin::new("BTC"), &hour(12)), None);
    }

    #[test]
    fn test_load_unsorted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usd.json");
        std::fs::write(
            &path,
            r#"[
                {"datetime": "2018-01-02 00:00:00 +0000", "BTC": 14000.0, "ETH": 880},
                {"datetime": "2018-01-01 00:00:00 +0000", "BTC": 13500.5, "ETH": "760.25"},
                {"BTC": 1.0}
            ]"#,
        )
        .unwrap();

        let table = CoinPricesTable::load("USD", &path).unwrap();
        assert_eq!(table.table().len(), 2);
        assert_eq!(table.get_value_on(&Coin::new("BTC"), &hour(2)), Some(13500.5));
        assert_eq!(table.get_value_on(&Coin::new("ETH"), &hour(23)), Some(880.0));
        assert_eq!(table.latest_value(&Coin::new("BTC")), Some(14000.0));
    }

    #[test]
    fn test_load_market_cap_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("market_cap.json"),
            r#"[{"datetime": "2018-01-01 00:00:00 +0000", "val": 600000000000.0}]"#,
        )
        .unwrap();

        let tables = PriceTables::load(dir.path(), &["USD", "EUR"]);
        let market_cap = tables.market_cap().unwrap();
        assert_eq!(market_cap.get_value_on(&hour(2)), Some(600000000000.0));
        assert_eq!(market_cap.get_value_on(&hour(4)), None);
        assert!(tables.coin_prices("usd").unwrap().table().is_empty());
        assert_eq!(tables.get_value_on(&Coin::new("BTC"), "EUR", &hour(0)), None);
        assert_eq!(tables.get_value_on(&Coin::new("BTC"), "GBP", &hour(0)), None);
    }
}
