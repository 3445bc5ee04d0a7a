/* This is used to get the price of a coin, live from Cryptocompare or offline from the price tables */

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::{
    errors::ApiError,
    structs::{Coin, PriceTables},
    utils::{get_delta_seconds, ratio, SECONDS_IN_MIN},
};

pub const API_CRYPTOCOMPARE_ENDPOINT: &str = "https://min-api.cryptocompare.com/data/";
pub const MAX_COINS_PER_REQUEST: usize = 6;

/* Requests closer than this to now use the live endpoint */
const REAL_TIME_INTERVAL: i64 = 5 * SECONDS_IN_MIN;

/* Symbols Cryptocompare knows under another name */
const API_ENCODING: [(&str, &str); 1] = [("IOTA", "IOT")];

/* Current price of a coin in a currency. Any failure is a missing price: the caller
turns it into NaN and leaves the coin out of totals. */
pub trait PriceFetcher {
    fn fetch_price(&self, coin: &Coin, currency: &str) -> Option<f64>;

    /* Current prices of several coins, keyed by symbol. Coins without a price are left out. */
    fn fetch_prices_now(&self, coins: &[&Coin], currency: &str) -> HashMap<String, f64> {
        coins
            .iter()
            .filter_map(|coin| self.fetch_price(coin, currency).map(|p| (coin.symbol.clone(), p)))
            .collect()
    }
}

pub fn encode_symbol(symbol: &str) -> &str {
    API_ENCODING
        .iter()
        .find(|(ours, _)| *ours == symbol)
        .map(|(_, theirs)| *theirs)
        .unwrap_or(symbol)
}

/* `price` answers `{BTC: 0.0001}`, `pricehistorical` nests it as `{USD: {BTC: 0.0001}}`.
Values are amounts of coin for one unit of currency. */
pub fn parse_response(response: &Value) -> Result<HashMap<String, f64>, ApiError> {
    let object = response
        .as_object()
        .ok_or_else(|| ApiError::DeserializationError(format!("unexpected answer {response}")))?;
    if object.get("Response").and_then(|r| r.as_str()) == Some("Error") {
        let message = object.get("Message").and_then(|m| m.as_str()).unwrap_or_default();
        return Err(ApiError::ApiCallError(message.to_string()));
    }
    let values = match object.values().next() {
        Some(Value::Object(nested)) => nested,
        _ => object,
    };
    return Ok(values
        .iter()
        .filter_map(|(symbol, value)| value.as_f64().map(|v| (symbol.to_string(), v)))
        .collect());
}

/* Live and historical prices from min-api.cryptocompare.com */
pub struct CryptocompareClient {
    base_url: String,
    client: reqwest::Client,
    runtime: Runtime,
}

impl CryptocompareClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ApiCallError(e.to_string()))?;
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(CryptocompareClient {
            base_url,
            client: reqwest::Client::new(),
            runtime,
        })
    }

    pub fn create_url(&self, coins: &[&str], date_time: &DateTime<Utc>, currency: &str, now: &DateTime<Utc>) -> String {
        let coins = coins.join(",");
        let real_time = get_delta_seconds(now, date_time).abs() < REAL_TIME_INTERVAL as f64;
        if real_time {
            return format!("{}price?fsym={currency}&tsyms={coins}", self.base_url);
        }
        format!(
            "{}pricehistorical?fsym={currency}&tsyms={coins}&ts={}",
            self.base_url,
            date_time.timestamp()
        )
    }

    async fn fetch_raw_prices(&self, coins: &[&str], date_time: &DateTime<Utc>, currency: &str) -> Result<HashMap<String, f64>, ApiError> {
        let url = self.create_url(coins, date_time, currency, &Utc::now());
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: Value = response.json().await?;
        return parse_response(&body);
    }

    /* Price of each coin in `currency` at `date_time`, keyed by the symbol asked for.
    Coins without an answer, or answered with 0, are NaN. */
    pub async fn fetch_prices_async(&self, coins: &[&Coin], date_time: &DateTime<Utc>, currency: &str) -> Result<HashMap<String, f64>, ApiError> {
        let currency = currency.to_uppercase();
        let mut prices = HashMap::new();
        for batch in coins.chunks(MAX_COINS_PER_REQUEST) {
            let encoded: Vec<&str> = batch.iter().map(|c| encode_symbol(&c.symbol)).collect();
            let raw = self.fetch_raw_prices(&encoded, date_time, &currency).await?;
            for (coin, symbol) in batch.iter().zip(encoded) {
                let price = match raw.get(symbol) {
                    Some(value) if *value != 0.0 => ratio(Some(1.0), Some(*value)),
                    _ => f64::NAN,
                };
                prices.insert(coin.symbol.clone(), price);
            }
        }
        return Ok(prices);
    }

    pub fn fetch_prices(&self, coins: &[&Coin], date_time: &DateTime<Utc>, currency: &str) -> Result<HashMap<String, f64>, ApiError> {
        self.runtime.block_on(self.fetch_prices_async(coins, date_time, currency))
    }
}

impl PriceFetcher for CryptocompareClient {
    fn fetch_price(&self, coin: &Coin, currency: &str) -> Option<f64> {
        if *coin == *currency {
            return Some(1.0);
        }
        match self.fetch_prices(&[coin], &Utc::now(), currency) {
            Ok(prices) => prices.get(&coin.symbol).copied().filter(|p| !p.is_nan()),
            Err(e) => {
                log::warn!("Cannot get {currency} price of {coin}: {e}");
                None
            }
        }
    }

    /* One request per batch of coins instead of one per coin */
    fn fetch_prices_now(&self, coins: &[&Coin], currency: &str) -> HashMap<String, f64> {
        let (same, others): (Vec<&Coin>, Vec<&Coin>) = coins.iter().copied().partition(|coin| **coin == *currency);
        let mut prices: HashMap<String, f64> = same.into_iter().map(|coin| (coin.symbol.clone(), 1.0)).collect();
        if others.is_empty() {
            return prices;
        }
        match self.fetch_prices(&others, &Utc::now(), currency) {
            Ok(fetched) => prices.extend(fetched.into_iter().filter(|(_, p)| !p.is_nan())),
            Err(e) => log::warn!("Cannot get {currency} prices of {} coins: {e}", others.len()),
        }
        return prices;
    }
}

/* Offline prices: the newest row of the price table of the currency */
pub struct TablePriceFetcher<'a> {
    tables: &'a PriceTables,
}

impl<'a> TablePriceFetcher<'a> {
    pub fn new(tables: &'a PriceTables) -> Self {
        TablePriceFetcher { tables }
    }
}

impl PriceFetcher for TablePriceFetcher<'_> {
    fn fetch_price(&self, coin: &Coin, currency: &str) -> Option<f64> {
        let price = self.tables.coin_prices(currency)?.latest_value(coin);
        if price.is_none() {
            log::debug!("No {currency} price of {coin} in the price table");
        }
        return price;
    }
}
