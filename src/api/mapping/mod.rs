use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    errors::MappingError,
    structs::{CoinAmount, CoinRegistry, Transaction},
    utils::generate_id,
};

pub mod binance;
pub use binance::*;

pub mod bitfinex;
pub use bitfinex::*;

pub mod coinbase;
pub use coinbase::*;

pub mod gdax;
pub use gdax::*;

/* Keys holding the exchange's own identifier of a record, in lookup order */
const ID_KEYS: [&str; 4] = ["id", "tradeId", "txId", "tid"];

/* A coin and an amount as written by the exchange, before symbol resolution */
#[derive(Debug, Clone, PartialEq)]
pub struct RawAmount {
    pub symbol: String,
    pub amount: Decimal,
}

impl RawAmount {
    pub fn new(symbol: &str, amount: Decimal) -> Self {
        RawAmount {
            symbol: symbol.to_string(),
            amount: amount.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTrade {
    pub buy: RawAmount,
    pub sell: RawAmount,
}

/* What an exchange has to tell about one of its raw records. parse_transaction turns
the answers into a Transaction; it is the only place where a Transaction is built from
exchange data. */
pub trait ExchangeParser {
    fn name(&self) -> &'static str;

    fn is_trade(&self, raw: &Value) -> bool;

    fn is_deposit(&self, raw: &Value) -> bool;

    fn is_withdrawal(&self, raw: &Value) -> bool;

    /* None for a trade record that carries no coin movement (bookkeeping lines) */
    fn get_coins_amount_traded(&self, raw: &Value) -> Result<Option<RawTrade>, MappingError>;

    fn get_coin_moved(&self, raw: &Value) -> Result<RawAmount, MappingError>;

    fn get_commission(&self, raw: &Value) -> Result<Option<RawAmount>, MappingError>;

    fn get_date(&self, raw: &Value) -> Result<DateTime<Utc>, MappingError>;

    fn is_successful(&self, raw: &Value) -> bool;

    fn is_commission_successful(&self, raw: &Value) -> bool {
        self.is_successful(raw)
    }

    fn get_id(&self, raw: &Value) -> Option<String> {
        ID_KEYS.iter().find_map(|key| match raw.get(*key) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.to_string()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        })
    }

    /* Exchanges that split one operation over several records merge them here */
    fn group_records(&self, records: Vec<Value>) -> Vec<Value> {
        records
    }
}

/* Builds the canonical transaction of one raw record. Ok(None) means the record is
legitimately empty and has to be skipped without noise. */
pub fn parse_transaction(
    parser: &dyn ExchangeParser,
    raw: Value,
    registry: &CoinRegistry,
) -> Result<Option<Transaction>, MappingError> {
    let date = parser.get_date(&raw)?;
    let leg = |raw_amount: RawAmount| CoinAmount::new(registry.resolve(&raw_amount.symbol), raw_amount.amount);

    let transaction = if parser.is_trade(&raw) {
        match parser.get_coins_amount_traded(&raw)? {
            Some(trade) => Transaction::trade(leg(trade.buy), leg(trade.sell), date)?,
            None => return Ok(None),
        }
    } else if parser.is_deposit(&raw) {
        Transaction::deposit(leg(parser.get_coin_moved(&raw)?), date)?
    } else if parser.is_withdrawal(&raw) {
        Transaction::withdrawal(leg(parser.get_coin_moved(&raw)?), date)?
    } else {
        return Err(MappingError::UnknownKind);
    };

    let commission = parser
        .get_commission(&raw)?
        .and_then(|fee| Transaction::commission(leg(fee), date, parser.is_commission_successful(&raw)));
    let id = match parser.get_id(&raw) {
        Some(id) => format!("{}-{id}", parser.name()),
        None => generate_id(),
    };

    Ok(Some(
        transaction
            .with_id(id)
            .with_successful(parser.is_successful(&raw))
            .with_commission(commission)
            .with_raw(raw),
    ))
}

/* Maps every record of one exchange, skipping (and logging) the ones that cannot be mapped */
pub fn parse_records(parser: &dyn ExchangeParser, records: Vec<Value>, registry: &CoinRegistry) -> Vec<Transaction> {
    let mut transactions = Vec::new();
    for raw in parser.group_records(records) {
        let summary = raw.to_string();
        match parse_transaction(parser, raw, registry) {
            Ok(Some(transaction)) => {
                log::debug!("{} {transaction}", parser.name());
                transactions.push(transaction);
            }
            Ok(None) => log::debug!("Skipping {} record without movement {summary}", parser.name()),
            Err(e) => log::warn!("Cannot parse {} record {summary}: {e}", parser.name()),
        }
    }
    transactions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Binance,
    Bitfinex,
    Coinbase,
    Gdax,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [Exchange::Binance, Exchange::Bitfinex, Exchange::Coinbase, Exchange::Gdax];

    pub fn name(&self) -> &'static str {
        self.parser().name()
    }

    pub fn parser(&self) -> &'static dyn ExchangeParser {
        match self {
            Exchange::Binance => &BinanceParser,
            Exchange::Bitfinex => &BitfinexParser,
            Exchange::Coinbase => &CoinbaseParser,
            Exchange::Gdax => &GdaxParser,
        }
    }

    /* File names like `binance.json` or `gdax_2018.json` */
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let stem = stem.to_lowercase();
        Exchange::ALL.into_iter().find(|e| stem.starts_with(e.name()))
    }

    /* Guess the exchange from the shape of one of its records */
    pub fn detect(record: &Value) -> Option<Self> {
        if has_field(record, "instant_exchange") {
            return Some(Exchange::Coinbase);
        }
        if ["isBuyer", "txId", "insertTime", "applyTime"].iter().any(|k| has_field(record, k)) {
            return Some(Exchange::Binance);
        }
        if has_field(record, "timestamp") {
            return Some(Exchange::Bitfinex);
        }
        if has_field(record, "created_at") && has_field(record, "details") {
            return Some(Exchange::Gdax);
        }
        None
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Exchange {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Exchange::ALL
            .into_iter()
            .find(|e| e.name() == name)
            .ok_or_else(|| MappingError::invalid("exchange", s))
    }
}

/* Raw record accessors. Exchanges write numbers either as JSON numbers or as strings. */

pub fn has_field(raw: &Value, key: &str) -> bool {
    raw.get(key).is_some_and(|v| !v.is_null())
}

pub fn get_field<'a>(raw: &'a Value, key: &str) -> Result<&'a Value, MappingError> {
    raw.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| MappingError::MissingField(key.to_string()))
}

pub fn get_str<'a>(raw: &'a Value, key: &str) -> Result<&'a str, MappingError> {
    let value = get_field(raw, key)?;
    value.as_str().ok_or_else(|| MappingError::invalid(key, value))
}

pub fn get_decimal(raw: &Value, key: &str) -> Result<Decimal, MappingError> {
    let value = get_field(raw, key)?;
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return Err(MappingError::invalid(key, value)),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| MappingError::invalid(key, value))
}

pub fn get_i64(raw: &Value, key: &str) -> Result<i64, MappingError> {
    let value = get_field(raw, key)?;
    let number = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| MappingError::invalid(key, value))
}

pub fn get_f64(raw: &Value, key: &str) -> Result<f64, MappingError> {
    let value = get_field(raw, key)?;
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| MappingError::invalid(key, value))
}

pub fn get_bool(raw: &Value, key: &str) -> Result<bool, MappingError> {
    let value = get_field(raw, key)?;
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => text.trim().to_lowercase().parse::<bool>().map_err(|_| MappingError::invalid(key, value)),
        _ => Err(MappingError::invalid(key, value)),
    }
}

pub fn multiply(first: Decimal, second: Decimal, field: &str) -> Result<Decimal, MappingError> {
    first
        .checked_mul(second)
        .ok_or_else(|| MappingError::invalid(field, format!("{first} * {second}")))
}
