use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::{errors::MappingError, utils::parse_datetime};

use super::{get_decimal, get_field, get_str, ExchangeParser, RawAmount, RawTrade};

/* Coinbase v2 account transactions. `amount` is in the account coin, `native_amount`
in the user's fiat. */
pub struct CoinbaseParser;

impl CoinbaseParser {
    fn get_amount(raw: &Value, key: &str) -> Result<RawAmount, MappingError> {
        let amount = get_field(raw, key)?;
        Ok(RawAmount::new(get_str(amount, "currency")?, get_decimal(amount, "amount")?))
    }

    /* Signs of (amount, native_amount) */
    fn get_signs(raw: &Value) -> Option<(bool, bool)> {
        let amount = get_field(raw, "amount").and_then(|a| get_decimal(a, "amount")).ok()?;
        let native = get_field(raw, "native_amount").and_then(|a| get_decimal(a, "amount")).ok()?;
        Some((amount >= dec!(0), native >= dec!(0)))
    }
}

impl ExchangeParser for CoinbaseParser {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn is_trade(&self, raw: &Value) -> bool {
        matches!(raw.get("type").and_then(|t| t.as_str()), Some("buy") | Some("sell"))
    }

    fn is_deposit(&self, raw: &Value) -> bool {
        Self::get_signs(raw) == Some((true, true))
    }

    fn is_withdrawal(&self, raw: &Value) -> bool {
        Self::get_signs(raw) == Some((false, false))
    }

    /* A buy spends fiat for the coin, a sell the other way around. Buys and sells where
    both sides are the same currency are fiat bookkeeping and carry no trade. Only trades
    go through here: a fiat deposit or withdrawal is still a move of its amount. */
    fn get_coins_amount_traded(&self, raw: &Value) -> Result<Option<RawTrade>, MappingError> {
        let coin = Self::get_amount(raw, "amount")?;
        let native = Self::get_amount(raw, "native_amount")?;
        if coin.symbol == native.symbol {
            return Ok(None);
        }
        let trade = match get_str(raw, "type")? {
            "sell" => RawTrade { buy: native, sell: coin },
            _ => RawTrade { buy: coin, sell: native },
        };
        Ok(Some(trade))
    }

    fn get_coin_moved(&self, raw: &Value) -> Result<RawAmount, MappingError> {
        Self::get_amount(raw, "amount")
    }

    fn get_commission(&self, raw: &Value) -> Result<Option<RawAmount>, MappingError> {
        let fee = raw.get("network").and_then(|n| n.get("transaction_fee"));
        match fee {
            Some(fee) if !fee.is_null() => {
                Ok(Some(RawAmount::new(get_str(fee, "currency")?, get_decimal(fee, "amount")?)))
            }
            _ => Ok(None),
        }
    }

    fn get_date(&self, raw: &Value) -> Result<DateTime<Utc>, MappingError> {
        let text = get_str(raw, "updated_at")?;
        parse_datetime(text).ok_or_else(|| MappingError::invalid("updated_at", text))
    }

    fn is_successful(&self, raw: &Value) -> bool {
        raw.get("status").and_then(|s| s.as_str()) == Some("completed")
    }

    fn is_commission_successful(&self, raw: &Value) -> bool {
        raw.get("network").and_then(|n| n.get("status")).and_then(|s| s.as_str()) == Some("confirmed")
    }
}
