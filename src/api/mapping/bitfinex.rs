use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::{errors::MappingError, utils::seconds_to_datetime_utc};

use super::{get_decimal, get_f64, get_str, multiply, ExchangeParser, RawAmount, RawTrade};

/* Bitfinex v1 history: `mytrades` (type Buy/Sell) and `history/movements` (DEPOSIT/WITHDRAWAL) */
pub struct BitfinexParser;

impl BitfinexParser {
    /* Bitfinex writes DASH as DSH */
    pub fn fix_coin_name(coin: &str) -> String {
        let coin = coin.trim().to_uppercase();
        if coin == "DSH" {
            return String::from("DASH");
        }
        coin
    }

    /* btcusd -> (BTC, USD) */
    pub fn split_symbol(symbol: &str) -> Result<(String, String), MappingError> {
        let symbol = symbol.trim();
        if symbol.len() < 6 || !symbol.is_char_boundary(3) {
            return Err(MappingError::invalid("symbol", symbol));
        }
        Ok((Self::fix_coin_name(&symbol[..3]), Self::fix_coin_name(&symbol[3..])))
    }

    fn get_type(raw: &Value) -> &str {
        raw.get("type").and_then(|t| t.as_str()).unwrap_or_default()
    }
}

impl ExchangeParser for BitfinexParser {
    fn name(&self) -> &'static str {
        "bitfinex"
    }

    fn is_trade(&self, raw: &Value) -> bool {
        matches!(Self::get_type(raw), "Buy" | "Sell")
    }

    fn is_deposit(&self, raw: &Value) -> bool {
        Self::get_type(raw) == "DEPOSIT"
    }

    fn is_withdrawal(&self, raw: &Value) -> bool {
        Self::get_type(raw) == "WITHDRAWAL"
    }

    fn get_coins_amount_traded(&self, raw: &Value) -> Result<Option<RawTrade>, MappingError> {
        let (base, quote) = Self::split_symbol(get_str(raw, "symbol")?)?;
        let amount = get_decimal(raw, "amount")?;
        let total = multiply(amount, get_decimal(raw, "price")?, "price")?;

        let mut trade = RawTrade {
            buy: RawAmount::new(&base, amount),
            sell: RawAmount::new(&quote, total),
        };
        if Self::get_type(raw) == "Sell" {
            std::mem::swap(&mut trade.buy, &mut trade.sell);
        }
        Ok(Some(trade))
    }

    fn get_coin_moved(&self, raw: &Value) -> Result<RawAmount, MappingError> {
        let coin = Self::fix_coin_name(get_str(raw, "currency")?);
        Ok(RawAmount::new(&coin, get_decimal(raw, "amount")?))
    }

    fn get_commission(&self, raw: &Value) -> Result<Option<RawAmount>, MappingError> {
        if self.is_trade(raw) {
            let coin = Self::fix_coin_name(get_str(raw, "fee_currency")?);
            return Ok(Some(RawAmount::new(&coin, get_decimal(raw, "fee_amount")?)));
        }
        if self.is_deposit(raw) {
            let coin = Self::fix_coin_name(get_str(raw, "currency")?);
            return Ok(Some(RawAmount::new(&coin, get_decimal(raw, "fee")?)));
        }
        Ok(None)
    }

    /* Seconds, written as a float string ("1514764800.0") */
    fn get_date(&self, raw: &Value) -> Result<DateTime<Utc>, MappingError> {
        let timestamp = get_f64(raw, "timestamp")?;
        seconds_to_datetime_utc(timestamp.trunc() as i64).ok_or_else(|| MappingError::invalid("timestamp", timestamp))
    }

    fn is_successful(&self, raw: &Value) -> bool {
        if self.is_trade(raw) {
            return get_decimal(raw, "fee_amount").is_ok_and(|fee| fee <= dec!(0));
        }
        if self.is_deposit(raw) || self.is_withdrawal(raw) {
            return raw.get("status").and_then(|s| s.as_str()) == Some("COMPLETED");
        }
        false
    }
}
