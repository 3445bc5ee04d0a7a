use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    errors::MappingError,
    utils::{millis_to_datetime_utc, parse_datetime},
};

use super::{get_bool, get_decimal, get_i64, get_str, has_field, multiply, ExchangeParser, RawAmount, RawTrade};

const STABLE_QUOTE: &str = "USDT";

/* Binance API history: trades (`myTrades`), deposits and withdrawals */
pub struct BinanceParser;

impl BinanceParser {
    /* ETHUSDT -> (ETH, USDT), ETHBTC -> (ETH, BTC) */
    pub fn split_market(market: &str) -> Result<(String, String), MappingError> {
        let market = market.trim().to_uppercase();
        if let Some(base) = market.strip_suffix(STABLE_QUOTE) {
            if base.is_empty() {
                return Err(MappingError::invalid("symbol", &market));
            }
            return Ok((base.to_string(), STABLE_QUOTE.to_string()));
        }
        let split = market.len().checked_sub(3).filter(|i| *i > 0 && market.is_char_boundary(*i));
        match split {
            Some(i) => Ok((market[..i].to_string(), market[i..].to_string())),
            None => Err(MappingError::invalid("symbol", market)),
        }
    }

    /* Instants are milliseconds; old withdrawal exports write applyTime as a date */
    fn get_millis_date(raw: &Value, key: &str) -> Result<DateTime<Utc>, MappingError> {
        if let Ok(millis) = get_i64(raw, key) {
            return millis_to_datetime_utc(millis).ok_or_else(|| MappingError::invalid(key, millis));
        }
        let text = get_str(raw, key)?;
        parse_datetime(text).ok_or_else(|| MappingError::invalid(key, text))
    }
}

impl ExchangeParser for BinanceParser {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn is_trade(&self, raw: &Value) -> bool {
        has_field(raw, "isBuyer")
    }

    fn is_deposit(&self, raw: &Value) -> bool {
        has_field(raw, "insertTime")
    }

    fn is_withdrawal(&self, raw: &Value) -> bool {
        has_field(raw, "applyTime")
    }

    fn get_coins_amount_traded(&self, raw: &Value) -> Result<Option<RawTrade>, MappingError> {
        let (base, quote) = Self::split_market(get_str(raw, "symbol")?)?;
        let quantity = get_decimal(raw, "qty")?;
        let total = multiply(get_decimal(raw, "price")?, quantity, "price")?;

        let mut trade = RawTrade {
            buy: RawAmount::new(&base, quantity),
            sell: RawAmount::new(&quote, total),
        };
        if !get_bool(raw, "isBuyer")? {
            std::mem::swap(&mut trade.buy, &mut trade.sell);
        }
        Ok(Some(trade))
    }

    fn get_coin_moved(&self, raw: &Value) -> Result<RawAmount, MappingError> {
        Ok(RawAmount::new(get_str(raw, "asset")?, get_decimal(raw, "amount")?))
    }

    fn get_commission(&self, raw: &Value) -> Result<Option<RawAmount>, MappingError> {
        if !has_field(raw, "commissionAsset") {
            return Ok(None);
        }
        let fee = RawAmount::new(get_str(raw, "commissionAsset")?, get_decimal(raw, "commission")?);
        Ok(Some(fee))
    }

    fn get_date(&self, raw: &Value) -> Result<DateTime<Utc>, MappingError> {
        if self.is_trade(raw) {
            return Self::get_millis_date(raw, "time");
        }
        if self.is_deposit(raw) {
            return Self::get_millis_date(raw, "insertTime");
        }
        if self.is_withdrawal(raw) {
            if has_field(raw, "successTime") {
                return Self::get_millis_date(raw, "successTime");
            }
            return Self::get_millis_date(raw, "applyTime");
        }
        Err(MappingError::UnknownKind)
    }

    fn is_successful(&self, raw: &Value) -> bool {
        if self.is_trade(raw) {
            return has_field(raw, "commission");
        }
        if self.is_deposit(raw) {
            return get_i64(raw, "status").is_ok_and(|status| status == 1);
        }
        if self.is_withdrawal(raw) {
            return get_i64(raw, "status").is_ok_and(|status| status == 6);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::{
        api::parse_transaction,
        structs::{Coin, CoinRegistry, TransactionKind},
    };

    use super::*;

    #[test]
    fn test_split_market() {
        assert_eq!(BinanceParser::split_market("ETHUSDT").unwrap(), ("ETH".to_string(), "USDT".to_string()));
        assert_eq!(BinanceParser::split_market("ethbtc").unwrap(), ("ETH".to_string(), "BTC".to_string()));
        assert_eq!(BinanceParser::split_market("IOTABNB").unwrap(), ("IOTA".to_string(), "BNB".to_string()));
        assert!(BinanceParser::split_market("BTC").is_err());
        assert!(BinanceParser::split_market("USDT").is_err());
    }

    #[test]
    fn test_buy_trade_with_commission() {
        let registry = CoinRegistry::bundled().unwrap();
        let raw = json!({
            "symbol": "ETHUSDT", "id": 28457, "isBuyer": true, "qty": "2", "price": "3000",
            "time": "1700000000000", "commissionAsset": "BNB", "commission": "0.01"
        });
        let tx = parse_transaction(&BinanceParser, raw, &registry).unwrap().unwrap();

        assert_eq!(tx.kind, TransactionKind::Trade);
        assert!(tx.successful);
        assert_eq!(tx.id, "binance-28457");
        assert_eq!(tx.date.timestamp(), 1_700_000_000);
        assert_eq!(tx.amount(&Coin::new("ETH")), dec!(2));
        assert_eq!(tx.amount(&Coin::new("USDT")), dec!(-6000));
        assert_eq!(tx.amount(&Coin::new("BNB")), dec!(-0.01));
    }

    #[test]
    fn test_sell_trade_swaps_legs() {
        let registry = CoinRegistry::bundled().unwrap();
        let raw = json!({
            "symbol": "IOTABTC", "isBuyer": false, "qty": "100", "price": "0.0001",
            "time": 1514764800000i64, "commissionAsset": "BTC", "commission": "0.00001"
        });
        let tx = parse_transaction(&BinanceParser, raw, &registry).unwrap().unwrap();

        assert_eq!(tx.coin_buy().unwrap().symbol, "BTC");
        assert_eq!(tx.coin_sell().unwrap().symbol, "IOTA");
        assert_eq!(tx.amount(&Coin::new("BTC")), dec!(0.00999));
        assert_eq!(tx.amount(&Coin::new("IOTA")), dec!(-100));
    }

    #[test]
    fn test_trade_without_commission_is_not_successful() {
        let registry = CoinRegistry::bundled().unwrap();
        let raw = json!({"symbol": "BNBBTC", "isBuyer": true, "qty": "1", "price": "0.001", "time": 1514764800000i64});
        let tx = parse_transaction(&BinanceParser, raw, &registry).unwrap().unwrap();
        assert!(!tx.successful);
        assert!(tx.commission.is_none());
    }

    #[test]
    fn test_deposit_and_withdrawal() {
        let registry = CoinRegistry::bundled().unwrap();
        let deposit = json!({"insertTime": 1514764800000i64, "amount": 1.5, "asset": "ETH", "txId": "0xabc", "status": 1});
        let withdrawal = json!({"applyTime": 1514764800000i64, "successTime": 1514768400000i64, "amount": "0.5", "asset": "ETH", "status": 6});
        let pending = json!({"applyTime": "2018-01-01 00:00:00", "amount": "0.5", "asset": "ETH", "status": 4});

        let deposit = parse_transaction(&BinanceParser, deposit, &registry).unwrap().unwrap();
        assert_eq!(deposit.kind, TransactionKind::Deposit);
        assert!(deposit.successful);
        assert_eq!(deposit.id, "binance-0xabc");
        assert_eq!(deposit.amount(&Coin::new("ETH")), dec!(1.5));

        let withdrawal = parse_transaction(&BinanceParser, withdrawal, &registry).unwrap().unwrap();
        assert_eq!(withdrawal.kind, TransactionKind::Withdrawal);
        assert!(withdrawal.successful);
        assert_eq!(withdrawal.date.timestamp(), 1_514_768_400);
        assert_eq!(withdrawal.amount(&Coin::new("ETH")), dec!(-0.5));

        let pending = parse_transaction(&BinanceParser, pending, &registry).unwrap().unwrap();
        assert!(!pending.successful);
        assert_eq!(pending.date.timestamp(), 1_514_764_800);
    }
}
