use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use crate::{errors::MappingError, utils::parse_datetime};

use super::{get_decimal, get_field, get_str, ExchangeParser, RawAmount, RawTrade};

const ENTRIES_KEY: &str = "entries";

/* GDAX account ledger. Each ledger line moves a single coin: the two sides of a trade
(`match` lines) and its fee (`fee` line) share `details.trade_id` and are merged into one
record before mapping. */
pub struct GdaxParser;

impl GdaxParser {
    fn get_details(raw: &Value) -> Option<&Value> {
        raw.get("details").filter(|d| d.is_object())
    }

    fn get_trade_id(raw: &Value) -> Option<String> {
        let id = Self::get_details(raw)?.get("trade_id")?;
        match id {
            Value::String(id) => Some(id.to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    fn get_transfer_type(raw: &Value) -> Option<&str> {
        if raw.get("type").and_then(|t| t.as_str()) != Some("transfer") {
            return None;
        }
        Self::get_details(raw)?.get("transfer_type")?.as_str()
    }

    fn is_fee_line(raw: &Value) -> bool {
        raw.get("type").and_then(|t| t.as_str()) == Some("fee")
    }

    fn get_line_amount(raw: &Value) -> Result<(RawAmount, bool), MappingError> {
        let amount = get_decimal(raw, "amount")?;
        Ok((RawAmount::new(get_str(raw, "currency")?, amount), amount >= dec!(0)))
    }

    fn get_entries(raw: &Value) -> Result<&Vec<Value>, MappingError> {
        let entries = get_field(raw, ENTRIES_KEY)?;
        entries.as_array().ok_or_else(|| MappingError::invalid(ENTRIES_KEY, entries))
    }
}

impl ExchangeParser for GdaxParser {
    fn name(&self) -> &'static str {
        "gdax"
    }

    fn is_trade(&self, raw: &Value) -> bool {
        Self::get_details(raw).is_some_and(|d| d.get("product_id").is_some())
    }

    fn is_deposit(&self, raw: &Value) -> bool {
        Self::get_transfer_type(raw) == Some("deposit")
    }

    fn is_withdrawal(&self, raw: &Value) -> bool {
        Self::get_transfer_type(raw) == Some("withdraw")
    }

    fn get_coins_amount_traded(&self, raw: &Value) -> Result<Option<RawTrade>, MappingError> {
        let mut buy = None;
        let mut sell = None;
        for entry in Self::get_entries(raw)?.iter().filter(|e| !Self::is_fee_line(e)) {
            match Self::get_line_amount(entry)? {
                (amount, true) => buy = Some(amount),
                (amount, false) => sell = Some(amount),
            }
        }
        match (buy, sell) {
            (Some(buy), Some(sell)) => Ok(Some(RawTrade { buy, sell })),
            _ => Err(MappingError::InvalidTransaction(String::from(
                "trade without both a bought and a sold ledger line",
            ))),
        }
    }

    fn get_coin_moved(&self, raw: &Value) -> Result<RawAmount, MappingError> {
        Ok(Self::get_line_amount(raw)?.0)
    }

    fn get_commission(&self, raw: &Value) -> Result<Option<RawAmount>, MappingError> {
        if !self.is_trade(raw) {
            return Ok(None);
        }
        match Self::get_entries(raw)?.iter().find(|e| Self::is_fee_line(e)) {
            Some(fee) => Ok(Some(Self::get_line_amount(fee)?.0)),
            None => Ok(None),
        }
    }

    fn get_date(&self, raw: &Value) -> Result<DateTime<Utc>, MappingError> {
        let text = get_str(raw, "created_at")?;
        parse_datetime(text).ok_or_else(|| MappingError::invalid("created_at", text))
    }

    fn is_successful(&self, _raw: &Value) -> bool {
        true
    }

    fn get_id(&self, raw: &Value) -> Option<String> {
        if let Some(trade_id) = Self::get_trade_id(raw) {
            return Some(format!("trade-{trade_id}"));
        }
        raw.get("id").and_then(|id| id.as_str()).map(|id| id.to_string())
    }

    /* Ledger lines sharing a trade id become one record `{created_at, type, details, entries}`,
    placed where the first of its lines was */
    fn group_records(&self, records: Vec<Value>) -> Vec<Value> {
        let mut grouped: Vec<Value> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for record in records {
            let trade_id = match Self::get_trade_id(&record) {
                Some(trade_id) if self.is_trade(&record) => trade_id,
                _ => {
                    grouped.push(record);
                    continue;
                }
            };
            match positions.get(&trade_id) {
                Some(position) => {
                    if let Some(entries) = grouped[*position].get_mut(ENTRIES_KEY).and_then(|e| e.as_array_mut()) {
                        entries.push(record);
                    }
                }
                None => {
                    let merged = json!({
                        "created_at": record.get("created_at").cloned().unwrap_or(Value::Null),
                        "type": "match",
                        "details": record.get("details").cloned().unwrap_or(Value::Null),
                        "entries": [record],
                    });
                    positions.insert(trade_id, grouped.len());
                    grouped.push(merged);
                }
            }
        }
        grouped
    }
}
