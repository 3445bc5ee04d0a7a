use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::{
    errors::SnapshotError,
    utils::{datetime_to_str, file_exists, nan_sum, parse_datetime},
};

use super::{managers::Persistable, BalanceEntry, DATE_TIME_KEY};

/* One coin line of a saved report. Values without a JSON number form are written as
null and read back as NaN. */
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default, deserialize_with = "nan_if_null")]
    pub balance: f64,
    #[serde(default, deserialize_with = "nan_if_null")]
    pub val: f64,
    #[serde(default, deserialize_with = "nan_if_null")]
    pub price: f64,
    #[serde(default, deserialize_with = "nan_if_null")]
    pub percentage: f64,
}

fn nan_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn number_or_null(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

impl SnapshotEntry {
    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("balance".to_string(), number_or_null(self.balance));
        map.insert("val".to_string(), number_or_null(self.val));
        map.insert("price".to_string(), number_or_null(self.price));
        map.insert("percentage".to_string(), number_or_null(self.percentage));
        Value::Object(map)
    }
}

impl From<&BalanceEntry> for SnapshotEntry {
    fn from(entry: &BalanceEntry) -> Self {
        SnapshotEntry {
            balance: entry.balance.to_f64().unwrap_or(f64::NAN),
            val: entry.fiat_value,
            price: entry.price,
            percentage: entry.percentage,
        }
    }
}

/* Report of a previous run, used to compute deltas. On disk it is a flat JSON object:
one key per coin symbol plus the reserved `datetime` key. */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Snapshot {
    pub datetime: DateTime<Utc>,
    pub entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new(datetime: DateTime<Utc>, entries: BTreeMap<String, SnapshotEntry>) -> Self {
        Snapshot { datetime, entries }
    }

    pub fn from_entries(entries: &[BalanceEntry], datetime: DateTime<Utc>) -> Self {
        let entries = entries
            .iter()
            .map(|e| (e.symbol.clone(), SnapshotEntry::from(e)))
            .collect();
        Snapshot { datetime, entries }
    }

    /* Total fiat value, unknown values left out */
    pub fn total(&self) -> f64 {
        nan_sum(self.entries.values().map(|e| e.val))
    }

    /* A missing file is not an error, an unreadable one is */
    pub fn read(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !file_exists(path) {
            log::info!("No previous balance at {}", path.display());
            return Ok(None);
        }
        return Self::load(path).map(Some).map_err(|e| SnapshotError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        });
    }

    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        self.save(path)?;
        log::info!("Saved balance to {}", path.display());
        Ok(())
    }
}

impl Persistable for Snapshot {}

impl TryFrom<Map<String, Value>> for Snapshot {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let datetime = match map.remove(DATE_TIME_KEY) {
            Some(Value::String(raw)) => {
                parse_datetime(&raw).ok_or_else(|| format!("invalid {DATE_TIME_KEY} {raw}"))?
            }
            _ => return Err(format!("missing {DATE_TIME_KEY}")),
        };
        let mut entries = BTreeMap::new();
        for (symbol, value) in map {
            let entry: SnapshotEntry =
                serde_json::from_value(value).map_err(|e| format!("entry {symbol}: {e}"))?;
            entries.insert(symbol, entry);
        }
        Ok(Snapshot { datetime, entries })
    }
}

impl From<Snapshot> for Map<String, Value> {
    fn from(snapshot: Snapshot) -> Self {
        let mut map = Map::new();
        for (symbol, entry) in snapshot.entries {
            // an entry without a fiat value says nothing to compare against
            if !entry.val.is_finite() {
                continue;
            }
            map.insert(symbol, entry.to_json());
        }
        map.insert(
            DATE_TIME_KEY.to_string(),
            Value::String(datetime_to_str(&snapshot.datetime)),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 2, 3, 12, 30, 0).unwrap()
    }

    fn entry(symbol: &str, val: f64) -> BalanceEntry {
        BalanceEntry {
            symbol: symbol.to_string(),
            balance: dec!(1.5),
            fiat_value: val,
            price: val / 1.5,
            percentage: 50.0,
        }
    }

    #[test]
    fn test_write_then_read_drops_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BinanceBalance.json");
        let snapshot = Snapshot::from_entries(
            &[entry("BTC", 15000.0), entry("IOTA", f64::NAN), entry("ETH", 1234.5678)],
            date(),
        );
        snapshot.write(&path).unwrap();

        let read = Snapshot::read(&path).unwrap().unwrap();
        assert_eq!(read.datetime, date());
        assert_eq!(read.entries.len(), 2);
        assert_eq!(read.entries["BTC"], snapshot.entries["BTC"]);
        assert_eq!(read.entries["ETH"], snapshot.entries["ETH"]);
        assert!(!read.entries.contains_key("IOTA"));
        assert_eq!(read.total(), 15000.0 + 1234.5678);
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        Snapshot::from_entries(&[entry("BTC", 3.0)], date()).write(&path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["datetime"], "2018-02-03 12:30:00 +0000");
        assert_eq!(raw["BTC"]["val"], 3.0);
        assert_eq!(raw["BTC"]["balance"], 1.5);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Snapshot::read(&dir.path().join("nothing.json")).unwrap().is_none());
    }

    #[test]
    fn test_read_partial_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        std::fs::write(&path, r#"{"BTC": {"val": 10000}, "datetime": "2018-01-01 00:00:00 +0100"}"#).unwrap();

        let read = Snapshot::read(&path).unwrap().unwrap();
        assert_eq!(read.datetime, Utc.with_ymd_and_hms(2017, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(read.entries["BTC"].val, 10000.0);
        assert_eq!(read.entries["BTC"].balance, 0.0);
    }

    #[test]
    fn test_read_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Snapshot::read(&path), Err(SnapshotError::Invalid { .. })));

        std::fs::write(&path, r#"{"BTC": {"val": 1}}"#).unwrap();
        assert!(matches!(Snapshot::read(&path), Err(SnapshotError::Invalid { .. })));

        std::fs::write(&path, r#"{"BTC": 3, "datetime": "2018-01-01 00:00:00 +0000"}"#).unwrap();
        assert!(matches!(Snapshot::read(&path), Err(SnapshotError::Invalid { .. })));
    }

    #[test]
    fn test_read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        Snapshot::from_entries(&[entry("BTC", 3.0)], date()).write(&path).unwrap();
        let read = Snapshot::read(&path).unwrap();
        assert!(matches!(read, Some(ref s) if s.entries.len() == 1));
    }

    #[test]
    fn test_non_finite_fields_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balance.json");
        let mut entries = BTreeMap::new();
        entries.insert(
            "BTC".to_string(),
            SnapshotEntry {
                balance: 1.0,
                val: 10.0,
                price: f64::INFINITY,
                percentage: f64::NAN,
            },
        );
        entries.insert(
            "ETH".to_string(),
            SnapshotEntry {
                balance: 2.0,
                val: f64::INFINITY,
                price: 1.0,
                percentage: 50.0,
            },
        );
        Snapshot::new(date(), entries).write(&path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["BTC"]["price"], Value::Null);

        let read = Snapshot::read(&path).unwrap().unwrap();
        assert_eq!(read.entries.len(), 1);
        let btc = &read.entries["BTC"];
        assert_eq!(btc.balance, 1.0);
        assert_eq!(btc.val, 10.0);
        assert!(btc.price.is_nan());
        assert!(btc.percentage.is_nan());
        assert_eq!(read.total(), 10.0);
    }
}
