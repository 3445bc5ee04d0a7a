use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde_json::Value;

use crate::{
    api::{parse_records, Exchange},
    errors::{IoError, PortfolioError},
    structs::{CoinRegistry, CryptoExchange, Transaction, TransactionManager},
    utils::{list_files_recursive, read_file},
};

/* Records of one raw export. Most exchanges write a JSON list; Coinbase writes an
object with one list per account, flattened here in key order. */
pub fn read_records(path: &Path) -> Result<Vec<Value>, IoError> {
    let content = read_file(path)?;
    let data: Value = serde_json::from_str(&content)?;
    match data {
        Value::Array(records) => Ok(records),
        Value::Object(accounts) => Ok(accounts
            .into_iter()
            .filter_map(|(_, records)| match records {
                Value::Array(records) => Some(records),
                _ => None,
            })
            .flatten()
            .collect()),
        _ => Err(IoError::new(format!("{} is not a list of records", path.display()))),
    }
}

/* By file name first, then by the shape of the first record */
pub fn detect_exchange(path: &Path, records: &[Value]) -> Option<Exchange> {
    let by_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(Exchange::from_file_stem);
    by_name.or_else(|| records.first().and_then(Exchange::detect))
}

/* Transactions of one file, or None when the file is not an exchange export */
pub fn parse_file(path: &Path, registry: &CoinRegistry) -> Option<(Exchange, Vec<Transaction>)> {
    let records = match read_records(path) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("Skipping {}: {e}", path.display());
            return None;
        }
    };
    let Some(exchange) = detect_exchange(path, &records) else {
        log::warn!("Skipping {}: cannot identify the exchange", path.display());
        return None;
    };
    let count = records.len();
    let transactions = parse_records(exchange.parser(), records, registry);
    log::info!(
        "Read {} transactions out of {count} {exchange} records from {}",
        transactions.len(),
        path.display()
    );
    Some((exchange, transactions))
}

fn input_files(input: &Path) -> Result<Vec<PathBuf>, PortfolioError> {
    if !input.exists() {
        return Err(PortfolioError::InputNotFound(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let files = list_files_recursive(input).map_err(IoError::from)?;
    Ok(files
        .into_iter()
        .filter(|f| f.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .collect())
}

/* One CryptoExchange per exchange found under `input` (a file or a folder). Files of the
same exchange are merged without duplicating transactions. */
pub fn build_exchanges(input: &Path, registry: &CoinRegistry) -> Result<Vec<CryptoExchange>, PortfolioError> {
    let mut managers: HashMap<Exchange, TransactionManager> = HashMap::new();
    for file in input_files(input)? {
        if let Some((exchange, transactions)) = parse_file(&file, registry) {
            managers.entry(exchange).or_default().extend(transactions);
        }
    }

    let mut exchanges = Vec::new();
    for exchange in Exchange::ALL {
        let Some(manager) = managers.remove(&exchange) else {
            continue;
        };
        if manager.is_empty() {
            log::warn!("No transaction found for {exchange}");
            continue;
        }
        exchanges.push(CryptoExchange::new(exchange.name(), manager.into_sorted())?);
    }
    if exchanges.is_empty() {
        return Err(PortfolioError::EmptyPortfolio);
    }
    Ok(exchanges)
}

/* Every transaction found under `input`, all exchanges together, sorted by date */
pub fn get_transactions(input: &Path, registry: &CoinRegistry) -> Result<Vec<Transaction>, PortfolioError> {
    let mut manager = TransactionManager::new();
    for file in input_files(input)? {
        if let Some((_, transactions)) = parse_file(&file, registry) {
            manager.extend(transactions);
        }
    }
    if manager.is_empty() {
        return Err(PortfolioError::EmptyPortfolio);
    }
    Ok(manager.into_sorted())
}
