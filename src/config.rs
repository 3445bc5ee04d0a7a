use std::{env, path::PathBuf};

use crate::{api::API_CRYPTOCOMPARE_ENDPOINT, structs::DEFAULT_FIAT};

pub const DATA_FOLDER_VAR: &str = "CRYPTOFOLIO_DATA_FOLDER";
pub const HISTORICAL_FOLDER_VAR: &str = "CRYPTOFOLIO_HISTORICAL_FOLDER";
pub const BALANCE_FOLDER_VAR: &str = "CRYPTOFOLIO_BALANCE_FOLDER";
pub const FIAT_VAR: &str = "CRYPTOFOLIO_FIAT";
pub const PRICE_API_VAR: &str = "CRYPTOFOLIO_PRICE_API";

/* Folders and defaults of a run. Read from the environment (a .env file is loaded by
the binary beforehand); command-line flags take precedence. */
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_folder: PathBuf,
    pub historical_folder: PathBuf,
    pub balance_folder: PathBuf,
    pub fiat: String,
    pub price_api: String,
}

impl Config {
    pub fn from_env() -> Self {
        let root = home_folder().join(".cryptofolio");
        let data_folder = var(DATA_FOLDER_VAR).map(PathBuf::from).unwrap_or_else(|| root.join("data"));
        let historical_folder = var(HISTORICAL_FOLDER_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.join("historical"));
        let balance_folder = var(BALANCE_FOLDER_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_folder.clone());
        Config {
            data_folder,
            historical_folder,
            balance_folder,
            fiat: var(FIAT_VAR).unwrap_or_else(|| DEFAULT_FIAT.to_string()).to_uppercase(),
            price_api: var(PRICE_API_VAR).unwrap_or_else(|| API_CRYPTOCOMPARE_ENDPOINT.to_string()),
        }
    }
}

/* Unset and blank variables are the same */
fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn home_folder() -> PathBuf {
    env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}
