use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::errors::IoError;

/* Bundled coin database: canonical symbol, long name and aliases (other symbols or names) */
const COINS_DATABASE: &str = include_str!("../../data/coins.json");

/* Supported fiat coins, everything else is considered crypto */
pub const FIAT_COINS: [&str; 2] = ["USD", "EUR"];
pub const DEFAULT_FIAT: &str = "USD";

/* A coin is identified by its uppercase symbol. Exchanges do not agree on symbols
(IOT on Bitfinex is IOTA everywhere else), so two coins are also equal when their long
names match or when any of their aliases overlap.

This equality is not transitive in general, so Coin is deliberately not Hash:
maps are keyed by the canonical symbol returned by CoinRegistry::resolve. */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub symbol: String,
    pub name: Option<String>,
    #[serde(default)]
    pub other_names: Vec<String>,
}

impl Coin {
    pub fn new(symbol: &str) -> Self {
        Coin {
            symbol: symbol.trim().to_uppercase(),
            name: None,
            other_names: Vec::new(),
        }
    }

    pub fn crypto(symbol: &str, name: Option<&str>, other_names: &[&str]) -> Self {
        Coin {
            symbol: symbol.trim().to_uppercase(),
            name: name.map(|n| n.trim().to_lowercase()),
            other_names: other_names.iter().map(|n| n.trim().to_lowercase()).collect(),
        }
    }

    /* Every lowercase identifier this coin answers to */
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.other_names.iter().map(|n| n.as_str())
    }

    fn has_same_names(&self, other: &Coin) -> bool {
        if let Some(name) = &self.name {
            if other.other_names.contains(name) {
                return true;
            }
        }
        let symbol = self.symbol.to_lowercase();
        if other.other_names.contains(&symbol) {
            return true;
        }
        self.other_names.iter().any(|n| other.other_names.contains(n))
    }
}

impl PartialEq for Coin {
    fn eq(&self, other: &Self) -> bool {
        if self.symbol == other.symbol {
            return true;
        }
        if let (Some(name), Some(other_name)) = (&self.name, &other.name) {
            if name == other_name {
                return true;
            }
        }
        self.has_same_names(other) || other.has_same_names(self)
    }
}

impl PartialEq<str> for Coin {
    fn eq(&self, other: &str) -> bool {
        *self == Coin::new(other)
    }
}

impl PartialEq<&str> for Coin {
    fn eq(&self, other: &&str) -> bool {
        *self == Coin::new(other)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[derive(Debug, Deserialize)]
struct RawCoin {
    symbol: String,
    name: Option<String>,
    #[serde(default)]
    other_names: Vec<String>,
}

/* Process-wide immutable table, built once before any parsing and passed by reference */
#[derive(Debug, Clone)]
pub struct CoinRegistry {
    coins: Vec<Coin>,
    index: HashMap<String, usize>,
    fiat: Vec<Coin>,
}

impl CoinRegistry {
    pub fn bundled() -> Result<Self, IoError> {
        Self::from_json(COINS_DATABASE)
    }

    pub fn from_json(content: &str) -> Result<Self, IoError> {
        let raw: Vec<RawCoin> = serde_json::from_str(content)?;
        let coins = raw
            .into_iter()
            .map(|c| {
                let other_names: Vec<&str> = c.other_names.iter().map(|n| n.as_str()).collect();
                Coin::crypto(&c.symbol, c.name.as_deref(), &other_names)
            })
            .collect();
        Ok(Self::new(coins))
    }

    pub fn new(coins: Vec<Coin>) -> Self {
        let mut index = HashMap::new();
        for (i, coin) in coins.iter().enumerate() {
            index.entry(coin.symbol.clone()).or_insert(i);
        }
        // Aliases never shadow a canonical symbol
        for (i, coin) in coins.iter().enumerate() {
            for alias in coin.aliases() {
                index.entry(alias.to_uppercase()).or_insert(i);
            }
        }
        let mut registry = CoinRegistry {
            coins,
            index,
            fiat: Vec::new(),
        };
        registry.fiat = FIAT_COINS.iter().map(|s| registry.resolve(s)).collect();
        registry
    }

    /* Canonical coin for a symbol (any case, any known alias). Unknown symbols are not
    an error: they become a bare coin carrying just the symbol. */
    pub fn resolve(&self, symbol: &str) -> Coin {
        let key = symbol.trim().to_uppercase();
        match self.index.get(&key) {
            Some(i) => self.coins[*i].clone(),
            None => {
                log::debug!("Unknown coin {key}, keeping it as is");
                Coin::new(&key)
            }
        }
    }

    pub fn is_fiat(&self, coin: &Coin) -> bool {
        self.fiat.iter().any(|fiat| fiat == coin)
    }

    pub fn is_crypto(&self, coin: &Coin) -> bool {
        !self.is_fiat(coin)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}
