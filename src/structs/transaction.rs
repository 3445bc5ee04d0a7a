use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::MappingError, utils::generate_id};

use super::Coin;

pub type TransactionId = String;

/* Every observable money movement on an exchange is one of these */
#[derive(Hash, Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TransactionKind {
    Trade,
    Deposit,
    Withdrawal,
    Commission,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TransactionKind::Trade => "TRADE",
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Commission => "COMMISSION",
        };
        write!(f, "{name}")
    }
}

/* One leg of a transaction. The amount is never negative, the direction is given by
the leg (buy or sell) the amount sits in. */
#[derive(PartialEq, Debug, Clone)]
pub struct CoinAmount {
    pub coin: Coin,
    pub amount: Decimal,
}

impl CoinAmount {
    pub fn new(coin: Coin, amount: Decimal) -> Self {
        CoinAmount {
            coin,
            amount: amount.abs(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == dec!(0)
    }
}

/* Zero-amount legs are the same as no leg at all */
fn non_zero(leg: Option<CoinAmount>) -> Option<CoinAmount> {
    leg.filter(|l| !l.is_zero())
}

/* The atomic ledger record, independent of the exchange it was read from.

- Trade: both legs, on different coins, and maybe a commission
- Deposit: only the buy leg
- Withdrawal: only the sell leg
- Commission: only the sell leg (the fee)

Failed or pending records are kept (successful = false) but wallets ignore them. */
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub raw: Value,
    pub kind: TransactionKind,
    pub buy: Option<CoinAmount>,
    pub sell: Option<CoinAmount>,
    pub date: DateTime<Utc>,
    pub successful: bool,
    pub commission: Option<Box<Transaction>>,
}

impl Transaction {
    pub fn new(
        kind: TransactionKind,
        buy: Option<CoinAmount>,
        sell: Option<CoinAmount>,
        date: DateTime<Utc>,
    ) -> Result<Self, MappingError> {
        let buy = non_zero(buy);
        let sell = non_zero(sell);
        match (kind, &buy, &sell) {
            (TransactionKind::Trade, Some(bought), Some(sold)) => {
                if bought.coin == sold.coin {
                    return Err(MappingError::InvalidTransaction(format!(
                        "trade buys and sells the same coin {}",
                        bought.coin
                    )));
                }
            }
            (TransactionKind::Trade, _, _) => {
                return Err(MappingError::InvalidTransaction(String::from(
                    "trade needs a bought and a sold leg",
                )))
            }
            (TransactionKind::Deposit, Some(_), None) => (),
            (TransactionKind::Withdrawal, None, Some(_))
            | (TransactionKind::Commission, None, Some(_)) => (),
            (kind, _, _) => {
                return Err(MappingError::InvalidTransaction(format!(
                    "{kind} has unexpected legs"
                )))
            }
        }
        Ok(Transaction {
            id: generate_id(),
            raw: Value::Null,
            kind,
            buy,
            sell,
            date,
            successful: true,
            commission: None,
        })
    }

    pub fn trade(bought: CoinAmount, sold: CoinAmount, date: DateTime<Utc>) -> Result<Self, MappingError> {
        Self::new(TransactionKind::Trade, Some(bought), Some(sold), date)
    }

    pub fn deposit(amount: CoinAmount, date: DateTime<Utc>) -> Result<Self, MappingError> {
        Self::new(TransactionKind::Deposit, Some(amount), None, date)
    }

    pub fn withdrawal(amount: CoinAmount, date: DateTime<Utc>) -> Result<Self, MappingError> {
        Self::new(TransactionKind::Withdrawal, None, Some(amount), date)
    }

    /* A fee of zero is no fee: returns None */
    pub fn commission(fee: CoinAmount, date: DateTime<Utc>, successful: bool) -> Option<Self> {
        Self::new(TransactionKind::Commission, None, Some(fee), date)
            .ok()
            .map(|c| c.with_successful(successful))
    }

    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_successful(mut self, successful: bool) -> Self {
        self.successful = successful;
        self
    }

    pub fn with_commission(mut self, commission: Option<Transaction>) -> Self {
        self.commission = commission
            .filter(|c| c.kind == TransactionKind::Commission)
            .map(Box::new);
        self
    }

    pub fn coin_buy(&self) -> Option<&Coin> {
        self.buy.as_ref().map(|l| &l.coin)
    }

    pub fn coin_sell(&self) -> Option<&Coin> {
        self.sell.as_ref().map(|l| &l.coin)
    }

    /* The fee paid by this record: its own leg for a commission, the embedded one otherwise */
    pub fn fee(&self) -> Option<&CoinAmount> {
        match self.kind {
            TransactionKind::Commission => self.sell.as_ref(),
            _ => self.commission.as_ref().and_then(|c| c.sell.as_ref()),
        }
    }

    pub fn amount_traded(&self, coin: &Coin) -> Decimal {
        let mut amount = dec!(0);
        if self.kind != TransactionKind::Trade {
            return amount;
        }
        if let Some(bought) = self.buy.as_ref().filter(|l| l.coin == *coin) {
            amount += bought.amount;
        }
        if let Some(sold) = self.sell.as_ref().filter(|l| l.coin == *coin) {
            amount -= sold.amount;
        }
        if let Some(fee) = self.fee().filter(|l| l.coin == *coin) {
            amount -= fee.amount;
        }
        amount
    }

    pub fn amount_moved(&self, coin: &Coin) -> Decimal {
        match (self.kind, &self.buy, &self.sell) {
            (TransactionKind::Deposit, Some(bought), _) if bought.coin == *coin => bought.amount,
            (TransactionKind::Withdrawal, _, Some(sold)) if sold.coin == *coin => -sold.amount,
            _ => dec!(0),
        }
    }

    pub fn amount_commission(&self, coin: &Coin) -> Decimal {
        match (self.kind, self.fee()) {
            (TransactionKind::Commission, Some(fee)) if fee.coin == *coin => -fee.amount,
            _ => dec!(0),
        }
    }

    /* Signed delta the wallet of `coin` has to apply */
    pub fn amount(&self, coin: &Coin) -> Decimal {
        self.amount_traded(coin) + self.amount_moved(coin) + self.amount_commission(coin)
    }

    /* Coins touched by this record, without duplicates */
    pub fn coins(&self) -> Vec<&Coin> {
        let mut coins: Vec<&Coin> = Vec::with_capacity(3);
        let candidates = [self.coin_buy(), self.coin_sell(), self.fee().map(|l| &l.coin)];
        for coin in candidates.into_iter().flatten() {
            if !coins.iter().any(|c| c.symbol == coin.symbol) {
                coins.push(coin);
            }
        }
        coins
    }

    pub fn involves(&self, coin: &Coin) -> bool {
        self.coins().into_iter().any(|c| c == coin)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} on {}", self.kind, self.date)?;
        if let Some(bought) = &self.buy {
            write!(f, " +{} {}", bought.amount, bought.coin)?;
        }
        if let Some(sold) = &self.sell {
            write!(f, " -{} {}", sold.amount, sold.coin)?;
        }
        if let Some(fee) = self.commission.as_ref().and_then(|c| c.sell.as_ref()) {
            write!(f, " (paying {} {} as fee)", fee.amount, fee.coin)?;
        }
        if !self.successful {
            write!(f, " [not successful]")?;
        }
        Ok(())
    }
}
