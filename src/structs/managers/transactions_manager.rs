use hashbrown::HashSet;

use crate::structs::{Transaction, TransactionId};

/* This transaction manager merges the transactions read from several files. The id comes from the exchange
when it has one, so reading the same export twice does not count its transactions twice. */
#[derive(Debug, Default)]
pub struct TransactionManager {
    transactions: Vec<Transaction>,
    hash_set: HashSet<TransactionId>,
}

impl TransactionManager {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn get(&self) -> &Vec<Transaction> {
        return &self.transactions;
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /* Add transaction by avoiding duplicates, returns false for a duplicate */
    pub fn push(&mut self, tx: Transaction) -> bool {
        if self.hash_set.insert(tx.id.clone()) {
            self.transactions.push(tx);
            return true;
        }
        log::debug!("Skipping duplicated transaction {}", tx.id);
        return false;
    }

    /* Extends transaction by avoiding duplicates */
    pub fn extend(&mut self, txs: Vec<Transaction>) {
        for tx in txs {
            self.push(tx);
        }
    }

    /* Stable: transactions at the same instant keep the order they were read in */
    pub fn sort(&mut self) {
        self.transactions.sort_by(|a, b| a.date.cmp(&b.date))
    }

    pub fn into_sorted(mut self) -> Vec<Transaction> {
        self.sort();
        return self.transactions;
    }
}
