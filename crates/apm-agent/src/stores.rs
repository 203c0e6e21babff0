// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Registry of in-flight transactions.
//!
//! Transactions are keyed by name: a name can be registered once until the
//! store is reset. Listing and draining return transactions in the order they
//! were registered, which is the order they are flushed in.

use std::collections::HashMap;

use crate::error::AgentError;
use crate::events::transaction::Transaction;

#[derive(Debug, Default)]
pub struct TransactionsStore {
    index: HashMap<String, usize>,
    transactions: Vec<Transaction>,
}

impl TransactionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `transaction` under its name and returns the stored entry.
    ///
    /// Fails with `DuplicateTransactionName` if the name is taken, leaving
    /// the store untouched.
    pub fn register(&mut self, transaction: Transaction) -> Result<&mut Transaction, AgentError> {
        let name = transaction.name();
        if self.index.contains_key(name) {
            return Err(AgentError::DuplicateTransactionName(name.to_string()));
        }

        let position = self.transactions.len();
        self.index.insert(name.to_string(), position);
        self.transactions.push(transaction);
        Ok(&mut self.transactions[position])
    }

    pub fn fetch(&self, name: &str) -> Option<&Transaction> {
        self.index.get(name).map(|&i| &self.transactions[i])
    }

    pub fn fetch_mut(&mut self, name: &str) -> Option<&mut Transaction> {
        self.index.get(name).map(|&i| &mut self.transactions[i])
    }

    /// All registered transactions, oldest first.
    pub fn list(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Removes and returns every transaction, oldest first.
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.index.clear();
        std::mem::take(&mut self.transactions)
    }

    pub fn reset(&mut self) {
        self.index.clear();
        self.transactions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}
