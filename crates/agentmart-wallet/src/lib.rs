//! Agentmart Wallet - account-keyed ledger for marketplace billing
//!
//! The wallet is:
//! - Account-keyed by AccountId
//! - Append-only (entries are never rewritten or deleted)
//! - Memo-linked (every entry carries a human-readable memo; debit memos
//!   reference the agent slug and request that earned the charge)
//!
//! # Invariants
//!
//! 1. No negative balances: `debit` is an atomic conditional decrement under
//!    one write lock, so a stale best-effort balance check upstream can never
//!    push an account below zero
//! 2. Every entry has a memo
//! 3. Entries record the balance after application

use std::collections::HashMap;
use std::sync::Arc;

use agentmart_types::{AccountId, Amount, Currency, EntryId, MartError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Direction of a wallet entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Increase to an account
    Credit,
    /// Decrease from an account
    Debit,
}

/// A single wallet ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: EntryId,
    pub account: AccountId,
    pub kind: EntryKind,
    pub amount: Amount,
    pub balance_after: Amount,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

/// Account state in the wallet ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: Amount,
    pub entry_count: u64,
}

/// The agentmart wallet ledger
///
/// Thread-safe and designed for concurrent access.
#[derive(Clone, Default)]
pub struct Wallet {
    accounts: Arc<RwLock<HashMap<AccountId, AccountState>>>,
    entries: Arc<RwLock<Vec<WalletEntry>>>,
}

impl Wallet {
    /// Create a new in-memory wallet ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the balance of an account
    ///
    /// Accounts with no history have a zero balance in the requested
    /// currency.
    pub async fn balance(&self, account: &AccountId, currency: Currency) -> Amount {
        let accounts = self.accounts.read().await;
        accounts
            .get(account)
            .map(|a| a.balance)
            .unwrap_or_else(|| Amount::zero(currency))
    }

    /// Best-effort balance check (read-only, no hold is taken)
    ///
    /// Two concurrent submissions can both pass this check before either
    /// debits; `debit` is the operation that actually guards the balance.
    pub async fn has_sufficient_balance(&self, account: &AccountId, amount: &Amount) -> bool {
        let accounts = self.accounts.read().await;
        match accounts.get(account) {
            Some(state) => state.balance >= *amount,
            None => amount.is_zero(),
        }
    }

    /// Credit an account (increase balance)
    ///
    /// Returns the new balance and the entry ID.
    pub async fn credit(
        &self,
        account: &AccountId,
        amount: Amount,
        memo: impl Into<String>,
    ) -> Result<(Amount, EntryId)> {
        if !amount.is_positive() {
            return Err(MartError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let mut entries = self.entries.write().await;

        let state = accounts.entry(account.clone()).or_insert_with(|| AccountState {
            balance: Amount::zero(amount.currency),
            entry_count: 0,
        });

        let new_balance = state.balance.checked_add(amount)?;

        let entry = WalletEntry {
            id: EntryId::new(),
            account: account.clone(),
            kind: EntryKind::Credit,
            amount,
            balance_after: new_balance,
            memo: memo.into(),
            created_at: Utc::now(),
        };

        state.balance = new_balance;
        state.entry_count += 1;

        let entry_id = entry.id.clone();
        debug!(account = %account, amount = %amount, balance = %new_balance, "credit applied");
        entries.push(entry);

        Ok((new_balance, entry_id))
    }

    /// Debit an account (decrease balance)
    ///
    /// Atomic conditional decrement: the balance check and the write happen
    /// under the same lock, and the debit fails with `InsufficientBalance` if
    /// the balance is inadequate. This is the defensive double-check behind
    /// the best-effort check at submission time.
    pub async fn debit(
        &self,
        account: &AccountId,
        amount: Amount,
        memo: impl Into<String>,
    ) -> Result<(Amount, EntryId)> {
        if !amount.is_positive() {
            return Err(MartError::InvalidAmount {
                message: "Amount must be greater than zero".to_string(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let mut entries = self.entries.write().await;

        let state = accounts.get_mut(account).ok_or_else(|| MartError::WalletNotFound {
            account: account.to_string(),
        })?;

        if state.balance < amount {
            return Err(MartError::InsufficientBalance {
                account: account.to_string(),
                requested: amount.to_human(),
                available: state.balance.to_human(),
            });
        }
        let new_balance = state.balance.checked_sub(amount)?;

        let entry = WalletEntry {
            id: EntryId::new(),
            account: account.clone(),
            kind: EntryKind::Debit,
            amount,
            balance_after: new_balance,
            memo: memo.into(),
            created_at: Utc::now(),
        };

        state.balance = new_balance;
        state.entry_count += 1;

        let entry_id = entry.id.clone();
        debug!(account = %account, amount = %amount, balance = %new_balance, "debit applied");
        entries.push(entry);

        Ok((new_balance, entry_id))
    }

    /// Get all entries for an account (oldest first)
    pub async fn account_entries(&self, account: &AccountId) -> Vec<WalletEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect()
    }

    /// Get recent entries across all accounts (newest first)
    pub async fn recent_entries(&self, limit: usize) -> Vec<WalletEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Get the total number of entries
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
