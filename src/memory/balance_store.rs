//! In-memory versioned balance store
//!
//! Balance rows live in a `DashMap`, so reads and conditional writes on
//! different accounts proceed in parallel while operations on the same row are
//! serialised by the map's shard locks. The version comparison and the write
//! happen under one entry lock, which is what makes `conditional_write` a
//! compare-and-swap.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::core::traits::BalanceStore;
use crate::types::{AccountBalance, AccountId, BalanceError, BalanceSnapshot, Version};

#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    rows: DashMap<AccountId, AccountBalance>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Insert or replace a row outright, bypassing the version check
    ///
    /// Intended for seeding; production writes go through
    /// [`BalanceStore::conditional_write`].
    pub fn insert(&self, account_id: AccountId, balance: Decimal, version: Version) {
        let mut row = AccountBalance::new(account_id, balance, "seed");
        row.version = version;
        self.rows.insert(account_id, row);
    }

    /// Copy of the current row
    pub fn get(&self, account_id: AccountId) -> Option<AccountBalance> {
        self.rows.get(&account_id).map(|row| row.value().clone())
    }

    /// Copy of every row, sorted by account
    pub fn all(&self) -> Vec<AccountBalance> {
        let mut rows: Vec<AccountBalance> =
            self.rows.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by_key(|row| row.account_id);
        rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn read(&self, account_id: AccountId) -> Result<Option<BalanceSnapshot>, BalanceError> {
        Ok(self
            .rows
            .get(&account_id)
            .map(|row| BalanceSnapshot::from(row.value())))
    }

    async fn conditional_write(
        &self,
        account_id: AccountId,
        new_balance: Decimal,
        expected_version: Version,
        operator: &str,
    ) -> Result<u64, BalanceError> {
        let Some(mut row) = self.rows.get_mut(&account_id) else {
            return Ok(0);
        };
        if row.version != expected_version {
            return Ok(0);
        }

        row.balance = new_balance;
        row.version += 1;
        row.update_time = Utc::now();
        row.update_user = operator.to_string();
        Ok(1)
    }

    async fn create(
        &self,
        account_id: AccountId,
        opening_balance: Decimal,
        operator: &str,
    ) -> Result<(), BalanceError> {
        use dashmap::mapref::entry::Entry;

        match self.rows.entry(account_id) {
            Entry::Occupied(_) => Err(BalanceError::account_exists(account_id)),
            Entry::Vacant(vacant) => {
                vacant.insert(AccountBalance::new(account_id, opening_balance, operator));
                Ok(())
            }
        }
    }
}
