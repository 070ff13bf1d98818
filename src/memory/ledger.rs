//! In-memory append-only ledger

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::core::traits::{LedgerReader, LedgerWriter};
use crate::types::{AccountId, BalanceError, LedgerEntry};

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: DashMap<AccountId, Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn push(&self, entry: LedgerEntry) {
        self.entries.entry(entry.account_id).or_default().push(entry);
    }

    /// Entries for one account in append order
    pub fn entries(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        self.entries
            .get(&account_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn sum_signed_entries(&self, account_id: AccountId) -> Result<Decimal, BalanceError> {
        let Some(entries) = self.entries.get(&account_id) else {
            return Ok(Decimal::ZERO);
        };
        entries.iter().try_fold(Decimal::ZERO, |total, entry| {
            total
                .checked_add(entry.signed_amount())
                .ok_or_else(|| BalanceError::arithmetic_overflow("ledger sum", account_id))
        })
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn append(&self, entry: LedgerEntry) -> Result<(), BalanceError> {
        self.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_sum_signed_entries() {
        let ledger = InMemoryLedger::new();
        ledger.append(LedgerEntry::new(1, EntryKind::Recharge, dec!(100))).await.unwrap();
        ledger.append(LedgerEntry::new(1, EntryKind::Consume, dec!(30.25))).await.unwrap();
        ledger.append(LedgerEntry::new(1, EntryKind::Refund, dec!(10))).await.unwrap();
        ledger.append(LedgerEntry::new(2, EntryKind::Recharge, dec!(5))).await.unwrap();

        assert_eq!(ledger.sum_signed_entries(1).await, Ok(dec!(79.75)));
        assert_eq!(ledger.sum_signed_entries(2).await, Ok(dec!(5)));
        assert_eq!(ledger.entries(1).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_ledger_sums_to_zero() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.sum_signed_entries(9).await, Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_overflowing_sum_is_an_error() {
        let ledger = InMemoryLedger::new();
        ledger.push(LedgerEntry::new(1, EntryKind::Recharge, Decimal::MAX));
        ledger.push(LedgerEntry::new(1, EntryKind::Refund, dec!(1)));

        assert_eq!(
            ledger.sum_signed_entries(1).await,
            Err(BalanceError::arithmetic_overflow("ledger sum", 1))
        );
    }
}
