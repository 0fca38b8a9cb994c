// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Debt storage.
//!
//! [`DebtStore`] is the persistence capability the ledger operations are
//! written against. [`MemoryStore`] is the in-process implementation.
//!
//! # Thread Safety
//!
//! [`MemoryStore`] keeps debts in a [`DashMap`], each behind its own
//! [`parking_lot::Mutex`]. Work on one debt is serialized; work on different
//! debts runs in parallel. Removing a debt takes the shard write lock, so it
//! cannot interleave with a mutation of the same debt.

use crate::base::{DebtId, PaymentId};
use crate::debt::Debt;
use crate::error::LedgerError;
use crate::name_index::NameIndex;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Persistence capability used by the [`ledger`](crate::ledger) operations.
///
/// Implementations must make [`modify`](DebtStore::modify) and
/// [`remove_if`](DebtStore::remove_if) atomic with respect to other calls on
/// the same debt, and must keep debt names unique.
pub trait DebtStore {
    /// Stores a new debt.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Conflict`] if the id or the name is already taken.
    fn insert(&self, debt: Debt) -> Result<(), LedgerError>;

    /// Returns a snapshot of the debt, if it exists.
    fn get(&self, id: &DebtId) -> Result<Option<Debt>, LedgerError>;

    /// Returns snapshots of every debt, newest first.
    fn list(&self) -> Result<Vec<Debt>, LedgerError>;

    /// Runs `f` against a working copy of the debt while holding its lock.
    ///
    /// The copy replaces the stored debt only when `f` returns `Ok`; an error
    /// leaves the stored debt untouched.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the debt does not exist,
    /// [`LedgerError::Conflict`] if `f` renamed the debt to a taken name,
    /// or whatever `f` returns.
    fn modify<T, F>(&self, id: &DebtId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Debt) -> Result<T, LedgerError>;

    /// Removes the debt if `guard` accepts it, returning the removed debt.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the debt does not exist, or the error
    /// returned by `guard`.
    fn remove_if<G>(&self, id: &DebtId, guard: G) -> Result<Debt, LedgerError>
    where
        G: FnOnce(&Debt) -> Result<(), LedgerError>;

    /// Returns the debt a payment belongs to.
    fn payment_owner(&self, id: &PaymentId) -> Result<Option<DebtId>, LedgerError>;
}

#[derive(Debug)]
struct DebtSlot {
    /// Insertion sequence, used for newest-first listing.
    seq: u64,
    debt: Mutex<Debt>,
}

/// In-memory [`DebtStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    debts: DashMap<DebtId, DebtSlot>,
    names: NameIndex,
    /// Payment id to owning debt, for payment lookups without a debt id.
    payments: DashMap<PaymentId, DebtId>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            debts: DashMap::new(),
            names: NameIndex::new(),
            payments: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Number of stored debts.
    pub fn len(&self) -> usize {
        self.debts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }

    fn index_payments(&self, before: Option<&Debt>, after: Option<&Debt>) {
        let old: HashSet<PaymentId> = before
            .map(|d| d.payments().iter().map(|p| p.id()).collect())
            .unwrap_or_default();
        let new: HashSet<PaymentId> = after
            .map(|d| d.payments().iter().map(|p| p.id()).collect())
            .unwrap_or_default();

        for removed in old.difference(&new) {
            self.payments.remove(removed);
        }
        if let Some(debt) = after {
            for added in new.difference(&old) {
                self.payments.insert(*added, debt.id());
            }
        }
    }
}

impl DebtStore for MemoryStore {
    fn insert(&self, debt: Debt) -> Result<(), LedgerError> {
        let id = debt.id();
        self.names.claim(debt.name(), id)?;

        match self.debts.entry(id) {
            Entry::Occupied(_) => {
                self.names.release(debt.name(), id);
                Err(LedgerError::Conflict(format!("debt with ID {id} already exists")))
            }
            Entry::Vacant(entry) => {
                self.index_payments(None, Some(&debt));
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                entry.insert(DebtSlot {
                    seq,
                    debt: Mutex::new(debt),
                });
                Ok(())
            }
        }
    }

    fn get(&self, id: &DebtId) -> Result<Option<Debt>, LedgerError> {
        Ok(self.debts.get(id).map(|slot| slot.debt.lock().clone()))
    }

    fn list(&self) -> Result<Vec<Debt>, LedgerError> {
        let mut snapshots: Vec<(u64, Debt)> = self
            .debts
            .iter()
            .map(|slot| (slot.seq, slot.debt.lock().clone()))
            .collect();
        snapshots.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(snapshots.into_iter().map(|(_, debt)| debt).collect())
    }

    fn modify<T, F>(&self, id: &DebtId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Debt) -> Result<T, LedgerError>,
    {
        let slot = self
            .debts
            .get(id)
            .ok_or_else(|| LedgerError::debt_not_found(*id))?;
        let mut stored = slot.debt.lock();

        let mut working = stored.clone();
        let output = f(&mut working)?;
        debug_assert_eq!(working.id(), stored.id());

        if working.name() != stored.name() {
            self.names.claim(working.name(), *id)?;
            self.names.release(stored.name(), *id);
        }
        self.index_payments(Some(&stored), Some(&working));

        *stored = working;
        Ok(output)
    }

    fn remove_if<G>(&self, id: &DebtId, guard: G) -> Result<Debt, LedgerError>
    where
        G: FnOnce(&Debt) -> Result<(), LedgerError>,
    {
        let mut refusal = None;
        let removed = self.debts.remove_if(id, |_, slot| {
            let debt = slot.debt.lock();
            match guard(&debt) {
                Ok(()) => true,
                Err(e) => {
                    refusal = Some(e);
                    false
                }
            }
        });

        match removed {
            Some((_, slot)) => {
                let debt = slot.debt.into_inner();
                self.names.release(debt.name(), *id);
                self.index_payments(Some(&debt), None);
                Ok(debt)
            }
            None => Err(refusal.unwrap_or_else(|| LedgerError::debt_not_found(*id))),
        }
    }

    fn payment_owner(&self, id: &PaymentId) -> Result<Option<DebtId>, LedgerError> {
        Ok(self.payments.get(id).map(|owner| *owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn debt(name: &str) -> Debt {
        Debt::new(name, dec!(100)).unwrap()
    }

    #[test]
    fn list_returns_newest_first() {
        let store = MemoryStore::new();
        for name in ["First", "Second", "Third"] {
            store.insert(debt(name)).unwrap();
        }

        let names: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, ["Third", "Second", "First"]);
    }

    #[test]
    fn insert_rejects_duplicate_name() {
        let store = MemoryStore::new();
        store.insert(debt("Car loan")).unwrap();
        let err = store.insert(debt("Car loan")).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_rejects_duplicate_id_and_keeps_name_free() {
        let store = MemoryStore::new();
        let original = debt("Original");
        store.insert(original.clone()).unwrap();

        let mut twin = original.clone();
        twin.rename("Twin").unwrap();
        assert!(store.insert(twin).unwrap_err().is_conflict());

        // The failed insert must not hold on to its name.
        store.insert(debt("Twin")).unwrap();
    }

    #[test]
    fn failed_modify_leaves_debt_untouched() {
        let store = MemoryStore::new();
        let d = debt("Rent");
        let id = d.id();
        store.insert(d).unwrap();
        let before = store.get(&id).unwrap().unwrap();

        let result: Result<(), LedgerError> = store.modify(&id, |debt| {
            debt.apply_payment(dec!(40), None)?;
            Err(LedgerError::Internal("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(&id).unwrap().unwrap(), before);
    }

    #[test]
    fn modify_indexes_new_payments() {
        let store = MemoryStore::new();
        let d = debt("Rent");
        let id = d.id();
        store.insert(d).unwrap();

        let payment = store
            .modify(&id, |debt| debt.apply_payment(dec!(10), None))
            .unwrap();
        assert_eq!(store.payment_owner(&payment.id()).unwrap(), Some(id));

        store
            .modify(&id, |debt| debt.reverse_payment(payment.id()))
            .unwrap();
        assert_eq!(store.payment_owner(&payment.id()).unwrap(), None);
    }

    #[test]
    fn rename_to_taken_name_is_rolled_back() {
        let store = MemoryStore::new();
        let a = debt("Alpha");
        let a_id = a.id();
        store.insert(a).unwrap();
        store.insert(debt("Bravo")).unwrap();

        let err = store
            .modify(&a_id, |debt| debt.rename("Bravo"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get(&a_id).unwrap().unwrap().name(), "Alpha");
    }

    #[test]
    fn rename_frees_old_name() {
        let store = MemoryStore::new();
        let a = debt("Alpha");
        let a_id = a.id();
        store.insert(a).unwrap();

        store.modify(&a_id, |debt| debt.rename("Charlie")).unwrap();
        store.insert(debt("Alpha")).unwrap();
    }

    #[test]
    fn remove_if_reports_guard_refusal() {
        let store = MemoryStore::new();
        let d = debt("Kept");
        let id = d.id();
        store.insert(d).unwrap();

        let err = store
            .remove_if(&id, |_| Err(LedgerError::Conflict("no".into())))
            .unwrap_err();
        assert_eq!(err, LedgerError::Conflict("no".into()));
        assert!(store.get(&id).unwrap().is_some());
    }

    #[test]
    fn remove_if_missing_debt_is_not_found() {
        let store = MemoryStore::new();
        let err = store.remove_if(&DebtId::new(), |_| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn removed_debt_releases_name() {
        let store = MemoryStore::new();
        let d = debt("Gone");
        let id = d.id();
        store.insert(d).unwrap();

        store.remove_if(&id, |_| Ok(())).unwrap();
        assert!(store.is_empty());
        store.insert(debt("Gone")).unwrap();
    }
}
