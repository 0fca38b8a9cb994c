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

//! Thread-safe debt name registry with duplicate detection.

use crate::LedgerError;
use crate::base::DebtId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Maps each trimmed debt name to the debt that owns it.
///
/// Claims go through the [`DashMap`] entry API so that two debts can never
/// race past the uniqueness check with the same name.
#[derive(Debug, Default)]
pub(crate) struct NameIndex {
    names: DashMap<String, DebtId>,
}

impl NameIndex {
    pub(crate) fn new() -> Self {
        Self {
            names: DashMap::new(),
        }
    }

    /// Reserves `name` for `owner`.
    ///
    /// Re-claiming a name the owner already holds succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Conflict`] if another debt holds the name.
    pub(crate) fn claim(&self, name: &str, owner: DebtId) -> Result<(), LedgerError> {
        // Use entry API for atomic check-and-insert to prevent race conditions
        match self.names.entry(name.trim().to_string()) {
            Entry::Occupied(entry) if *entry.get() == owner => Ok(()),
            Entry::Occupied(_) => Err(LedgerError::Conflict(format!(
                "debt with name \"{}\" already exists",
                name.trim()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(owner);
                Ok(())
            }
        }
    }

    /// Drops `name` if it still belongs to `owner`.
    pub(crate) fn release(&self, name: &str, owner: DebtId) {
        self.names.remove_if(name.trim(), |_, holder| *holder == owner);
    }
}
