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

//! Error types for ledger operations.
//!
//! Every failure falls into one of four kinds: [`LedgerError::Validation`],
//! [`LedgerError::NotFound`], [`LedgerError::Conflict`] and
//! [`LedgerError::Internal`]. The boundary layer (CLI, HTTP) decides how each
//! kind is reported; the ledger itself only signals them.

use crate::base::{DebtId, PaymentId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Kind of entity referenced by a [`LedgerError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Debt,
    Payment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Debt => f.write_str("debt"),
            Entity::Payment => f.write_str("payment"),
        }
    }
}

/// Field-keyed collection of violated input constraints.
///
/// Keys are the input field names (`name`, `amount`, `description`, `query`,
/// `range`); each holds the first message reported for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation for `field`. Later messages for the same field are dropped.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    /// Folds the outcome of a field check into the collection.
    pub fn check(&mut self, field: &'static str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Converts into `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), LedgerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller input violates a documented constraint
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Referenced id does not resolve to a live entity
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },

    /// Operation is disallowed given the current state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or infrastructure failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn debt_not_found(id: DebtId) -> Self {
        LedgerError::NotFound {
            entity: Entity::Debt,
            id: id.to_string(),
        }
    }

    pub fn payment_not_found(id: PaymentId) -> Self {
        LedgerError::NotFound {
            entity: Entity::Payment,
            id: id.to_string(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        LedgerError::Validation(errors)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }

    /// Field map of a validation failure, if this is one.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            LedgerError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
