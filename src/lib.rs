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

//! # Debt Ledger
//!
//! This library tracks debts and the payments made against them: creating a
//! debt, recording partial payments that reduce its remaining balance,
//! reversing payments, and aggregating statistics across debts and payments.
//!
//! ## Core Components
//!
//! - [`Debt`]: A debt with its balance rules and payment history
//! - [`Payment`]: Immutable record of a partial payment
//! - [`ledger`]: Validated operations over a [`DebtStore`]
//! - [`MemoryStore`]: Concurrent in-memory [`DebtStore`]
//! - [`LedgerError`]: Validation, not-found, conflict and internal failures
//!
//! ## Example
//!
//! ```
//! use debt_ledger::{ledger, LedgerError, MemoryStore};
//! use rust_decimal_macros::dec;
//!
//! let store = MemoryStore::new();
//!
//! let debt = ledger::create_debt(&store, "Personal Loan", dec!(50000)).unwrap();
//! ledger::apply_payment(&store, debt.id(), dec!(15000), None).unwrap();
//!
//! let debt = ledger::get_debt(&store, debt.id()).unwrap();
//! assert_eq!(debt.remaining_amount(), dec!(35000));
//! assert!(!debt.is_paid());
//!
//! // Overpayment is rejected, never clamped.
//! let result = ledger::apply_payment(&store, debt.id(), dec!(35000.01), None);
//! assert!(matches!(result, Err(LedgerError::Validation(_))));
//! ```
//!
//! ## Thread Safety
//!
//! [`MemoryStore`] serializes operations on the same debt and lets operations
//! on different debts proceed in parallel.

mod base;
pub mod debt;
pub mod error;
pub mod ledger;
mod name_index;
pub mod payment;
pub mod statistics;
pub mod store;
pub mod validation;

pub use base::{DebtId, PaymentId};
pub use debt::{Debt, DebtState};
pub use error::{Entity, LedgerError, ValidationErrors};
pub use ledger::DebtPatch;
pub use payment::Payment;
pub use statistics::{DebtStatistics, PaymentStatistics};
pub use store::{DebtStore, MemoryStore};
