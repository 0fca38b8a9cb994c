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

//! Ledger operations.
//!
//! Every operation is a free function taking the [`DebtStore`] it works
//! against. Mutations validate first and commit through
//! [`DebtStore::modify`], so a failed call never leaves a partial change.
//!
//! | Operation | Errors |
//! |-----------|--------|
//! | [`create_debt`] | Validation, Conflict (name taken) |
//! | [`update_debt`] | NotFound, Validation, Conflict (name taken) |
//! | [`delete_debt`] | NotFound, Conflict (debt has payments) |
//! | [`apply_payment`] | NotFound, Validation (including overpayment) |
//! | [`delete_payment`] | NotFound |
//!
//! # Deletion Policy
//!
//! A debt with recorded payments cannot be deleted. Delete its payments first;
//! payment history is never dropped implicitly.

use crate::base::{DebtId, PaymentId};
use crate::debt::Debt;
use crate::error::{LedgerError, ValidationErrors};
use crate::payment::Payment;
use crate::statistics::{self, DebtStatistics, PaymentStatistics};
use crate::store::DebtStore;
use crate::validation;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Number of payments returned by [`recent_payments`] when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Partial update for [`update_debt`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPatch {
    pub name: Option<String>,
    pub initial_amount: Option<Decimal>,
}

// =============================================================================
// Debts
// =============================================================================

/// All debts, newest first.
pub fn list_debts<S: DebtStore>(store: &S) -> Result<Vec<Debt>, LedgerError> {
    store.list()
}

pub fn get_debt<S: DebtStore>(store: &S, id: DebtId) -> Result<Debt, LedgerError> {
    store.get(&id)?.ok_or_else(|| LedgerError::debt_not_found(id))
}

/// Looks a debt up by its exact (trimmed) name.
pub fn find_debt_by_name<S: DebtStore>(store: &S, name: &str) -> Result<Option<Debt>, LedgerError> {
    let name = name.trim();
    Ok(store.list()?.into_iter().find(|d| d.name() == name))
}

/// Debts whose derived paid status equals `is_paid`, newest first.
pub fn debts_by_status<S: DebtStore>(store: &S, is_paid: bool) -> Result<Vec<Debt>, LedgerError> {
    Ok(store
        .list()?
        .into_iter()
        .filter(|d| d.is_paid() == is_paid)
        .collect())
}

/// Creates and stores a new debt with its full amount outstanding.
///
/// # Errors
///
/// - [`LedgerError::Validation`] with every invalid field (`name`, `amount`).
/// - [`LedgerError::Conflict`] if a debt with the same name exists.
pub fn create_debt<S: DebtStore>(
    store: &S,
    name: &str,
    initial_amount: Decimal,
) -> Result<Debt, LedgerError> {
    let debt = Debt::new(name, initial_amount)?;
    store.insert(debt.clone())?;
    debug!(debt_id = %debt.id(), name = debt.name(), amount = %initial_amount, "debt created");
    Ok(debt)
}

/// Renames and/or re-baselines a debt.
///
/// A new initial amount keeps the amount already paid:
/// `remaining = new_initial - (old_initial - old_remaining)`.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if the debt does not exist.
/// - [`LedgerError::Validation`] for an invalid name or amount, or an amount
///   below what has already been paid.
/// - [`LedgerError::Conflict`] if the new name belongs to another debt.
pub fn update_debt<S: DebtStore>(
    store: &S,
    id: DebtId,
    patch: DebtPatch,
) -> Result<Debt, LedgerError> {
    let debt = store.modify(&id, |debt| {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.name {
            errors.check("name", validation::validate_name(name));
        }
        if let Some(amount) = patch.initial_amount {
            errors.check("amount", validation::validate_amount(amount));
        }
        errors.into_result()?;

        if let Some(amount) = patch.initial_amount {
            debt.rebaseline(amount)?;
        }
        if let Some(name) = &patch.name {
            debt.rename(name)?;
        }
        debt.touch();
        Ok(debt.clone())
    })?;

    debug!(
        debt_id = %id,
        initial = %debt.initial_amount(),
        remaining = %debt.remaining_amount(),
        "debt updated"
    );
    Ok(debt)
}

/// Deletes a debt that has no payments.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if the debt does not exist.
/// - [`LedgerError::Conflict`] if the debt has recorded payments.
pub fn delete_debt<S: DebtStore>(store: &S, id: DebtId) -> Result<(), LedgerError> {
    store.remove_if(&id, |debt| {
        if debt.has_payments() {
            return Err(LedgerError::Conflict(format!(
                "cannot delete debt \"{}\" with {} existing payment(s)",
                debt.name(),
                debt.payments().len()
            )));
        }
        Ok(())
    })?;

    debug!(debt_id = %id, "debt deleted");
    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

/// Records a payment against a debt and lowers its remaining balance.
///
/// Payment creation and the balance change are committed together.
///
/// # Errors
///
/// - [`LedgerError::NotFound`] if the debt does not exist.
/// - [`LedgerError::Validation`] if the amount is not positive, exceeds
///   the remaining balance, or the description is too long.
pub fn apply_payment<S: DebtStore>(
    store: &S,
    debt_id: DebtId,
    amount: Decimal,
    description: Option<&str>,
) -> Result<Payment, LedgerError> {
    let (payment, remaining) = store.modify(&debt_id, |debt| {
        let payment = debt.apply_payment(amount, description)?;
        Ok((payment, debt.remaining_amount()))
    })?;

    debug!(
        debt_id = %debt_id,
        payment_id = %payment.id(),
        amount = %amount,
        remaining = %remaining,
        "payment applied"
    );
    Ok(payment)
}

/// Deletes a payment and restores its amount to the debt's balance.
///
/// # Errors
///
/// [`LedgerError::NotFound`] if the payment does not exist.
pub fn delete_payment<S: DebtStore>(store: &S, payment_id: PaymentId) -> Result<(), LedgerError> {
    let owner = store
        .payment_owner(&payment_id)?
        .ok_or_else(|| LedgerError::payment_not_found(payment_id))?;

    let (payment, remaining) = store
        .modify(&owner, |debt| {
            let payment = debt.reverse_payment(payment_id)?;
            Ok((payment, debt.remaining_amount()))
        })
        .map_err(|e| match e {
            // Owner vanished between lookup and lock; so did the payment.
            LedgerError::NotFound { .. } => LedgerError::payment_not_found(payment_id),
            other => other,
        })?;

    debug!(
        debt_id = %owner,
        payment_id = %payment_id,
        amount = %payment.amount(),
        remaining = %remaining,
        "payment deleted"
    );
    Ok(())
}

pub fn get_payment<S: DebtStore>(store: &S, payment_id: PaymentId) -> Result<Payment, LedgerError> {
    let not_found = || LedgerError::payment_not_found(payment_id);
    let owner = store.payment_owner(&payment_id)?.ok_or_else(not_found)?;
    store
        .get(&owner)?
        .and_then(|debt| debt.payment(payment_id).cloned())
        .ok_or_else(not_found)
}

/// Every payment across all debts, newest first.
pub fn list_payments<S: DebtStore>(store: &S) -> Result<Vec<Payment>, LedgerError> {
    let debts = store.list()?;
    Ok(newest_first(debts.iter().flat_map(|d| d.payments().iter().rev())))
}

/// A debt's payments, newest first.
///
/// # Errors
///
/// [`LedgerError::NotFound`] if the debt does not exist.
pub fn payments_for_debt<S: DebtStore>(
    store: &S,
    debt_id: DebtId,
) -> Result<Vec<Payment>, LedgerError> {
    let debt = get_debt(store, debt_id)?;
    Ok(debt.payments().iter().rev().cloned().collect())
}

/// The `limit` most recent payments across all debts.
pub fn recent_payments<S: DebtStore>(store: &S, limit: usize) -> Result<Vec<Payment>, LedgerError> {
    let mut payments = list_payments(store)?;
    payments.truncate(limit);
    Ok(payments)
}

/// Stable sort by date, newest first; ties keep iteration order.
fn newest_first<'a>(payments: impl Iterator<Item = &'a Payment>) -> Vec<Payment> {
    let mut payments: Vec<Payment> = payments.cloned().collect();
    payments.sort_by(|a, b| b.date().cmp(&a.date()));
    payments
}

// =============================================================================
// Search and filters
// =============================================================================

/// Debts whose name contains `query`, ignoring case. Newest first.
///
/// # Errors
///
/// [`LedgerError::Validation`] on field `query` if the query is blank.
pub fn search_debts<S: DebtStore>(store: &S, query: &str) -> Result<Vec<Debt>, LedgerError> {
    validation::validate_query(query).map_err(|m| LedgerError::invalid("query", m))?;

    let needle = query.trim().to_lowercase();
    Ok(store
        .list()?
        .into_iter()
        .filter(|d| d.name().to_lowercase().contains(&needle))
        .collect())
}

/// Payments dated within `[start, end]`, newest first.
///
/// # Errors
///
/// [`LedgerError::Validation`] on field `range` if `start > end`.
pub fn filter_payments_by_date<S: DebtStore>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Payment>, LedgerError> {
    validation::validate_date_range(start, end).map_err(|m| LedgerError::invalid("range", m))?;

    Ok(list_payments(store)?
        .into_iter()
        .filter(|p| p.date() >= start && p.date() <= end)
        .collect())
}

/// Payments with an amount within `[min, max]`, newest first.
///
/// # Errors
///
/// [`LedgerError::Validation`] on field `range` if `min > max` or a bound
/// is negative.
pub fn filter_payments_by_amount<S: DebtStore>(
    store: &S,
    min: Decimal,
    max: Decimal,
) -> Result<Vec<Payment>, LedgerError> {
    validation::validate_amount_range(min, max).map_err(|m| LedgerError::invalid("range", m))?;

    Ok(list_payments(store)?
        .into_iter()
        .filter(|p| p.amount() >= min && p.amount() <= max)
        .collect())
}

// =============================================================================
// Statistics
// =============================================================================

pub fn debt_statistics<S: DebtStore>(store: &S) -> Result<DebtStatistics, LedgerError> {
    Ok(statistics::debt_statistics(&store.list()?))
}

pub fn payment_statistics<S: DebtStore>(store: &S) -> Result<PaymentStatistics, LedgerError> {
    Ok(statistics::payment_statistics(&list_payments(store)?))
}
