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

//! Debt records and the rules for changing their balance.
//!
//! Status is derived from the balance, never stored:
//!
//! ```text
//!  Created (remaining = initial) ──pay──► Active (0 < remaining < initial) ──pay rest──► Paid (remaining = 0)
//!          ▲                                  ▲                                             │
//!          └───────────── delete payment ─────┴─────────────── delete payment ──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use debt_ledger::{Debt, DebtState};
//!
//! let mut debt = Debt::new("Personal Loan", dec!(50000)).unwrap();
//! debt.apply_payment(dec!(15000), None).unwrap();
//! assert_eq!(debt.remaining_amount(), dec!(35000));
//! assert_eq!(debt.state(), DebtState::Active);
//! ```

use crate::base::{DebtId, PaymentId};
use crate::error::{LedgerError, ValidationErrors};
use crate::payment::Payment;
use crate::validation::{self, AMOUNT_SCALE};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Balance-derived lifecycle state of a debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtState {
    /// Nothing paid yet.
    Created,
    /// Partially paid.
    Active,
    /// Remaining balance is zero.
    Paid,
}

/// A tracked obligation and the payments recorded against it.
///
/// # Invariants
///
/// - `0 <= remaining_amount <= initial_amount`
/// - `remaining_amount == initial_amount - sum(payments.amount)`
/// - every payment's `debt_id` is this debt's id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debt {
    id: DebtId,
    name: String,
    initial_amount: Decimal,
    remaining_amount: Decimal,
    /// Append order.
    payments: Vec<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Debt {
    const DECIMAL_PRECISION: u32 = AMOUNT_SCALE;

    /// Creates an empty debt, reporting every invalid field at once.
    pub fn new(name: &str, initial_amount: Decimal) -> Result<Self, LedgerError> {
        let mut errors = ValidationErrors::new();
        errors.check("name", validation::validate_name(name));
        errors.check("amount", validation::validate_amount(initial_amount));
        errors.into_result()?;

        let now = Utc::now();
        Ok(Self {
            id: DebtId::new(),
            name: name.trim().to_string(),
            initial_amount,
            remaining_amount: initial_amount,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> DebtId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_amount(&self) -> Decimal {
        self.initial_amount
    }

    pub fn remaining_amount(&self) -> Decimal {
        self.remaining_amount
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn payment(&self, payment_id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id() == payment_id)
    }

    pub fn has_payments(&self) -> bool {
        !self.payments.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_paid(&self) -> bool {
        self.remaining_amount.is_zero()
    }

    /// Returns `initial_amount - remaining_amount`.
    pub fn total_paid(&self) -> Decimal {
        self.initial_amount - self.remaining_amount
    }

    /// Share of the initial amount already paid, in percent.
    pub fn progress_percentage(&self) -> Decimal {
        self.total_paid() / self.initial_amount * Decimal::ONE_HUNDRED
    }

    pub fn state(&self) -> DebtState {
        if self.is_paid() {
            DebtState::Paid
        } else if self.remaining_amount == self.initial_amount {
            DebtState::Created
        } else {
            DebtState::Active
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.remaining_amount >= Decimal::ZERO,
            "Invariant violated: remaining balance went negative: {}",
            self.remaining_amount
        );
        debug_assert!(
            self.remaining_amount <= self.initial_amount,
            "Invariant violated: remaining {} exceeds initial {}",
            self.remaining_amount,
            self.initial_amount
        );
        debug_assert_eq!(
            self.remaining_amount,
            self.initial_amount - self.payments.iter().map(Payment::amount).sum::<Decimal>(),
            "Invariant violated: remaining balance disagrees with payment history"
        );
    }

    /// Records a payment and decrements the remaining balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] on field `amount` when the amount is not
    /// positive, too large, too precise, or above the remaining balance; on
    /// field `description` when the description is too long. Nothing changes
    /// on error.
    pub fn apply_payment(
        &mut self,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Payment, LedgerError> {
        let mut errors = ValidationErrors::new();
        errors.check("amount", validation::validate_amount(amount));
        errors.check("description", validation::validate_description(description));
        errors.into_result()?;

        // Hard ceiling: overpayment is rejected, never clamped.
        if amount > self.remaining_amount {
            return Err(LedgerError::invalid(
                "amount",
                format!(
                    "payment of {} exceeds remaining balance of {}",
                    amount, self.remaining_amount
                ),
            ));
        }

        let now = Utc::now();
        let payment = Payment::new(self.id, amount, description, now);
        self.remaining_amount -= amount;
        self.payments.push(payment.clone());
        self.updated_at = now;
        self.assert_invariants();
        Ok(payment)
    }

    /// Removes a payment and gives its amount back to the remaining balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the payment does not belong to this debt.
    pub fn reverse_payment(&mut self, payment_id: PaymentId) -> Result<Payment, LedgerError> {
        let index = self
            .payments
            .iter()
            .position(|p| p.id() == payment_id)
            .ok_or_else(|| LedgerError::payment_not_found(payment_id))?;

        let payment = self.payments.remove(index);
        self.remaining_amount = (self.remaining_amount + payment.amount()).min(self.initial_amount);
        self.updated_at = Utc::now();
        self.assert_invariants();
        Ok(payment)
    }

    /// Changes the debt size while keeping its payment history.
    ///
    /// The remaining balance becomes `new_initial - total_paid`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] on field `amount` if the amount is invalid
    /// or lower than what has already been paid.
    pub fn rebaseline(&mut self, new_initial: Decimal) -> Result<(), LedgerError> {
        validation::validate_amount(new_initial).map_err(|m| LedgerError::invalid("amount", m))?;

        let paid = self.total_paid();
        if new_initial < paid {
            return Err(LedgerError::invalid(
                "amount",
                format!("cannot be lower than the amount already paid ({paid})"),
            ));
        }

        self.initial_amount = new_initial;
        self.remaining_amount = (new_initial - paid).max(Decimal::ZERO);
        self.updated_at = Utc::now();
        self.assert_invariants();
        Ok(())
    }

    /// Replaces the name. Uniqueness is enforced by the store, not here.
    pub fn rename(&mut self, name: &str) -> Result<(), LedgerError> {
        validation::validate_name(name).map_err(|m| LedgerError::invalid("name", m))?;
        self.name = name.trim().to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Serialize for Debt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Debt", 11)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field(
            "initialAmount",
            &self.initial_amount.round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "remainingAmount",
            &self.remaining_amount.round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field("isPaid", &self.is_paid())?;
        state.serialize_field("state", &self.state())?;
        state.serialize_field(
            "totalPaid",
            &self.total_paid().round_dp(Debt::DECIMAL_PRECISION),
        )?;
        state.serialize_field(
            "progressPercentage",
            &self.progress_percentage().round_dp(Debt::DECIMAL_PRECISION),
        )?;
        let newest_first: Vec<&Payment> = self.payments.iter().rev().collect();
        state.serialize_field("payments", &newest_first)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("updatedAt", &self.updated_at)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loan() -> Debt {
        Debt::new("Personal Loan", dec!(50000)).unwrap()
    }

    #[test]
    fn new_debt_starts_unpaid_with_full_balance() {
        let debt = loan();
        assert_eq!(debt.remaining_amount(), dec!(50000));
        assert_eq!(debt.state(), DebtState::Created);
        assert!(!debt.is_paid());
        assert!(debt.payments().is_empty());
        assert_eq!(debt.created_at(), debt.updated_at());
    }

    #[test]
    fn new_debt_trims_name() {
        let debt = Debt::new("  Car  ", dec!(10)).unwrap();
        assert_eq!(debt.name(), "Car");
    }

    #[test]
    fn new_debt_reports_all_invalid_fields() {
        let err = Debt::new("ab", dec!(0)).unwrap_err();
        let fields = err.validation_errors().unwrap();
        assert!(fields.contains("name"));
        assert!(fields.contains("amount"));
    }

    fn pause() {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    #[test]
    fn payment_advances_timestamp() {
        let mut debt = loan();
        let created = debt.updated_at();
        pause();
        debt.apply_payment(dec!(1), None).unwrap();
        assert!(debt.updated_at() > created);
        assert_eq!(debt.created_at(), created);
    }

    #[test]
    fn reversal_advances_timestamp() {
        let mut debt = loan();
        let payment = debt.apply_payment(dec!(1), None).unwrap();
        let before = debt.updated_at();
        pause();
        debt.reverse_payment(payment.id()).unwrap();
        assert!(debt.updated_at() > before);
    }

    #[test]
    fn rebaseline_and_rename_advance_timestamp() {
        let mut debt = loan();
        let before = debt.updated_at();
        pause();
        debt.rebaseline(dec!(60000)).unwrap();
        let resized = debt.updated_at();
        assert!(resized > before);

        pause();
        debt.rename("Family Loan").unwrap();
        assert!(debt.updated_at() > resized);
    }

    #[test]
    fn rejected_payment_keeps_timestamp() {
        let mut debt = loan();
        let before = debt.updated_at();
        pause();
        debt.apply_payment(dec!(50000.01), None).unwrap_err();
        assert_eq!(debt.updated_at(), before);
    }

    #[test]
    fn reverse_caps_at_initial_amount() {
        let mut debt = loan();
        let payment = debt.apply_payment(dec!(100), None).unwrap();
        debt.reverse_payment(payment.id()).unwrap();
        assert_eq!(debt.remaining_amount(), debt.initial_amount());
    }

    #[test]
    fn reverse_unknown_payment_is_not_found() {
        let mut debt = loan();
        let err = debt.reverse_payment(PaymentId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rebaseline_keeps_amount_already_paid() {
        let mut debt = loan();
        debt.apply_payment(dec!(15000), None).unwrap();
        debt.rebaseline(dec!(60000)).unwrap();
        assert_eq!(debt.initial_amount(), dec!(60000));
        assert_eq!(debt.remaining_amount(), dec!(45000));
        assert_eq!(debt.total_paid(), dec!(15000));
    }

    #[test]
    fn rebaseline_to_amount_paid_marks_debt_paid() {
        let mut debt = loan();
        debt.apply_payment(dec!(15000), None).unwrap();
        debt.rebaseline(dec!(15000)).unwrap();
        assert!(debt.is_paid());
    }

    #[test]
    fn rebaseline_below_amount_paid_is_rejected() {
        let mut debt = loan();
        debt.apply_payment(dec!(15000), None).unwrap();
        let before = debt.clone();

        let err = debt.rebaseline(dec!(10000)).unwrap_err();
        assert!(err.validation_errors().unwrap().contains("amount"));
        assert_eq!(debt, before);
    }

    #[test]
    fn progress_percentage_tracks_payments() {
        let mut debt = Debt::new("Phone", dec!(400)).unwrap();
        debt.apply_payment(dec!(100), None).unwrap();
        assert_eq!(debt.progress_percentage(), dec!(25));
    }

    // === Serialization Tests ===

    #[test]
    fn serializer_includes_derived_fields() {
        let mut debt = Debt::new("Personal Loan", dec!(50000)).unwrap();
        debt.apply_payment(dec!(15000), None).unwrap();

        let parsed: serde_json::Value = serde_json::to_value(&debt).unwrap();

        assert_eq!(parsed["name"], "Personal Loan");
        assert_eq!(parsed["initialAmount"].as_str().unwrap(), "50000");
        assert_eq!(parsed["remainingAmount"].as_str().unwrap(), "35000");
        assert_eq!(parsed["totalPaid"].as_str().unwrap(), "15000");
        let progress: Decimal = parsed["progressPercentage"].as_str().unwrap().parse().unwrap();
        assert_eq!(progress, dec!(30));
        assert_eq!(parsed["isPaid"], false);
        assert_eq!(parsed["state"], "active");
        assert_eq!(parsed["payments"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn serializer_rounds_progress_to_two_decimal_places() {
        let mut debt = Debt::new("Thirds", dec!(3)).unwrap();
        debt.apply_payment(dec!(1), None).unwrap();

        let parsed: serde_json::Value = serde_json::to_value(&debt).unwrap();
        assert_eq!(parsed["progressPercentage"].as_str().unwrap(), "33.33");
    }

    #[test]
    fn serializer_lists_payments_newest_first() {
        let mut debt = loan();
        let first = debt.apply_payment(dec!(10), Some("first")).unwrap();
        let second = debt.apply_payment(dec!(20), Some("second")).unwrap();

        let parsed: serde_json::Value = serde_json::to_value(&debt).unwrap();
        let ids: Vec<&str> = parsed["payments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();

        assert_eq!(ids, vec![second.id().to_string(), first.id().to_string()]);
        assert_eq!(debt.payments()[0].id(), first.id());
    }
}
