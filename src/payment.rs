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

//! Payment records.
//!
//! A payment is immutable once created. The only way to undo one is to delete
//! it through its debt, which restores the balance it consumed.

use crate::base::{DebtId, PaymentId};
use crate::validation::AMOUNT_SCALE;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A partial reduction applied to a debt's remaining balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    id: PaymentId,
    debt_id: DebtId,
    amount: Decimal,
    description: String,
    date: DateTime<Utc>,
}

impl Payment {
    /// Builds a payment record dated `date`.
    ///
    /// A blank or missing description is replaced by [`default_description`].
    /// This does not check the amount against any balance; attach payments
    /// through [`Debt::apply_payment`](crate::Debt::apply_payment) for that.
    pub fn new(
        debt_id: DebtId,
        amount: Decimal,
        description: Option<&str>,
        date: DateTime<Utc>,
    ) -> Self {
        let description = match description.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => default_description(amount),
        };

        Self {
            id: PaymentId::new(),
            debt_id,
            amount,
            description,
            date,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn debt_id(&self) -> DebtId {
        self.debt_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Label used when a payment is recorded without a description.
pub fn default_description(amount: Decimal) -> String {
    format!("Payment of ${:.2}", amount)
}

impl Serialize for Payment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Payment", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("debtId", &self.debt_id)?;
        state.serialize_field("amount", &self.amount.round_dp(AMOUNT_SCALE))?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("date", &self.date)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn missing_description_gets_generated_label() {
        let payment = Payment::new(DebtId::new(), dec!(15000), None, Utc::now());
        assert_eq!(payment.description(), "Payment of $15000.00");
    }

    #[test]
    fn blank_description_gets_generated_label() {
        let payment = Payment::new(DebtId::new(), dec!(10.5), Some("   "), Utc::now());
        assert_eq!(payment.description(), "Payment of $10.50");
    }

    #[test]
    fn explicit_description_is_trimmed() {
        let payment = Payment::new(DebtId::new(), dec!(1), Some(" first installment "), Utc::now());
        assert_eq!(payment.description(), "first installment");
    }

    #[test]
    fn serializer_uses_camel_case_and_string_amounts() {
        let debt_id = DebtId::new();
        let payment = Payment::new(debt_id, dec!(99.999), Some("rent"), Utc::now());

        let parsed: serde_json::Value = serde_json::to_value(&payment).unwrap();

        assert_eq!(parsed["debtId"], debt_id.to_string());
        // Banker's rounding at two places.
        assert_eq!(parsed["amount"].as_str().unwrap(), "100.00");
        assert_eq!(parsed["description"], "rent");
        assert!(parsed["date"].is_string());
    }
}
