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

//! Aggregate figures over debts and payments.
//!
//! These are pure functions over snapshots; averages and rates are rounded to
//! two decimal places, sums are exact.

use crate::debt::Debt;
use crate::payment::Payment;
use crate::validation::AMOUNT_SCALE;
use chrono::{DateTime, Datelike, Months, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtStatistics {
    pub total_debts: usize,
    pub total_initial: Decimal,
    pub total_remaining: Decimal,
    /// Always `total_initial - total_remaining`.
    pub total_paid: Decimal,
    pub average_debt_amount: Decimal,
    pub paid_count: usize,
    pub pending_count: usize,
    /// `total_paid / total_initial` in percent.
    pub completion_rate: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatistics {
    pub total_payments: usize,
    pub total_amount: Decimal,
    pub average_amount: Decimal,
    pub largest_amount: Decimal,
    pub smallest_amount: Decimal,
    pub payments_this_month: usize,
    pub amount_this_month: Decimal,
}

pub fn debt_statistics(debts: &[Debt]) -> DebtStatistics {
    if debts.is_empty() {
        return DebtStatistics::default();
    }

    let total_initial: Decimal = debts.iter().map(Debt::initial_amount).sum();
    let total_remaining: Decimal = debts.iter().map(Debt::remaining_amount).sum();
    let total_paid = total_initial - total_remaining;
    let paid_count = debts.iter().filter(|d| d.is_paid()).count();

    let completion_rate = if total_initial.is_zero() {
        Decimal::ZERO
    } else {
        (total_paid / total_initial * Decimal::ONE_HUNDRED).round_dp(AMOUNT_SCALE)
    };

    DebtStatistics {
        total_debts: debts.len(),
        total_initial,
        total_remaining,
        total_paid,
        average_debt_amount: (total_initial / Decimal::from(debts.len())).round_dp(AMOUNT_SCALE),
        paid_count,
        pending_count: debts.len() - paid_count,
        completion_rate,
    }
}

/// Payment figures, with "this month" taken from the wall clock.
pub fn payment_statistics(payments: &[Payment]) -> PaymentStatistics {
    payment_statistics_at(payments, Utc::now())
}

/// Payment figures, with "this month" being the UTC month containing `now`.
pub fn payment_statistics_at(payments: &[Payment], now: DateTime<Utc>) -> PaymentStatistics {
    if payments.is_empty() {
        return PaymentStatistics::default();
    }

    let total_amount: Decimal = payments.iter().map(Payment::amount).sum();
    let largest_amount = payments.iter().map(Payment::amount).max().unwrap_or_default();
    let smallest_amount = payments.iter().map(Payment::amount).min().unwrap_or_default();

    let (month_start, next_month_start) = month_bounds(now);
    let this_month: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.date() >= month_start && p.date() < next_month_start)
        .collect();

    PaymentStatistics {
        total_payments: payments.len(),
        total_amount,
        average_amount: (total_amount / Decimal::from(payments.len())).round_dp(AMOUNT_SCALE),
        largest_amount,
        smallest_amount,
        payments_this_month: this_month.len(),
        amount_this_month: this_month.iter().map(|p| p.amount()).sum(),
    }
}

/// Start of the UTC month containing `now`, and start of the following month.
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);

    let midnight = NaiveTime::default();
    (
        Utc.from_utc_datetime(&first.and_time(midnight)),
        Utc.from_utc_datetime(&next.and_time(midnight)),
    )
}
