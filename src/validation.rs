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

//! Field constraints for ledger inputs.
//!
//! Each check is a plain predicate returning the violation message, so callers
//! can collect several of them into a [`ValidationErrors`](crate::error::ValidationErrors) map.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Largest accepted debt or payment amount.
pub const MAX_AMOUNT: Decimal = dec!(999999999);

/// Monetary amounts carry at most this many decimal places.
pub const AMOUNT_SCALE: u32 = 2;

/// Checks a debt name. Length is measured in characters after trimming.
pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err("name is required".into());
    }
    if len < MIN_NAME_LEN {
        return Err(format!("must be at least {MIN_NAME_LEN} characters"));
    }
    if len > MAX_NAME_LEN {
        return Err(format!("cannot exceed {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

/// Checks sign, magnitude and precision of a monetary amount.
pub fn validate_amount(amount: Decimal) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err("must be greater than 0".into());
    }
    if amount > MAX_AMOUNT {
        return Err(format!("cannot exceed {MAX_AMOUNT}"));
    }
    // 10.50 and 10.5 are the same amount; only significant digits count.
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(format!("must have at most {AMOUNT_SCALE} decimal places"));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), String> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => Err(format!(
            "cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )),
        _ => Ok(()),
    }
}

pub fn validate_query(query: &str) -> Result<(), String> {
    if query.trim().is_empty() {
        return Err("search query is required".into());
    }
    Ok(())
}

pub fn validate_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), String> {
    if start > end {
        return Err("start date must not be after end date".into());
    }
    Ok(())
}

pub fn validate_amount_range(min: Decimal, max: Decimal) -> Result<(), String> {
    if min < Decimal::ZERO || max < Decimal::ZERO {
        return Err("amount bounds must not be negative".into());
    }
    if min > max {
        return Err("minimum amount must not exceed maximum amount".into());
    }
    Ok(())
}
