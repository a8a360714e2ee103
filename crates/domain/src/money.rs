// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! Monetary precision rules.
//!
//! All monetary fields are NUMERIC(12,2): at most ten integer digits and two
//! fractional digits. Values are validated at the boundary so storage
//! round-trips are exact; binary floating point never touches money.

use rust_decimal::Decimal;

/// Largest storable monetary value (NUMERIC(12,2) upper bound).
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Smallest accepted monetary value.
pub fn min_amount() -> Decimal {
    Decimal::new(1, 2)
}

/// Upper bound of the risk score scale.
pub fn max_risk_score() -> Decimal {
    Decimal::new(100, 0)
}

/// Violations of the monetary precision rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Value is zero or negative.
    #[error("amount must be positive, got {0}")]
    NotPositive(Decimal),
    /// More than two fractional digits.
    #[error("amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),
    /// Exceeds the NUMERIC(12,2) bound.
    #[error("amount {0} exceeds maximum of 9999999999.99")]
    Overflow(Decimal),
}

/// Validate a monetary amount (requested_amount, monthly_income, debts).
pub fn validate_amount(value: Decimal) -> Result<(), MoneyError> {
    if value < min_amount() {
        return Err(MoneyError::NotPositive(value));
    }
    if value.normalize().scale() > 2 {
        return Err(MoneyError::TooPrecise(value));
    }
    if value > max_amount() {
        return Err(MoneyError::Overflow(value));
    }
    Ok(())
}

/// Clamp a risk score into [0, 100] and round to NUMERIC(5,2) scale.
///
/// Rule evaluation accumulates penalties that can exceed the scale; the
/// stored score is always within it.
pub fn clamp_risk_score(value: Decimal) -> Decimal {
    let clamped = value.clamp(Decimal::ZERO, max_risk_score());
    clamped.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accepts_two_decimal_places() {
        assert!(validate_amount(dec!(15000.00)).is_ok());
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(dec!(9999999999.99)).is_ok());
    }

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(
            validate_amount(dec!(0)),
            Err(MoneyError::NotPositive(dec!(0)))
        );
        assert!(matches!(
            validate_amount(dec!(-5.00)),
            Err(MoneyError::NotPositive(_))
        ));
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        assert!(matches!(
            validate_amount(dec!(10.001)),
            Err(MoneyError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        // 10.0100 normalizes to 10.01
        assert!(validate_amount(dec!(10.0100)).is_ok());
    }

    #[test]
    fn test_rejects_precision_overflow() {
        assert_eq!(
            validate_amount(dec!(10000000000.00)),
            Err(MoneyError::Overflow(dec!(10000000000.00)))
        );
    }

    #[test]
    fn test_risk_score_clamped_to_scale() {
        assert_eq!(clamp_risk_score(dec!(135)), dec!(100.00));
        assert_eq!(clamp_risk_score(dec!(-10)), dec!(0.00));
        assert_eq!(clamp_risk_score(dec!(42.456)), dec!(42.46));
    }
}
