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

//! Shared business-rule scoring machinery.
//!
//! Countries differ in thresholds, not in mechanics: each rule that fires
//! adds penalty points, positive signals subtract a few, the clamped total
//! maps through the risk ladder to a recommendation. The penalty values are
//! part of the product's tuning and shared across markets unless a country
//! overrides them.

use creditcore_domain::money::clamp_risk_score;
use creditcore_domain::{BankingData, Recommendation, RiskAssessment, RiskLevel};
use rust_decimal::Decimal;

pub(crate) fn penalty_defaults() -> Decimal {
    Decimal::new(35, 0)
}

pub(crate) fn penalty_low_income() -> Decimal {
    Decimal::new(30, 0)
}

pub(crate) fn penalty_high_dti() -> Decimal {
    Decimal::new(30, 0)
}

pub(crate) fn penalty_low_credit() -> Decimal {
    Decimal::new(25, 0)
}

pub(crate) fn penalty_high_payment_ratio() -> Decimal {
    Decimal::new(20, 0)
}

pub(crate) fn penalty_stability() -> Decimal {
    Decimal::new(15, 0)
}

pub(crate) fn bonus_excellent_credit() -> Decimal {
    Decimal::new(10, 0)
}

/// Credit score considered excellent on the international scale.
pub(crate) const EXCELLENT_SCORE_THRESHOLD: i32 = 750;

/// Accumulates penalty points and reasons while rules run.
pub(crate) struct ScoreCard {
    points: Decimal,
    reasons: Vec<String>,
    requires_review: bool,
}

impl ScoreCard {
    /// Start an evaluation. A fallback banking artifact immediately demands
    /// review: synthetic data must never auto-decide an application.
    pub(crate) fn open(banking: &BankingData) -> Self {
        let mut card = Self {
            points: Decimal::ZERO,
            reasons: Vec::new(),
            requires_review: false,
        };
        if banking.is_fallback() {
            card.requires_review = true;
            card.reasons
                .push("Banking data unavailable, evaluated against conservative fallback".into());
        }
        card
    }

    pub(crate) fn penalize(&mut self, points: Decimal, reason: impl Into<String>) {
        self.points += points;
        self.reasons.push(reason.into());
    }

    pub(crate) fn reward(&mut self, points: Decimal, reason: impl Into<String>) {
        self.points -= points;
        self.reasons.push(reason.into());
    }

    pub(crate) fn demand_review(&mut self) {
        self.requires_review = true;
    }

    /// Hard rejection: the score saturates and the recommendation is REJECT
    /// regardless of everything else.
    pub(crate) fn reject(mut self, reason: impl Into<String>) -> RiskAssessment {
        self.reasons.push(reason.into());
        RiskAssessment {
            risk_score: Decimal::new(100, 0),
            risk_level: RiskLevel::Critical,
            recommendation: Recommendation::Reject,
            reasons: self.reasons,
            requires_review: false,
        }
    }

    /// Close the card: clamp the score, classify, recommend.
    pub(crate) fn close(self) -> RiskAssessment {
        let risk_score = clamp_risk_score(self.points);
        let risk_level = RiskLevel::from_score(risk_score);
        let recommendation = match risk_level {
            RiskLevel::Critical => Recommendation::Reject,
            RiskLevel::High => Recommendation::Review,
            RiskLevel::Medium | RiskLevel::Low => {
                if self.requires_review {
                    Recommendation::Review
                } else {
                    Recommendation::Approve
                }
            }
        };
        let requires_review =
            self.requires_review || matches!(recommendation, Recommendation::Review);
        let reasons = if self.reasons.is_empty() {
            vec!["Standard credit profile".to_string()]
        } else {
            self.reasons
        };
        RiskAssessment {
            risk_score,
            risk_level,
            recommendation,
            reasons,
            requires_review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::Map;

    fn real_banking() -> BankingData {
        BankingData {
            provider_name: "p".into(),
            account_status: "active".into(),
            credit_score: Some(700),
            total_debt: None,
            monthly_obligations: None,
            has_defaults: false,
            additional_data: Map::new(),
        }
    }

    #[test]
    fn test_clean_card_approves() {
        let assessment = ScoreCard::open(&real_banking()).close();
        assert_eq!(assessment.recommendation, Recommendation::Approve);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.reasons, vec!["Standard credit profile"]);
    }

    #[test]
    fn test_fallback_always_reviews() {
        let mut banking = real_banking();
        banking
            .additional_data
            .insert("fallback".into(), serde_json::Value::Bool(true));
        let assessment = ScoreCard::open(&banking).close();
        assert_eq!(assessment.recommendation, Recommendation::Review);
        assert!(assessment.requires_review);
    }

    #[test]
    fn test_critical_score_rejects() {
        let mut card = ScoreCard::open(&real_banking());
        card.penalize(dec!(40), "a");
        card.penalize(dec!(35), "b");
        let assessment = card.close();
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.recommendation, Recommendation::Reject);
    }

    #[test]
    fn test_high_score_reviews() {
        let mut card = ScoreCard::open(&real_banking());
        card.penalize(dec!(55), "a");
        let assessment = card.close();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.recommendation, Recommendation::Review);
        assert!(assessment.requires_review);
    }

    #[test]
    fn test_hard_reject_saturates() {
        let card = ScoreCard::open(&real_banking());
        let assessment = card.reject("amount over the country maximum");
        assert_eq!(assessment.risk_score, dec!(100));
        assert_eq!(assessment.recommendation, Recommendation::Reject);
    }

    #[test]
    fn test_rewards_reduce_score() {
        let mut card = ScoreCard::open(&real_banking());
        card.penalize(dec!(35), "a");
        card.reward(dec!(10), "excellent credit");
        let assessment = card.close();
        assert_eq!(assessment.risk_score, dec!(25.00));
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }
}
