//! Sales tax and broker fee rates derived from skills and standings.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// 8% base sales tax before the Accounting skill.
pub const BASE_SALES_TAX: Decimal = Decimal::from_parts(8, 2);
/// 3% base broker fee before Broker Relations and standings.
pub const BASE_BROKER_FEE: Decimal = Decimal::from_parts(3, 2);
/// Broker fee never drops below 1%.
pub const MIN_BROKER_FEE: Decimal = Decimal::from_parts(1, 2);

const ACCOUNTING_STEP: Decimal = Decimal::from_parts(11, 2);
const BROKER_RELATIONS_STEP: Decimal = Decimal::from_parts(3, 3);
const CORP_STANDING_STEP: Decimal = Decimal::from_parts(3, 4);
const FACTION_STANDING_STEP: Decimal = Decimal::from_parts(2, 4);

pub const MAX_SKILL_LEVEL: u8 = 5;
const STANDING_LIMIT: f64 = 10.0;

/// Skill levels and standings a fee profile is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInputs {
    #[serde(default)]
    pub accounting_level: i64,
    #[serde(default)]
    pub broker_relations_level: i64,
    #[serde(default)]
    pub corp_standing: f64,
    #[serde(default)]
    pub faction_standing: f64,
}

impl FeeInputs {
    pub fn new(accounting_level: i64, broker_relations_level: i64) -> Self {
        Self {
            accounting_level,
            broker_relations_level,
            corp_standing: 0.0,
            faction_standing: 0.0,
        }
    }

    pub fn with_standings(mut self, corp_standing: f64, faction_standing: f64) -> Self {
        self.corp_standing = corp_standing;
        self.faction_standing = faction_standing;
        self
    }

    /// Clamp every input to its documented range.
    ///
    /// Levels go to `0..=5`, standings to `[-10, 10]`. Infinite or huge
    /// standings land on the nearest bound; NaN counts as neutral.
    pub fn clamped(&self) -> ClampedFeeInputs {
        let level = |v: i64| v.clamp(0, MAX_SKILL_LEVEL as i64) as u8;
        let standing = |v: f64| {
            let bounded = if v.is_nan() {
                0.0
            } else {
                v.clamp(-STANDING_LIMIT, STANDING_LIMIT)
            };
            Decimal::from_f64(bounded).unwrap_or_default()
        };

        ClampedFeeInputs {
            accounting_level: level(self.accounting_level),
            broker_relations_level: level(self.broker_relations_level),
            corp_standing: standing(self.corp_standing),
            faction_standing: standing(self.faction_standing),
        }
    }
}

/// Fee inputs after range clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClampedFeeInputs {
    pub accounting_level: u8,
    pub broker_relations_level: u8,
    pub corp_standing: Decimal,
    pub faction_standing: Decimal,
}

/// Immutable tax and fee rates applied to every sale of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeProfile {
    pub sales_tax_rate: Decimal,
    pub broker_fee_rate: Decimal,
    pub inputs: ClampedFeeInputs,
}

impl FeeProfile {
    /// Rates for a character with no skills and neutral standings.
    pub fn untrained() -> Self {
        compute_fee_profile(&FeeInputs::default())
    }
}

impl Default for FeeProfile {
    fn default() -> Self {
        Self::untrained()
    }
}

/// Compute the sales tax and broker fee rates.
///
/// - `sales_tax = 0.08 * (1 - 0.11 * accounting)`
/// - `broker_fee = max(0.01, 0.03 - 0.003 * broker_relations - (0.0003 * corp + 0.0002 * faction))`
pub fn compute_fee_profile(inputs: &FeeInputs) -> FeeProfile {
    let clamped = inputs.clamped();
    if clamped.accounting_level as i64 != inputs.accounting_level
        || clamped.broker_relations_level as i64 != inputs.broker_relations_level
        || Decimal::from_f64(inputs.corp_standing) != Some(clamped.corp_standing)
        || Decimal::from_f64(inputs.faction_standing) != Some(clamped.faction_standing)
    {
        tracing::debug!(?inputs, ?clamped, "Fee inputs clamped to valid range");
    }

    let accounting = Decimal::from_units(clamped.accounting_level as u64);
    let sales_tax_rate = BASE_SALES_TAX * (Decimal::one() - ACCOUNTING_STEP * accounting);

    let broker_relations = Decimal::from_units(clamped.broker_relations_level as u64);
    let standing_bonus = CORP_STANDING_STEP * clamped.corp_standing
        + FACTION_STANDING_STEP * clamped.faction_standing;
    let raw_broker = BASE_BROKER_FEE - BROKER_RELATIONS_STEP * broker_relations - standing_bonus;
    let broker_fee_rate = if raw_broker < MIN_BROKER_FEE {
        MIN_BROKER_FEE
    } else {
        raw_broker
    };

    FeeProfile {
        sales_tax_rate,
        broker_fee_rate,
        inputs: clamped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_untrained_rates() {
        let profile = FeeProfile::untrained();
        assert_eq!(profile.sales_tax_rate, d("0.08"));
        assert_eq!(profile.broker_fee_rate, d("0.03"));
    }

    #[test]
    fn test_max_skills_rates() {
        let profile = compute_fee_profile(&FeeInputs::new(5, 5));
        assert_eq!(profile.sales_tax_rate, d("0.036"));
        assert_eq!(profile.broker_fee_rate, d("0.015"));
    }

    #[test]
    fn test_each_accounting_level() {
        let expected = ["0.08", "0.0712", "0.0624", "0.0536", "0.0448", "0.036"];
        for (level, rate) in expected.iter().enumerate() {
            let profile = compute_fee_profile(&FeeInputs::new(level as i64, 0));
            assert_eq!(profile.sales_tax_rate, d(rate), "accounting level {}", level);
        }
    }

    #[test]
    fn test_rates_are_monotonic_in_skills() {
        for level in 0..5 {
            let lower = compute_fee_profile(&FeeInputs::new(level, level));
            let higher = compute_fee_profile(&FeeInputs::new(level + 1, level + 1));
            assert!(higher.sales_tax_rate < lower.sales_tax_rate);
            assert!(higher.broker_fee_rate < lower.broker_fee_rate);
        }
    }

    #[test]
    fn test_standings_reduce_broker_fee() {
        let neutral = compute_fee_profile(&FeeInputs::new(0, 5));
        let friendly = compute_fee_profile(&FeeInputs::new(0, 5).with_standings(5.0, 5.0));
        // 0.015 - (0.0015 + 0.001)
        assert_eq!(friendly.broker_fee_rate, d("0.0125"));
        assert!(friendly.broker_fee_rate < neutral.broker_fee_rate);
        assert_eq!(friendly.sales_tax_rate, neutral.sales_tax_rate);
    }

    #[test]
    fn test_negative_standings_raise_broker_fee() {
        let hostile = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(-10.0, -10.0));
        assert_eq!(hostile.broker_fee_rate, d("0.035"));
    }

    #[test]
    fn test_broker_fee_floor() {
        let profile = compute_fee_profile(&FeeInputs::new(5, 5).with_standings(10.0, 10.0));
        // 0.015 - 0.005 = 0.01, exactly at the floor
        assert_eq!(profile.broker_fee_rate, MIN_BROKER_FEE);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let wild = compute_fee_profile(&FeeInputs::new(9, -3).with_standings(25.0, f64::NAN));
        let tame = compute_fee_profile(&FeeInputs::new(5, 0).with_standings(10.0, 0.0));
        assert_eq!(wild, tame);
        assert_eq!(wild.inputs.accounting_level, 5);
        assert_eq!(wild.inputs.broker_relations_level, 0);
        assert_eq!(wild.inputs.corp_standing, d("10"));
        assert_eq!(wild.inputs.faction_standing, Decimal::zero());
    }

    #[test]
    fn test_extreme_standings_clamp_to_nearest_bound() {
        let at_max = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(10.0, 0.0));
        let at_min = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(-10.0, 0.0));
        assert_eq!(at_max.broker_fee_rate, d("0.027"));

        for huge in [1e30, f64::INFINITY] {
            let profile = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(huge, 0.0));
            assert_eq!(profile, at_max);
            assert_eq!(profile.inputs.corp_standing, d("10"));

            let profile = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(-huge, 0.0));
            assert_eq!(profile, at_min);
            assert_eq!(profile.inputs.corp_standing, d("-10"));
        }

        let faction = compute_fee_profile(&FeeInputs::new(0, 0).with_standings(0.0, f64::INFINITY));
        assert_eq!(faction.inputs.faction_standing, d("10"));
        assert_eq!(faction.broker_fee_rate, d("0.028"));
    }

    #[test]
    fn test_broker_fee_never_below_floor() {
        for broker in 0..=5 {
            for standing in [-10.0, -2.5, 0.0, 4.2, 10.0] {
                let profile =
                    compute_fee_profile(&FeeInputs::new(0, broker).with_standings(standing, standing));
                assert!(profile.broker_fee_rate >= MIN_BROKER_FEE);
                assert!(profile.broker_fee_rate <= d("0.035"));
            }
        }
    }
}
