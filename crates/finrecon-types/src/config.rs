//! Injectable configuration for matching, commission and settlement.
//!
//! Nothing in the calculation paths reads global state: every rate and
//! threshold arrives through one of these structs, so the same inputs
//! always produce the same outputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{FinreconError, Money, PartnerType, Result, constants};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinreconConfig {
    pub matching: MatchConfig,
    pub commission: CommissionConfig,
    pub settlement: SettlementConfig,
}

impl FinreconConfig {
    /// Parse a JSON configuration document. Missing sections and fields
    /// fall back to their defaults. The result is validated.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw)
            .map_err(|e| FinreconError::Configuration(format!("invalid config document: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.commission.validate()?;
        self.settlement.validate()
    }
}

/// Scoring ladder confidences and auto-match threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum confidence for an automatic match. Candidates below it
    /// leave the statement item PENDING for review.
    pub auto_match_threshold: u8,
    /// Largest absolute amount difference (minor units) treated as fuzzy.
    pub fuzzy_amount_tolerance: i64,
    pub exact_confidence: u8,
    pub amount_only_confidence: u8,
    pub reference_only_confidence: u8,
    pub fuzzy_confidence: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auto_match_threshold: constants::DEFAULT_AUTO_MATCH_THRESHOLD,
            fuzzy_amount_tolerance: constants::DEFAULT_FUZZY_AMOUNT_TOLERANCE,
            exact_confidence: constants::CONFIDENCE_EXACT,
            amount_only_confidence: constants::CONFIDENCE_AMOUNT_ONLY,
            reference_only_confidence: constants::CONFIDENCE_REFERENCE_ONLY,
            fuzzy_confidence: constants::CONFIDENCE_FUZZY,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fuzzy_amount_tolerance < 0 {
            return Err(FinreconError::Configuration(
                "fuzzy_amount_tolerance must be >= 0".into(),
            ));
        }
        let ladder = [
            self.exact_confidence,
            self.amount_only_confidence,
            self.reference_only_confidence,
            self.fuzzy_confidence,
        ];
        if ladder.iter().any(|c| *c == 0 || *c > 100) || self.auto_match_threshold > 100 {
            return Err(FinreconError::Configuration(
                "confidences must be within 1..=100".into(),
            ));
        }
        // Exact must stay the ladder maximum: the matcher stops searching on it.
        if ladder[1..].iter().any(|c| *c >= self.exact_confidence) {
            return Err(FinreconError::Configuration(
                "exact_confidence must be strictly the highest confidence".into(),
            ));
        }
        Ok(())
    }
}

/// Commission allocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionConfig {
    /// Reference annual premium per policy.
    pub annual_premium_reference: Money,
    /// Share of the premium that is pure (risk) premium.
    pub pure_premium_ratio: Decimal,
    /// Commission rate applied to the pure premium.
    pub commission_rate: Decimal,
    /// Flat platform operating allowance per rider.
    pub flat_per_rider_allowance: Money,
    /// Fraction of the post-allowance remainder forming the joint mobilization pool.
    pub joint_mobilization_fraction: Decimal,
    /// Display label of the first mobilization partner.
    pub partner_a_label: String,
    /// Display label of the second mobilization partner.
    pub partner_b_label: String,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            annual_premium_reference: Money(constants::DEFAULT_ANNUAL_PREMIUM_REFERENCE),
            pure_premium_ratio: Decimal::new(constants::DEFAULT_PURE_PREMIUM_RATIO_PCT, 2),
            commission_rate: Decimal::new(constants::DEFAULT_COMMISSION_RATE_PCT, 2),
            flat_per_rider_allowance: Money(constants::DEFAULT_FLAT_PER_RIDER_ALLOWANCE),
            joint_mobilization_fraction: Decimal::new(constants::DEFAULT_JOINT_MOBILIZATION_PCT, 2),
            partner_a_label: constants::DEFAULT_PARTNER_A_LABEL.to_string(),
            partner_b_label: constants::DEFAULT_PARTNER_B_LABEL.to_string(),
        }
    }
}

impl CommissionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.annual_premium_reference.is_negative() || self.flat_per_rider_allowance.is_negative()
        {
            return Err(FinreconError::Configuration(
                "commission amounts must be >= 0".into(),
            ));
        }
        for (name, ratio) in [
            ("pure_premium_ratio", self.pure_premium_ratio),
            ("commission_rate", self.commission_rate),
            ("joint_mobilization_fraction", self.joint_mobilization_fraction),
        ] {
            check_unit_ratio(name, ratio)?;
        }
        Ok(())
    }
}

/// Settlement creation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Fee charged on each completed transaction in the period.
    pub fee_rate: Decimal,
    /// Partner types that may receive fee settlements.
    pub fee_partner_types: Vec<PartnerType>,
    /// Prefix of generated settlement numbers.
    pub number_prefix: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            fee_rate: Decimal::new(constants::DEFAULT_FEE_RATE_BPS, 4),
            fee_partner_types: vec![PartnerType::PaymentProvider, PartnerType::Agency],
            number_prefix: constants::DEFAULT_SETTLEMENT_NUMBER_PREFIX.to_string(),
        }
    }
}

impl SettlementConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_ratio("fee_rate", self.fee_rate)?;
        if self.number_prefix.trim().is_empty() {
            return Err(FinreconError::Configuration(
                "number_prefix must not be blank".into(),
            ));
        }
        Ok(())
    }
}

fn check_unit_ratio(name: &str, ratio: Decimal) -> Result<()> {
    if ratio < Decimal::ZERO || ratio > Decimal::ONE {
        return Err(FinreconError::Configuration(format!(
            "{name} must be within [0, 1], got {ratio}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FinreconConfig::default().validate().unwrap();
    }

    #[test]
    fn match_defaults() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.auto_match_threshold, 60);
        assert_eq!(cfg.fuzzy_amount_tolerance, 100);
        assert_eq!(cfg.exact_confidence, 100);
    }

    #[test]
    fn partial_document_uses_defaults() {
        let cfg = FinreconConfig::from_json_str(
            r#"{ "commission": { "commission_rate": "0.125" }, "matching": { "auto_match_threshold": 75 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.commission.commission_rate, Decimal::new(125, 3));
        assert_eq!(cfg.commission.pure_premium_ratio, Decimal::new(70, 2));
        assert_eq!(cfg.matching.auto_match_threshold, 75);
        assert_eq!(cfg.matching.fuzzy_amount_tolerance, 100);
        assert_eq!(cfg.settlement.number_prefix, "STL");
    }

    #[test]
    fn ratio_out_of_range_rejected() {
        let err = FinreconConfig::from_json_str(r#"{ "settlement": { "fee_rate": "1.5" } }"#)
            .unwrap_err();
        assert!(matches!(err, FinreconError::Configuration(_)));
    }

    #[test]
    fn exact_must_be_highest() {
        let cfg = MatchConfig {
            amount_only_confidence: 100,
            ..MatchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_document_rejected() {
        assert!(matches!(
            FinreconConfig::from_json_str("{ not json"),
            Err(FinreconError::Configuration(_))
        ));
    }
}
