//! Commission allocation.
//!
//! ```text
//! pure_premium        = round(annual_premium_reference × pure_premium_ratio)
//! per_policy          = round(pure_premium × commission_rate)
//! total               = n × per_policy
//! allowance           = min(n × flat_per_rider_allowance, total)
//! remaining           = total − allowance                         (≥ 0)
//! joint_pool          = floor(remaining × joint_mobilization_fraction)
//! profit_pool         = remaining − joint_pool
//!
//! partner A / B       = joint_pool / 2 + profit_pool / 3
//! platform            = allowance + profit_pool / 3 + remainders
//! ```
//!
//! The per-policy figures are computed once and then scaled by `n`, so any
//! count is an exact multiple of the single-policy result.

use std::collections::HashSet;

use finrecon_types::{
    ActiveRider, CommissionAllocation, CommissionBreakdown, CommissionConfig,
    CommissionDistribution, CommissionPreview, FinreconError, Money, Period, Result, constants,
    invariants,
};

/// Stateless allocator over a fixed configuration.
#[derive(Debug, Clone)]
pub struct CommissionAllocator {
    config: CommissionConfig,
}

impl CommissionAllocator {
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(config: CommissionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &CommissionConfig {
        &self.config
    }

    /// `(pure_premium, commission)` for a single policy.
    ///
    /// # Errors
    /// Returns `Overflow` if the reference premium cannot be scaled.
    pub fn per_policy(&self) -> Result<(Money, Money)> {
        let pure = self
            .config
            .annual_premium_reference
            .apply_ratio(self.config.pure_premium_ratio)?;
        let commission = pure.apply_ratio(self.config.commission_rate)?;
        Ok((pure, commission))
    }

    /// Allocate the commission earned on `policy_count` policies.
    ///
    /// # Errors
    /// Returns `Overflow` if any product leaves the `i64` range, or
    /// `InvariantViolation` if the result does not foot.
    pub fn allocate(&self, policy_count: u64) -> Result<CommissionAllocation> {
        let n = i64::try_from(policy_count).map_err(|_| FinreconError::Overflow {
            context: format!("policy count {policy_count}"),
        })?;
        let (pure, per_policy) = self.per_policy()?;
        let total = per_policy.try_mul(n, "total commission")?;

        let allowance_due = self
            .config
            .flat_per_rider_allowance
            .try_mul(n, "operating allowance")?;
        let allowance = allowance_due.min(total);
        let shortfall = allowance_due - allowance;
        if !shortfall.is_zero() {
            tracing::warn!(
                policies = policy_count,
                total = %total,
                allowance_due = %allowance_due,
                shortfall = %shortfall,
                "Operating allowance exceeds commission, remainder clamped to zero"
            );
        }

        let remaining = total - allowance;
        let joint_pool = remaining.apply_ratio_floor(self.config.joint_mobilization_fraction)?;
        let profit_pool = remaining - joint_pool;
        let (joint_share, joint_rest) = split(joint_pool, constants::JOINT_MOBILIZATION_SHARES);
        let (profit_share, profit_rest) = split(profit_pool, constants::PROFIT_SHARE_SHARES);
        let rounding_remainder = joint_rest + profit_rest;

        let allocation = CommissionAllocation {
            policy_count,
            distinct_riders: None,
            pure_premium_per_policy: pure,
            commission_per_policy: per_policy,
            total_commission: total,
            breakdown: CommissionBreakdown {
                platform_operating_allowance: allowance,
                joint_mobilization: joint_pool,
                profit_share: profit_pool,
                allowance_shortfall: shortfall,
            },
            distribution: CommissionDistribution {
                platform_total: allowance + profit_share + rounding_remainder,
                partner_a_total: joint_share + profit_share,
                partner_b_total: joint_share + profit_share,
                partner_a_joint_share: joint_share,
                partner_b_joint_share: joint_share,
                platform_profit_share: profit_share,
                partner_a_profit_share: profit_share,
                partner_b_profit_share: profit_share,
                rounding_remainder,
            },
            partner_a_label: self.config.partner_a_label.clone(),
            partner_b_label: self.config.partner_b_label.clone(),
        };
        invariants::check_allocation_foot(&allocation)?;

        tracing::debug!(
            policies = policy_count,
            total = %allocation.total_commission,
            platform = %allocation.distribution.platform_total,
            partner_a = %allocation.distribution.partner_a_total,
            partner_b = %allocation.distribution.partner_b_total,
            "Commission allocated"
        );
        Ok(allocation)
    }

    /// Allocate over raw active-rider records.
    ///
    /// Every record counts as one policy; the distinct rider count is
    /// reported alongside. An empty slice yields an all-zero allocation.
    ///
    /// # Errors
    /// Same as [`CommissionAllocator::allocate`].
    pub fn allocate_for_riders(&self, riders: &[ActiveRider]) -> Result<CommissionAllocation> {
        let distinct: HashSet<&str> = riders.iter().map(|r| r.rider_id.as_str()).collect();
        let mut allocation = self.allocate(riders.len() as u64)?;
        allocation.distinct_riders = Some(distinct.len() as u64);
        Ok(allocation)
    }

    /// Allocation for a period with its foot-check result.
    ///
    /// # Errors
    /// Same as [`CommissionAllocator::allocate`].
    pub fn preview(&self, period: Period, policy_count: u64) -> Result<CommissionPreview> {
        let allocation = self.allocate(policy_count)?;
        Ok(CommissionPreview {
            period,
            balanced: allocation.is_balanced(),
            allocation,
        })
    }
}

/// Equal shares and the leftover.
fn split(pool: Money, shares: i64) -> (Money, Money) {
    (Money(pool.0 / shares), Money(pool.0 % shares))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn allocator() -> CommissionAllocator {
        CommissionAllocator::new(CommissionConfig::default()).unwrap()
    }

    #[test]
    fn zero_policies_all_zero() {
        let a = allocator().allocate(0).unwrap();
        assert_eq!(a.total_commission, Money::ZERO);
        assert_eq!(a.breakdown, CommissionBreakdown::default());
        assert_eq!(a.distribution, CommissionDistribution::default());
        assert!(a.is_balanced());
    }

    #[test]
    fn single_policy_reference_figures() {
        let a = allocator().allocate(1).unwrap();
        assert_eq!(a.pure_premium_per_policy, Money(210_000));
        assert_eq!(a.commission_per_policy, Money(21_000));
        assert_eq!(a.total_commission, Money(21_000));
        assert_eq!(a.breakdown.platform_operating_allowance, Money(5_000));
        assert_eq!(a.breakdown.joint_mobilization, Money(6_400));
        assert_eq!(a.breakdown.profit_share, Money(9_600));
        assert_eq!(a.distribution.partner_a_total, Money(3_200 + 3_200));
        assert_eq!(a.distribution.partner_b_total, Money(6_400));
        assert_eq!(a.distribution.platform_total, Money(5_000 + 3_200));
        assert_eq!(a.distribution.rounding_remainder, Money::ZERO);
    }

    #[test]
    fn scales_linearly() {
        let one = allocator().allocate(1).unwrap();
        let hundred = allocator().allocate(100).unwrap();
        assert_eq!(hundred.total_commission, Money(one.total_commission.0 * 100));
        assert_eq!(
            hundred.breakdown.platform_operating_allowance,
            Money(one.breakdown.platform_operating_allowance.0 * 100)
        );
        assert_eq!(hundred.commission_per_policy, one.commission_per_policy);
    }

    #[test]
    fn large_portfolio_without_overflow() {
        let one = allocator().allocate(1).unwrap();
        let big = allocator().allocate(700_000).unwrap();
        assert_eq!(big.total_commission, Money(one.total_commission.0 * 700_000));
        assert_eq!(big.total_commission, Money(14_700_000_000));
        assert!(big.is_balanced());
    }

    #[test]
    fn foots_for_many_counts() {
        let alloc = allocator();
        for n in (0..=2_000).chain([999_999, 1_000_000, 1_000_001]) {
            let a = alloc.allocate(n).unwrap();
            assert!(a.is_balanced(), "n = {n}");
            assert!(!a.distribution.rounding_remainder.is_negative());
        }
    }

    #[test]
    fn rounding_remainder_goes_to_platform() {
        let alloc = CommissionAllocator::new(CommissionConfig {
            annual_premium_reference: Money(101),
            pure_premium_ratio: Decimal::ONE,
            commission_rate: Decimal::ONE,
            flat_per_rider_allowance: Money::ZERO,
            ..CommissionConfig::default()
        })
        .unwrap();
        let a = alloc.allocate(1).unwrap();
        // remaining 101 → joint floor(40.4) = 40, profit 61
        assert_eq!(a.breakdown.joint_mobilization, Money(40));
        assert_eq!(a.breakdown.profit_share, Money(61));
        assert_eq!(a.distribution.partner_a_total, Money(20 + 20));
        assert_eq!(a.distribution.rounding_remainder, Money(1));
        assert_eq!(a.distribution.platform_total, Money(20 + 1));
        assert!(a.is_balanced());
    }

    #[test]
    fn allowance_above_commission_clamps_remainder() {
        let alloc = CommissionAllocator::new(CommissionConfig {
            flat_per_rider_allowance: Money(50_000),
            ..CommissionConfig::default()
        })
        .unwrap();
        let a = alloc.allocate(3).unwrap();
        assert_eq!(a.total_commission, Money(63_000));
        assert_eq!(a.breakdown.platform_operating_allowance, Money(63_000));
        assert_eq!(a.breakdown.allowance_shortfall, Money(150_000 - 63_000));
        assert_eq!(a.breakdown.joint_mobilization, Money::ZERO);
        assert_eq!(a.breakdown.profit_share, Money::ZERO);
        assert_eq!(a.distribution.partner_a_total, Money::ZERO);
        assert_eq!(a.distribution.platform_total, Money(63_000));
        assert!(a.is_balanced());
    }

    #[test]
    fn absurd_count_overflows_cleanly() {
        let err = allocator().allocate(u64::MAX).unwrap_err();
        assert!(matches!(err, FinreconError::Overflow { .. }));
        let err = allocator().allocate(i64::MAX as u64).unwrap_err();
        assert!(matches!(err, FinreconError::Overflow { .. }));
    }

    #[test]
    fn riders_counted_and_deduplicated() {
        let riders = vec![
            ActiveRider { policy_id: "P1".into(), rider_id: "R1".into() },
            ActiveRider { policy_id: "P2".into(), rider_id: "R1".into() },
            ActiveRider { policy_id: "P3".into(), rider_id: "R2".into() },
        ];
        let a = allocator().allocate_for_riders(&riders).unwrap();
        assert_eq!(a.policy_count, 3);
        assert_eq!(a.distinct_riders, Some(2));
        assert_eq!(a.total_commission, Money(63_000));
    }

    #[test]
    fn no_riders_all_zero() {
        let a = allocator().allocate_for_riders(&[]).unwrap();
        assert_eq!(a.total_commission, Money::ZERO);
        assert_eq!(a.distinct_riders, Some(0));
        assert!(a.is_balanced());
    }

    #[test]
    fn preview_reports_balance() {
        let period = Period::month(2026, 1).unwrap();
        let p = allocator().preview(period, 42).unwrap();
        assert!(p.balanced);
        assert_eq!(p.period, period);
        assert_eq!(p.allocation.policy_count, 42);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = CommissionAllocator::new(CommissionConfig {
            commission_rate: Decimal::new(15, 1),
            ..CommissionConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, FinreconError::Configuration(_)));
    }
}
