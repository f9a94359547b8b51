use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{invalid_bid_amount_error, Error};

pub const PLATFORM_RATE: Decimal = dec!(0.05);
pub const MINIMUM_CHARGE: Decimal = dec!(25);
pub const MAXIMUM_CHARGE: Decimal = dec!(100);

/// A bid below the minimum platform charge cannot clear, so the floor on
/// bid amounts equals the floor on the charge itself.
pub const MINIMUM_BID_AMOUNT: Decimal = MINIMUM_CHARGE;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub platform_charge: Decimal,
    pub carrier_net_amount: Decimal,
    pub platform_charge_percentage: Decimal,
}

pub fn validate_bid_amount(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO || amount < MINIMUM_BID_AMOUNT {
        return Err(invalid_bid_amount_error());
    }

    Ok(())
}

/// Computes the platform charge for a bid. Deterministic: the result is
/// persisted on the bid row at submission and never recalculated, even if
/// the rate or clamp bounds change later.
pub fn compute_charge(amount: Decimal) -> Result<FeeBreakdown, Error> {
    validate_bid_amount(amount)?;

    let platform_charge = (amount * PLATFORM_RATE)
        .round_dp(2)
        .clamp(MINIMUM_CHARGE, MAXIMUM_CHARGE);

    // amount > 0 is guaranteed above, the division cannot fail
    let platform_charge_percentage = (platform_charge / amount * dec!(100)).round_dp(2);

    Ok(FeeBreakdown {
        platform_charge,
        carrier_net_amount: amount - platform_charge,
        platform_charge_percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_percent_within_bounds() {
        let breakdown = compute_charge(dec!(500)).unwrap();

        assert_eq!(breakdown.platform_charge, dec!(25));
        assert_eq!(breakdown.carrier_net_amount, dec!(475));
        assert_eq!(breakdown.platform_charge_percentage, dec!(5));
    }

    #[test]
    fn charge_clamped_to_maximum() {
        let breakdown = compute_charge(dec!(3000)).unwrap();

        assert_eq!(breakdown.platform_charge, dec!(100));
        assert_eq!(breakdown.carrier_net_amount, dec!(2900));
        assert_eq!(breakdown.platform_charge_percentage, dec!(3.33));
    }

    #[test]
    fn charge_clamped_to_minimum() {
        let breakdown = compute_charge(dec!(100)).unwrap();

        // 5% of 100 is 5, clamped up to the 25 floor
        assert_eq!(breakdown.platform_charge, dec!(25));
        assert_eq!(breakdown.carrier_net_amount, dec!(75));
        assert_eq!(breakdown.platform_charge_percentage, dec!(25));
    }

    #[test]
    fn net_and_charge_sum_to_amount() {
        for amount in [dec!(25), dec!(137.50), dec!(499.99), dec!(2000), dec!(100000)] {
            let breakdown = compute_charge(amount).unwrap();
            assert_eq!(
                breakdown.carrier_net_amount + breakdown.platform_charge,
                amount
            );
        }
    }

    #[test]
    fn amount_at_floor_clears_with_zero_net() {
        let breakdown = compute_charge(dec!(25)).unwrap();

        assert_eq!(breakdown.platform_charge, dec!(25));
        assert_eq!(breakdown.carrier_net_amount, dec!(0));
        assert_eq!(breakdown.platform_charge_percentage, dec!(100));
    }

    #[test]
    fn amount_below_floor_rejected() {
        let err = compute_charge(dec!(10)).unwrap_err();
        assert_eq!(err.code, crate::error::INVALID_BID_AMOUNT);

        assert!(validate_bid_amount(dec!(24.99)).is_err());
        assert!(validate_bid_amount(dec!(25)).is_ok());
    }

    #[test]
    fn non_positive_amount_rejected() {
        assert!(validate_bid_amount(dec!(0)).is_err());
        assert!(validate_bid_amount(dec!(-500)).is_err());
    }
}
