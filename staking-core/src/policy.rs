//! Commission and self-delegation rules
//!
//! Each rule has one implementation, used by stateless message validation
//! and by the ledger alike.

use crate::error::{Error, Result};
use crate::types::{Commission, CommissionRates};
use rust_decimal::Decimal;

fn in_unit_interval(d: Decimal) -> bool {
    d >= Decimal::ZERO && d <= Decimal::ONE
}

/// Rate lies in [0, 1]
pub fn check_commission_rate(rate: Decimal) -> Result<()> {
    if !in_unit_interval(rate) {
        return Err(Error::InvalidInput(
            "commission rate must be between 0 and 1, inclusive".into(),
        ));
    }
    Ok(())
}

/// Bounds for a new validator's commission:
/// `0 <= max_rate <= 1`, `0 <= rate <= max_rate`, `0 <= max_change_rate <= max_rate`
pub fn check_commission_rates(rates: &CommissionRates) -> Result<()> {
    if !in_unit_interval(rates.max_rate) {
        return Err(Error::InvalidInput(
            "commission max rate must be between 0 and 1, inclusive".into(),
        ));
    }
    check_commission_rate(rates.rate)?;
    if rates.rate > rates.max_rate {
        return Err(Error::CommissionGtMaxRate);
    }
    if rates.max_change_rate < Decimal::ZERO {
        return Err(Error::CommissionChangeRateNegative);
    }
    if rates.max_change_rate > rates.max_rate {
        return Err(Error::CommissionChangeRateGtMaxRate);
    }
    Ok(())
}

/// A new rate respects the stored max rate and max change rate
pub fn check_commission_change(current: &Commission, new_rate: Decimal) -> Result<()> {
    check_commission_rate(new_rate)?;
    let rates = &current.commission_rates;
    if new_rate > rates.max_rate {
        return Err(Error::CommissionGtMaxRate);
    }
    if (new_rate - rates.rate).abs() > rates.max_change_rate {
        return Err(Error::CommissionGtMaxChangeRate);
    }
    Ok(())
}

/// Minimum self-delegation is positive and, when the backing tokens are
/// known, covered by them
pub fn check_min_self_delegation(min_self_delegation: Decimal, tokens: Option<Decimal>) -> Result<()> {
    if min_self_delegation <= Decimal::ZERO {
        return Err(Error::MinSelfDelegationInvalid);
    }
    if let Some(tokens) = tokens {
        if min_self_delegation > tokens {
            return Err(Error::SelfDelegationBelowMinimum);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::epoch;
    use rust_decimal_macros::dec;

    fn commission(rate: Decimal, max_rate: Decimal, max_change: Decimal) -> Commission {
        Commission {
            commission_rates: CommissionRates::new(rate, max_rate, max_change),
            update_time: epoch(),
        }
    }

    #[test]
    fn test_rate_bounds() {
        assert!(check_commission_rate(dec!(0)).is_ok());
        assert!(check_commission_rate(dec!(1)).is_ok());
        let err = check_commission_rate(dec!(1.5)).unwrap_err();
        assert_eq!(err.to_string(), "commission rate must be between 0 and 1, inclusive");
        assert!(check_commission_rate(dec!(-0.1)).is_err());
    }

    #[test]
    fn test_creation_bounds() {
        assert!(check_commission_rates(&CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.01))).is_ok());
        assert!(matches!(
            check_commission_rates(&CommissionRates::new(dec!(0.3), dec!(0.2), dec!(0.01))),
            Err(Error::CommissionGtMaxRate)
        ));
        assert!(matches!(
            check_commission_rates(&CommissionRates::new(dec!(0.1), dec!(0.2), dec!(-0.01))),
            Err(Error::CommissionChangeRateNegative)
        ));
        assert!(matches!(
            check_commission_rates(&CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.3))),
            Err(Error::CommissionChangeRateGtMaxRate)
        ));
        assert!(check_commission_rates(&CommissionRates::new(dec!(0.1), dec!(1.2), dec!(0.1))).is_err());
    }

    #[test]
    fn test_commission_change() {
        let current = commission(dec!(0.1), dec!(0.5), dec!(0.05));
        assert!(check_commission_change(&current, dec!(0.15)).is_ok());
        assert!(check_commission_change(&current, dec!(0.05)).is_ok());
        assert!(matches!(
            check_commission_change(&current, dec!(0.2)),
            Err(Error::CommissionGtMaxChangeRate)
        ));
        assert!(matches!(
            check_commission_change(&current, dec!(0.6)),
            Err(Error::CommissionGtMaxRate)
        ));
    }

    #[test]
    fn test_min_self_delegation() {
        assert!(matches!(
            check_min_self_delegation(dec!(0), None),
            Err(Error::MinSelfDelegationInvalid)
        ));
        assert!(matches!(
            check_min_self_delegation(dec!(150), Some(dec!(100))),
            Err(Error::SelfDelegationBelowMinimum)
        ));
        assert!(check_min_self_delegation(dec!(50), Some(dec!(100))).is_ok());
    }
}
