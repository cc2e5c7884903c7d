//! Ledger invariants
//!
//! Run after every committed block in debug builds and from tests. A broken
//! invariant is a bug in the ledger, never a user error.

use crate::address::ValAddress;
use crate::error::{Error, Result};
use crate::ledger::Keeper;
use crate::store::KvStore;
use crate::types::checked_add;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Sum of delegation shares per validator equals its `delegator_shares`,
/// and no delegation points at a missing validator
///
/// One pass over delegations, one over validators.
pub fn delegator_shares_invariant(keeper: &Keeper, store: &dyn KvStore) -> Result<()> {
    let mut sums: BTreeMap<ValAddress, Decimal> = BTreeMap::new();
    for delegation in keeper.delegations(store)? {
        let sum = sums
            .entry(delegation.validator_address)
            .or_insert(Decimal::ZERO);
        *sum = checked_add(*sum, delegation.shares)?;
    }

    for validator in keeper.validators(store)? {
        let total = sums
            .remove(&validator.operator_address)
            .unwrap_or(Decimal::ZERO);
        if total != validator.delegator_shares {
            return Err(Error::InvariantBroken(format!(
                "validator {} has {} delegator shares but delegations sum to {}",
                validator.operator_address, validator.delegator_shares, total
            )));
        }
    }

    if let Some((operator, shares)) = sums.into_iter().next() {
        return Err(Error::InvariantBroken(format!(
            "delegations of {} shares point at missing validator {}",
            shares, operator
        )));
    }
    Ok(())
}

/// Pool totals match validator tokens plus pending unbondings
///
/// Bonded pool equals the tokens of bonded validators. Not-bonded pool equals
/// the tokens of the other validators plus unreleased unbonding balances.
pub fn pool_invariant(keeper: &Keeper, store: &dyn KvStore) -> Result<()> {
    let pool = keeper.pool(store)?;

    let mut bonded = Decimal::ZERO;
    let mut not_bonded = Decimal::ZERO;
    for validator in keeper.validators(store)? {
        if validator.tokens < Decimal::ZERO {
            return Err(Error::InvariantBroken(format!(
                "validator {} has negative tokens",
                validator.operator_address
            )));
        }
        if validator.is_bonded() {
            bonded = checked_add(bonded, validator.tokens)?;
        } else {
            not_bonded = checked_add(not_bonded, validator.tokens)?;
        }
    }
    for ubd in keeper.unbonding_delegations(store)? {
        for entry in &ubd.entries {
            not_bonded = checked_add(not_bonded, entry.balance)?;
        }
    }

    if pool.bonded_tokens != bonded {
        return Err(Error::InvariantBroken(format!(
            "bonded pool {} but bonded validators hold {}",
            pool.bonded_tokens, bonded
        )));
    }
    if pool.not_bonded_tokens != not_bonded {
        return Err(Error::InvariantBroken(format!(
            "not-bonded pool {} but expected {}",
            pool.not_bonded_tokens, not_bonded
        )));
    }
    Ok(())
}

/// Every invariant
pub fn check_all(keeper: &Keeper, store: &dyn KvStore) -> Result<()> {
    delegator_shares_invariant(keeper, store)?;
    pool_invariant(keeper, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AccAddress;
    use crate::config::Params;
    use crate::keys;
    use crate::store::{KvStoreExt, MemStore};
    use crate::types::{Delegation, Pool};
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_store_holds() {
        let store = MemStore::new();
        check_all(&Keeper::new(Params::default()), &store).unwrap();
    }

    #[test]
    fn test_orphan_delegation_detected() {
        let mut store = MemStore::new();
        let delegation = Delegation {
            delegator_address: AccAddress::new(vec![1; 20]),
            validator_address: ValAddress::new(vec![2; 20]),
            shares: dec!(5),
        };
        store
            .set_encoded(
                &keys::delegation_key(&delegation.delegator_address, &delegation.validator_address),
                &delegation,
            )
            .unwrap();

        let keeper = Keeper::new(Params::default());
        assert_eq!(keeper.delegations(&store).unwrap(), vec![delegation]);
        let err = delegator_shares_invariant(&keeper, &store).unwrap_err();
        assert!(matches!(err, Error::InvariantBroken(msg) if msg.contains("missing validator")));
    }

    #[test]
    fn test_pool_mismatch_detected() {
        let mut store = MemStore::new();
        let pool = Pool {
            not_bonded_tokens: dec!(0),
            bonded_tokens: dec!(10),
        };
        store.set_encoded(keys::POOL_KEY, &pool).unwrap();

        let err = pool_invariant(&Keeper::new(Params::default()), &store).unwrap_err();
        assert!(matches!(err, Error::InvariantBroken(_)));
    }
}
