//! Store key layout
//!
//! ```text
//! 0x01                                   → Pool
//! 0x02                                   → Params (set at genesis)
//! 0x21 | len | operator                  → Validator
//! 0x22 | pubkey                          → operator (by consensus key)
//! 0x31 | len | delegator | len | val     → Delegation
//! 0x32 | len | delegator | len | val     → UnbondingDelegation
//! 0x34 | len | delegator | len | src | len | dst → Redelegation
//! 0x51 | len | account | denom           → balance
//! ```
//!
//! Addresses are length-prefixed so that a prefix scan over one address never
//! matches a longer address sharing the same leading bytes.

use crate::address::{AccAddress, ConsPubKey, ValAddress};

/// Pool record
pub const POOL_KEY: &[u8] = &[0x01];
/// Staking parameters chosen at genesis
pub const PARAMS_KEY: &[u8] = &[0x02];
/// Validators by operator
pub const VALIDATOR_PREFIX: u8 = 0x21;
/// Operator by consensus key
pub const VALIDATOR_BY_CONS_PREFIX: u8 = 0x22;
/// Delegations
pub const DELEGATION_PREFIX: u8 = 0x31;
/// Unbonding delegations
pub const UNBONDING_PREFIX: u8 = 0x32;
/// Redelegations
pub const REDELEGATION_PREFIX: u8 = 0x34;
/// Account balances
pub const BALANCE_PREFIX: u8 = 0x51;

fn push_addr(key: &mut Vec<u8>, addr: &[u8]) {
    key.push(addr.len().min(u8::MAX as usize) as u8);
    key.extend_from_slice(addr);
}

/// Key of a validator record
pub fn validator_key(operator: &ValAddress) -> Vec<u8> {
    let mut key = vec![VALIDATOR_PREFIX];
    push_addr(&mut key, operator.as_bytes());
    key
}

/// Key of the consensus key index
pub fn validator_by_cons_key(pubkey: &ConsPubKey) -> Vec<u8> {
    let mut key = vec![VALIDATOR_BY_CONS_PREFIX];
    key.extend_from_slice(pubkey.as_bytes());
    key
}

/// Prefix of every delegation held by `delegator`
pub fn delegations_prefix(delegator: &AccAddress) -> Vec<u8> {
    let mut key = vec![DELEGATION_PREFIX];
    push_addr(&mut key, delegator.as_bytes());
    key
}

/// Key of a delegation
pub fn delegation_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    let mut key = delegations_prefix(delegator);
    push_addr(&mut key, validator.as_bytes());
    key
}

/// Key of an unbonding delegation
pub fn unbonding_key(delegator: &AccAddress, validator: &ValAddress) -> Vec<u8> {
    let mut key = vec![UNBONDING_PREFIX];
    push_addr(&mut key, delegator.as_bytes());
    push_addr(&mut key, validator.as_bytes());
    key
}

/// Prefix of every redelegation made by `delegator`
pub fn redelegations_prefix(delegator: &AccAddress) -> Vec<u8> {
    let mut key = vec![REDELEGATION_PREFIX];
    push_addr(&mut key, delegator.as_bytes());
    key
}

/// Key of a redelegation
pub fn redelegation_key(delegator: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    let mut key = redelegations_prefix(delegator);
    push_addr(&mut key, src.as_bytes());
    push_addr(&mut key, dst.as_bytes());
    key
}

/// Key of an account balance
pub fn balance_key(account: &AccAddress, denom: &str) -> Vec<u8> {
    let mut key = vec![BALANCE_PREFIX];
    push_addr(&mut key, account.as_bytes());
    key.extend_from_slice(denom.as_bytes());
    key
}
