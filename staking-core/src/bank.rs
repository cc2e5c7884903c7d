//! Account balances
//!
//! Minimal bank kept in the same store as the staking state, so a rolled
//! back operation rolls back its balance changes too.

use crate::address::AccAddress;
use crate::error::{Error, Result};
use crate::keys;
use crate::store::{KvStore, KvStoreExt};
use crate::types::{checked_add, checked_sub, Coin};
use rust_decimal::Decimal;

/// Balance of `account` in `denom`
pub fn balance(store: &dyn KvStore, account: &AccAddress, denom: &str) -> Result<Decimal> {
    Ok(store
        .get_decoded::<Decimal>(&keys::balance_key(account, denom))?
        .unwrap_or(Decimal::ZERO))
}

fn set_balance(
    store: &mut dyn KvStore,
    account: &AccAddress,
    denom: &str,
    amount: Decimal,
) -> Result<()> {
    let key = keys::balance_key(account, denom);
    if amount.is_zero() {
        store.delete(&key)
    } else {
        store.set_encoded(&key, &amount)
    }
}

/// Credit `coin` to `account`
pub fn add_coins(store: &mut dyn KvStore, account: &AccAddress, coin: &Coin) -> Result<()> {
    if coin.is_negative() {
        return Err(Error::InvalidInput(format!("cannot credit negative coin {}", coin)));
    }
    let current = balance(store, account, &coin.denom)?;
    set_balance(store, account, &coin.denom, checked_add(current, coin.amount)?)
}

/// Debit `coin` from `account`
pub fn subtract_coins(store: &mut dyn KvStore, account: &AccAddress, coin: &Coin) -> Result<()> {
    if coin.is_negative() {
        return Err(Error::InvalidInput(format!("cannot debit negative coin {}", coin)));
    }
    let current = balance(store, account, &coin.denom)?;
    if current < coin.amount {
        return Err(Error::InsufficientFunds {
            need: coin.amount,
            have: current,
        });
    }
    set_balance(store, account, &coin.denom, checked_sub(current, coin.amount)?)
}
