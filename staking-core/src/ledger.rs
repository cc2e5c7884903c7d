//! Staking ledger
//!
//! Stateful validation and mutation for every staking message, plus the
//! end-of-block sweep that releases matured unbondings and recomputes the
//! bonded validator set.
//!
//! # Token flow
//!
//! ```text
//!   account ──delegate──► validator (bonded pool | not-bonded pool)
//!   validator ──undelegate──► unbonding entry (not-bonded pool)
//!   unbonding entry ──matures at end_block──► account
//!   validator A ──redelegate──► validator B (tracked until maturity)
//! ```
//!
//! Every `apply_*` runs inside a cache branch of the context store. Nothing
//! reaches the parent store unless the whole operation succeeds.

use crate::address::{AccAddress, ConsPubKey, ValAddress};
use crate::bank;
use crate::config::Params;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::keys;
use crate::msg::{
    MsgBeginRedelegate, MsgCreateValidator, MsgDelegate, MsgEditValidator, MsgIndexDelegate,
    MsgUndelegate, TYPE_BEGIN_REDELEGATE, TYPE_CREATE_VALIDATOR, TYPE_DELEGATE,
    TYPE_EDIT_VALIDATOR, TYPE_INDEX_DELEGATE, TYPE_UNDELEGATE,
};
use crate::policy;
use crate::store::{KvStore, KvStoreExt};
use crate::tags::{self, Tags};
use crate::types::{
    checked_add, checked_sub, BondStatus, Coin, Commission, Delegation, Pool, Redelegation,
    RedelegationEntry, UnbondingDelegation, UnbondingDelegationEntry, Validator,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Consensus power change reported to the consensus engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    /// Consensus key
    pub pubkey: ConsPubKey,
    /// New power, zero removes the validator from the set
    pub power: u64,
}

/// Where delegated tokens come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    /// Debited from the delegator's account
    Account,
    /// Already in the not-bonded pool (redelegation)
    NotBondedPool,
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Staking keeper
#[derive(Debug, Clone)]
pub struct Keeper {
    params: Params,
}

impl Keeper {
    /// Create a keeper
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Staking parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    // Queries

    /// Validator by operator address
    pub fn validator(&self, store: &dyn KvStore, operator: &ValAddress) -> Result<Option<Validator>> {
        store.get_decoded(&keys::validator_key(operator))
    }

    /// Validator by consensus key
    pub fn validator_by_cons_pubkey(
        &self,
        store: &dyn KvStore,
        pubkey: &ConsPubKey,
    ) -> Result<Option<Validator>> {
        match store.get_decoded::<ValAddress>(&keys::validator_by_cons_key(pubkey))? {
            Some(operator) => self.validator(store, &operator),
            None => Ok(None),
        }
    }

    /// Every validator, ordered by operator key
    pub fn validators(&self, store: &dyn KvStore) -> Result<Vec<Validator>> {
        store.scan_decoded(&[keys::VALIDATOR_PREFIX])
    }

    /// Validators in the active set
    pub fn bonded_validators(&self, store: &dyn KvStore) -> Result<Vec<Validator>> {
        Ok(self
            .validators(store)?
            .into_iter()
            .filter(Validator::is_bonded)
            .collect())
    }

    /// Delegation for a (delegator, validator) pair
    pub fn delegation(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<Delegation>> {
        store.get_decoded(&keys::delegation_key(delegator, validator))
    }

    /// Every delegation held by `delegator`
    pub fn delegator_delegations(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
    ) -> Result<Vec<Delegation>> {
        store.scan_decoded(&keys::delegations_prefix(delegator))
    }

    /// Every delegation, in key order
    pub fn delegations(&self, store: &dyn KvStore) -> Result<Vec<Delegation>> {
        store.scan_decoded(&[keys::DELEGATION_PREFIX])
    }

    /// Every delegation to `validator`
    pub fn validator_delegations(
        &self,
        store: &dyn KvStore,
        validator: &ValAddress,
    ) -> Result<Vec<Delegation>> {
        Ok(self
            .delegations(store)?
            .into_iter()
            .filter(|d| &d.validator_address == validator)
            .collect())
    }

    /// Unbonding record for a (delegator, validator) pair
    pub fn unbonding_delegation(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
        validator: &ValAddress,
    ) -> Result<Option<UnbondingDelegation>> {
        store.get_decoded(&keys::unbonding_key(delegator, validator))
    }

    /// Every unbonding record
    pub fn unbonding_delegations(&self, store: &dyn KvStore) -> Result<Vec<UnbondingDelegation>> {
        store.scan_decoded(&[keys::UNBONDING_PREFIX])
    }

    /// Redelegation record for a (delegator, src, dst) tuple
    pub fn redelegation(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Result<Option<Redelegation>> {
        store.get_decoded(&keys::redelegation_key(delegator, src, dst))
    }

    /// Every redelegation made by `delegator`
    pub fn delegator_redelegations(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
    ) -> Result<Vec<Redelegation>> {
        store.scan_decoded(&keys::redelegations_prefix(delegator))
    }

    /// Every redelegation record
    pub fn redelegations(&self, store: &dyn KvStore) -> Result<Vec<Redelegation>> {
        store.scan_decoded(&[keys::REDELEGATION_PREFIX])
    }

    /// Token pools
    pub fn pool(&self, store: &dyn KvStore) -> Result<Pool> {
        Ok(store.get_decoded(keys::POOL_KEY)?.unwrap_or_default())
    }

    // Writes

    fn set_validator(&self, store: &mut dyn KvStore, validator: &Validator) -> Result<()> {
        store.set_encoded(&keys::validator_key(&validator.operator_address), validator)?;
        store.set_encoded(
            &keys::validator_by_cons_key(&validator.consensus_pubkey),
            &validator.operator_address,
        )
    }

    fn remove_validator(&self, store: &mut dyn KvStore, validator: &Validator) -> Result<()> {
        store.delete(&keys::validator_key(&validator.operator_address))?;
        store.delete(&keys::validator_by_cons_key(&validator.consensus_pubkey))
    }

    fn set_delegation(&self, store: &mut dyn KvStore, delegation: &Delegation) -> Result<()> {
        let key = keys::delegation_key(&delegation.delegator_address, &delegation.validator_address);
        if delegation.shares.is_zero() {
            store.delete(&key)
        } else {
            store.set_encoded(&key, delegation)
        }
    }

    fn set_unbonding(&self, store: &mut dyn KvStore, ubd: &UnbondingDelegation) -> Result<()> {
        let key = keys::unbonding_key(&ubd.delegator_address, &ubd.validator_address);
        if ubd.entries.is_empty() {
            store.delete(&key)
        } else {
            store.set_encoded(&key, ubd)
        }
    }

    fn set_redelegation(&self, store: &mut dyn KvStore, red: &Redelegation) -> Result<()> {
        let key = keys::redelegation_key(
            &red.delegator_address,
            &red.validator_src_address,
            &red.validator_dst_address,
        );
        if red.entries.is_empty() {
            store.delete(&key)
        } else {
            store.set_encoded(&key, red)
        }
    }

    fn set_pool(&self, store: &mut dyn KvStore, pool: &Pool) -> Result<()> {
        store.set_encoded(keys::POOL_KEY, pool)
    }

    fn ensure_bond_denom(&self, denom: &str) -> Result<()> {
        if denom != self.params.bond_denom {
            return Err(Error::BadDenom {
                got: denom.to_string(),
                expected: self.params.bond_denom.clone(),
            });
        }
        Ok(())
    }

    fn unbonding_end(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_add_signed(self.params.unbonding_time())
            .ok_or_else(|| Error::Arithmetic("unbonding completion time overflows".into()))
    }

    /// Release time for tokens leaving `validator` now
    fn completion_time(&self, now: DateTime<Utc>, validator: &Validator) -> Result<DateTime<Utc>> {
        match validator.status {
            BondStatus::Unbonded => Ok(now),
            BondStatus::Unbonding => Ok(validator.unbonding_completion_time.max(now)),
            BondStatus::Bonded => self.unbonding_end(now),
        }
    }

    // Message handlers

    /// Create a validator with its self-delegation
    pub fn apply_create_validator(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateValidator,
    ) -> Result<Tags> {
        ctx.branch(|ctx| {
            if self.validator(ctx.store(), &msg.validator_address)?.is_some() {
                return Err(Error::ValidatorOwnerExists);
            }
            if self.validator_by_cons_pubkey(ctx.store(), &msg.pubkey)?.is_some() {
                return Err(Error::ValidatorPubKeyExists);
            }
            self.ensure_bond_denom(&msg.value.denom)?;
            policy::check_min_self_delegation(msg.min_self_delegation, Some(msg.value.amount))?;
            msg.description.ensure_length()?;
            policy::check_commission_rates(&msg.commission)?;

            let commission = Commission {
                commission_rates: msg.commission,
                update_time: ctx.block_time(),
            };
            let mut validator = Validator::new(
                msg.validator_address.clone(),
                msg.pubkey,
                msg.description.clone(),
                commission,
                msg.min_self_delegation,
                msg.share_token_denom.clone(),
            );

            self.delegate(
                ctx,
                &msg.delegator_address,
                msg.value.amount,
                &mut validator,
                TokenSource::Account,
            )?;

            if self.params.bond_on_create {
                let bonded = self.bonded_validators(ctx.store())?.len();
                if bonded < usize::from(self.params.max_validators) {
                    self.bond_validator(ctx.store_mut(), &mut validator)?;
                }
            }

            info!(
                validator = %validator.operator_address,
                tokens = %validator.tokens,
                status = %validator.status,
                "Validator created"
            );

            Ok(Tags::new()
                .with(tags::ACTION, TYPE_CREATE_VALIDATOR)
                .with(tags::DST_VALIDATOR, msg.validator_address.to_string())
                .with(tags::MONIKER, msg.description.moniker.clone())
                .with(tags::IDENTITY, msg.description.identity.clone()))
        })
    }

    /// Edit description, commission rate or minimum self-delegation
    pub fn apply_edit_validator(&self, ctx: &mut Context<'_>, msg: &MsgEditValidator) -> Result<Tags> {
        ctx.branch(|ctx| {
            let mut validator = self
                .validator(ctx.store(), &msg.validator_address)?
                .ok_or(Error::NoValidatorFound)?;

            let description = validator.description.merge(&msg.description);
            description.ensure_length()?;
            validator.description = description;

            if let Some(rate) = msg.commission_rate {
                policy::check_commission_change(&validator.commission, rate)?;
                validator.commission.commission_rates.rate = rate;
                validator.commission.update_time = ctx.block_time();
            }

            if let Some(min) = msg.min_self_delegation {
                if min <= validator.min_self_delegation {
                    return Err(Error::MinSelfDelegationDecreased);
                }
                policy::check_min_self_delegation(min, Some(validator.tokens))?;
                validator.min_self_delegation = min;
            }

            self.set_validator(ctx.store_mut(), &validator)?;

            debug!(validator = %validator.operator_address, "Validator edited");

            Ok(Tags::new()
                .with(tags::ACTION, TYPE_EDIT_VALIDATOR)
                .with(tags::DST_VALIDATOR, msg.validator_address.to_string())
                .with(tags::MONIKER, validator.description.moniker.clone())
                .with(tags::IDENTITY, validator.description.identity.clone()))
        })
    }

    /// Bond tokens from the delegator's account
    pub fn apply_delegate(&self, ctx: &mut Context<'_>, msg: &MsgDelegate) -> Result<Tags> {
        ctx.branch(|ctx| {
            self.delegate_coin(ctx, &msg.delegator_address, &msg.validator_address, &msg.amount)?;
            Ok(Tags::new()
                .with(tags::ACTION, TYPE_DELEGATE)
                .with(tags::DELEGATOR, msg.delegator_address.to_string())
                .with(tags::DST_VALIDATOR, msg.validator_address.to_string()))
        })
    }

    /// Apply every portion in one branch: all succeed or none apply
    pub fn apply_index_delegate(&self, ctx: &mut Context<'_>, msg: &MsgIndexDelegate) -> Result<Tags> {
        ctx.branch(|ctx| {
            self.ensure_bond_denom(&msg.denomination)?;

            let mut tags = Tags::new()
                .with(tags::ACTION, TYPE_INDEX_DELEGATE)
                .with(tags::DELEGATOR, msg.delegator_address.to_string());
            for portion in &msg.portions {
                self.delegate_coin(
                    ctx,
                    &msg.delegator_address,
                    &portion.validator_address,
                    &portion.amount,
                )?;
                tags.push(tags::DST_VALIDATOR, portion.validator_address.to_string());
            }

            debug!(
                delegator = %msg.delegator_address,
                portions = msg.portions.len(),
                "Index delegation applied"
            );
            Ok(tags)
        })
    }

    /// Begin unbonding; tokens are released by [`Keeper::end_block`] at maturity
    pub fn apply_undelegate(&self, ctx: &mut Context<'_>, msg: &MsgUndelegate) -> Result<Tags> {
        ctx.branch(|ctx| {
            self.ensure_bond_denom(&msg.amount.denom)?;
            let shares = self.validate_unbond_amount(
                ctx.store(),
                &msg.delegator_address,
                &msg.validator_address,
                msg.amount.amount,
            )?;
            let completion =
                self.undelegate(ctx, &msg.delegator_address, &msg.validator_address, shares)?;

            Ok(Tags::new()
                .with(tags::ACTION, TYPE_UNDELEGATE)
                .with(tags::DELEGATOR, msg.delegator_address.to_string())
                .with(tags::SRC_VALIDATOR, msg.validator_address.to_string())
                .with(tags::END_TIME, rfc3339(completion)))
        })
    }

    /// Move bonded tokens from one validator to another
    pub fn apply_begin_redelegate(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgBeginRedelegate,
    ) -> Result<Tags> {
        ctx.branch(|ctx| {
            let delegator = &msg.delegator_address;
            let src = &msg.validator_src_address;
            let dst = &msg.validator_dst_address;

            if src == dst {
                return Err(Error::SelfRedelegation);
            }
            self.ensure_bond_denom(&msg.amount.denom)?;

            let src_validator = self
                .validator(ctx.store(), src)?
                .ok_or(Error::NoValidatorFound)?;
            let mut dst_validator = self
                .validator(ctx.store(), dst)?
                .ok_or(Error::BadRedelegationDst)?;

            let now = ctx.block_time();
            if self.has_receiving_redelegation(ctx.store(), delegator, src, now)? {
                return Err(Error::TransitiveRedelegation);
            }

            let mut redelegation = self
                .redelegation(ctx.store(), delegator, src, dst)?
                .unwrap_or_else(|| Redelegation::new(delegator.clone(), src.clone(), dst.clone()));
            if redelegation.entries.len() >= usize::from(self.params.max_entries) {
                return Err(Error::MaxRedelegationEntries);
            }

            let shares =
                self.validate_unbond_amount(ctx.store(), delegator, src, msg.amount.amount)?;
            let completion = self.completion_time(now, &src_validator)?;

            let returned = self.unbond(ctx, delegator, src, shares)?;
            if returned <= Decimal::ZERO {
                return Err(Error::TinyRedelegationAmount);
            }

            let shares_dst = self.delegate(
                ctx,
                delegator,
                returned,
                &mut dst_validator,
                TokenSource::NotBondedPool,
            )?;

            // nothing to track when the source no longer backs consensus
            if !src_validator.is_unbonded() {
                redelegation.entries.push(RedelegationEntry {
                    creation_height: ctx.block_height(),
                    completion_time: completion,
                    initial_balance: returned,
                    shares_dst,
                });
                self.set_redelegation(ctx.store_mut(), &redelegation)?;
            }

            debug!(
                delegator = %delegator,
                src = %src,
                dst = %dst,
                amount = %returned,
                "Redelegation started"
            );

            Ok(Tags::new()
                .with(tags::ACTION, TYPE_BEGIN_REDELEGATE)
                .with(tags::DELEGATOR, delegator.to_string())
                .with(tags::SRC_VALIDATOR, src.to_string())
                .with(tags::DST_VALIDATOR, dst.to_string())
                .with(tags::END_TIME, rfc3339(completion)))
        })
    }

    // Internals

    fn delegate_coin(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator_address: &ValAddress,
        coin: &Coin,
    ) -> Result<Decimal> {
        if !coin.is_positive() {
            return Err(Error::BadDelegationAmount);
        }
        let mut validator = self
            .validator(ctx.store(), validator_address)?
            .ok_or(Error::NoValidatorFound)?;
        self.ensure_bond_denom(&coin.denom)?;
        self.delegate(ctx, delegator, coin.amount, &mut validator, TokenSource::Account)
    }

    /// Issue shares for `amount` tokens and store validator, delegation and pool
    fn delegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        amount: Decimal,
        validator: &mut Validator,
        source: TokenSource,
    ) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(Error::BadDelegationAmount);
        }
        if validator.jailed {
            return Err(Error::ValidatorJailed);
        }
        if validator.invalid_ex_rate() {
            return Err(Error::DelegatorShareExRateInvalid);
        }

        let mut pool = self.pool(ctx.store())?;
        match source {
            TokenSource::Account => {
                let coin = Coin::new(self.params.bond_denom.clone(), amount);
                bank::subtract_coins(ctx.store_mut(), delegator, &coin)?;
                if validator.is_bonded() {
                    pool.bonded_tokens = checked_add(pool.bonded_tokens, amount)?;
                } else {
                    pool.not_bonded_tokens = checked_add(pool.not_bonded_tokens, amount)?;
                }
            }
            TokenSource::NotBondedPool => {
                if validator.is_bonded() {
                    pool.bond(amount)?;
                }
            }
        }

        let shares = validator.add_tokens_from_delegation(amount)?;

        let mut delegation = self
            .delegation(ctx.store(), delegator, &validator.operator_address)?
            .unwrap_or_else(|| Delegation {
                delegator_address: delegator.clone(),
                validator_address: validator.operator_address.clone(),
                shares: Decimal::ZERO,
            });
        delegation.shares = checked_add(delegation.shares, shares)?;

        let store = ctx.store_mut();
        self.set_delegation(store, &delegation)?;
        self.set_validator(store, validator)?;
        self.set_pool(store, &pool)?;

        debug!(
            delegator = %delegator,
            validator = %validator.operator_address,
            amount = %amount,
            shares = %shares,
            "Delegation added"
        );
        Ok(shares)
    }

    /// Shares to burn for `amount` tokens, bounded by the delegation
    fn validate_unbond_amount(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
        validator_address: &ValAddress,
        amount: Decimal,
    ) -> Result<Decimal> {
        let validator = self
            .validator(store, validator_address)?
            .ok_or(Error::NoValidatorFound)?;
        let delegation = self
            .delegation(store, delegator, validator_address)?
            .ok_or(Error::NoDelegation)?;

        let shares = validator.shares_from_tokens(amount)?;
        if shares <= Decimal::ZERO || shares > delegation.shares {
            return Err(Error::BadSharesAmount);
        }
        Ok(shares)
    }

    /// Burn shares and return the tokens released from the validator
    fn unbond(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator_address: &ValAddress,
        shares: Decimal,
    ) -> Result<Decimal> {
        let mut delegation = self
            .delegation(ctx.store(), delegator, validator_address)?
            .ok_or(Error::NoDelegation)?;
        if shares > delegation.shares {
            return Err(Error::BadSharesAmount);
        }
        let mut validator = self
            .validator(ctx.store(), validator_address)?
            .ok_or(Error::NoValidatorFound)?;

        delegation.shares = checked_sub(delegation.shares, shares)?;

        let is_self_delegation = delegator.as_bytes() == validator_address.as_bytes();
        if is_self_delegation && !validator.jailed {
            let remaining = validator.tokens_from_shares(delegation.shares)?.trunc();
            if remaining < validator.min_self_delegation {
                validator.jailed = true;
                info!(
                    validator = %validator.operator_address,
                    remaining = %remaining,
                    min_self_delegation = %validator.min_self_delegation,
                    "Validator jailed, self-delegation below minimum"
                );
            }
        }

        let was_bonded = validator.is_bonded();
        let amount = validator.remove_delegator_shares(shares)?;

        let store = ctx.store_mut();
        self.set_delegation(store, &delegation)?;

        if was_bonded {
            let mut pool = self.pool(store)?;
            pool.unbond(amount)?;
            self.set_pool(store, &pool)?;
        }

        if validator.delegator_shares.is_zero() && validator.is_unbonded() {
            self.remove_validator(store, &validator)?;
        } else {
            self.set_validator(store, &validator)?;
        }

        Ok(amount)
    }

    fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        delegator: &AccAddress,
        validator_address: &ValAddress,
        shares: Decimal,
    ) -> Result<DateTime<Utc>> {
        let mut ubd = self
            .unbonding_delegation(ctx.store(), delegator, validator_address)?
            .unwrap_or_else(|| UnbondingDelegation::new(delegator.clone(), validator_address.clone()));
        if ubd.entries.len() >= usize::from(self.params.max_entries) {
            return Err(Error::MaxUnbondingEntries);
        }

        let validator = self
            .validator(ctx.store(), validator_address)?
            .ok_or(Error::NoValidatorFound)?;
        let completion = self.completion_time(ctx.block_time(), &validator)?;

        let amount = self.unbond(ctx, delegator, validator_address, shares)?;

        ubd.entries.push(UnbondingDelegationEntry {
            creation_height: ctx.block_height(),
            completion_time: completion,
            initial_balance: amount,
            balance: amount,
        });
        self.set_unbonding(ctx.store_mut(), &ubd)?;

        debug!(
            delegator = %delegator,
            validator = %validator_address,
            amount = %amount,
            completion = %rfc3339(completion),
            "Unbonding started"
        );
        Ok(completion)
    }

    /// A redelegation into `validator` by `delegator` is still maturing
    fn has_receiving_redelegation(
        &self,
        store: &dyn KvStore,
        delegator: &AccAddress,
        validator: &ValAddress,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .delegator_redelegations(store, delegator)?
            .iter()
            .filter(|r| &r.validator_dst_address == validator)
            .any(|r| r.entries.iter().any(|e| !e.is_mature(now))))
    }

    fn bond_validator(&self, store: &mut dyn KvStore, validator: &mut Validator) -> Result<()> {
        let mut pool = self.pool(store)?;
        pool.bond(validator.tokens)?;
        validator.status = BondStatus::Bonded;
        self.set_pool(store, &pool)?;
        self.set_validator(store, validator)
    }

    // End block

    /// Release matured unbondings, drop matured redelegations and recompute
    /// the bonded set. Returns consensus power updates.
    pub fn end_block(&self, ctx: &mut Context<'_>) -> Result<Vec<ValidatorUpdate>> {
        ctx.branch(|ctx| {
            self.complete_unbondings(ctx)?;
            self.complete_redelegations(ctx)?;
            self.update_validator_set(ctx)
        })
    }

    fn complete_unbondings(&self, ctx: &mut Context<'_>) -> Result<()> {
        let now = ctx.block_time();
        let mut pool = self.pool(ctx.store())?;

        for mut ubd in self.unbonding_delegations(ctx.store())? {
            let (matured, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut ubd.entries)
                .into_iter()
                .partition(|e| e.is_mature(now));
            if matured.is_empty() {
                continue;
            }

            let released = matured
                .iter()
                .try_fold(Decimal::ZERO, |acc, e| checked_add(acc, e.balance))?;
            if released > Decimal::ZERO {
                pool.not_bonded_tokens = checked_sub(pool.not_bonded_tokens, released)?;
                let coin = Coin::new(self.params.bond_denom.clone(), released);
                bank::add_coins(ctx.store_mut(), &ubd.delegator_address, &coin)?;
            }

            ubd.entries = pending;
            self.set_unbonding(ctx.store_mut(), &ubd)?;

            info!(
                delegator = %ubd.delegator_address,
                validator = %ubd.validator_address,
                released = %released,
                "Unbonding completed"
            );
            ctx.emit(
                Tags::new()
                    .with(tags::ACTION, tags::ACTION_COMPLETE_UNBONDING)
                    .with(tags::DELEGATOR, ubd.delegator_address.to_string())
                    .with(tags::SRC_VALIDATOR, ubd.validator_address.to_string()),
            );
        }

        self.set_pool(ctx.store_mut(), &pool)
    }

    fn complete_redelegations(&self, ctx: &mut Context<'_>) -> Result<()> {
        let now = ctx.block_time();

        for mut red in self.redelegations(ctx.store())? {
            let before = red.entries.len();
            red.entries.retain(|e| !e.is_mature(now));
            if red.entries.len() == before {
                continue;
            }
            self.set_redelegation(ctx.store_mut(), &red)?;

            ctx.emit(
                Tags::new()
                    .with(tags::ACTION, tags::ACTION_COMPLETE_REDELEGATION)
                    .with(tags::DELEGATOR, red.delegator_address.to_string())
                    .with(tags::SRC_VALIDATOR, red.validator_src_address.to_string())
                    .with(tags::DST_VALIDATOR, red.validator_dst_address.to_string()),
            );
        }
        Ok(())
    }

    fn update_validator_set(&self, ctx: &mut Context<'_>) -> Result<Vec<ValidatorUpdate>> {
        let now = ctx.block_time();
        let height = ctx.block_height();
        let mut pool = self.pool(ctx.store())?;
        let mut validators = self.validators(ctx.store())?;

        for validator in validators.iter_mut() {
            if validator.status == BondStatus::Unbonding
                && validator.unbonding_completion_time <= now
            {
                validator.status = BondStatus::Unbonded;
                info!(validator = %validator.operator_address, "Validator unbonded");
            }
        }

        // top max_validators by tokens, ties broken by operator address
        let mut ranked: Vec<&Validator> = validators
            .iter()
            .filter(|v| !v.jailed && v.tokens > Decimal::ZERO)
            .collect();
        ranked.sort_by(|a, b| {
            b.tokens
                .cmp(&a.tokens)
                .then_with(|| a.operator_address.cmp(&b.operator_address))
        });
        let active: BTreeSet<ValAddress> = ranked
            .into_iter()
            .take(usize::from(self.params.max_validators))
            .map(|v| v.operator_address.clone())
            .collect();

        let power_reduction = self.params.power_reduction;
        let mut updates = Vec::new();

        for mut validator in validators {
            let in_set = active.contains(&validator.operator_address);
            match (validator.status, in_set) {
                (BondStatus::Bonded, true) => {
                    updates.push(ValidatorUpdate {
                        pubkey: validator.consensus_pubkey,
                        power: validator.consensus_power(power_reduction),
                    });
                }
                (BondStatus::Bonded, false) => {
                    pool.unbond(validator.tokens)?;
                    validator.status = BondStatus::Unbonding;
                    validator.unbonding_height = height;
                    validator.unbonding_completion_time = self.unbonding_end(now)?;
                    updates.push(ValidatorUpdate {
                        pubkey: validator.consensus_pubkey,
                        power: 0,
                    });
                    info!(validator = %validator.operator_address, "Validator began unbonding");
                }
                (_, true) => {
                    pool.bond(validator.tokens)?;
                    validator.status = BondStatus::Bonded;
                    updates.push(ValidatorUpdate {
                        pubkey: validator.consensus_pubkey,
                        power: validator.consensus_power(power_reduction),
                    });
                    info!(
                        validator = %validator.operator_address,
                        tokens = %validator.tokens,
                        "Validator bonded"
                    );
                }
                (_, false) => {}
            }

            if validator.is_unbonded() && validator.delegator_shares.is_zero() {
                self.remove_validator(ctx.store_mut(), &validator)?;
            } else {
                self.set_validator(ctx.store_mut(), &validator)?;
            }
        }

        self.set_pool(ctx.store_mut(), &pool)?;
        Ok(updates)
    }
}
