//! Core types for the staking ledger

use crate::address::{AccAddress, ConsPubKey, ValAddress};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits kept on delegator shares
pub const SHARE_PRECISION: u32 = 10;

/// Decimals rendered as strings with exactly 18 fractional digits
pub mod dec_str {
    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    /// Fractional digits in the rendered form
    pub const PRECISION: u32 = 18;

    /// Render at fixed precision
    pub fn to_string(d: &Decimal) -> String {
        format!("{:.*}", PRECISION as usize, d)
    }

    /// Parse, rejecting values that carry more than 18 fractional digits
    pub fn parse(s: &str) -> Result<Decimal, String> {
        let d = Decimal::from_str(s).map_err(|e| e.to_string())?;
        if d.normalize().scale() > PRECISION {
            return Err(format!("decimal {} has more than {} fractional digits", s, PRECISION));
        }
        Ok(d)
    }

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(d: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_string(d))
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    /// Optional variant; `None` renders as `null`
    pub mod option {
        use rust_decimal::Decimal;
        use serde::{de, Deserialize, Deserializer, Serializer};

        #[allow(missing_docs)]
        pub fn serialize<S: Serializer>(d: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => serializer.serialize_str(&super::to_string(d)),
                None => serializer.serialize_none(),
            }
        }

        #[allow(missing_docs)]
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Decimal>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(de::Error::custom))
                .transpose()
        }
    }
}

/// Integral amounts rendered as plain integer strings
pub mod int_str {
    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    /// Parse an integral amount
    pub fn parse(s: &str) -> Result<Decimal, String> {
        let d = Decimal::from_str(s).map_err(|e| e.to_string())?;
        if !d.fract().is_zero() {
            return Err(format!("amount {} is not an integer", s));
        }
        Ok(d.trunc())
    }

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(d: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&d.trunc().to_string())
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    /// Optional variant; `None` renders as `null`
    pub mod option {
        use rust_decimal::Decimal;
        use serde::{de, Deserialize, Deserializer, Serializer};

        #[allow(missing_docs)]
        pub fn serialize<S: Serializer>(d: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => serializer.serialize_str(&d.trunc().to_string()),
                None => serializer.serialize_none(),
            }
        }

        #[allow(missing_docs)]
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Decimal>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| super::parse(&s).map_err(de::Error::custom))
                .transpose()
        }
    }
}

pub(crate) fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| Error::Arithmetic(format!("overflow adding {} and {}", a, b)))
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| Error::Arithmetic(format!("overflow subtracting {} from {}", b, a)))
}

/// Zero time, used for unset timestamps
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}

/// `a * mul / div`.
///
/// The product is formed first when it fits in 96 bits. Otherwise the ratio
/// `mul / div` (28 significant digits) is applied to `a`, so chain-scale
/// amounts never fail on the intermediate.
fn checked_mul_div(a: Decimal, mul: Decimal, div: Decimal) -> Result<Decimal> {
    let overflow = || Error::Arithmetic(format!("cannot compute {} * {} / {}", a, mul, div));
    if div.is_zero() {
        return Err(overflow());
    }
    if mul == div {
        return Ok(a);
    }
    a.checked_mul(mul)
        .and_then(|p| p.checked_div(div))
        .or_else(|| mul.checked_div(div).and_then(|ratio| a.checked_mul(ratio)))
        .or_else(|| a.checked_div(div).and_then(|q| q.checked_mul(mul)))
        .ok_or_else(overflow)
}

/// Token amount with denomination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Integral amount
    #[serde(with = "int_str")]
    pub amount: Decimal,
}

impl Coin {
    /// Create a coin
    pub fn new(denom: impl Into<String>, amount: impl Into<Decimal>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    /// Amount strictly above zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Amount below zero
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A coin list is valid when every coin is positive with a non-blank denom
/// and denominations are strictly ascending
pub fn coins_valid(coins: &[Coin]) -> bool {
    coins
        .iter()
        .all(|c| c.is_positive() && !c.denom.trim().is_empty())
        && coins.windows(2).all(|w| w[0].denom < w[1].denom)
}

/// Validator description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Name
    pub moniker: String,
    /// Optional identity signature (ex. UPort or Keybase)
    pub identity: String,
    /// Optional website link
    pub website: String,
    /// Optional details
    pub details: String,
}

impl Description {
    /// Marker that keeps the stored value of a field on edit
    pub const DO_NOT_MODIFY: &'static str = "[do-not-modify]";

    /// Max moniker length
    pub const MAX_MONIKER_LENGTH: usize = 70;
    /// Max identity length
    pub const MAX_IDENTITY_LENGTH: usize = 3000;
    /// Max website length
    pub const MAX_WEBSITE_LENGTH: usize = 140;
    /// Max details length
    pub const MAX_DETAILS_LENGTH: usize = 280;

    /// Create a description
    pub fn new(
        moniker: impl Into<String>,
        identity: impl Into<String>,
        website: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            moniker: moniker.into(),
            identity: identity.into(),
            website: website.into(),
            details: details.into(),
        }
    }

    /// True when every field is empty
    pub fn is_empty(&self) -> bool {
        *self == Description::default()
    }

    /// Apply an edit; empty or `[do-not-modify]` fields keep the stored value
    pub fn merge(&self, edit: &Description) -> Description {
        fn pick(current: &str, edit: &str) -> String {
            if edit.is_empty() || edit == Description::DO_NOT_MODIFY {
                current.to_string()
            } else {
                edit.to_string()
            }
        }

        Description {
            moniker: pick(&self.moniker, &edit.moniker),
            identity: pick(&self.identity, &edit.identity),
            website: pick(&self.website, &edit.website),
            details: pick(&self.details, &edit.details),
        }
    }

    /// Enforce field length limits
    pub fn ensure_length(&self) -> Result<()> {
        let checks = [
            ("moniker", &self.moniker, Self::MAX_MONIKER_LENGTH),
            ("identity", &self.identity, Self::MAX_IDENTITY_LENGTH),
            ("website", &self.website, Self::MAX_WEBSITE_LENGTH),
            ("details", &self.details, Self::MAX_DETAILS_LENGTH),
        ];
        for (field, value, max) in checks {
            let len = value.chars().count();
            if len > max {
                return Err(Error::InvalidInput(format!(
                    "invalid {} length; got: {}, max: {}",
                    field, len, max
                )));
            }
        }
        Ok(())
    }
}

/// Commission parameters chosen at validator creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    /// Current commission rate
    #[serde(with = "dec_str")]
    pub rate: Decimal,
    /// Upper bound for the rate, fixed forever
    #[serde(with = "dec_str")]
    pub max_rate: Decimal,
    /// Max change of the rate per edit, fixed forever
    #[serde(with = "dec_str")]
    pub max_change_rate: Decimal,
}

impl CommissionRates {
    /// Create commission rates
    pub fn new(rate: Decimal, max_rate: Decimal, max_change_rate: Decimal) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    /// True when all rates are zero
    pub fn is_empty(&self) -> bool {
        *self == CommissionRates::default()
    }
}

/// Stored commission of a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Rates
    pub commission_rates: CommissionRates,
    /// Time of the last rate change
    pub update_time: DateTime<Utc>,
}

/// Bonding status of a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    /// Outside the active set, tokens in the not-bonded pool
    Unbonded,
    /// Leaving the active set, waiting out the unbonding period
    Unbonding,
    /// In the active set
    Bonded,
}

impl fmt::Display for BondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BondStatus::Unbonded => "Unbonded",
            BondStatus::Unbonding => "Unbonding",
            BondStatus::Bonded => "Bonded",
        };
        f.write_str(s)
    }
}

/// Validator record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator address
    pub operator_address: ValAddress,
    /// Consensus public key
    pub consensus_pubkey: ConsPubKey,
    /// Jailed validators cannot be bonded or receive delegations
    pub jailed: bool,
    /// Bonding status
    pub status: BondStatus,
    /// Tokens held by the validator
    pub tokens: Decimal,
    /// Total shares issued to delegators
    pub delegator_shares: Decimal,
    /// Description
    pub description: Description,
    /// Height at which unbonding started
    pub unbonding_height: u64,
    /// Time at which unbonding completes
    pub unbonding_completion_time: DateTime<Utc>,
    /// Commission
    pub commission: Commission,
    /// Minimum self-delegation
    pub min_self_delegation: Decimal,
    /// Denomination of the validator's share token
    pub share_token_denom: String,
}

impl Validator {
    /// New unbonded validator with no tokens
    pub fn new(
        operator_address: ValAddress,
        consensus_pubkey: ConsPubKey,
        description: Description,
        commission: Commission,
        min_self_delegation: Decimal,
        share_token_denom: impl Into<String>,
    ) -> Self {
        Self {
            operator_address,
            consensus_pubkey,
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: Decimal::ZERO,
            delegator_shares: Decimal::ZERO,
            description,
            unbonding_height: 0,
            unbonding_completion_time: epoch(),
            commission,
            min_self_delegation,
            share_token_denom: share_token_denom.into(),
        }
    }

    /// In the active set
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Fully unbonded
    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Shares exist but back no tokens
    pub fn invalid_ex_rate(&self) -> bool {
        self.tokens.is_zero() && self.delegator_shares > Decimal::ZERO
    }

    /// Shares issued for `amount` tokens, truncated to the share precision
    pub fn shares_from_tokens(&self, amount: Decimal) -> Result<Decimal> {
        if self.delegator_shares.is_zero() {
            return Ok(amount.round_dp_with_strategy(SHARE_PRECISION, RoundingStrategy::ToZero));
        }
        if self.tokens.is_zero() {
            return Err(Error::DelegatorShareExRateInvalid);
        }
        let shares = checked_mul_div(amount, self.delegator_shares, self.tokens)?;
        Ok(shares.round_dp_with_strategy(SHARE_PRECISION, RoundingStrategy::ToZero))
    }

    /// Tokens backing `shares`
    pub fn tokens_from_shares(&self, shares: Decimal) -> Result<Decimal> {
        if self.delegator_shares.is_zero() {
            return Ok(Decimal::ZERO);
        }
        checked_mul_div(shares, self.tokens, self.delegator_shares)
    }

    /// Add delegated tokens, returning the shares issued
    pub fn add_tokens_from_delegation(&mut self, amount: Decimal) -> Result<Decimal> {
        let shares = self.shares_from_tokens(amount)?;
        if shares <= Decimal::ZERO {
            return Err(Error::BadDelegationAmount);
        }
        self.tokens = checked_add(self.tokens, amount)?;
        self.delegator_shares = checked_add(self.delegator_shares, shares)?;
        Ok(shares)
    }

    /// Burn delegator shares, returning the whole tokens released
    pub fn remove_delegator_shares(&mut self, shares: Decimal) -> Result<Decimal> {
        let remaining = checked_sub(self.delegator_shares, shares)?;
        if remaining < Decimal::ZERO {
            return Err(Error::BadSharesAmount);
        }

        let issued = if remaining.is_zero() {
            self.tokens
        } else {
            self.tokens_from_shares(shares)?.trunc()
        };

        self.tokens = checked_sub(self.tokens, issued)?;
        if self.tokens < Decimal::ZERO {
            return Err(Error::InvariantBroken(format!(
                "validator {} has negative tokens",
                self.operator_address
            )));
        }
        self.delegator_shares = remaining;
        Ok(issued)
    }

    /// Consensus power: whole tokens per power reduction unit
    pub fn consensus_power(&self, power_reduction: Decimal) -> u64 {
        if !self.is_bonded() || power_reduction <= Decimal::ZERO {
            return 0;
        }
        (self.tokens / power_reduction).trunc().to_u64().unwrap_or(u64::MAX)
    }
}

/// Shares held by a delegator with a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Validator
    pub validator_address: ValAddress,
    /// Shares held
    pub shares: Decimal,
}

/// Single maturing unbonding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    /// Height the entry was created at
    pub creation_height: u64,
    /// Time the tokens are released
    pub completion_time: DateTime<Utc>,
    /// Tokens at creation
    pub initial_balance: Decimal,
    /// Tokens to release
    pub balance: Decimal,
}

impl UnbondingDelegationEntry {
    /// Entry matured at `now`
    pub fn is_mature(&self, now: DateTime<Utc>) -> bool {
        self.completion_time <= now
    }
}

/// Unbonding entries for a (delegator, validator) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Validator
    pub validator_address: ValAddress,
    /// Entries, oldest first
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    /// Empty record for the pair
    pub fn new(delegator_address: AccAddress, validator_address: ValAddress) -> Self {
        Self {
            delegator_address,
            validator_address,
            entries: Vec::new(),
        }
    }
}

/// Single maturing redelegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    /// Height the entry was created at
    pub creation_height: u64,
    /// Time the entry matures
    pub completion_time: DateTime<Utc>,
    /// Tokens moved
    pub initial_balance: Decimal,
    /// Shares received at the destination
    pub shares_dst: Decimal,
}

impl RedelegationEntry {
    /// Entry matured at `now`
    pub fn is_mature(&self, now: DateTime<Utc>) -> bool {
        self.completion_time <= now
    }
}

/// Redelegation entries for a (delegator, src, dst) tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Source validator
    pub validator_src_address: ValAddress,
    /// Destination validator
    pub validator_dst_address: ValAddress,
    /// Entries, oldest first
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    /// Empty record for the tuple
    pub fn new(delegator: AccAddress, src: ValAddress, dst: ValAddress) -> Self {
        Self {
            delegator_address: delegator,
            validator_src_address: src,
            validator_dst_address: dst,
            entries: Vec::new(),
        }
    }
}

/// Token pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Tokens held by non-bonded validators and maturing unbondings
    pub not_bonded_tokens: Decimal,
    /// Tokens held by bonded validators
    pub bonded_tokens: Decimal,
}

impl Pool {
    /// Total staked tokens
    pub fn total(&self) -> Decimal {
        self.not_bonded_tokens + self.bonded_tokens
    }

    /// Move tokens from not-bonded to bonded
    pub fn bond(&mut self, amount: Decimal) -> Result<()> {
        self.not_bonded_tokens = checked_sub(self.not_bonded_tokens, amount)?;
        self.bonded_tokens = checked_add(self.bonded_tokens, amount)?;
        Ok(())
    }

    /// Move tokens from bonded to not-bonded
    pub fn unbond(&mut self, amount: Decimal) -> Result<()> {
        self.bonded_tokens = checked_sub(self.bonded_tokens, amount)?;
        self.not_bonded_tokens = checked_add(self.not_bonded_tokens, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rust_decimal_macros::dec;

    fn validator() -> Validator {
        let pk = SigningKey::from_bytes(&[9u8; 32]).verifying_key().into();
        Validator::new(
            ValAddress::new(vec![1u8; 20]),
            pk,
            Description::new("val", "", "", ""),
            Commission {
                commission_rates: CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.01)),
                update_time: epoch(),
            },
            dec!(1),
            "vstake",
        )
    }

    #[test]
    fn test_rate_renders_18_digits() {
        let rates = CommissionRates::new(dec!(0.5), dec!(1), dec!(0.01));
        let json = serde_json::to_value(rates).unwrap();
        assert_eq!(json["rate"], "0.500000000000000000");
        assert_eq!(json["max_rate"], "1.000000000000000000");

        let back: CommissionRates = serde_json::from_value(json).unwrap();
        assert_eq!(back, rates);
    }

    #[test]
    fn test_coin_amount_must_be_integral() {
        let coin: Coin = serde_json::from_str(r#"{"denom":"stake","amount":"10"}"#).unwrap();
        assert_eq!(coin, Coin::new("stake", 10));
        assert!(serde_json::from_str::<Coin>(r#"{"denom":"stake","amount":"1.5"}"#).is_err());
    }

    #[test]
    fn test_coins_valid() {
        assert!(coins_valid(&[]));
        assert!(coins_valid(&[Coin::new("atom", 1), Coin::new("stake", 2)]));
        assert!(!coins_valid(&[Coin::new("stake", 1), Coin::new("atom", 2)]));
        assert!(!coins_valid(&[Coin::new("stake", 0)]));
    }

    #[test]
    fn test_description_merge_keeps_unmodified() {
        let current = Description::new("alice", "id", "web", "details");
        let edit = Description::new("bob", Description::DO_NOT_MODIFY, "", "new details");
        let merged = current.merge(&edit);
        assert_eq!(merged, Description::new("bob", "id", "web", "new details"));
    }

    #[test]
    fn test_description_length() {
        let desc = Description::new("m".repeat(71), "", "", "");
        assert!(desc.ensure_length().is_err());
        let desc = Description::new("m".repeat(70), "", "", "d".repeat(280));
        assert!(desc.ensure_length().is_ok());
    }

    #[test]
    fn test_first_delegation_is_one_to_one() {
        let mut v = validator();
        let shares = v.add_tokens_from_delegation(dec!(100)).unwrap();
        assert_eq!(shares, dec!(100));
        assert_eq!(v.tokens, dec!(100));
        assert_eq!(v.delegator_shares, dec!(100));
    }

    #[test]
    fn test_share_math_at_chain_scale() {
        // 1e14 * 1e15 leaves the 96-bit range
        let mut v = validator();
        v.tokens = Decimal::from(1_000_000_000_000_000i64);
        v.delegator_shares = Decimal::from(1_000_000_000_000_000i64);
        assert_eq!(
            v.shares_from_tokens(Decimal::from(100_000_000_000_000i64)).unwrap(),
            Decimal::from(100_000_000_000_000i64)
        );

        v.delegator_shares = Decimal::from(2_000_000_000_000_000i64);
        assert_eq!(
            v.shares_from_tokens(Decimal::from(100_000_000_000_000i64)).unwrap(),
            Decimal::from(200_000_000_000_000i64)
        );
        assert_eq!(
            v.tokens_from_shares(Decimal::from(200_000_000_000_000i64)).unwrap(),
            Decimal::from(100_000_000_000_000i64)
        );
    }

    #[test]
    fn test_shares_truncate_to_precision() {
        let mut v = validator();
        v.tokens = dec!(3);
        v.delegator_shares = dec!(1);
        let shares = v.shares_from_tokens(dec!(1)).unwrap();
        assert_eq!(shares, dec!(0.3333333333));
    }

    #[test]
    fn test_remove_all_shares_releases_all_tokens() {
        let mut v = validator();
        v.tokens = dec!(10);
        v.delegator_shares = dec!(3);
        let released = v.remove_delegator_shares(dec!(3)).unwrap();
        assert_eq!(released, dec!(10));
        assert!(v.tokens.is_zero());
        assert!(v.delegator_shares.is_zero());
    }

    #[test]
    fn test_invalid_ex_rate_rejects_delegation() {
        let mut v = validator();
        v.delegator_shares = dec!(5);
        assert!(v.invalid_ex_rate());
        assert!(matches!(
            v.add_tokens_from_delegation(dec!(1)),
            Err(Error::DelegatorShareExRateInvalid)
        ));
    }

    #[test]
    fn test_pool_moves() {
        let mut pool = Pool {
            not_bonded_tokens: dec!(10),
            bonded_tokens: dec!(0),
        };
        pool.bond(dec!(4)).unwrap();
        assert_eq!(pool.bonded_tokens, dec!(4));
        pool.unbond(dec!(1)).unwrap();
        assert_eq!(pool.not_bonded_tokens, dec!(7));
        assert_eq!(pool.total(), dec!(10));
    }
}
