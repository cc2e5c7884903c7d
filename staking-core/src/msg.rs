//! Staking messages
//!
//! Every message is immutable once built and validates itself twice: here,
//! without state ([`Msg::validate_basic`]), and inside the ledger against
//! current state.

use crate::address::{AccAddress, ConsPubKey, ValAddress};
use crate::codec::{self, Named, Registry};
use crate::error::{Error, Result};
use crate::policy;
use crate::types::{dec_str, int_str, Coin, CommissionRates, Description};
use crate::ROUTER_KEY;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Message type of [`MsgCreateValidator`]
pub const TYPE_CREATE_VALIDATOR: &str = "create_validator";
/// Message type of [`MsgEditValidator`]
pub const TYPE_EDIT_VALIDATOR: &str = "edit_validator";
/// Message type of [`MsgDelegate`]
pub const TYPE_DELEGATE: &str = "delegate";
/// Message type of [`MsgUndelegate`]
pub const TYPE_UNDELEGATE: &str = "begin_unbonding";
/// Message type of [`MsgBeginRedelegate`]
pub const TYPE_BEGIN_REDELEGATE: &str = "begin_redelegate";
/// Message type of [`MsgIndexDelegate`]
pub const TYPE_INDEX_DELEGATE: &str = "index_delegate";

/// Self-describing, self-validating transaction intent
pub trait Msg {
    /// Error returned by validation
    type Error;

    /// Routing key
    fn route(&self) -> &'static str;

    /// Action name, used for tagging
    fn msg_type(&self) -> &'static str;

    /// Addresses that must sign, in order
    fn signers(&self) -> Vec<AccAddress>;

    /// Canonical bytes external signers sign over
    fn sign_bytes(&self) -> std::result::Result<Vec<u8>, Self::Error>;

    /// Stateless validity check
    fn validate_basic(&self) -> std::result::Result<(), Self::Error>;
}

/// Create a new validator with a self-delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    /// Description
    pub description: Description,
    /// Commission terms
    pub commission: CommissionRates,
    /// Minimum self-delegation
    #[serde(with = "int_str")]
    pub min_self_delegation: Decimal,
    /// Account paying the self-delegation
    pub delegator_address: AccAddress,
    /// Operator address
    pub validator_address: ValAddress,
    /// Consensus key, bech32 encoded on the wire
    pub pubkey: ConsPubKey,
    /// Self-delegation
    pub value: Coin,
    /// Denomination of the share token
    pub share_token_denom: String,
}

impl MsgCreateValidator {
    /// Build a create message where the operator also pays the self-delegation
    pub fn new(
        validator_address: ValAddress,
        pubkey: ConsPubKey,
        value: Coin,
        description: Description,
        commission: CommissionRates,
        min_self_delegation: Decimal,
        share_token_denom: impl Into<String>,
    ) -> Self {
        Self {
            description,
            commission,
            min_self_delegation,
            delegator_address: AccAddress::from(&validator_address),
            validator_address,
            pubkey,
            value,
            share_token_denom: share_token_denom.into(),
        }
    }
}

impl Named for MsgCreateValidator {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgCreateValidator";
}

impl Msg for MsgCreateValidator {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_CREATE_VALIDATOR
    }

    fn signers(&self) -> Vec<AccAddress> {
        // delegator first, it pays the fees
        let mut signers = vec![self.delegator_address.clone()];
        if self.delegator_address.as_bytes() != self.validator_address.as_bytes() {
            signers.push(AccAddress::from(&self.validator_address));
        }
        signers
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.delegator_address.is_empty() {
            return Err(Error::NilDelegatorAddress);
        }
        if self.validator_address.is_empty() {
            return Err(Error::NilValidatorAddress);
        }
        if self.delegator_address.as_bytes() != self.validator_address.as_bytes() {
            return Err(Error::BadValidatorAddress);
        }
        if !self.value.is_positive() {
            return Err(Error::BadDelegationAmount);
        }
        if self.description.is_empty() {
            return Err(Error::InvalidInput("description must be included".into()));
        }
        if self.commission.is_empty() {
            return Err(Error::InvalidInput("commission must be included".into()));
        }
        if self.share_token_denom.trim().is_empty() {
            return Err(Error::InvalidInput("share token denom must be included".into()));
        }
        policy::check_min_self_delegation(self.min_self_delegation, Some(self.value.amount))
    }
}

/// Edit an existing validator
///
/// Absent optional fields mean "no change".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEditValidator {
    /// New description fields
    #[serde(flatten)]
    pub description: Description,
    /// Operator address
    #[serde(rename = "address")]
    pub validator_address: ValAddress,
    /// New commission rate
    #[serde(with = "dec_str::option", default)]
    pub commission_rate: Option<Decimal>,
    /// New minimum self-delegation
    #[serde(with = "int_str::option", default)]
    pub min_self_delegation: Option<Decimal>,
}

impl MsgEditValidator {
    /// Build an edit message
    pub fn new(
        validator_address: ValAddress,
        description: Description,
        commission_rate: Option<Decimal>,
        min_self_delegation: Option<Decimal>,
    ) -> Self {
        Self {
            description,
            validator_address,
            commission_rate,
            min_self_delegation,
        }
    }
}

impl Named for MsgEditValidator {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgEditValidator";
}

impl Msg for MsgEditValidator {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_EDIT_VALIDATOR
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![AccAddress::from(&self.validator_address)]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.validator_address.is_empty() {
            return Err(Error::InvalidInput("nil validator address".into()));
        }
        if self.description.is_empty()
            && self.commission_rate.is_none()
            && self.min_self_delegation.is_none()
        {
            return Err(Error::InvalidInput(
                "transaction must include some information to modify".into(),
            ));
        }
        if let Some(min) = self.min_self_delegation {
            policy::check_min_self_delegation(min, None)?;
        }
        if let Some(rate) = self.commission_rate {
            policy::check_commission_rate(rate)?;
        }
        Ok(())
    }
}

/// Bond tokens to a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Validator
    pub validator_address: ValAddress,
    /// Tokens to bond
    pub amount: Coin,
}

impl MsgDelegate {
    /// Build a delegate message
    pub fn new(delegator_address: AccAddress, validator_address: ValAddress, amount: Coin) -> Self {
        Self {
            delegator_address,
            validator_address,
            amount,
        }
    }
}

impl Named for MsgDelegate {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgDelegate";
}

impl Msg for MsgDelegate {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_DELEGATE
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.delegator_address.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.delegator_address.is_empty() {
            return Err(Error::NilDelegatorAddress);
        }
        if self.validator_address.is_empty() {
            return Err(Error::NilValidatorAddress);
        }
        if !self.amount.is_positive() {
            return Err(Error::BadDelegationAmount);
        }
        Ok(())
    }
}

/// Begin unbonding tokens from a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Validator
    pub validator_address: ValAddress,
    /// Tokens to unbond
    pub amount: Coin,
}

impl MsgUndelegate {
    /// Build an undelegate message
    pub fn new(delegator_address: AccAddress, validator_address: ValAddress, amount: Coin) -> Self {
        Self {
            delegator_address,
            validator_address,
            amount,
        }
    }
}

impl Named for MsgUndelegate {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgUndelegate";
}

impl Msg for MsgUndelegate {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_UNDELEGATE
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.delegator_address.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.delegator_address.is_empty() {
            return Err(Error::NilDelegatorAddress);
        }
        if self.validator_address.is_empty() {
            return Err(Error::NilValidatorAddress);
        }
        if !self.amount.is_positive() {
            return Err(Error::BadSharesAmount);
        }
        Ok(())
    }
}

/// Move bonded tokens from one validator to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Source validator
    pub validator_src_address: ValAddress,
    /// Destination validator
    pub validator_dst_address: ValAddress,
    /// Tokens to move
    pub amount: Coin,
}

impl MsgBeginRedelegate {
    /// Build a redelegate message
    pub fn new(
        delegator_address: AccAddress,
        validator_src_address: ValAddress,
        validator_dst_address: ValAddress,
        amount: Coin,
    ) -> Self {
        Self {
            delegator_address,
            validator_src_address,
            validator_dst_address,
            amount,
        }
    }
}

impl Named for MsgBeginRedelegate {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgBeginRedelegate";
}

impl Msg for MsgBeginRedelegate {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_BEGIN_REDELEGATE
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.delegator_address.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.delegator_address.is_empty() {
            return Err(Error::NilDelegatorAddress);
        }
        if self.validator_src_address.is_empty() || self.validator_dst_address.is_empty() {
            return Err(Error::NilValidatorAddress);
        }
        if !self.amount.is_positive() {
            return Err(Error::BadSharesAmount);
        }
        Ok(())
    }
}

/// One validator's share of an indexed delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPortion {
    /// Validator
    pub validator_address: ValAddress,
    /// Tokens to bond to it
    pub amount: Coin,
}

/// Split one delegation across many validators, all or nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgIndexDelegate {
    /// Delegator
    pub delegator_address: AccAddress,
    /// Portions, applied in order
    #[serde(rename = "validator_portion")]
    pub portions: Vec<ValidatorPortion>,
    /// Denomination every portion must use
    pub denomination: String,
}

impl MsgIndexDelegate {
    /// Build an indexed delegation
    pub fn new(
        delegator_address: AccAddress,
        portions: Vec<ValidatorPortion>,
        denomination: impl Into<String>,
    ) -> Self {
        Self {
            delegator_address,
            portions,
            denomination: denomination.into(),
        }
    }
}

impl Named for MsgIndexDelegate {
    const TYPE_NAME: &'static str = "cosmos-sdk/MsgIndexDelegate";
}

impl Msg for MsgIndexDelegate {
    type Error = Error;

    fn route(&self) -> &'static str {
        ROUTER_KEY
    }

    fn msg_type(&self) -> &'static str {
        TYPE_INDEX_DELEGATE
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.delegator_address.clone()]
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        codec::sign_bytes(self)
    }

    fn validate_basic(&self) -> Result<()> {
        if self.delegator_address.is_empty() {
            return Err(Error::NilDelegatorAddress);
        }
        if self.portions.is_empty() {
            return Err(Error::InvalidInput(
                "index delegation must include at least one validator portion".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for portion in &self.portions {
            if portion.validator_address.is_empty() {
                return Err(Error::NilValidatorAddress);
            }
            if !portion.amount.is_positive() {
                return Err(Error::BadDelegationAmount);
            }
            if !seen.insert(&portion.validator_address) {
                return Err(Error::InvalidInput(format!(
                    "duplicate validator {} in index delegation",
                    portion.validator_address
                )));
            }
        }
        Ok(())
    }
}

/// Every staking message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingMsg {
    /// Create validator
    CreateValidator(MsgCreateValidator),
    /// Edit validator
    EditValidator(MsgEditValidator),
    /// Delegate
    Delegate(MsgDelegate),
    /// Undelegate
    Undelegate(MsgUndelegate),
    /// Redelegate
    BeginRedelegate(MsgBeginRedelegate),
    /// Indexed delegation
    IndexDelegate(MsgIndexDelegate),
}

macro_rules! impl_from_msg {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for StakingMsg {
                fn from(msg: $ty) -> Self {
                    StakingMsg::$variant(msg)
                }
            }
        )*
    };
}

impl_from_msg!(
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    IndexDelegate(MsgIndexDelegate),
);

impl StakingMsg {
    fn inner(&self) -> &dyn Msg<Error = Error> {
        match self {
            StakingMsg::CreateValidator(m) => m,
            StakingMsg::EditValidator(m) => m,
            StakingMsg::Delegate(m) => m,
            StakingMsg::Undelegate(m) => m,
            StakingMsg::BeginRedelegate(m) => m,
            StakingMsg::IndexDelegate(m) => m,
        }
    }

    /// Registered codec name
    pub fn type_name(&self) -> &'static str {
        match self {
            StakingMsg::CreateValidator(_) => MsgCreateValidator::TYPE_NAME,
            StakingMsg::EditValidator(_) => MsgEditValidator::TYPE_NAME,
            StakingMsg::Delegate(_) => MsgDelegate::TYPE_NAME,
            StakingMsg::Undelegate(_) => MsgUndelegate::TYPE_NAME,
            StakingMsg::BeginRedelegate(_) => MsgBeginRedelegate::TYPE_NAME,
            StakingMsg::IndexDelegate(_) => MsgIndexDelegate::TYPE_NAME,
        }
    }
}

impl Msg for StakingMsg {
    type Error = Error;

    fn route(&self) -> &'static str {
        self.inner().route()
    }

    fn msg_type(&self) -> &'static str {
        self.inner().msg_type()
    }

    fn signers(&self) -> Vec<AccAddress> {
        self.inner().signers()
    }

    fn sign_bytes(&self) -> Result<Vec<u8>> {
        self.inner().sign_bytes()
    }

    fn validate_basic(&self) -> Result<()> {
        self.inner().validate_basic()
    }
}

/// Register every staking message under its codec name
pub fn register_msgs<T>(registry: &mut Registry<T>) -> Result<()>
where
    T: From<StakingMsg>,
{
    registry.register(MsgCreateValidator::TYPE_NAME, |v| {
        serde_json::from_value::<MsgCreateValidator>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    registry.register(MsgEditValidator::TYPE_NAME, |v| {
        serde_json::from_value::<MsgEditValidator>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    registry.register(MsgDelegate::TYPE_NAME, |v| {
        serde_json::from_value::<MsgDelegate>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    registry.register(MsgUndelegate::TYPE_NAME, |v| {
        serde_json::from_value::<MsgUndelegate>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    registry.register(MsgBeginRedelegate::TYPE_NAME, |v| {
        serde_json::from_value::<MsgBeginRedelegate>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    registry.register(MsgIndexDelegate::TYPE_NAME, |v| {
        serde_json::from_value::<MsgIndexDelegate>(v).map(|m| T::from(StakingMsg::from(m)))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Envelope;
    use ed25519_dalek::SigningKey;
    use rust_decimal_macros::dec;

    fn acc(b: u8) -> AccAddress {
        AccAddress::new(vec![b; 20])
    }

    fn val(b: u8) -> ValAddress {
        ValAddress::new(vec![b; 20])
    }

    fn pubkey() -> ConsPubKey {
        SigningKey::from_bytes(&[4u8; 32]).verifying_key().into()
    }

    fn create_msg(value: i64, min_self: i64) -> MsgCreateValidator {
        MsgCreateValidator::new(
            val(1),
            pubkey(),
            Coin::new("stake", value),
            Description::new("alice", "", "", ""),
            CommissionRates::new(dec!(0.1), dec!(0.2), dec!(0.01)),
            Decimal::from(min_self),
            "vstake",
        )
    }

    #[test]
    fn test_create_validator_self_delegation_floor() {
        assert!(matches!(
            create_msg(100, 150).validate_basic(),
            Err(Error::SelfDelegationBelowMinimum)
        ));
        assert!(create_msg(100, 50).validate_basic().is_ok());
        assert!(matches!(
            create_msg(100, 0).validate_basic(),
            Err(Error::MinSelfDelegationInvalid)
        ));
    }

    #[test]
    fn test_create_validator_checks_in_order() {
        let mut msg = create_msg(100, 1);
        msg.delegator_address = AccAddress::default();
        assert!(matches!(msg.validate_basic(), Err(Error::NilDelegatorAddress)));

        let mut msg = create_msg(100, 1);
        msg.delegator_address = acc(9);
        assert!(matches!(msg.validate_basic(), Err(Error::BadValidatorAddress)));

        let mut msg = create_msg(100, 1);
        msg.description = Description::default();
        assert!(matches!(
            msg.validate_basic(),
            Err(Error::InvalidInput(m)) if m == "description must be included"
        ));

        let mut msg = create_msg(100, 1);
        msg.commission = CommissionRates::default();
        assert!(matches!(
            msg.validate_basic(),
            Err(Error::InvalidInput(m)) if m == "commission must be included"
        ));
    }

    #[test]
    fn test_create_validator_signers() {
        let msg = create_msg(100, 1);
        assert_eq!(msg.signers(), vec![acc(1)]);

        let mut msg = create_msg(100, 1);
        msg.delegator_address = acc(2);
        assert_eq!(msg.signers(), vec![acc(2), acc(1)]);
    }

    #[test]
    fn test_create_validator_pubkey_is_bech32_on_the_wire() {
        let msg = create_msg(100, 1);
        let json = serde_json::to_value(&msg).unwrap();
        let pk = json["pubkey"].as_str().unwrap();
        assert!(pk.starts_with("cosmosvalconspub1"));

        let back: MsgCreateValidator = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_create_validator_bad_pubkey_is_decode_error() {
        let mut json = serde_json::to_value(create_msg(100, 1)).unwrap();
        json["pubkey"] = serde_json::Value::String("cosmosvalconspub1garbage".into());
        assert!(serde_json::from_value::<MsgCreateValidator>(json).is_err());
    }

    #[test]
    fn test_edit_validator_rate_bounds() {
        let msg = MsgEditValidator::new(val(1), Description::default(), Some(dec!(1.5)), None);
        assert!(matches!(
            msg.validate_basic(),
            Err(Error::InvalidInput(m)) if m == "commission rate must be between 0 and 1, inclusive"
        ));

        let msg = MsgEditValidator::new(val(1), Description::default(), Some(dec!(0.5)), None);
        assert!(msg.validate_basic().is_ok());
    }

    #[test]
    fn test_edit_validator_requires_change() {
        let msg = MsgEditValidator::new(val(1), Description::default(), None, None);
        assert!(matches!(
            msg.validate_basic(),
            Err(Error::InvalidInput(m)) if m == "transaction must include some information to modify"
        ));

        let msg = MsgEditValidator::new(ValAddress::default(), Description::default(), None, None);
        assert!(matches!(
            msg.validate_basic(),
            Err(Error::InvalidInput(m)) if m == "nil validator address"
        ));

        let msg = MsgEditValidator::new(val(1), Description::default(), None, Some(dec!(0)));
        assert!(matches!(msg.validate_basic(), Err(Error::MinSelfDelegationInvalid)));
    }

    #[test]
    fn test_edit_validator_absent_fields_are_null() {
        let msg = MsgEditValidator::new(val(1), Description::new("m", "", "", ""), None, None);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["commission_rate"].is_null());
        assert!(json["min_self_delegation"].is_null());
        assert_eq!(json["moniker"], "m");

        let back: MsgEditValidator = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_delegate_and_undelegate_amounts() {
        let msg = MsgDelegate::new(acc(1), val(2), Coin::new("stake", 0));
        assert!(matches!(msg.validate_basic(), Err(Error::BadDelegationAmount)));

        let msg = MsgUndelegate::new(acc(1), val(2), Coin::new("stake", 0));
        assert!(matches!(msg.validate_basic(), Err(Error::BadSharesAmount)));

        let msg = MsgDelegate::new(acc(1), ValAddress::default(), Coin::new("stake", 1));
        assert!(matches!(msg.validate_basic(), Err(Error::NilValidatorAddress)));
    }

    #[test]
    fn test_redelegate_requires_both_validators() {
        let msg = MsgBeginRedelegate::new(acc(1), val(2), ValAddress::default(), Coin::new("stake", 1));
        assert!(matches!(msg.validate_basic(), Err(Error::NilValidatorAddress)));

        let msg = MsgBeginRedelegate::new(acc(1), val(2), val(3), Coin::new("stake", -1));
        assert!(matches!(msg.validate_basic(), Err(Error::BadSharesAmount)));
    }

    #[test]
    fn test_index_delegate_first_failure_short_circuits() {
        let portions = vec![
            ValidatorPortion {
                validator_address: val(2),
                amount: Coin::new("stake", 10),
            },
            ValidatorPortion {
                validator_address: ValAddress::default(),
                amount: Coin::new("stake", -5),
            },
        ];
        let msg = MsgIndexDelegate::new(acc(1), portions, "stake");
        assert!(matches!(msg.validate_basic(), Err(Error::NilValidatorAddress)));
    }

    #[test]
    fn test_index_delegate_rejects_duplicates_and_empty() {
        let portion = ValidatorPortion {
            validator_address: val(2),
            amount: Coin::new("stake", 10),
        };
        let msg = MsgIndexDelegate::new(acc(1), vec![portion.clone(), portion], "stake");
        assert!(matches!(msg.validate_basic(), Err(Error::InvalidInput(_))));

        let msg = MsgIndexDelegate::new(acc(1), vec![], "stake");
        assert!(matches!(msg.validate_basic(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_index_delegate_wire_field_name() {
        let msg = MsgIndexDelegate::new(acc(1), vec![], "stake");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("validator_portion").is_some());
    }

    #[test]
    fn test_routes_and_types() {
        let msg: StakingMsg = MsgUndelegate::new(acc(1), val(2), Coin::new("stake", 1)).into();
        assert_eq!(msg.route(), "staking");
        assert_eq!(msg.msg_type(), "begin_unbonding");
        assert_eq!(msg.type_name(), "cosmos-sdk/MsgUndelegate");
    }

    #[test]
    fn test_sign_bytes_sorted_and_stable() {
        let msg = MsgDelegate::new(acc(1), val(2), Coin::new("stake", 10));
        let bytes = msg.sign_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(r#"{"type":"cosmos-sdk/MsgDelegate","value":{"amount":{"amount":"10","denom":"stake"}"#));

        let envelope: Envelope = serde_json::from_slice(&bytes).unwrap();
        let back: MsgDelegate = serde_json::from_value(envelope.value).unwrap();
        assert_eq!(back.sign_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_registry_roundtrip_through_envelope() {
        let mut registry: Registry<StakingMsg> = Registry::new();
        register_msgs(&mut registry).unwrap();

        let msg = create_msg(100, 1);
        let bytes = serde_json::to_vec(&Envelope::wrap(&msg).unwrap()).unwrap();
        let decoded = registry.decode_json(&bytes).unwrap();
        assert_eq!(decoded, StakingMsg::CreateValidator(msg));
    }
}
