//! Transaction decoding and stateless checks
//!
//! Wire form: `{"msgs": [<envelope>, ...], "memo": "..."}`. Signatures are
//! verified by the surrounding framework and are not part of this format.

use crate::msg::{self, AppMsg};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use staking_core::codec::{Envelope, Registry};
use staking_core::Msg;
use std::fmt;

/// Maximum memo length in characters
pub const MAX_MEMO_CHARACTERS: usize = 256;

/// Transaction as encoded on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    /// Message envelopes, applied in order
    pub msgs: Vec<Envelope>,
    /// Free-form note
    #[serde(default)]
    pub memo: String,
}

impl StdTx {
    /// Encode as JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Decoded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    /// Messages, applied in order
    pub msgs: Vec<AppMsg>,
    /// Free-form note
    pub memo: String,
}

impl Tx {
    /// Stateless checks on the transaction and every message
    pub fn validate_basic(&self) -> Result<()> {
        if self.msgs.is_empty() {
            return Err(Error::InvalidTx("must contain at least one message".into()));
        }
        let len = self.memo.chars().count();
        if len > MAX_MEMO_CHARACTERS {
            return Err(Error::MemoTooLarge {
                len,
                max: MAX_MEMO_CHARACTERS,
            });
        }
        for msg in &self.msgs {
            if msg.signers().is_empty() {
                return Err(Error::InvalidTx(format!(
                    "message {} has no signers",
                    msg.type_name()
                )));
            }
            msg.validate_basic()?;
        }
        Ok(())
    }

    /// Type of the first message, used for labelling
    pub fn primary_type(&self) -> &'static str {
        self.msgs.first().map(AppMsg::msg_type).unwrap_or("empty")
    }
}

/// Decodes wire transactions through the codec registry
pub struct TxDecoder {
    registry: Registry<AppMsg>,
}

impl fmt::Debug for TxDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxDecoder")
            .field("registry", &self.registry)
            .finish()
    }
}

impl TxDecoder {
    /// Decoder for every registered message
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: msg::registry()?,
        })
    }

    /// Decode JSON bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<Tx> {
        let std_tx: StdTx =
            serde_json::from_slice(bytes).map_err(|e| Error::TxDecode(e.to_string()))?;
        let msgs = std_tx
            .msgs
            .into_iter()
            .map(|envelope| self.registry.decode(envelope))
            .collect::<staking_core::Result<Vec<_>>>()?;
        Ok(Tx {
            msgs,
            memo: std_tx.memo,
        })
    }
}

/// Uppercase hex SHA-256 of the raw transaction
pub fn tx_hash(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use staking_core::msg::MsgDelegate;
    use staking_core::{AccAddress, Coin, ValAddress};

    fn delegate_envelope(amount: i64) -> Envelope {
        Envelope::wrap(&MsgDelegate::new(
            AccAddress::new(vec![1; 20]),
            ValAddress::new(vec![2; 20]),
            Coin::new("stake", amount),
        ))
        .unwrap()
    }

    #[test]
    fn test_decode_and_validate() {
        let decoder = TxDecoder::new().unwrap();
        let bytes = StdTx {
            msgs: vec![delegate_envelope(10)],
            memo: "hello".into(),
        }
        .to_bytes()
        .unwrap();

        let tx = decoder.decode(&bytes).unwrap();
        assert_eq!(tx.msgs.len(), 1);
        assert_eq!(tx.primary_type(), "delegate");
        tx.validate_basic().unwrap();
    }

    #[test]
    fn test_rejections() {
        let decoder = TxDecoder::new().unwrap();
        assert!(matches!(decoder.decode(b"not json"), Err(Error::TxDecode(_))));

        let unknown = br#"{"msgs":[{"type":"cosmos-sdk/MsgSend","value":{}}]}"#;
        let err = decoder.decode(unknown).unwrap_err();
        assert!(matches!(
            err,
            Error::Staking(staking_core::Error::UnknownMsgType(_))
        ));

        let empty = Tx {
            msgs: vec![],
            memo: String::new(),
        };
        assert!(matches!(empty.validate_basic(), Err(Error::InvalidTx(_))));

        let tx = decoder
            .decode(
                &StdTx {
                    msgs: vec![delegate_envelope(1)],
                    memo: "x".repeat(MAX_MEMO_CHARACTERS + 1),
                }
                .to_bytes()
                .unwrap(),
            )
            .unwrap();
        assert!(matches!(tx.validate_basic(), Err(Error::MemoTooLarge { .. })));

        let tx = decoder
            .decode(
                &StdTx {
                    msgs: vec![delegate_envelope(0)],
                    memo: String::new(),
                }
                .to_bytes()
                .unwrap(),
            )
            .unwrap();
        assert!(matches!(
            tx.validate_basic(),
            Err(Error::Staking(staking_core::Error::BadDelegationAmount))
        ));
    }

    #[test]
    fn test_tx_hash() {
        assert_eq!(
            tx_hash(b""),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }
}
