//! Codec registry and canonical encoding
//!
//! Messages travel as an envelope `{"type": <name>, "value": <body>}`. The
//! registered names are part of the persisted format and never change. Sign
//! bytes are the envelope rendered as JSON with recursively sorted keys.

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A type with a registered codec name
pub trait Named {
    /// Name in the registry
    const TYPE_NAME: &'static str;
}

/// Tagged wire form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Registered type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Body
    pub value: Value,
}

impl Envelope {
    /// Wrap a named value
    pub fn wrap<T: Named + Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            type_name: T::TYPE_NAME.to_string(),
            value: serde_json::to_value(value)?,
        })
    }
}

/// Decoder from an envelope body into the registry's target type
pub type DecodeFn<T> = fn(Value) -> serde_json::Result<T>;

/// Decode a concrete type and convert it into the target type
pub fn decode_into<C, T>(value: Value) -> serde_json::Result<T>
where
    C: DeserializeOwned + Into<T>,
{
    serde_json::from_value::<C>(value).map(Into::into)
}

/// Name → decoder table, built once at startup
pub struct Registry<T> {
    decoders: BTreeMap<&'static str, DecodeFn<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Registry<T> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder under `name`
    pub fn register(&mut self, name: &'static str, decode: DecodeFn<T>) -> Result<()> {
        if self.decoders.contains_key(name) {
            return Err(Error::Codec(format!("type {} already registered", name)));
        }
        self.decoders.insert(name, decode);
        Ok(())
    }

    /// Register a concrete type under its own name
    pub fn register_named<C>(&mut self) -> Result<()>
    where
        C: Named + DeserializeOwned + Into<T>,
    {
        self.register(C::TYPE_NAME, decode_into::<C, T>)
    }

    /// Whether `name` is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Registered names in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// Decode an envelope
    pub fn decode(&self, envelope: Envelope) -> Result<T> {
        let decode = self
            .decoders
            .get(envelope.type_name.as_str())
            .ok_or_else(|| Error::UnknownMsgType(envelope.type_name.clone()))?;
        Ok(decode(envelope.value)?)
    }

    /// Decode an envelope from JSON bytes
    pub fn decode_json(&self, bytes: &[u8]) -> Result<T> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        self.decode(envelope)
    }
}

/// Recursively sort object keys
pub fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_json(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

/// JSON with recursively sorted keys and no insignificant whitespace
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = sort_json(serde_json::to_value(value)?);
    Ok(serde_json::to_vec(&value)?)
}

/// Canonical sign bytes of a named message
pub fn sign_bytes<T: Named + Serialize>(msg: &T) -> Result<Vec<u8>> {
    canonical_json(&Envelope::wrap(msg)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        zeta: u8,
        alpha: String,
    }

    impl Named for Ping {
        const TYPE_NAME: &'static str = "test/Ping";
    }

    #[derive(Debug, PartialEq)]
    enum Any {
        Ping(Ping),
    }

    impl From<Ping> for Any {
        fn from(p: Ping) -> Self {
            Any::Ping(p)
        }
    }

    #[test]
    fn test_sort_json_is_recursive() {
        let value = json!({"b": {"y": 1, "x": [{"d": 1, "c": 2}]}, "a": 0});
        let bytes = serde_json::to_vec(&sort_json(value)).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":0,"b":{"x":[{"c":2,"d":1}],"y":1}}"#
        );
    }

    #[test]
    fn test_sign_bytes_envelope() {
        let ping = Ping {
            zeta: 1,
            alpha: "a".into(),
        };
        let bytes = sign_bytes(&ping).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"test/Ping","value":{"alpha":"a","zeta":1}}"#
        );
    }

    #[test]
    fn test_registry_decode() {
        let mut registry: Registry<Any> = Registry::new();
        registry.register_named::<Ping>().unwrap();

        let decoded = registry
            .decode_json(br#"{"type":"test/Ping","value":{"zeta":2,"alpha":"b"}}"#)
            .unwrap();
        assert_eq!(
            decoded,
            Any::Ping(Ping {
                zeta: 2,
                alpha: "b".into()
            })
        );
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknown_names() {
        let mut registry: Registry<Any> = Registry::new();
        registry.register_named::<Ping>().unwrap();
        assert!(registry.register_named::<Ping>().is_err());

        let err = registry
            .decode_json(br#"{"type":"test/Pong","value":{}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMsgType(name) if name == "test/Pong"));
    }
}
