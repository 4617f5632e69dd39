//! Issuer key material
//!
//! The adapter never interprets key internals. Keys only travel to and from
//! the ledger as string-keyed maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CredLedgerError, Result};

/// String-keyed map used as the wire form of key material
pub type StrDict = serde_json::Map<String, serde_json::Value>;

/// Issuer public key for the CL signature scheme
///
/// Every component is a decimal big-integer string; `r` holds one base per
/// attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(rename = "N")]
    pub n: String,

    #[serde(rename = "R")]
    pub r: BTreeMap<String, String>,

    #[serde(rename = "S")]
    pub s: String,

    #[serde(rename = "Z")]
    pub z: String,
}

impl PublicKey {
    /// Serialize to the wire map
    pub fn to_str_dict(&self) -> Result<StrDict> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(CredLedgerError::Serialization(format!(
                "public key serialized to non-map value {}",
                other
            ))),
        }
    }

    /// Parse from the wire map
    pub fn from_str_dict(dict: &StrDict) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(dict.clone()))
            .map_err(|e| CredLedgerError::MalformedReply(format!("public key: {}", e)))
    }
}

/// Revocation public key (declared for the revocation capability)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationPublicKey(pub StrDict);

/// Accumulator public key (declared for the revocation capability)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorPublicKey(pub StrDict);

/// Revocation accumulator value (declared for the revocation capability)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator(pub StrDict);

/// Accumulator tails, indexed by credential index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tails(pub BTreeMap<u64, String>);

/// Timestamp attached to accumulator updates
pub type Timestamp = DateTime<Utc>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key() -> PublicKey {
        let mut r = BTreeMap::new();
        r.insert("age".to_string(), "1234".to_string());
        r.insert("name".to_string(), "5678".to_string());
        PublicKey {
            n: "9871".to_string(),
            r,
            s: "42".to_string(),
            z: "17".to_string(),
        }
    }

    #[test]
    fn test_str_dict_uses_scheme_field_names() {
        let dict = sample_key().to_str_dict().unwrap();
        assert_eq!(dict["N"], "9871");
        assert_eq!(dict["R"]["age"], "1234");
        assert!(dict.contains_key("S"));
        assert!(dict.contains_key("Z"));
    }

    #[test]
    fn test_from_str_dict_missing_component() {
        let mut dict = sample_key().to_str_dict().unwrap();
        dict.remove("Z");
        assert!(matches!(
            PublicKey::from_str_dict(&dict),
            Err(CredLedgerError::MalformedReply(_))
        ));
    }
}
