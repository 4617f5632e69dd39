//! Wire envelopes exchanged with the ledger client
//!
//! Every domain entity is encoded into a [`LedgerOperation`] before
//! submission. The operation travels inside a [`Request`], which the wallet
//! turns into a [`SignedRequest`] carrying the [`RequestKey`] used to find
//! the quorum reply later.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CredLedgerError, Result};
use crate::identity::Identifier;
use crate::public_key::StrDict;

/// Field names used in operations and replies
pub mod fields {
    pub const TXN_TYPE: &str = "type";
    pub const TARGET: &str = "dest";
    pub const DATA: &str = "data";
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const TYPE: &str = "type";
    pub const ATTR_NAMES: &str = "attrNames";
    pub const ORIGIN: &str = "origin";
    pub const REF: &str = "ref";
    pub const SEQ_NO: &str = "seqNo";
    pub const IDENTIFIER: &str = "identifier";
    pub const REQ_ID: &str = "reqId";
}

/// Ledger transaction types handled by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnType {
    #[serde(rename = "102")]
    ClaimDef,
    #[serde(rename = "108")]
    GetClaimDef,
    #[serde(rename = "109")]
    IssuerKey,
    #[serde(rename = "110")]
    GetIssuerKey,
}

impl TxnType {
    pub fn code(&self) -> &'static str {
        match self {
            TxnType::ClaimDef => "102",
            TxnType::GetClaimDef => "108",
            TxnType::IssuerKey => "109",
            TxnType::GetIssuerKey => "110",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "102" => Some(TxnType::ClaimDef),
            "108" => Some(TxnType::GetClaimDef),
            "109" => Some(TxnType::IssuerKey),
            "110" => Some(TxnType::GetIssuerKey),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Generic ledger operation: a transaction type plus its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerOperation {
    #[serde(rename = "type")]
    pub txn_type: TxnType,

    #[serde(flatten)]
    pub fields: StrDict,
}

impl LedgerOperation {
    pub fn new(txn_type: TxnType) -> Self {
        Self {
            txn_type,
            fields: StrDict::new(),
        }
    }

    /// Add a field to the operation
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Correlation handle between a submitted request and its reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub identifier: Identifier,
    pub req_id: u64,
}

impl RequestKey {
    pub fn new(identifier: impl Into<Identifier>, req_id: u64) -> Self {
        Self {
            identifier: identifier.into(),
            req_id,
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.identifier, self.req_id)
    }
}

/// Unsigned request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub identifier: Identifier,
    pub operation: LedgerOperation,
}

impl Request {
    pub fn new(identifier: Identifier, operation: LedgerOperation) -> Self {
        Self {
            identifier,
            operation,
        }
    }
}

/// Request prepared by a wallet: it has a request id and a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRequest {
    pub identifier: Identifier,
    pub req_id: u64,
    pub operation: LedgerOperation,
    pub signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningPayload<'a> {
    identifier: &'a Identifier,
    req_id: u64,
    operation: &'a LedgerOperation,
}

impl SignedRequest {
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.identifier.clone(), self.req_id)
    }

    /// Canonical bytes covered by the signature
    pub fn signing_bytes(
        identifier: &Identifier,
        req_id: u64,
        operation: &LedgerOperation,
    ) -> Result<Vec<u8>> {
        let payload = SigningPayload {
            identifier,
            req_id,
            operation,
        };
        Ok(serde_json::to_vec(&payload)?)
    }
}

/// Quorum-confirmed reply as handed back by the ledger client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(pub StrDict);

impl Reply {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The `data` field, which the ledger sends as an embedded string
    ///
    /// Returns `None` when the field is absent or null.
    pub fn data_str(&self) -> Result<Option<&str>> {
        match self.get(fields::DATA) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(CredLedgerError::MalformedReply(format!(
                "expected string data, got {}",
                other
            ))),
        }
    }

    /// The top-level `seqNo` field
    pub fn seq_no(&self) -> Option<u64> {
        self.get(fields::SEQ_NO).and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serializes_flat() {
        let op = LedgerOperation::new(TxnType::GetClaimDef)
            .with(fields::TARGET, "issuer-1")
            .with(fields::DATA, serde_json::json!({"name": "degree"}));

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "108");
        assert_eq!(value["dest"], "issuer-1");
        assert_eq!(value["data"]["name"], "degree");

        let back: LedgerOperation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_txn_type_codes() {
        for t in [
            TxnType::ClaimDef,
            TxnType::GetClaimDef,
            TxnType::IssuerKey,
            TxnType::GetIssuerKey,
        ] {
            assert_eq!(TxnType::from_code(t.code()), Some(t));
        }
        assert!(TxnType::from_code("1").is_none());
    }

    #[test]
    fn test_signed_request_key() {
        let signed = SignedRequest {
            identifier: Identifier::new("issuer-1"),
            req_id: 7,
            operation: LedgerOperation::new(TxnType::ClaimDef),
            signature: "sig".to_string(),
        };
        assert_eq!(signed.key(), RequestKey::new("issuer-1", 7));
        assert_eq!(signed.key().to_string(), "(issuer-1, 7)");
    }

    #[test]
    fn test_reply_data_str() {
        let reply: Reply = serde_json::from_value(serde_json::json!({
            "data": "{'name': 'degree'}",
            "seqNo": 3
        }))
        .unwrap();
        assert_eq!(reply.data_str().unwrap(), Some("{'name': 'degree'}"));
        assert_eq!(reply.seq_no(), Some(3));

        let null: Reply = serde_json::from_value(serde_json::json!({"data": null})).unwrap();
        assert_eq!(null.data_str().unwrap(), None);

        let bad: Reply = serde_json::from_value(serde_json::json!({"data": 5})).unwrap();
        assert!(bad.data_str().is_err());
    }
}
