//! Claim definition types
//!
//! A claim definition is the schema an issuer publishes once and then
//! addresses forever by the sequence number the ledger assigned to it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CredLedgerError, Result};
use crate::identity::Identifier;

/// Delimiter used to join attribute names on the wire.
///
/// Attribute names containing it cannot round-trip and are rejected.
pub const ATTR_DELIMITER: char = ',';

/// Characters that cannot survive the single-quoted reply rendering
const QUOTES: [char; 2] = ['\'', '"'];

/// Lookup key of a claim definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimDefinitionKey {
    /// Issuer that published the definition
    pub issuer_id: Identifier,

    /// Definition name (e.g. "degree")
    pub name: String,

    /// Definition version (e.g. "1.0")
    pub version: String,
}

impl ClaimDefinitionKey {
    pub fn new(
        issuer_id: impl Into<Identifier>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for ClaimDefinitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.issuer_id, self.name, self.version)
    }
}

/// Address of a claim definition, stored or not
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimDefinitionId {
    pub key: ClaimDefinitionKey,

    /// Ledger sequence number, present once the definition is stored
    pub seq_no: Option<u64>,
}

impl ClaimDefinitionId {
    /// Id of a definition that is not on the ledger yet
    pub fn unregistered(key: ClaimDefinitionKey) -> Self {
        Self { key, seq_no: None }
    }

    /// Id of a definition already stored under `seq_no`
    pub fn registered(key: ClaimDefinitionKey, seq_no: u64) -> Self {
        Self {
            key,
            seq_no: Some(seq_no),
        }
    }

    /// The sequence number, or `MissingClaimDefSeqNo` when unregistered
    pub fn require_seq_no(&self) -> Result<u64> {
        self.seq_no
            .ok_or_else(|| CredLedgerError::MissingClaimDefSeqNo(self.key.to_string()))
    }
}

/// Credential schema published by an issuer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDefinition {
    pub name: String,

    pub version: String,

    /// Semantic type tag (signature scheme, e.g. "CL")
    pub claim_type: String,

    /// Ordered attribute names
    pub attr_names: Vec<String>,

    /// Issuer that owns this definition
    pub issuer_id: Identifier,

    /// Ledger sequence number, assigned on submission
    pub seq_no: Option<u64>,
}

impl ClaimDefinition {
    /// Default signature scheme tag
    pub const CL_TYPE: &'static str = "CL";

    /// Create a local, not yet submitted definition
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        attr_names: Vec<String>,
        issuer_id: impl Into<Identifier>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            claim_type: Self::CL_TYPE.to_string(),
            attr_names,
            issuer_id: issuer_id.into(),
            seq_no: None,
        }
    }

    pub fn key(&self) -> ClaimDefinitionKey {
        ClaimDefinitionKey {
            issuer_id: self.issuer_id.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn id(&self) -> ClaimDefinitionId {
        ClaimDefinitionId {
            key: self.key(),
            seq_no: self.seq_no,
        }
    }

    /// Check the definition can be put on the wire and read back unchanged
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CredLedgerError::InvalidClaimDef("empty name".to_string()));
        }
        if self.version.is_empty() {
            return Err(CredLedgerError::InvalidClaimDef("empty version".to_string()));
        }
        for (field, value) in [
            ("name", &self.name),
            ("version", &self.version),
            ("type", &self.claim_type),
        ] {
            reject_quotes(field, value)?;
        }
        if self.attr_names.is_empty() {
            return Err(CredLedgerError::InvalidClaimDef(
                "no attribute names".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for attr in &self.attr_names {
            if attr.is_empty() {
                return Err(CredLedgerError::InvalidClaimDef(
                    "empty attribute name".to_string(),
                ));
            }
            if attr.contains(ATTR_DELIMITER) {
                return Err(CredLedgerError::InvalidClaimDef(format!(
                    "attribute name {:?} contains the '{}' delimiter",
                    attr, ATTR_DELIMITER
                )));
            }
            reject_quotes("attribute name", attr)?;
            if !seen.insert(attr.as_str()) {
                return Err(CredLedgerError::InvalidClaimDef(format!(
                    "duplicate attribute name {:?}",
                    attr
                )));
            }
        }

        Ok(())
    }
}

fn reject_quotes(field: &str, value: &str) -> Result<()> {
    if value.contains(&QUOTES[..]) {
        return Err(CredLedgerError::InvalidClaimDef(format!(
            "{} {:?} contains a quote character",
            field, value
        )));
    }
    Ok(())
}
