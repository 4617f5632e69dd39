//! Transaction codec
//!
//! Pure mapping between domain entities and ledger operations, and from
//! confirmed replies back to domain entities. No I/O happens here.
//!
//! Reply payloads arrive as strings rendered with single quotes. They are
//! normalized to double quotes before JSON decoding, so values that contain
//! an apostrophe cannot be decoded.

use credledger_core::claim_def::ATTR_DELIMITER;
use credledger_core::request::fields;
use credledger_core::{
    ClaimDefinition, ClaimDefinitionId, CredLedgerError, LedgerOperation, PublicKey, Reply,
    Result, StrDict, TxnType,
};
use serde_json::{json, Value};

/// Decoded reply: the data map plus the sequence number it carries, if any
pub type ReplyData = (StrDict, Option<u64>);

/// Read operation for a claim definition
pub fn encode_get_claim_def(id: &ClaimDefinitionId) -> LedgerOperation {
    LedgerOperation::new(TxnType::GetClaimDef)
        .with(fields::TARGET, id.key.issuer_id.as_str())
        .with(
            fields::DATA,
            json!({
                "name": id.key.name,
                "version": id.key.version,
            }),
        )
}

/// Write operation for a claim definition
pub fn encode_submit_claim_def(def: &ClaimDefinition) -> Result<LedgerOperation> {
    def.validate()?;

    let delimiter = ATTR_DELIMITER.to_string();
    Ok(LedgerOperation::new(TxnType::ClaimDef).with(
        fields::DATA,
        json!({
            "name": def.name,
            "version": def.version,
            "type": def.claim_type,
            "attrNames": def.attr_names.join(delimiter.as_str()),
        }),
    ))
}

/// Read operation for the issuer key certifying a stored claim definition
pub fn encode_get_public_key(id: &ClaimDefinitionId) -> Result<LedgerOperation> {
    let seq_no = id.require_seq_no()?;
    Ok(LedgerOperation::new(TxnType::GetIssuerKey)
        .with(fields::REF, seq_no)
        .with(fields::ORIGIN, id.key.issuer_id.as_str()))
}

/// Write operation publishing `key` for a stored claim definition
pub fn encode_submit_public_key(
    id: &ClaimDefinitionId,
    key: &PublicKey,
) -> Result<LedgerOperation> {
    let seq_no = id.require_seq_no()?;
    Ok(LedgerOperation::new(TxnType::IssuerKey)
        .with(fields::REF, seq_no)
        .with(fields::DATA, Value::Object(key.to_str_dict()?)))
}

/// Parse an embedded reply payload into a map
pub fn parse_payload(raw: &str) -> Result<StrDict> {
    let normalized = raw.replace('\'', "\"");
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CredLedgerError::MalformedReply(format!(
            "expected a map payload, got {}",
            other
        ))),
        Err(e) => Err(CredLedgerError::MalformedReply(format!(
            "unparsable payload: {}",
            e
        ))),
    }
}

/// Decoder for read replies: the sequence number lives inside the data.
///
/// A reply without data yields an empty map, meaning nothing was found.
pub fn decode_get_reply(reply: &Reply) -> Result<ReplyData> {
    let data = match reply.data_str()? {
        Some(raw) => parse_payload(raw)?,
        None => StrDict::new(),
    };
    let seq_no = data.get(fields::SEQ_NO).and_then(Value::as_u64);
    Ok((data, seq_no))
}

/// Decoder for write replies: the sequence number is on the reply itself
pub fn decode_submit_reply(reply: &Reply) -> Result<ReplyData> {
    let raw = reply.data_str()?.ok_or_else(|| {
        CredLedgerError::MalformedReply("write reply without data".to_string())
    })?;
    Ok((parse_payload(raw)?, reply.seq_no()))
}

/// Decode a raw claim definition payload stored under `seq_no`
pub fn decode_claim_def(raw: &str, seq_no: u64) -> Result<ClaimDefinition> {
    claim_def_from_data(&parse_payload(raw)?, seq_no)
}

/// Build a claim definition from an already parsed record
pub fn claim_def_from_data(data: &StrDict, seq_no: u64) -> Result<ClaimDefinition> {
    let attr_names: Vec<String> = required_str(data, fields::ATTR_NAMES)?
        .split(ATTR_DELIMITER)
        .map(str::to_string)
        .collect();
    if attr_names.iter().any(String::is_empty) {
        return Err(CredLedgerError::MalformedReply(
            "empty attribute name in attrNames".to_string(),
        ));
    }

    Ok(ClaimDefinition {
        name: required_str(data, fields::NAME)?.to_string(),
        version: required_str(data, fields::VERSION)?.to_string(),
        claim_type: required_str(data, fields::TYPE)?.to_string(),
        attr_names,
        issuer_id: required_str(data, fields::ORIGIN)?.into(),
        seq_no: Some(seq_no),
    })
}

/// The key map nested under `data` in an issuer key record
pub fn nested_data(record: &StrDict) -> Result<&StrDict> {
    record
        .get(fields::DATA)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            CredLedgerError::MalformedReply("issuer key record without data".to_string())
        })
}

/// Parse an issuer public key from its wire map
pub fn decode_public_key(raw_data_map: &StrDict) -> Result<PublicKey> {
    PublicKey::from_str_dict(raw_data_map)
}

fn required_str<'a>(data: &'a StrDict, field: &str) -> Result<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CredLedgerError::MalformedReply(format!("missing field {}", field)))
}
