//! Identifier classification and binary identifier encoding
//!
//! A value handed to the converter may be a DN, an objectGUID, an objectSid
//! or a plain name. GUIDs and SIDs are stored as binary attributes, so their
//! textual forms are converted to the on-directory byte layout before they
//! can be matched in a search filter.
//!
//! # Binary layouts
//!
//! GUID (MS-DTYP 2.3.4): `Data1(4, LE) Data2(2, LE) Data3(2, LE) Data4(8)`
//!
//! SID (MS-DTYP 2.4.2):
//! ```text
//! Offset  Size  Field
//! 0       1     Revision
//! 1       1     SubAuthorityCount
//! 2       6     IdentifierAuthority (big-endian)
//! 8       4*N   SubAuthorities (little-endian)
//! ```

use crate::dn;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of sub-authorities in a SID
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;

const GUID_LEN: usize = 16;
const SID_HEADER_LEN: usize = 8;
const SID_MAX_AUTHORITY: u64 = (1 << 48) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier value is empty")]
    Empty,
    #[error("malformed GUID: {0}")]
    MalformedGuid(String),
    #[error("malformed SID: {0}")]
    MalformedSid(String),
    #[error("invalid binary identifier: {0}")]
    InvalidBinary(String),
}

/// The form a caller-supplied value was recognized as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    DistinguishedName(String),
    ObjectGuid { bytes: [u8; GUID_LEN], text: String },
    ObjectSid { bytes: Vec<u8>, text: String },
    PlainName(String),
}

impl Identifier {
    /// The value as the caller supplied it
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::DistinguishedName(s) | Identifier::PlainName(s) => s,
            Identifier::ObjectGuid { text, .. } | Identifier::ObjectSid { text, .. } => text,
        }
    }

    /// Short name of the form, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::DistinguishedName(_) => "dn",
            Identifier::ObjectGuid { .. } => "guid",
            Identifier::ObjectSid { .. } => "sid",
            Identifier::PlainName(_) => "name",
        }
    }
}

/// Decide which identifier form `value` is.
///
/// Tried in order: DN, GUID, SID, and anything else is a plain name.
/// Classification is syntactic only.
pub fn classify(value: &str) -> Identifier {
    if dn::is_dn(value) {
        return Identifier::DistinguishedName(value.to_string());
    }

    if is_guid(value) {
        if let Ok(bytes) = encode_guid_to_bytes(value) {
            return Identifier::ObjectGuid {
                bytes,
                text: value.to_string(),
            };
        }
    }

    // A SID-shaped value whose fields overflow is treated as a name
    if is_sid(value) {
        if let Ok(bytes) = encode_sid_to_bytes(value) {
            return Identifier::ObjectSid {
                bytes,
                text: value.to_string(),
            };
        }
    }

    Identifier::PlainName(value.to_string())
}

/// Canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form
fn is_guid(value: &str) -> bool {
    value.len() == 36
        && value.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// `S-<revision>-<authority>-<sub>[-<sub>...]`
fn is_sid(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("S-") else {
        return false;
    };

    let parts: Vec<&str> = rest.split('-').collect();
    parts.len() >= 3
        && parts
            .iter()
            .enumerate()
            .all(|(i, part)| is_decimal(part) || (i == 1 && is_hex_authority(part)))
}

fn is_decimal(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn is_hex_authority(part: &str) -> bool {
    part.strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
        .map(|hex| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Convert a textual GUID to the byte order stored in `objectGUID`.
///
/// The first three groups are little-endian on the directory, the last two
/// are kept as written.
pub fn encode_guid_to_bytes(text: &str) -> Result<[u8; GUID_LEN], IdentifierError> {
    let digits: String = text.chars().filter(|c| *c != '-').collect();
    if digits.len() != GUID_LEN * 2 {
        return Err(IdentifierError::MalformedGuid(format!(
            "expected 32 hex digits, got {}",
            digits.len()
        )));
    }

    let raw = hex::decode(&digits).map_err(|e| IdentifierError::MalformedGuid(e.to_string()))?;

    let mut bytes = [0u8; GUID_LEN];
    bytes.copy_from_slice(&raw);
    bytes[0..4].reverse();
    bytes[4..6].reverse();
    bytes[6..8].reverse();

    Ok(bytes)
}

/// Convert a textual SID (`S-1-5-21-...`) to its binary form.
pub fn encode_sid_to_bytes(text: &str) -> Result<Vec<u8>, IdentifierError> {
    let malformed = |reason: &str| IdentifierError::MalformedSid(format!("{}: {}", reason, text));

    let rest = text
        .strip_prefix("S-")
        .ok_or_else(|| malformed("missing S- prefix"))?;
    let mut parts = rest.split('-');

    let revision: u8 = parts
        .next()
        .and_then(parse_decimal)
        .ok_or_else(|| malformed("invalid revision"))?;

    let authority = parts
        .next()
        .and_then(parse_authority)
        .filter(|a| *a <= SID_MAX_AUTHORITY)
        .ok_or_else(|| malformed("invalid identifier authority"))?;

    let sub_authorities = parts
        .map(|part| parse_decimal::<u32>(part).ok_or_else(|| malformed("invalid sub-authority")))
        .collect::<Result<Vec<u32>, _>>()?;

    if sub_authorities.is_empty() {
        return Err(malformed("no sub-authorities"));
    }
    if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
        return Err(malformed("too many sub-authorities"));
    }

    let mut bytes = Vec::with_capacity(SID_HEADER_LEN + sub_authorities.len() * 4);
    bytes.push(revision);
    bytes.push(sub_authorities.len() as u8);
    bytes.extend_from_slice(&authority.to_be_bytes()[2..]);
    for sub in &sub_authorities {
        bytes.extend_from_slice(&sub.to_le_bytes());
    }

    Ok(bytes)
}

fn parse_decimal<T: FromStr>(part: &str) -> Option<T> {
    if is_decimal(part) {
        part.parse().ok()
    } else {
        None
    }
}

fn parse_authority(part: &str) -> Option<u64> {
    if is_hex_authority(part) {
        u64::from_str_radix(&part[2..], 16).ok()
    } else {
        parse_decimal(part)
    }
}

/// Render a binary `objectGUID` value in canonical dashed form.
pub fn guid_from_bytes(bytes: &[u8]) -> Result<String, IdentifierError> {
    if bytes.len() != GUID_LEN {
        return Err(IdentifierError::InvalidBinary(format!(
            "GUID must be 16 bytes, got {}",
            bytes.len()
        )));
    }

    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);

    Ok(format!(
        "{:08x}-{:04x}-{:04x}-{}-{}",
        data1,
        data2,
        data3,
        hex::encode(&bytes[8..10]),
        hex::encode(&bytes[10..16])
    ))
}

/// Render a binary `objectSid` value as `S-rev-auth-sub...`.
///
/// Authorities of 2^32 and above are written in hex, as Windows does.
pub fn sid_from_bytes(bytes: &[u8]) -> Result<String, IdentifierError> {
    if bytes.len() < SID_HEADER_LEN {
        return Err(IdentifierError::InvalidBinary(
            "SID too short (minimum 8 bytes)".to_string(),
        ));
    }

    let revision = bytes[0];
    let count = bytes[1] as usize;
    if bytes.len() < SID_HEADER_LEN + count * 4 {
        return Err(IdentifierError::InvalidBinary(format!(
            "SID data insufficient for {} sub-authorities",
            count
        )));
    }

    let authority = u64::from_be_bytes([
        0, 0, bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);

    let mut sid = if authority >= 1 << 32 {
        format!("S-{}-0x{:012X}", revision, authority)
    } else {
        format!("S-{}-{}", revision, authority)
    };

    for chunk in bytes[SID_HEADER_LEN..SID_HEADER_LEN + count * 4].chunks_exact(4) {
        let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        sid.push('-');
        sid.push_str(&sub.to_string());
    }

    Ok(sid)
}
