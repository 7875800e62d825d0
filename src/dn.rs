//! Distinguished name parsing
//!
//! Splits a DN into its RDN components and unescapes attribute values
//! (RFC 4514). Values handed out by this module are always unescaped;
//! the escaped wire form never leaves the parser.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    #[error("distinguished name cannot be empty")]
    Empty,
    #[error("empty component in distinguished name: {0}")]
    EmptyComponent(String),
    #[error("component has no '=' separator: {0}")]
    MissingEquals(String),
    #[error("invalid attribute name in component: {0}")]
    InvalidAttribute(String),
    #[error("distinguished name ends with an unterminated escape sequence")]
    DanglingEscape,
    #[error("distinguished name contains an unterminated quoted value")]
    UnterminatedQuote,
    #[error("escaped value is not valid UTF-8")]
    InvalidUtf8,
}

/// One `attribute=value` pair of a relative distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute type as written in the DN (e.g. `cn`)
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Unescaped attribute value
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Parse a DN into its ordered components.
///
/// Each component is a list of one or more `Rdn` pairs; more than one
/// pair means a multi-valued RDN joined with `+`.
pub fn parse_dn(dn: &str) -> Result<Vec<Vec<Rdn>>, DnError> {
    let dn = dn.trim();
    if dn.is_empty() {
        return Err(DnError::Empty);
    }

    split_unescaped(dn, ',')?
        .into_iter()
        .map(parse_component)
        .collect()
}

/// Get the unescaped value of the first RDN of a DN.
///
/// `cn=Foo\,\=bar,dc=example,dc=com` yields `Foo,=bar`.
pub fn first_rdn_value(dn: &str) -> Result<String, DnError> {
    let dn = dn.trim();
    if dn.is_empty() {
        return Err(DnError::Empty);
    }

    let components = split_unescaped(dn, ',')?;
    let first = components.first().copied().ok_or(DnError::Empty)?;

    parse_component(first)?
        .into_iter()
        .next()
        .map(|rdn| rdn.value)
        .ok_or_else(|| DnError::EmptyComponent(first.to_string()))
}

/// Whether a string is syntactically a DN with at least one component.
pub fn is_dn(value: &str) -> bool {
    parse_dn(value).is_ok()
}

/// Whether `name` is a valid attribute description: a keystring
/// (`cn`, `objectClass`) or numeric OID (`2.5.4.3`), optionally followed
/// by `;option` segments.
pub fn is_attribute_descriptor(name: &str) -> bool {
    let mut parts = name.split(';');
    let base = parts.next().unwrap_or_default();

    (is_keystring(base) || is_numeric_oid(base))
        && parts.all(|option| {
            !option.is_empty()
                && option
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

fn is_keystring(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-')
        }
        _ => false,
    }
}

fn is_numeric_oid(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()))
}

/// Split on `delimiter` where it is neither backslash-escaped nor inside a
/// double-quoted value. The returned slices keep their escapes.
fn split_unescaped(input: &str, delimiter: char) -> Result<Vec<&str>, DnError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escape = false;
    let mut quoted = false;

    for (i, ch) in input.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' => escape = true,
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if escape {
        return Err(DnError::DanglingEscape);
    }
    if quoted {
        return Err(DnError::UnterminatedQuote);
    }

    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_component(component: &str) -> Result<Vec<Rdn>, DnError> {
    let component = component.trim_start();
    if component.is_empty() {
        return Err(DnError::EmptyComponent(component.to_string()));
    }

    split_unescaped(component, '+')?
        .into_iter()
        .map(|pair| {
            let idx = find_unescaped(pair, '=')
                .ok_or_else(|| DnError::MissingEquals(component.to_string()))?;

            let attribute = pair[..idx].trim();
            if !is_attribute_descriptor(attribute) {
                return Err(DnError::InvalidAttribute(component.to_string()));
            }

            let raw_value = trim_unescaped_end(pair[idx + 1..].trim_start());
            Ok(Rdn::new(attribute, unescape_value(raw_value)?))
        })
        .collect()
}

fn find_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escape = false;
    for (i, ch) in input.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == needle {
            return Some(i);
        }
    }
    None
}

/// Drop trailing spaces unless the last one is escaped (`\ `).
fn trim_unescaped_end(raw: &str) -> &str {
    let mut end = raw.len();
    while raw[..end].ends_with(' ') {
        let backslashes = raw[..end - 1]
            .bytes()
            .rev()
            .take_while(|b| *b == b'\\')
            .count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &raw[..end]
}

/// Remove RFC 4514 escaping from a raw attribute value.
///
/// `\` followed by a special character yields that character, `\` followed
/// by two hex digits yields that byte, and a value wrapped in double quotes
/// loses its quotes.
fn unescape_value(raw: &str) -> Result<String, DnError> {
    let raw = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => inner,
        None => raw,
    };

    let bytes = raw.as_bytes();
    let mut value = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            value.push(bytes[i]);
            i += 1;
            continue;
        }

        match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                let pair = [*hi, *lo];
                let decoded = hex::decode(pair).map_err(|_| DnError::InvalidUtf8)?;
                value.extend_from_slice(&decoded);
                i += 3;
            }
            (Some(next), _) => {
                value.push(*next);
                i += 2;
            }
            (None, _) => return Err(DnError::DanglingEscape),
        }
    }

    String::from_utf8(value).map_err(|_| DnError::InvalidUtf8)
}
