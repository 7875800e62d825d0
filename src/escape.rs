//! Search filter value escaping
//!
//! Every byte of a value placed in a search filter is written as a `\xx`
//! hex pair. Escaping all bytes instead of only `*`, `(`, `)`, `\` and NUL
//! keeps a single code path for text and binary values alike.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscapeError {
    #[error("truncated escape sequence at offset {0}")]
    Truncated(usize),
    #[error("invalid hex escape at offset {0}")]
    InvalidHex(usize),
}

/// Render each byte as `\xx` (lowercase hex), with no separators.
pub fn hex_escape(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    let mut escaped = String::with_capacity(bytes.len() * 3);
    for pair in encoded.as_bytes().chunks(2) {
        escaped.push('\\');
        escaped.extend(pair.iter().copied().map(char::from));
    }
    escaped
}

/// Escape a text value for use on the right-hand side of a filter item.
///
/// Every byte of the UTF-8 encoding is escaped, not only the reserved
/// filter metacharacters.
pub fn escape_filter_value(value: &str) -> String {
    hex_escape(value.as_bytes())
}

/// Decode a filter value back into raw bytes.
///
/// `\xx` pairs are decoded, any other byte is taken literally.
pub fn unescape_filter_value(value: &str) -> Result<Vec<u8>, EscapeError> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len() / 3 + 1);

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            decoded.push(bytes[i]);
            i += 1;
            continue;
        }

        let pair = bytes.get(i + 1..i + 3).ok_or(EscapeError::Truncated(i))?;
        let byte = hex::decode(pair)
            .map_err(|_| EscapeError::InvalidHex(i))?
            .first()
            .copied()
            .ok_or(EscapeError::InvalidHex(i))?;
        decoded.push(byte);
        i += 3;
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_escape() {
        assert_eq!(hex_escape(&[]), "");
        assert_eq!(hex_escape(&[0x00, 0x0f, 0xff]), "\\00\\0f\\ff");
    }

    #[test]
    fn test_escape_reserved_characters() {
        assert_eq!(escape_filter_value("*"), "\\2a");
        assert_eq!(escape_filter_value("("), "\\28");
        assert_eq!(escape_filter_value(")"), "\\29");
        assert_eq!(escape_filter_value("\\"), "\\5c");
        assert_eq!(escape_filter_value("\0"), "\\00");
    }

    #[test]
    fn test_escape_ordinary_letters() {
        // Plain ASCII is escaped too
        assert_eq!(escape_filter_value("Foo"), "\\46\\6f\\6f");
        assert_eq!(escape_filter_value("bar"), "\\62\\61\\72");
    }

    #[test]
    fn test_escape_injection_attempt() {
        assert_eq!(
            escape_filter_value("*)(cn=*"),
            "\\2a\\29\\28\\63\\6e\\3d\\2a"
        );
    }

    #[test]
    fn test_escape_multibyte_utf8() {
        // U+00E9 is two bytes in UTF-8
        assert_eq!(escape_filter_value("é"), "\\c3\\a9");
    }

    #[test]
    fn test_unescape_round_trip() {
        for text in ["", "Foo", "a*b(c)d\\e", "\0", "Jürgen Müller", "CN=Foo,DC=bar"] {
            let escaped = escape_filter_value(text);
            assert_eq!(unescape_filter_value(&escaped).unwrap(), text.as_bytes());
        }
    }

    #[test]
    fn test_unescape_mixed_literal_and_escaped() {
        assert_eq!(unescape_filter_value("ab\\2ac").unwrap(), b"ab*c");
        assert_eq!(unescape_filter_value("\\C3\\A9").unwrap(), "é".as_bytes());
    }

    #[test]
    fn test_unescape_errors() {
        assert_eq!(unescape_filter_value("abc\\4"), Err(EscapeError::Truncated(3)));
        assert_eq!(unescape_filter_value("\\zz"), Err(EscapeError::InvalidHex(0)));
    }
}
