//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest) and
//! [`ResponseWriter`](crate::http::response::ResponseWriter)
//!
//! Header names are stored lower-cased, so every lookup and mutation is
//! case-insensitive. Setting a name that is already present appends the new
//! value to the old one, joined by a comma, which is how repeated field lines
//! (`Set-Person: a` followed by `Set-Person: b`) accumulate. Use
//! [`HttpHeaders::replace`] to overwrite.
//!
//! Entries are kept in an ordered map, but nothing on the wire relies on that
//! order: consumers must not assume a stable ordering between runs.
//!
//! [`HttpHeaders::parse`] is the incremental field-line parser used while
//! reading a request. It only commits lines that are complete and valid.

use indexmap::IndexMap;
use thiserror::Error;

use crate::http::CRLF;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid field-line syntax")]
    InvalidSyntax,

    #[error("invalid tchar for field-name")]
    InvalidFieldName,

    #[error("field-value is not valid UTF-8")]
    InvalidFieldValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: IndexMap<String, String>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// Adds `value` under `name`, comma-joining it onto any existing value.
    pub fn set(&mut self, name: &str, value: &str) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    pub fn replace(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn delete(&mut self, name: &str) -> Option<String> {
        self.headers.shift_remove(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Wire rendering: one `name: value\r\n` line per entry, without the
    /// terminating blank line.
    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in self.iter() {
            result.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        result
    }

    /// Parses as many complete field lines out of `data` as possible.
    ///
    /// Returns the number of bytes consumed and whether the blank line that
    /// terminates the field section was reached (its `CRLF` is included in the
    /// count). `Ok((0, false))` means no complete line is available yet.
    ///
    /// On error nothing is reported as consumed. Lines committed earlier in
    /// the same call stay set.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let mut consumed = 0;

        while consumed < data.len() {
            let rest = &data[consumed..];
            let line_end = match find_crlf(rest) {
                Some(idx) => idx,
                None => return Ok((consumed, false)),
            };

            if line_end == 0 {
                return Ok((consumed + CRLF.len(), true));
            }

            let (name, value) = parse_field_line(&rest[..line_end])?;
            self.set(name, value);

            consumed += line_end + CRLF.len();
        }

        Ok((consumed, false))
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF.as_bytes())
}

/// Splits one `name: value` line. No whitespace is allowed between the name
/// and the colon; both sides are trimmed.
fn parse_field_line(line: &[u8]) -> Result<(&str, &str), HeaderError> {
    let line = line.trim_ascii();
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(HeaderError::InvalidSyntax)?;

    if colon > 0 && matches!(line[colon - 1], b' ' | b'\t') {
        return Err(HeaderError::InvalidSyntax);
    }

    let name = line[..colon].trim_ascii();
    let value = line[colon + 1..].trim_ascii();

    if name.is_empty() || !name.iter().copied().all(is_tchar) {
        return Err(HeaderError::InvalidFieldName);
    }

    // Every tchar is ASCII, so the name is always valid UTF-8.
    let name = std::str::from_utf8(name).map_err(|_| HeaderError::InvalidFieldName)?;
    let value = std::str::from_utf8(value).map_err(|_| HeaderError::InvalidFieldValue)?;

    Ok((name, value))
}

/// `tchar` from RFC 9110: ALPHA / DIGIT / one of ``!#$%&'*+-.^_`|~``
pub fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
