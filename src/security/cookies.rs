//! Permissive cookie decoding.
//!
//! The raw `Cookie` header bytes are split by hand rather than through a
//! strict cookie parser: values containing characters some parsers reject
//! (unquoted commas, spaces, non-UTF-8 bytes) must still reach the session
//! verifier.
//!
//! # Rules
//! - Pairs are separated by `;`, surrounding whitespace is trimmed
//! - The name ends at the first `=`; a pair without `=` is skipped
//! - Empty names are skipped
//! - Surrounding double quotes around a value are removed
//! - Invalid UTF-8 is replaced lossily
//! - When a name repeats, the last occurrence wins
//! - Multiple `Cookie` headers are read in order

use axum::http::{header, HeaderMap};
use std::collections::HashMap;

/// Decoded request cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    values: HashMap<String, String>,
}

impl Cookies {
    /// Decode every `Cookie` header in `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::default();
        for value in headers.get_all(header::COOKIE) {
            cookies.extend_from_raw(value.as_bytes());
        }
        cookies
    }

    /// Decode one raw header value.
    pub fn parse(raw: &[u8]) -> Self {
        let mut cookies = Self::default();
        cookies.extend_from_raw(raw);
        cookies
    }

    fn extend_from_raw(&mut self, raw: &[u8]) {
        for pair in raw.split(|b| *b == b';') {
            let Some(eq) = pair.iter().position(|b| *b == b'=') else {
                continue;
            };
            let name = String::from_utf8_lossy(&pair[..eq]).trim().to_string();
            if name.is_empty() {
                continue;
            }
            let value = String::from_utf8_lossy(&pair[eq + 1..]).trim().to_string();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .map(str::to_string)
                .unwrap_or(value);
            self.values.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
