//! Acceptable HTTP status codes.

use std::collections::BTreeSet;
use std::fmt;

use reqwest::StatusCode;

/// Non-empty set of status codes a check accepts.
///
/// Backends of different versions answer the same request with different
/// codes (InfluxDB 0.11 rejects a non-admin with 401, 1.1 with 403), so a
/// check may accept more than one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedStatus(BTreeSet<u16>);

impl ExpectedStatus {
    pub fn one(code: u16) -> Self {
        Self(BTreeSet::from([code]))
    }

    /// Also accept `code`.
    pub fn or(mut self, code: u16) -> Self {
        self.0.insert(code);
        self
    }

    pub fn ok() -> Self {
        Self::one(200)
    }

    pub fn no_content() -> Self {
        Self::one(204)
    }

    pub fn unauthorized() -> Self {
        Self::one(401)
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status.as_u16())
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            if let Some(code) = self.0.first() {
                return write!(f, "{code}");
            }
        }
        let codes: Vec<String> = self.0.iter().map(u16::to_string).collect();
        write!(f, "one of {}", codes.join(", "))
    }
}
