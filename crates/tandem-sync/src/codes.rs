//! Human-shareable codes: 4-digit session codes and 9-character device codes.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tandem_common::SyncError;

pub const SESSION_CODE_LEN: usize = 4;
pub const DEVICE_CODE_LEN: usize = 9;

const DEVICE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces candidate codes. Registries retry it on collision.
pub type CodeSource<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Four decimal digits, unique among active sessions only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    pub fn generate() -> Self {
        let n: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(n.to_string())
    }

    /// Validate user input. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let code = input.trim();
        if code.len() != SESSION_CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(SyncError::Validation(format!(
                "session code must be {SESSION_CODE_LEN} digits, got '{code}'"
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionCode {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nine uppercase alphanumerics, unique among active device links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceCode(String);

impl DeviceCode {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..DEVICE_CODE_LEN)
            .map(|_| DEVICE_CODE_ALPHABET[rng.gen_range(0..DEVICE_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Validate user input. Lowercase letters are accepted and uppercased,
    /// since codes are often typed by hand.
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != DEVICE_CODE_LEN || !code.bytes().all(|b| DEVICE_CODE_ALPHABET.contains(&b))
        {
            return Err(SyncError::Validation(format!(
                "device code must be {DEVICE_CODE_LEN} alphanumeric characters, got '{}'",
                input.trim()
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceCode {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceCode> for String {
    fn from(code: DeviceCode) -> Self {
        code.0
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
