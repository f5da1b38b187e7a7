//! One-way hashing for session join passwords.
//!
//! PBKDF2-HMAC-SHA256 with a random per-password salt. The iteration
//! count travels with the hash so it can be raised without breaking
//! existing sessions.

use std::fmt;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tandem_common::SyncError;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    iterations: u32,
    salt: String,
    hash: String,
}

impl PasswordHash {
    pub fn new(password: &str, iterations: u32) -> Result<Self, SyncError> {
        if password.is_empty() {
            return Err(SyncError::Validation("password must not be empty".into()));
        }
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = derive(password, &salt, iterations)?;
        Ok(Self {
            iterations,
            salt: B64.encode(salt),
            hash: B64.encode(key),
        })
    }

    pub fn verify(&self, candidate: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (B64.decode(&self.salt), B64.decode(&self.hash)) else {
            return false;
        };
        match derive(candidate, &salt, self.iterations) {
            Ok(key) => constant_time_eq(&key, &expected),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("iterations", &self.iterations)
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN], SyncError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key)
        .map_err(|e| SyncError::Validation(format!("password derivation failed: {e}")))?;
    Ok(key)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
