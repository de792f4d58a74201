// totp.rs
// TOTP helpers for login codes and new user secrets.

use anyhow::Result;
use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use totp_rs::{Algorithm, Secret, TOTP};

pub const ISSUER: &str = "SpaceHub";
pub const MIN_SECRET_BYTES: usize = 16; // 128 bits
pub const DEFAULT_SECRET_BYTES: usize = 20;

/// TOTP for `email` with the given Base32 secret. Secrets shorter than 128 bits are rejected.
pub fn build_totp(email: &str, base32_secret: &str) -> Result<TOTP> {
    let secret = Secret::Encoded(base32_secret.to_string()).to_bytes()?;
    if secret.len() < MIN_SECRET_BYTES {
        anyhow::bail!(
            "shared secret too short: {} bytes, need >= {}",
            secret.len(),
            MIN_SECRET_BYTES
        );
    }
    let totp = TOTP::new(
        Algorithm::SHA1,
        6,
        1, // ±1 step of clock drift
        30,
        secret,
        Some(ISSUER.to_string()),
        email.to_string(),
    )?;
    Ok(totp)
}

/// Whether `code` is valid for the secret right now.
pub fn verify_code(email: &str, base32_secret: &str, code: &str) -> Result<bool> {
    let totp = build_totp(email, base32_secret)?;
    Ok(totp.check_current(code.trim())?)
}

/// Random Base32 (no padding) secret of at least `MIN_SECRET_BYTES`.
pub fn generate_base32_secret_n(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(MIN_SECRET_BYTES)];
    rand::rng().fill_bytes(&mut buf);
    BASE32_NOPAD.encode(&buf)
}
