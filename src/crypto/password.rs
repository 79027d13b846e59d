use std::fmt;
use std::str::FromStr;

use argon2::Argon2;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::AppError;

const SALT_ALPHABET: &[u8] =
    b"abcdefghijkmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ123456780!@#$%^&*()~`_-+={}[]|\\:\";'<>,.?/";

const ARGON2_PREFIX: &str = "argon2id$";

/// Which construction new password hashes are written with.
///
/// Verification never consults this: the stored value tells which scheme produced it,
/// so switching to `Argon2` leaves existing `Legacy` rows valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    /// `sha256(salt[..n/2] + password + salt[n/2..])`, hex encoded.
    #[default]
    Legacy,
    /// Argon2id over the same salt, stored as `argon2id$<hex>`.
    Argon2,
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(PasswordScheme::Legacy),
            "argon2" => Ok(PasswordScheme::Argon2),
            other => Err(format!("unknown password scheme '{}'", other)),
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordScheme::Legacy => f.write_str("legacy"),
            PasswordScheme::Argon2 => f.write_str("argon2"),
        }
    }
}

/// Generate a fresh salt: 32 characters plus 1 to 32 more, from a wide printable alphabet
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    let len = 32 + rng.gen_range(1..=32);
    (0..len)
        .map(|_| SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())] as char)
        .collect()
}

/// Insert the password between the two halves of the salt
pub fn apply_salt(password: &str, salt: &str) -> String {
    let mid = salt.chars().count() / 2;
    let split = salt
        .char_indices()
        .nth(mid)
        .map(|(i, _)| i)
        .unwrap_or(salt.len());
    let (head, tail) = salt.split_at(split);

    let mut salted = String::with_capacity(salt.len() + password.len());
    salted.push_str(head);
    salted.push_str(password);
    salted.push_str(tail);
    salted
}

pub fn legacy_hash(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(apply_salt(password, salt).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn argon2_hash(password: &str, salt: &str) -> Result<String, AppError> {
    let argon2 = Argon2::default();
    let mut hash = [0u8; 32];

    argon2
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut hash)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(format!("{}{}", ARGON2_PREFIX, hex::encode(hash)))
}

/// Hash a password with the given scheme and salt
pub fn hash_password(scheme: PasswordScheme, password: &str, salt: &str) -> Result<String, AppError> {
    match scheme {
        PasswordScheme::Legacy => Ok(legacy_hash(password, salt)),
        PasswordScheme::Argon2 => argon2_hash(password, salt),
    }
}

/// Verify a password against a stored hash and salt
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> Result<bool, AppError> {
    let computed = if stored_hash.starts_with(ARGON2_PREFIX) {
        argon2_hash(password, salt)?
    } else {
        legacy_hash(password, salt)
    };
    Ok(computed == stored_hash)
}
