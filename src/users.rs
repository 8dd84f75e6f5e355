//! Password hashing helpers shared by the identity store and the CLI.

use argon2::{
    Argon2,
    password_hash::{Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
                    rand_core::OsRng},
};

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
/// Returns any error produced by the Argon2 hasher.
pub fn hash_password(argon2: &Argon2, pw: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
}

/// Check a plaintext password against a stored hash.
///
/// An unparsable stored hash counts as a failed verification rather than
/// a panic; corrupt rows must not take the process down.
#[must_use]
pub fn verify_password(hash: &str, pw: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pw.as_bytes(), &parsed_hash)
        .is_ok()
}
