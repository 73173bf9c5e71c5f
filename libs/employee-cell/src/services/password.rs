use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use tracing::{debug, instrument, warn};

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    /// Stored values without a PHC prefix are legacy plaintext rows.
    pub fn is_hashed(stored: &str) -> bool {
        stored.starts_with("$argon2")
    }

    #[instrument(skip(password, stored))]
    pub fn verify_password(password: &str, stored: &str) -> Result<bool, argon2::password_hash::Error> {
        if !Self::is_hashed(stored) {
            warn!("Verifying against a plaintext password row");
            return Ok(!stored.is_empty() && password == stored);
        }

        let parsed_hash = PasswordHash::new(stored)?;
        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
