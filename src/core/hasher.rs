use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;

use crate::config::StoreConfig;
use crate::core::errors::{StoreError, StoreResult};

/// Digests written by the older front-end (`$2a$`, `$2b$`, `$2y$`).
fn is_bcrypt(digest: &str) -> bool {
    digest.starts_with("$2")
}

/// Salted Argon2id password hashing at a fixed work factor. Bcrypt digests
/// are still accepted by [`verify`](CredentialHasher::verify).
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(iterations: u32, memory_kib: u32) -> StoreResult<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| StoreError::Hashing(format!("Invalid work factor: {}", e)))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::new(config.hash_iterations, config.hash_memory_kib)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// PHC-format digest of `plaintext`.
    pub fn hash(&self, plaintext: &str) -> StoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Hashing(format!("Failed to hash password: {}", e)))
    }

    /// `Ok(false)` only on a genuine mismatch; unreadable digests are errors.
    pub fn verify(&self, plaintext: &str, digest: &str) -> StoreResult<bool> {
        if is_bcrypt(digest) {
            return bcrypt::verify(plaintext, digest)
                .map_err(|e| StoreError::Hashing(format!("Malformed bcrypt digest: {}", e)));
        }

        let parsed = PasswordHash::new(digest)
            .map_err(|e| StoreError::Hashing(format!("Malformed password digest: {}", e)))?;

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StoreError::Hashing(format!("Failed to verify password: {}", e))),
        }
    }

    /// True for digests that should be replaced by an Argon2id one.
    pub fn needs_rehash(&self, digest: &str) -> bool {
        is_bcrypt(digest)
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, plaintext: &str) -> StoreResult<String> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| StoreError::Hashing(format!("Hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, plaintext: &str, digest: &str) -> StoreResult<bool> {
        let hasher = self.clone();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| StoreError::Hashing(format!("Verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> CredentialHasher {
        CredentialHasher::new(1, 1024).unwrap()
    }

    #[test]
    fn hashes_are_salted_and_verify() {
        let hasher = cheap();
        let a = hasher.hash("hunter2").unwrap();
        let b = hasher.hash("hunter2").unwrap();

        assert_ne!(a, b);
        assert_ne!(a, "hunter2");
        assert!(a.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2", &a).unwrap());
        assert!(hasher.verify("hunter2", &b).unwrap());
        assert!(!hasher.verify("hunter3", &a).unwrap());
    }

    #[test]
    fn digests_carry_their_own_parameters() {
        let digest = cheap().hash("pw").unwrap();
        let other = CredentialHasher::new(3, 2048).unwrap();
        assert!(other.verify("pw", &digest).unwrap());
    }

    #[test]
    fn malformed_digest_is_an_error_not_a_mismatch() {
        let err = cheap().verify("pw", "plaintext-password").unwrap_err();
        assert_eq!(err.code(), "HASHING_ERROR");
    }

    #[test]
    fn verifies_bcrypt_digests() {
        let hasher = cheap();
        // crypt_blowfish reference vector
        let reference = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
        assert!(hasher.verify("U*U", reference).unwrap());
        assert!(!hasher.verify("U*V", reference).unwrap());

        let digest = bcrypt::hash("hunter2", 4).unwrap();
        assert!(hasher.verify("hunter2", &digest).unwrap());
        assert!(!hasher.verify("hunter3", &digest).unwrap());
        assert!(hasher.needs_rehash(&digest));
        assert!(!hasher.needs_rehash(&hasher.hash("hunter2").unwrap()));
    }

    #[test]
    fn truncated_bcrypt_digest_is_an_error() {
        let err = cheap().verify("pw", "$2a$10$tooshort").unwrap_err();
        assert_eq!(err.code(), "HASHING_ERROR");
    }

    #[test]
    fn rejects_impossible_work_factor() {
        assert!(CredentialHasher::new(0, 1024).is_err());
    }

    #[tokio::test]
    async fn blocking_variants_match() {
        let hasher = cheap();
        let digest = hasher.hash_blocking("pw").await.unwrap();
        assert!(hasher.verify_blocking("pw", &digest).await.unwrap());
        assert!(!hasher.verify_blocking("nope", &digest).await.unwrap());
    }
}
