//! Bearer token hashing and validation against configured credentials.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use catalog_types::{AuthError, TokenValidator};

/// Hashes a token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

/// Verifies a token against a stored hash using constant-time comparison.
pub fn verify_token(input: &str, stored_hash: &str) -> bool {
    let input_hash = hash_token(input);
    input_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Validates bearer tokens against a fixed set issued out of band.
///
/// Only SHA-256 digests are kept in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    hashes: Vec<String>,
}

impl StaticTokenValidator {
    /// Blank entries are ignored.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hashes = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|t| hash_token(&t))
            .collect();

        Self { hashes }
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<bool, AuthError> {
        // Compare against every stored hash so timing does not reveal which matched.
        let matched = self
            .hashes
            .iter()
            .fold(false, |found, hash| verify_token(token, hash) | found);
        Ok(matched)
    }
}
