use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::{ApiKeyId, BrandId};
use crate::config::DEFAULT_API_KEY_TAG;

const KEY_ENTROPY_BYTES: usize = 32;
const DISPLAY_PREFIX_LEN: usize = 12;
const SHA256_HEX_LEN: usize = 64;

/// Source of cryptographically secure random bytes.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyIssueError>;
}

/// Digest used to store keys at rest.
pub trait KeyHasher: Send + Sync {
    fn hex_digest(&self, input: &str) -> Result<String, KeyIssueError>;
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), KeyIssueError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|err| KeyIssueError::RandomUnavailable(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl KeyHasher for Sha256Hasher {
    fn hex_digest(&self, input: &str) -> Result<String, KeyIssueError> {
        Ok(hex::encode(Sha256::digest(input.as_bytes())))
    }
}

/// Issuance failure. Nothing from a failed attempt may be stored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyIssueError {
    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),
    #[error("key hashing failed: {0}")]
    Hashing(String),
}

/// Freshly minted key. The plaintext is only reachable through `full_key` and is redacted from
/// `Debug` output.
#[derive(Debug)]
pub struct KeyMaterial {
    pub full_key: SecretString,
    pub prefix: String,
    pub hash: String,
}

/// Persisted key row: display prefix and digest only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: ApiKeyId,
    pub name: String,
    pub brand_id: BrandId,
    pub key_prefix: String,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    pub fn new(
        id: ApiKeyId,
        name: impl Into<String>,
        brand_id: BrandId,
        material: &KeyMaterial,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            brand_id,
            key_prefix: material.prefix.clone(),
            key_hash: material.hash.clone(),
            created_at,
            last_used_at: None,
            revoked_at: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Mark the key revoked. The first revocation timestamp is kept; returns whether this call
    /// changed anything.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        self.revoked_at = Some(now);
        true
    }
}

/// Mints and verifies API keys of the form `<tag><64 hex chars>`.
#[derive(Debug, Clone)]
pub struct ApiKeyIssuer<R = OsSecureRandom, H = Sha256Hasher> {
    tag: String,
    random: R,
    hasher: H,
}

impl Default for ApiKeyIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_TAG)
    }
}

impl ApiKeyIssuer {
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_capabilities(tag, OsSecureRandom, Sha256Hasher)
    }
}

impl<R, H> ApiKeyIssuer<R, H>
where
    R: SecureRandom,
    H: KeyHasher,
{
    pub fn with_capabilities(tag: impl Into<String>, random: R, hasher: H) -> Self {
        Self {
            tag: tag.into(),
            random,
            hasher,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn issue(&self) -> Result<KeyMaterial, KeyIssueError> {
        let mut entropy = [0u8; KEY_ENTROPY_BYTES];
        self.random.fill(&mut entropy)?;

        let full_key = format!("{}{}", self.tag, hex::encode(entropy));
        let hash = self.digest(&full_key)?;
        let prefix = full_key.chars().take(DISPLAY_PREFIX_LEN).collect();

        Ok(KeyMaterial {
            full_key: SecretString::from(full_key),
            prefix,
            hash,
        })
    }

    /// Find the live key of `brand_id` whose digest matches the presented plaintext.
    pub fn verify<'a>(
        &self,
        presented: &str,
        records: &'a [ApiKeyRecord],
        brand_id: &BrandId,
    ) -> Option<&'a ApiKeyRecord> {
        let presented = presented.trim();
        if presented.is_empty() {
            return None;
        }

        let digest = self.digest(presented).ok()?;
        records.iter().find(|record| {
            record.is_valid() && &record.brand_id == brand_id && record.key_hash == digest
        })
    }

    fn digest(&self, input: &str) -> Result<String, KeyIssueError> {
        let hash = self.hasher.hex_digest(input)?;
        if hash.len() != SHA256_HEX_LEN || !hash.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(KeyIssueError::Hashing(format!(
                "expected {SHA256_HEX_LEN} hex characters, got {}",
                hash.len()
            )));
        }
        Ok(hash.to_ascii_lowercase())
    }
}

/// Extract the key from an `Authorization: Bearer <key>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
pub(crate) fn reveal(material: &KeyMaterial) -> &str {
    use secrecy::ExposeSecret;
    material.full_key.expose_secret()
}
