use std::fmt;

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::errors::{DrngError, Result};

pub const SEED_WORDS: usize = 3;
pub const SEED_WORD_SIZE: usize = 8;
pub const SEED_SIZE: usize = SEED_WORDS * SEED_WORD_SIZE;

/// Fixed-size generator seed, three big-endian 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed([u64; SEED_WORDS]);

impl Seed {
    pub fn from_words(words: [u64; SEED_WORDS]) -> Self {
        Self(words)
    }

    pub fn from_bytes(bytes: [u8; SEED_SIZE]) -> Self {
        let mut words = [0u64; SEED_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(SEED_WORD_SIZE)) {
            let mut buf = [0u8; SEED_WORD_SIZE];
            buf.copy_from_slice(chunk);
            *word = u64::from_be_bytes(buf);
        }
        Self(words)
    }

    pub fn words(&self) -> [u64; SEED_WORDS] {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; SEED_SIZE] {
        let mut bytes = [0u8; SEED_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(SEED_WORD_SIZE).zip(self.0) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

/// Expand `entropy` into a [`Seed`] with HKDF-SHA256.
///
/// No salt is used; `info` is the domain separation label. Equal inputs
/// always give equal seeds.
pub fn derive(entropy: &[u8], info: &[u8]) -> Result<Seed> {
    let kdf = Hkdf::<Sha256>::new(None, entropy);

    let mut okm = [0u8; SEED_SIZE];
    kdf.expand(info, &mut okm)
        .map_err(|e| DrngError::Derivation(format!("KDF stream read failed: {}", e)))?;

    let seed = Seed::from_bytes(okm);
    debug!(entropy_len = entropy.len(), %seed, "seed derived");
    Ok(seed)
}

/// Caller-supplied entropy replacing the beacon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOverride {
    /// Raw bytes of a string or passphrase
    Text(String),
    /// Hex-decoded bytes
    Bytes(Vec<u8>),
}

impl SeedOverride {
    /// Pick the override from a string seed and a hex seed.
    ///
    /// An empty string seed counts as unset. Returns `Ok(None)` when neither is
    /// given, so the beacon is used.
    pub fn from_options(seed: Option<&str>, hex_seed: Option<&str>) -> Result<Option<Self>> {
        let seed = seed.filter(|s| !s.is_empty());
        match (seed, hex_seed) {
            (Some(_), Some(_)) => Err(DrngError::Config(
                "seed and hex seed are mutually exclusive options".to_string(),
            )),
            (Some(text), None) => Ok(Some(SeedOverride::Text(text.to_string()))),
            (None, Some(hex_seed)) => {
                let bytes = hex::decode(hex_seed.trim())
                    .map_err(|e| DrngError::InvalidInput(format!("malformed hex seed: {}", e)))?;
                Ok(Some(SeedOverride::Bytes(bytes)))
            }
            (None, None) => Ok(None),
        }
    }

    pub fn entropy(&self) -> &[u8] {
        match self {
            SeedOverride::Text(text) => text.as_bytes(),
            SeedOverride::Bytes(bytes) => bytes,
        }
    }
}
