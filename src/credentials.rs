//! API-key resolution from environment settings.
//!
//! The settings collaborator stores one record per named environment with the
//! key obfuscated at rest. Resolution walks the environments in fixed
//! priority order (dev, qa, prod), takes the first record whose domain
//! matches the current hostname, and opens and trims its key. No match means
//! the helper is disabled for the page: both pipelines report zero items
//! instead of failing.

use crate::util::normalize_domain;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    #[serde(default)]
    pub domain: String,
    /// Sealed with [`KeyCipher::seal`].
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    #[serde(default)]
    pub dev: Option<EnvironmentRecord>,
    #[serde(default)]
    pub qa: Option<EnvironmentRecord>,
    #[serde(default)]
    pub prod: Option<EnvironmentRecord>,
}

impl EnvironmentSettings {
    fn in_priority_order(&self) -> [&Option<EnvironmentRecord>; 3] {
        [&self.dev, &self.qa, &self.prod]
    }
}

/// Symmetric obfuscation for keys at rest: a SHA-256-derived XOR keystream,
/// base64-armored. Matches the strength class of the original storage (a
/// cipher key embedded next to the code that reads it); this is not a secrecy
/// boundary.
#[derive(Debug, Clone)]
pub struct KeyCipher {
    passphrase: String,
}

impl KeyCipher {
    pub fn new(passphrase: &str) -> Self {
        Self {
            passphrase: passphrase.to_string(),
        }
    }

    pub fn seal(&self, plain: &str) -> String {
        BASE64.encode(self.xor(plain.as_bytes()))
    }

    /// Inverse of [`seal`](Self::seal). Garbage input opens to the empty
    /// string rather than an error.
    pub fn open(&self, sealed: &str) -> String {
        let Ok(bytes) = BASE64.decode(sealed) else {
            return String::new();
        };
        String::from_utf8(self.xor(&bytes)).unwrap_or_default()
    }

    fn xor(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        let mut block = 0u64;
        let mut stream = self.keystream_block(block);
        for (i, byte) in data.iter().enumerate() {
            let offset = i % stream.len();
            if i > 0 && offset == 0 {
                block += 1;
                stream = self.keystream_block(block);
            }
            out.push(byte ^ stream[offset]);
        }
        out
    }

    fn keystream_block(&self, block: u64) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.passphrase.as_bytes());
        hasher.update(block.to_le_bytes());
        hasher.finalize().to_vec()
    }
}

/// Resolve the API key for `hostname`: first matching environment in priority
/// order, opened and trimmed. An empty configured domain matches any host.
pub fn resolve_api_key(
    settings: &EnvironmentSettings,
    hostname: &str,
    cipher: &KeyCipher,
) -> Option<String> {
    let host = hostname.to_lowercase();
    for record in settings.in_priority_order().into_iter().flatten() {
        if record.api_key.is_empty() {
            continue;
        }
        let domain_matches =
            record.domain.is_empty() || normalize_domain(&record.domain) == host;
        if !domain_matches {
            continue;
        }
        let key = cipher.open(&record.api_key);
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    None
}
