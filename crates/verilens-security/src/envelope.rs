// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// At-rest envelope — AES-256-GCM over captured bytes, serialized as
// `{ "iv", "authTag", "ciphertext" }` with every field base64-encoded.
//
// The data key is fetched from a `KeyProvider` on every call so that keys
// held in a platform keystore or a remote KMS never need to be cached here.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use verilens_core::config::IntegrityConfig;
use verilens_core::error::VerilensError;

/// Serialized envelope produced by [`EnvelopeCipher::seal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedEnvelope {
    pub iv: String,
    pub auth_tag: String,
    pub ciphertext: String,
}

impl SealedEnvelope {
    pub fn to_json(&self) -> Result<String, VerilensError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, VerilensError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Supplies the data-encryption key at call time.
///
/// Implementations may hit a keystore or network service; callers only rely
/// on the call suspending and possibly failing.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn data_key(&self) -> Result<Vec<u8>, VerilensError>;
}

/// A key held in memory, e.g. passed on the command line or in tests.
pub struct StaticKeyProvider {
    key: Vec<u8>,
}

impl StaticKeyProvider {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, VerilensError> {
        let key = hex::decode(hex_key.trim())
            .map_err(|e| VerilensError::Configuration(format!("key is not valid hex: {e}")))?;
        Ok(Self::new(key))
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn data_key(&self) -> Result<Vec<u8>, VerilensError> {
        Ok(self.key.clone())
    }
}

/// AES-256-GCM envelope encryption over a pluggable key source.
pub struct EnvelopeCipher<P> {
    provider: P,
    key_length: usize,
    rng: SystemRandom,
}

impl<P: KeyProvider> EnvelopeCipher<P> {
    /// Create a cipher, validating IV and key lengths from `config`.
    pub fn new(provider: P, config: &IntegrityConfig) -> Result<Self, VerilensError> {
        if config.iv_length != NONCE_LEN {
            return Err(VerilensError::Configuration(format!(
                "AES-GCM IV must be {NONCE_LEN} bytes, configured {}",
                config.iv_length
            )));
        }
        if config.key_length != AES_256_GCM.key_len() {
            return Err(VerilensError::Configuration(format!(
                "AES-256-GCM key must be {} bytes, configured {}",
                AES_256_GCM.key_len(),
                config.key_length
            )));
        }
        Ok(Self {
            provider,
            key_length: config.key_length,
            rng: SystemRandom::new(),
        })
    }

    async fn key(&self) -> Result<LessSafeKey, VerilensError> {
        let bytes = self.provider.data_key().await?;
        if bytes.len() != self.key_length {
            return Err(VerilensError::Configuration(format!(
                "wrong key length: expected {} bytes, got {}",
                self.key_length,
                bytes.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, &bytes)
            .map_err(|_| VerilensError::Configuration("key rejected by AES-256-GCM".into()))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt `plaintext` under a fresh random IV.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub async fn seal(&self, plaintext: &[u8]) -> Result<SealedEnvelope, VerilensError> {
        let key = self.key().await?;

        let mut iv = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| VerilensError::Encryption("IV generation failed".into()))?;

        let mut in_out = plaintext.to_vec();
        let tag = key
            .seal_in_place_separate_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
            .map_err(|_| VerilensError::Encryption("AES-GCM seal failed".into()))?;

        debug!(ciphertext_len = in_out.len(), "envelope sealed");
        Ok(SealedEnvelope {
            iv: STANDARD.encode(iv),
            auth_tag: STANDARD.encode(tag.as_ref()),
            ciphertext: STANDARD.encode(&in_out),
        })
    }

    /// Decrypt an envelope. Fails closed with `VerilensError::Integrity` if
    /// the envelope is malformed or the authentication tag does not verify.
    #[instrument(skip_all, fields(ciphertext_len = envelope.ciphertext.len()))]
    pub async fn open(&self, envelope: &SealedEnvelope) -> Result<Vec<u8>, VerilensError> {
        let iv = decode_field("iv", &envelope.iv)?;
        let tag = decode_field("authTag", &envelope.auth_tag)?;
        let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

        let iv: [u8; NONCE_LEN] = iv.try_into().map_err(|v: Vec<u8>| {
            VerilensError::Integrity(format!("IV must be {NONCE_LEN} bytes, got {}", v.len()))
        })?;
        if tag.len() != AES_256_GCM.tag_len() {
            return Err(VerilensError::Integrity(format!(
                "authentication tag must be {} bytes, got {}",
                AES_256_GCM.tag_len(),
                tag.len()
            )));
        }

        let key = self.key().await?;
        let mut in_out = ciphertext;
        in_out.extend_from_slice(&tag);

        let plaintext = key
            .open_in_place(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
            .map_err(|_| {
                warn!("envelope authentication failed");
                VerilensError::Integrity("authentication tag mismatch".into())
            })?;

        debug!(plaintext_len = plaintext.len(), "envelope opened");
        Ok(plaintext.to_vec())
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, VerilensError> {
    STANDARD
        .decode(value)
        .map_err(|e| VerilensError::Integrity(format!("envelope field '{name}' is not base64: {e}")))
}
