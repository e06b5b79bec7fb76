// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local transaction signing — ECDSA P-256 over payload digests.
//
// Stands in for a device attestation key or a remote signing service. The
// signature covers the ASCII hex digest of the payload, so a verifier only
// needs the digest and the signer's public key.

use chrono::Utc;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair,
    UnparsedPublicKey,
};
use tracing::{debug, instrument};
use verilens_core::error::VerilensError;
use verilens_core::types::{HashAlgorithm, SignedPayload};

use crate::integrity::hash_payload;

/// Identifier recorded in [`SignedPayload::algorithm`].
pub const SIGNATURE_ALGORITHM: &str = "ECDSA_P256_SHA256";

/// An ECDSA P-256 signing identity bound to a signer id and chain id.
pub struct LocalSigner {
    signer_id: String,
    chain_id: String,
    /// PKCS#8 v1 DER-encoded private key.
    pkcs8_der: Vec<u8>,
    /// Uncompressed SEC1 public key (65 bytes).
    public_key: Vec<u8>,
}

impl LocalSigner {
    /// Generate a fresh key pair using the OS CSPRNG.
    #[instrument(skip_all)]
    pub fn generate(
        signer_id: impl Into<String>,
        chain_id: impl Into<String>,
    ) -> Result<Self, VerilensError> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|e| VerilensError::Signing(format!("key generation failed: {e}")))?;
        Self::from_pkcs8(signer_id, chain_id, pkcs8.as_ref())
    }

    /// Load an existing PKCS#8 private key.
    pub fn from_pkcs8(
        signer_id: impl Into<String>,
        chain_id: impl Into<String>,
        pkcs8_der: &[u8],
    ) -> Result<Self, VerilensError> {
        let key_pair = load_key_pair(pkcs8_der)?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        debug!(pubkey_len = public_key.len(), "signing key loaded");
        Ok(Self {
            signer_id: signer_id.into(),
            chain_id: chain_id.into(),
            pkcs8_der: pkcs8_der.to_vec(),
            public_key,
        })
    }

    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    pub fn private_key_pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// Hash `payload` and sign the digest.
    #[instrument(skip_all, fields(payload_len = payload.len(), %algorithm))]
    pub fn sign_payload(
        &self,
        payload: &[u8],
        algorithm: HashAlgorithm,
    ) -> Result<SignedPayload, VerilensError> {
        let payload_hash = hash_payload(payload, algorithm);
        let key_pair = load_key_pair(&self.pkcs8_der)?;
        let signature = key_pair
            .sign(&SystemRandom::new(), payload_hash.as_bytes())
            .map_err(|e| VerilensError::Signing(format!("signing failed: {e}")))?;

        Ok(SignedPayload {
            signer_id: self.signer_id.clone(),
            chain_id: self.chain_id.clone(),
            signature: hex::encode(signature.as_ref()),
            algorithm: SIGNATURE_ALGORITHM.to_owned(),
            payload_hash,
            issued_at: Utc::now(),
        })
    }
}

fn load_key_pair(pkcs8_der: &[u8]) -> Result<EcdsaKeyPair, VerilensError> {
    EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8_der, &SystemRandom::new())
        .map_err(|e| VerilensError::Signing(format!("key load failed: {e}")))
}

/// Verify `signed.signature` over `signed.payload_hash` with `public_key`.
///
/// Any failure (unknown scheme, malformed hex, bad signature) is an
/// integrity error.
pub fn verify_signature(signed: &SignedPayload, public_key: &[u8]) -> Result<(), VerilensError> {
    if signed.algorithm != SIGNATURE_ALGORITHM {
        return Err(VerilensError::Integrity(format!(
            "unsupported signature algorithm: {}",
            signed.algorithm
        )));
    }
    let signature = hex::decode(&signed.signature)
        .map_err(|e| VerilensError::Integrity(format!("signature is not valid hex: {e}")))?;

    UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, public_key)
        .verify(signed.payload_hash.as_bytes(), &signature)
        .map_err(|_| VerilensError::Integrity("signature does not verify".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> LocalSigner {
        LocalSigner::generate("device-001", "verilens-testnet").expect("key generation")
    }

    #[test]
    fn generated_key_shapes() {
        let s = signer();
        // Uncompressed P-256 public key: 1 (0x04) + 32 + 32 = 65 bytes.
        assert_eq!(s.public_key().len(), 65);
        assert_eq!(s.public_key()[0], 0x04);
        assert!(s.private_key_pkcs8_der().len() > 100);
    }

    #[test]
    fn sign_and_verify() {
        let s = signer();
        let signed = s.sign_payload(b"frame", HashAlgorithm::Sha256).unwrap();
        assert_eq!(signed.signer_id, "device-001");
        assert_eq!(signed.chain_id, "verilens-testnet");
        assert_eq!(signed.algorithm, SIGNATURE_ALGORITHM);
        assert_eq!(signed.payload_hash, hash_payload(b"frame", HashAlgorithm::Sha256));
        verify_signature(&signed, s.public_key()).expect("signature verifies");
    }

    #[test]
    fn reloaded_key_keeps_identity() {
        let s = signer();
        let reloaded =
            LocalSigner::from_pkcs8("device-001", "verilens-testnet", s.private_key_pkcs8_der())
                .unwrap();
        assert_eq!(reloaded.public_key(), s.public_key());
    }

    #[test]
    fn tampered_hash_does_not_verify() {
        let s = signer();
        let mut signed = s.sign_payload(b"frame", HashAlgorithm::Sha256).unwrap();
        signed.payload_hash = hash_payload(b"other", HashAlgorithm::Sha256);
        assert!(verify_signature(&signed, s.public_key()).unwrap_err().is_integrity());
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let signed = signer().sign_payload(b"frame", HashAlgorithm::Sha256).unwrap();
        let other = signer();
        assert!(verify_signature(&signed, other.public_key()).is_err());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let s = signer();
        let mut signed = s.sign_payload(b"frame", HashAlgorithm::Sha256).unwrap();
        signed.algorithm = "RSA_PSS".into();
        assert!(verify_signature(&signed, s.public_key()).is_err());
    }
}
