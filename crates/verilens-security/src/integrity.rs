// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload integrity — SHA-2 digests for tamper detection.

use sha2::{Digest, Sha256, Sha384, Sha512};
use verilens_core::error::VerilensError;
use verilens_core::types::HashAlgorithm;

/// Compute the digest of `data` with `algorithm`, as a lowercase hex string.
pub fn hash_payload(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha384 => hex::encode(Sha384::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// SHA-256 shorthand, used for audit keys and ledger transaction hashes.
pub fn hash_bytes(data: &[u8]) -> String {
    hash_payload(data, HashAlgorithm::Sha256)
}

/// Verify that `data` matches the expected hex digest.
///
/// Hex case is ignored. Returns `Err(VerilensError::IntegrityMismatch)` with
/// the expected and actual values when the digest differs.
pub fn verify_hash(
    data: &[u8],
    expected_hex: &str,
    algorithm: HashAlgorithm,
) -> Result<(), VerilensError> {
    let actual = hash_payload(data, algorithm);
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        Ok(())
    } else {
        Err(VerilensError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256("test"), regression vector for the default algorithm.
    const TEST_SHA256: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn hash_known_value() {
        assert_eq!(hash_payload(b"test", HashAlgorithm::default()), TEST_SHA256);
        assert_eq!(hash_bytes(b"test"), TEST_SHA256);
    }

    #[test]
    fn hash_empty_input_per_algorithm() {
        assert_eq!(
            hash_payload(b"", HashAlgorithm::Sha256),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_payload(b"", HashAlgorithm::Sha384),
            "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b"
        );
        assert_eq!(
            hash_payload(b"", HashAlgorithm::Sha512),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn hashing_is_deterministic() {
        let data = b"captured frame bytes";
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let a = hash_payload(data, alg);
            assert_eq!(a, hash_payload(data, alg));
            assert_eq!(a.len(), alg.digest_len() * 2);
        }
    }

    #[test]
    fn verify_matching_hash_ignores_case() {
        let data = b"verilens";
        let hex = hash_payload(data, HashAlgorithm::Sha256).to_ascii_uppercase();
        assert!(verify_hash(data, &hex, HashAlgorithm::Sha256).is_ok());
    }

    #[test]
    fn verify_mismatched_hash() {
        let result = verify_hash(b"a", "0000", HashAlgorithm::Sha256);
        match result.unwrap_err() {
            VerilensError::IntegrityMismatch { expected, actual } => {
                assert_eq!(expected, "0000");
                assert_eq!(actual, hash_bytes(b"a"));
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn verify_rejects_wrong_algorithm() {
        let digest = hash_payload(b"frame", HashAlgorithm::Sha512);
        assert!(verify_hash(b"frame", &digest, HashAlgorithm::Sha256).is_err());
    }
}
