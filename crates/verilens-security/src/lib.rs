// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// verilens-security — Cryptographic collaborators for capture verification.
//
// Payload digests for integrity binding, AES-256-GCM envelopes for captured
// bytes at rest, a local ECDSA signer with an in-process ledger, and the
// SQLite audit trail of verification runs.

pub mod audit;
pub mod envelope;
pub mod integrity;
pub mod ledger;
pub mod signing;

pub use audit::{AuditEntry, AuditLog};
pub use envelope::{EnvelopeCipher, KeyProvider, SealedEnvelope, StaticKeyProvider};
pub use integrity::{hash_bytes, hash_payload, verify_hash};
pub use ledger::MockLedger;
pub use signing::{LocalSigner, SIGNATURE_ALGORITHM, verify_signature};
