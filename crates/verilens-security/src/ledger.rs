// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process ledger used to anchor signed payloads.
//
// Submissions are checked against the signer's public key and the ledger's
// chain id. Valid submissions start `pending` and become `confirmed` with a
// monotonically increasing block number; invalid ones are recorded `failed`.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, warn};
use verilens_core::error::VerilensError;
use verilens_core::types::{ReceiptStatus, SignedPayload, TransactionReceipt};

use crate::integrity::hash_bytes;
use crate::signing::verify_signature;

struct LedgerState {
    next_block: u64,
    receipts: HashMap<String, TransactionReceipt>,
}

/// A single-chain, in-memory ledger.
pub struct MockLedger {
    chain_id: String,
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            state: Mutex::new(LedgerState {
                next_block: 1,
                receipts: HashMap::new(),
            }),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, VerilensError> {
        self.state
            .lock()
            .map_err(|_| VerilensError::Signing("ledger state lock poisoned".into()))
    }

    /// Submit a signed payload. Resubmitting the same payload returns the
    /// existing receipt.
    pub fn submit(
        &self,
        signed: &SignedPayload,
        public_key: &[u8],
    ) -> Result<TransactionReceipt, VerilensError> {
        let tx_hash = transaction_hash(signed);
        let mut state = self.state()?;
        if let Some(existing) = state.receipts.get(&tx_hash) {
            return Ok(existing.clone());
        }

        let status = if signed.chain_id != self.chain_id {
            warn!(chain = %signed.chain_id, expected = %self.chain_id, "payload signed for another chain");
            ReceiptStatus::Failed
        } else if let Err(e) = verify_signature(signed, public_key) {
            warn!(error = %e, "rejecting submission");
            ReceiptStatus::Failed
        } else {
            ReceiptStatus::Pending
        };

        let receipt = TransactionReceipt {
            tx_hash: tx_hash.clone(),
            chain_id: self.chain_id.clone(),
            status,
            block_number: None,
        };
        info!(%tx_hash, ?status, "payload submitted");
        state.receipts.insert(tx_hash, receipt.clone());
        Ok(receipt)
    }

    /// Include a pending transaction in the next block.
    ///
    /// Confirmed and failed receipts are returned unchanged.
    pub fn confirm(&self, tx_hash: &str) -> Result<TransactionReceipt, VerilensError> {
        let mut state = self.state()?;
        let block = state.next_block;
        let receipt = state
            .receipts
            .get_mut(tx_hash)
            .ok_or_else(|| VerilensError::Validation(format!("unknown transaction: {tx_hash}")))?;

        if receipt.status == ReceiptStatus::Pending {
            receipt.status = ReceiptStatus::Confirmed;
            receipt.block_number = Some(block);
            let confirmed = receipt.clone();
            state.next_block += 1;
            info!(%tx_hash, block, "transaction confirmed");
            return Ok(confirmed);
        }
        Ok(receipt.clone())
    }

    pub fn receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, VerilensError> {
        Ok(self.state()?.receipts.get(tx_hash).cloned())
    }
}

fn transaction_hash(signed: &SignedPayload) -> String {
    let preimage = format!(
        "{}|{}|{}|{}",
        signed.signer_id, signed.chain_id, signed.payload_hash, signed.signature
    );
    format!("0x{}", hash_bytes(preimage.as_bytes()))
}
