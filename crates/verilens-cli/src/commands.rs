// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each returns the JSON (or text) it wants
// printed; `main` owns stdout and the process exit code.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::info;
use verilens_core::VerifierConfig;
use verilens_core::config::ConfigLoader;
use verilens_core::error::VerilensError;
use verilens_core::types::{CryptoBinding, HashAlgorithm, ReceiptStatus, Verdict};
use verilens_security::{
    AuditLog, EnvelopeCipher, LocalSigner, MockLedger, SealedEnvelope, StaticKeyProvider,
    hash_bytes, hash_payload,
};
use verilens_verify::{AuthenticityPipeline, VerificationReport};

use crate::request::VerifyRequest;

/// Exit status for a verdict: 0 pass, 1 suspect, 2 fail.
pub fn verdict_exit_code(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Suspect => 1,
        Verdict::Fail => 2,
    }
}

/// Load configuration from an explicit directory/environment, falling back
/// to `VERILENS_CONFIG_DIR` / `VERILENS_ENV`.
pub fn load_config(
    config_dir: Option<PathBuf>,
    environment: Option<String>,
) -> Result<VerifierConfig, VerilensError> {
    let mut loader = match environment {
        Some(env) => ConfigLoader::new(env),
        None => ConfigLoader::from_env(),
    };
    if let Some(dir) = config_dir {
        loader = loader.with_dir(dir);
    }
    loader.load()
}

pub struct VerifyArgs {
    pub request: PathBuf,
    pub image: Option<PathBuf>,
    pub audit_db: Option<PathBuf>,
}

/// Run the pipeline for one request and optionally log the outcome.
pub async fn verify(
    args: VerifyArgs,
    config: &VerifierConfig,
) -> Result<VerificationReport, VerilensError> {
    let mut request = VerifyRequest::from_path(&args.request)?;
    let image_path = args.image.or_else(|| request.image.take()).ok_or_else(|| {
        VerilensError::Validation("no image given: pass --image or set \"image\" in the request".into())
    })?;
    let image = tokio::fs::read(&image_path).await?;
    let image_hash = hash_bytes(&image);

    let pipeline = AuthenticityPipeline::new(config.clone())?;
    let input = request.into_input(image);
    let report = pipeline.verify(&input).await?;

    if let Some(db) = args.audit_db {
        let details = serde_json::to_string(report.result.stage_results())?;
        AuditLog::open(&db)?.record(
            report.result.run_id(),
            &image_hash,
            report.verdict,
            report.result.success(),
            Some(&details),
        )?;
        info!(db = %db.display(), "verification recorded in audit log");
    }
    Ok(report)
}

/// `<digest>  <path>`, as printed by coreutils' sha*sum.
pub async fn hash(path: &Path, algorithm: HashAlgorithm) -> Result<String, VerilensError> {
    let data = tokio::fs::read(path).await?;
    Ok(format!("{}  {}", hash_payload(&data, algorithm), path.display()))
}

pub async fn seal(
    input: &Path,
    output: &Path,
    key_hex: &str,
    config: &VerifierConfig,
) -> Result<(), VerilensError> {
    let cipher = EnvelopeCipher::new(StaticKeyProvider::from_hex(key_hex)?, &config.integrity)?;
    let plaintext = tokio::fs::read(input).await?;
    let envelope = cipher.seal(&plaintext).await?;
    tokio::fs::write(output, envelope.to_json()?).await?;
    info!(input = %input.display(), output = %output.display(), "envelope sealed");
    Ok(())
}

pub async fn open(
    input: &Path,
    output: &Path,
    key_hex: &str,
    config: &VerifierConfig,
) -> Result<(), VerilensError> {
    let cipher = EnvelopeCipher::new(StaticKeyProvider::from_hex(key_hex)?, &config.integrity)?;
    let envelope = SealedEnvelope::from_json(&tokio::fs::read_to_string(input).await?)?;
    let plaintext = cipher.open(&envelope).await?;
    tokio::fs::write(output, plaintext).await?;
    info!(input = %input.display(), output = %output.display(), "envelope opened");
    Ok(())
}

/// Sign a capture with a fresh device key and anchor it on the local ledger.
///
/// Prints the binding a later `verify` request can carry, plus the receipt.
pub async fn sign(
    path: &Path,
    signer_id: &str,
    chain_id: &str,
    algorithm: HashAlgorithm,
) -> Result<Value, VerilensError> {
    let data = tokio::fs::read(path).await?;
    let signer = LocalSigner::generate(signer_id, chain_id)?;
    let signed = signer.sign_payload(&data, algorithm)?;

    let ledger = MockLedger::new(chain_id);
    let mut receipt = ledger.submit(&signed, signer.public_key())?;
    if receipt.status == ReceiptStatus::Pending {
        receipt = ledger.confirm(&receipt.tx_hash)?;
    }

    let binding = CryptoBinding {
        expected_digest: signed.payload_hash.clone(),
        algorithm: Some(algorithm),
        signed_payload: Some(signed),
        public_key: Some(signer.public_key_hex()),
    };
    Ok(json!({ "binding": binding, "receipt": receipt }))
}

pub fn audit(db: &Path, image_hash: Option<&str>, limit: u32) -> Result<Value, VerilensError> {
    let log = AuditLog::open(db)?;
    let entries = match image_hash {
        Some(hash) => log.entries_for_hash(hash)?,
        None => log.recent_entries(limit)?,
    };
    Ok(serde_json::to_value(entries)?)
}
