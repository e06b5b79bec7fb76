// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON verification request read by `verilens verify`.
//
// {
//   "image": "capture.jpg",            // relative to the request file
//   "expectedDevice": "Veri Lens One",
//   "metadata": { "deviceMake": "Veri", "iso": 100, ... },
//   "depthFrame": { "width": 2, "height": 2, "values": [10, 20, 30, 40] },
//   "binding": { "expectedDigest": "9f86...", "algorithm": "sha256" }
// }

use std::path::{Path, PathBuf};

use serde::Deserialize;
use verilens_core::error::VerilensError;
use verilens_core::types::{CryptoBinding, DepthFrame, MetadataSummary, VerificationInput};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyRequest {
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub expected_device: Option<String>,
    #[serde(default)]
    pub metadata: Option<MetadataSummary>,
    #[serde(default)]
    pub depth_frame: Option<DepthFrame>,
    #[serde(default)]
    pub binding: Option<CryptoBinding>,
}

impl VerifyRequest {
    /// Read a request file; a relative `image` is resolved against the
    /// file's directory.
    pub fn from_path(path: &Path) -> Result<Self, VerilensError> {
        let data = std::fs::read_to_string(path)?;
        let mut request: Self = serde_json::from_str(&data)
            .map_err(|e| VerilensError::Validation(format!("{}: {e}", path.display())))?;
        if let Some(image) = request.image.take() {
            request.image = Some(match path.parent() {
                Some(dir) if image.is_relative() => dir.join(image),
                _ => image,
            });
        }
        Ok(request)
    }

    pub fn into_input(self, image: Vec<u8>) -> VerificationInput {
        let mut input = VerificationInput::new(image);
        if let Some(device) = self.expected_device {
            input = input.with_expected_device(device);
        }
        if let Some(metadata) = self.metadata {
            input = input.with_metadata_hints(metadata);
        }
        if let Some(frame) = self.depth_frame {
            input = input.with_depth_frame(frame);
        }
        if let Some(binding) = self.binding {
            input = input.with_binding(binding);
        }
        input
    }
}
