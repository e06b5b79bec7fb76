// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture metadata extraction and merging.
//
// Extraction confirms the bytes are a real image container and records what
// the header says. Camera fields (make, model, exposure, location) are not
// parsed out of EXIF here; they arrive as caller hints and are merged on top.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use verilens_core::error::VerilensError;
use verilens_core::types::MetadataSummary;

use crate::image::{ImageInfo, inspect_image};

/// Output of a metadata extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub image: ImageInfo,
    pub summary: MetadataSummary,
}

/// Source of capture metadata for an image.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<ExtractedMetadata, VerilensError>;
}

/// Extractor that inspects the image container only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerExtractor;

impl MetadataExtractor for ContainerExtractor {
    fn extract(&self, image: &[u8]) -> Result<ExtractedMetadata, VerilensError> {
        extract_metadata(image)
    }
}

/// Inspect `image` and return its (possibly sparse) metadata.
#[instrument(skip_all, fields(image_len = image.len()))]
pub fn extract_metadata(image: &[u8]) -> Result<ExtractedMetadata, VerilensError> {
    let info = inspect_image(image)?;
    Ok(ExtractedMetadata {
        image: info,
        summary: MetadataSummary::default(),
    })
}

/// Overlay `overrides` on `base`: every field set in `overrides` wins.
pub fn merge_metadata(base: &MetadataSummary, overrides: &MetadataSummary) -> MetadataSummary {
    MetadataSummary {
        device_make: overrides.device_make.clone().or_else(|| base.device_make.clone()),
        device_model: overrides
            .device_model
            .clone()
            .or_else(|| base.device_model.clone()),
        iso: overrides.iso.or(base.iso),
        exposure_time: overrides.exposure_time.or(base.exposure_time),
        f_number: overrides.f_number.or(base.f_number),
        timestamp: overrides.timestamp.clone().or_else(|| base.timestamp.clone()),
        latitude: overrides.latitude.or(base.latitude),
        longitude: overrides.longitude.or(base.longitude),
    }
}
