// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image inspection — identify the container format and read dimensions from
// the header without decoding pixel data.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use verilens_core::error::VerilensError;

/// What the container header says about a captured image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// MIME type of the detected container, e.g. `image/jpeg`.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
}

/// Sniff the container and read its dimensions.
///
/// Fails with `VerilensError::Extraction` when the bytes are not a
/// recognisable image or the header is truncated.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn inspect_image(data: &[u8]) -> Result<ImageInfo, VerilensError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| VerilensError::Extraction(format!("failed to read image header: {e}")))?;

    let format: ImageFormat = reader
        .format()
        .ok_or_else(|| VerilensError::Extraction("unrecognised image container".into()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| VerilensError::Extraction(format!("failed to read dimensions: {e}")))?;

    debug!(width, height, format = ?format, "image header inspected");
    Ok(ImageInfo {
        mime_type: format.to_mime_type().to_owned(),
        width,
        height,
        byte_len: data.len(),
    })
}
