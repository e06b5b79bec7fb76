// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// verilens-capture — Capture-side collaborators for the verification pipeline.
//
// Provides image container inspection (format, dimensions) and the metadata
// extraction/merge contract consumed by the metadata stage.

pub mod image;
pub mod metadata;

pub use self::image::{ImageInfo, inspect_image};
pub use metadata::{
    ContainerExtractor, ExtractedMetadata, MetadataExtractor, extract_metadata, merge_metadata,
};
