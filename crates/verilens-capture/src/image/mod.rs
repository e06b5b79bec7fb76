// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — container sniffing and header inspection.

pub mod inspect;

pub use inspect::{ImageInfo, inspect_image};
