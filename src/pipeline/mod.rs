//! Pipeline stages for a single upload.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rasterizer can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! stage ──▶ encode ──▶ document ──▶ rasterize
//! (copy)    (JPEG)     (lopdf)      (ghostscript)
//! ```
//!
//! 1. [`stage`]     — copy the source into the staging root under the invocation id
//! 2. [`encode`]    — decode the staged raster and re-encode it as an in-memory JPEG
//! 3. [`document`]  — embed the JPEG on a single fitted page and write the PDF
//! 4. [`rasterize`] — run the external rasterizer to turn the PDF into a TIFF

pub mod document;
pub mod encode;
pub mod rasterize;
pub mod stage;
