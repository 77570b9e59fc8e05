// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines
//!
//! - [`photo`]: rotated snapshot rendering and encoding

pub mod photo;
