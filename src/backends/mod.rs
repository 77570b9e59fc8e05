// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! The backend layer abstracts hardware access, providing a consistent API
//! regardless of the underlying capture method:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Widget Session                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │            ┌──────────────────┐             │
//! │            │     Camera       │             │
//! │            │  (CameraHost)    │             │
//! │            └──────────────────┘             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device enumeration, stream lifecycle and frame capture

pub mod camera;
