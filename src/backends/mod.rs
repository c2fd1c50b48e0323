// SPDX-License-Identifier: GPL-3.0-only

//! Platform backends
//!
//! - [`camera`]: frame sources (V4L2 devices, image files) and the camera slot
//! - [`permission`]: camera access requests (portal, device node check)

pub mod camera;
pub mod permission;
