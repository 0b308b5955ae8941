//! Ground contact for falling coins.
//!
//! This module handles:
//! - **Detection**: Finding the points of a cylinder touching the ground plane
//! - **Resolution**: Impulses that stop those points sinking, with bounce and friction
//!
//! ## Contact points
//!
//! A cylinder meets a plane along its rim circles. Each rim contributes its
//! exact lowest point plus evenly spaced samples, so that a coin lying flat
//! gets a ring of supports while a tilted coin pivots on a single point.
//!
//! ```text
//!        ╱‾‾‾‾‾‾╲
//!       ●        ╲      tilted: one lowest rim point
//! ══════╳══════════════
//!
//!    ●──●──●──●──●      flat: whole bottom rim
//! ══════════════════
//! ```

pub mod detection;
pub mod resolution;

pub use detection::*;
pub use resolution::*;
