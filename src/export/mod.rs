//! Offscreen rendering of every pose and hand-off to an encoder.

/// Export lifecycle, progress and artifact ownership.
pub mod pipeline;
