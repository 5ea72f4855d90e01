//! Timer-driven preview animation.

/// Repeating-timer scheduler for the preview.
pub mod scheduler;
