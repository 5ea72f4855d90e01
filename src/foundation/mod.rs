/// Shared configuration loaded from JSON.
pub mod config;
/// Constants, poses and geometry primitives.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
