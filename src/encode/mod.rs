//! Encoders that turn queued frames into one animated artifact.
//!
//! Encoders run on their own worker threads and report back through an [`adapter::EncodeJob`].

/// Encoder contract and factory.
pub mod adapter;
/// Animated GIF encoder.
pub mod gif;
