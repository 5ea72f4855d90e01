/// Convenience result type used across petpet.
pub type PetResult<T> = Result<T, PetError>;

/// Top-level error taxonomy used by the compositing and export APIs.
///
/// Pose indices never fail: out-of-range requests are resolved by
/// [`PoseIndex::clamp_from`](crate::PoseIndex::clamp_from).
#[derive(thiserror::Error, Debug)]
pub enum PetError {
    /// Invalid user-provided configuration or frame data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The source image could not be decoded; the core must not run with it.
    #[error("source image error: {0}")]
    SourceImage(String),

    /// The encoder terminated abnormally instead of finishing.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PetError {
    /// Build a [`PetError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PetError::SourceImage`] value.
    pub fn source_image(msg: impl Into<String>) -> Self {
        Self::SourceImage(msg.into())
    }

    /// Build a [`PetError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
