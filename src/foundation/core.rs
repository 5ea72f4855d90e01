pub use kurbo::{Point, Rect, Size};

/// Side length of one sprite cell and of every exported frame.
pub const FRAME_SIZE: u32 = 112;
/// Width of the display-scaled copy kept for an uploaded source image.
pub const CACHE_SIZE: u32 = 256;
/// Number of poses in the walk cycle.
pub const POSE_COUNT: usize = 5;
/// Background colour the encoder treats as transparent.
pub const CHROMA_KEY: [u8; 3] = [0, 255, 0];

/// Index of one pose in the fixed five-step cycle.
///
/// The value is always in `0..POSE_COUNT`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoseIndex(u8);

impl PoseIndex {
    /// First pose of the cycle.
    pub const FIRST: Self = Self(0);
    /// Last pose of the cycle.
    pub const LAST: Self = Self((POSE_COUNT - 1) as u8);

    /// Return the pose at `index`, or `None` when it is out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < POSE_COUNT).then(|| Self(index as u8))
    }

    /// Resolve any signed index to a pose: in-range values pass through,
    /// everything else lands on pose 0 (overflow does not wrap to the end).
    pub fn clamp_from(n: i64) -> Self {
        Self(frame_clamp(n) as u8)
    }

    /// Move by `delta` poses, resolving out-of-range results with [`PoseIndex::clamp_from`].
    pub fn offset(self, delta: i64) -> Self {
        Self::clamp_from(i64::from(self.0).saturating_add(delta))
    }

    /// The next pose; after the last pose this is pose 0.
    pub fn next(self) -> Self {
        self.offset(1)
    }

    /// Zero-based position in the cycle.
    pub fn get(self) -> usize {
        usize::from(self.0)
    }

    /// All poses in cycle order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..POSE_COUNT).map(|i| Self(i as u8))
    }
}

/// Clamp a frame number to `0..POSE_COUNT`, mapping both underflow and overflow to 0.
pub fn frame_clamp(n: i64) -> usize {
    let last = (POSE_COUNT - 1) as i64;
    if n <= 0 || n > last { 0 } else { n as usize }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
