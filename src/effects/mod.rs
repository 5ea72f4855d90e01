/// Palette-friendly pixel adjustments applied before encoding.
pub mod chroma;
