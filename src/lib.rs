//! Petpet composites a still image under a five-pose hand sprite, previews the loop, and
//! exports it as a transparent animated GIF.
//!
//! - Load a [`SourceImage`] and a [`SpriteSheet`]
//! - Position it with a [`TransformState`]
//! - Drive a [`PreviewRenderer`] with an [`AnimationScheduler`]
//! - Hand every pose to an [`ExportPipeline`] and collect the [`ArtifactHandle`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod effects;
mod foundation;
mod geometry;

/// Encoder adapters.
pub mod encode;
/// Export pipeline.
pub mod export;
/// Preview playback.
pub mod playback;
/// Surfaces and preview rendering.
pub mod render;

pub use crate::assets::source::{SourceImage, SpriteSheet};
pub use crate::effects::chroma::{optimize, optimize_rgba8};
pub use crate::foundation::config::{StudioConfig, delay_ms_for_fps};
pub use crate::foundation::core::{
    CACHE_SIZE, CHROMA_KEY, FRAME_SIZE, POSE_COUNT, Point, PoseIndex, Rect, Size, frame_clamp,
};
pub use crate::foundation::error::{PetError, PetResult};
pub use crate::geometry::placement::{Placement, TransformState, placement_for};

pub use crate::encode::adapter::{
    EncodeEvent, EncodeJob, EncodedBlob, EncoderAdapter, EncoderConfig, EncoderKind,
    FrameOptions, create_encoder,
};
pub use crate::encode::gif::GifEncoderAdapter;
pub use crate::export::pipeline::{
    ArtifactHandle, EncodedArtifact, EncoderFactory, ExportOptions, ExportPipeline,
    ExportStatus, ExportTicket, ExportUpdate, render_export_frame,
};
pub use crate::playback::scheduler::{AnimationScheduler, PlaybackHandle, PlaybackState};
pub use crate::render::frame::FrameBuffer;
pub use crate::render::preview::{PoseTarget, PreviewRenderer, compose_pose, draw_pose};
pub use crate::render::surface::Surface;
