use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::assets::source::{SourceImage, SpriteSheet};
use crate::effects::chroma;
use crate::encode::adapter::{
    EncodeEvent, EncodeJob, EncodedBlob, EncoderAdapter, EncoderConfig, EncoderKind,
    FrameOptions, create_encoder,
};
use crate::foundation::config::StudioConfig;
use crate::foundation::core::PoseIndex;
use crate::foundation::error::{PetError, PetResult};
use crate::geometry::placement::TransformState;
use crate::render::frame::FrameBuffer;
use crate::render::preview::compose_pose;
use crate::render::surface::Surface;

/// Settings for one export run.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// Poses to encode, in order.
    pub poses: Vec<PoseIndex>,
    /// Side of each square output frame.
    pub frame_size: u32,
    /// Delay attached to every frame.
    pub delay_ms: u32,
    /// Background colour that the encoder makes transparent.
    pub chroma_key: [u8; 3],
    /// Encoder worker count.
    pub worker_count: usize,
    /// Encoder quantizer speed.
    pub quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

impl ExportOptions {
    /// All poses, with sizes and timing taken from `cfg`.
    pub fn from_config(cfg: &StudioConfig) -> Self {
        Self {
            poses: PoseIndex::all().collect(),
            frame_size: cfg.frame_size,
            delay_ms: cfg.delay_ms,
            chroma_key: cfg.chroma_key,
            worker_count: cfg.worker_count,
            quality: cfg.quality,
        }
    }

    fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            worker_count: self.worker_count,
            worker_label: "petpet-encode".to_string(),
            width: self.frame_size,
            height: self.frame_size,
            transparent: Some(self.chroma_key),
            quality: self.quality,
        }
    }
}

/// The finished output of one export.
#[derive(Debug)]
pub struct EncodedArtifact {
    /// Encoded container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: &'static str,
    /// Time from encode start to completion.
    pub encode_duration: Duration,
}

impl EncodedArtifact {
    /// Size of the encoded bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Encode time in whole milliseconds.
    pub fn encode_duration_ms(&self) -> u128 {
        self.encode_duration.as_millis()
    }
}

/// Shared, cheaply clonable reference to a published artifact.
#[derive(Clone, Debug)]
pub struct ArtifactHandle {
    id: u64,
    artifact: Arc<EncodedArtifact>,
}

impl ArtifactHandle {
    /// Unique id of this handle within its pipeline.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The artifact and its metadata.
    pub fn artifact(&self) -> &EncodedArtifact {
        &self.artifact
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.artifact.bytes
    }

    /// Write the artifact to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> PetResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        std::fs::write(path, self.bytes())
            .with_context(|| format!("write artifact '{}'", path.display()))?;
        Ok(())
    }
}

/// Where the pipeline is in its lifecycle. Every non-idle state carries the run's generation.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportStatus {
    /// Nothing exported yet.
    Idle,
    /// Frames were submitted and the encoder is working.
    Running {
        /// Run identifier.
        generation: u64,
        /// Highest progress seen, in `[0, 1]`.
        progress: f32,
    },
    /// The run finished and its artifact is published.
    Completed {
        /// Run identifier.
        generation: u64,
        /// Encoded size in bytes.
        byte_size: usize,
        /// Time from encode start to completion.
        encode_duration: Duration,
    },
    /// The run aborted.
    Failed {
        /// Run identifier.
        generation: u64,
        /// Human-readable cause.
        reason: String,
    },
}

/// Observable changes produced while a run progresses.
#[derive(Clone, Debug)]
pub enum ExportUpdate {
    /// The encoder began.
    Started {
        /// Run identifier.
        generation: u64,
    },
    /// Progress moved; never decreases within a run.
    Progress {
        /// Run identifier.
        generation: u64,
        /// Fraction done, in `[0, 1]`.
        fraction: f32,
    },
    /// Terminal: artifact published.
    Completed {
        /// Run identifier.
        generation: u64,
        /// The published artifact.
        artifact: ArtifactHandle,
    },
    /// Terminal: run aborted.
    Failed {
        /// Run identifier.
        generation: u64,
        /// Human-readable cause.
        reason: String,
    },
}

/// Identifies a started export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportTicket {
    /// Run identifier; later runs have larger values.
    pub generation: u64,
}

/// Builds an encoder for each export run.
pub type EncoderFactory = Box<dyn Fn(EncoderConfig) -> PetResult<Box<dyn EncoderAdapter>> + Send>;

struct ActiveRun {
    generation: u64,
    job: EncodeJob,
    submitted_at: Instant,
    started_at: Option<Instant>,
}

/// Renders every pose offscreen, prepares it for chroma-key encoding, and drives the encoder.
///
/// Only the most recent run may publish an artifact: starting a new export abandons the
/// previous run and releases the previously published artifact.
pub struct ExportPipeline {
    opts: ExportOptions,
    factory: EncoderFactory,
    generation: u64,
    active: Option<ActiveRun>,
    status: ExportStatus,
    artifact: Option<ArtifactHandle>,
    next_artifact_id: u64,
    released: u64,
}

impl ExportPipeline {
    /// A pipeline encoding GIFs.
    pub fn new(opts: ExportOptions) -> Self {
        Self::with_encoder_factory(opts, Box::new(|cfg: EncoderConfig| {
            create_encoder(EncoderKind::Gif, cfg)
        }))
    }

    /// A pipeline using a custom encoder.
    pub fn with_encoder_factory(opts: ExportOptions, factory: EncoderFactory) -> Self {
        Self {
            opts,
            factory,
            generation: 0,
            active: None,
            status: ExportStatus::Idle,
            artifact: None,
            next_artifact_id: 0,
            released: 0,
        }
    }

    /// Options used for new runs.
    pub fn options(&self) -> &ExportOptions {
        &self.opts
    }

    /// Change the frame delay for subsequent runs.
    pub fn set_delay_ms(&mut self, delay_ms: u32) {
        self.opts.delay_ms = delay_ms.max(1);
    }

    /// Current lifecycle state.
    pub fn status(&self) -> &ExportStatus {
        &self.status
    }

    /// Generation of the most recent run (0 before the first export).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a run is waiting on its encoder.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// The published artifact of the latest completed run, if still held.
    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    /// How many artifact handles this pipeline has released.
    pub fn released_artifacts(&self) -> u64 {
        self.released
    }

    /// One-line status for display: `"NN%"` while running,
    /// `"100%, S.SSsecs, K.KKkb"` when done.
    pub fn status_line(&self) -> String {
        match &self.status {
            ExportStatus::Idle => String::new(),
            ExportStatus::Running { progress, .. } => {
                format!("{}%", (f64::from(*progress) * 100.0).round() as u32)
            }
            ExportStatus::Completed {
                byte_size,
                encode_duration,
                ..
            } => format!(
                "100%, {:.2}secs, {:.2}kb",
                encode_duration.as_secs_f64(),
                *byte_size as f64 / 1000.0
            ),
            ExportStatus::Failed { reason, .. } => format!("export failed: {reason}"),
        }
    }

    /// Start a new export of every configured pose.
    ///
    /// Any earlier run still in flight becomes stale and can no longer publish. Frame
    /// preparation errors are recorded as a failed status and returned.
    #[tracing::instrument(skip_all, fields(generation = self.generation + 1))]
    pub fn export(
        &mut self,
        source: &SourceImage,
        sprite: &SpriteSheet,
        transform: &TransformState,
    ) -> PetResult<ExportTicket> {
        self.release_artifact();
        self.generation += 1;
        let generation = self.generation;
        if self.active.take().is_some() {
            tracing::debug!(generation, "abandoning previous in-flight export");
        }
        self.status = ExportStatus::Running {
            generation,
            progress: 0.0,
        };

        match self.submit(source, sprite, transform) {
            Ok(job) => {
                self.active = Some(ActiveRun {
                    generation,
                    job,
                    submitted_at: Instant::now(),
                    started_at: None,
                });
                Ok(ExportTicket { generation })
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "export could not start");
                self.status = ExportStatus::Failed {
                    generation,
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Drain whatever encoder events are ready, without blocking.
    pub fn poll(&mut self) -> Vec<ExportUpdate> {
        let mut updates = Vec::new();
        while let Some((generation, ev)) = self.next_event(None) {
            let terminal = ev.is_terminal();
            if let Some(update) = self.apply(generation, ev) {
                updates.push(update);
            }
            if terminal {
                break;
            }
        }
        updates
    }

    /// Block until the current run ends or `timeout` passes.
    ///
    /// Returns the published artifact, or the run's failure as [`PetError::Encode`].
    pub fn wait(&mut self, timeout: Duration) -> PetResult<ArtifactHandle> {
        let deadline = Instant::now() + timeout;
        while self.active.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PetError::encode(format!(
                    "export timed out after {:.2}secs",
                    timeout.as_secs_f64()
                )));
            }
            if let Some((generation, ev)) = self.next_event(Some(remaining)) {
                self.apply(generation, ev);
            }
        }
        match &self.status {
            ExportStatus::Completed { .. } => self
                .artifact
                .clone()
                .ok_or_else(|| PetError::encode("completed export has no artifact")),
            ExportStatus::Failed { reason, .. } => Err(PetError::encode(reason.clone())),
            ExportStatus::Idle | ExportStatus::Running { .. } => {
                Err(PetError::validation("no export in progress"))
            }
        }
    }

    /// Render, optimize and queue every pose, then start the encoder.
    fn submit(
        &mut self,
        source: &SourceImage,
        sprite: &SpriteSheet,
        transform: &TransformState,
    ) -> PetResult<EncodeJob> {
        if self.opts.poses.is_empty() {
            return Err(PetError::validation("export needs at least one pose"));
        }
        if sprite.frame_size() != self.opts.frame_size {
            return Err(PetError::validation(format!(
                "sprite cells are {}px but frames are {}px",
                sprite.frame_size(),
                self.opts.frame_size
            )));
        }

        let mut encoder = (self.factory)(self.opts.encoder_config())?;
        let frame_opts = FrameOptions {
            delay_ms: self.opts.delay_ms,
        };
        let mut frames = FrameRenderer::new(self.opts.frame_size, self.opts.chroma_key);
        for &pose in &self.opts.poses {
            let frame = frames.render(pose, transform, source, sprite)?;
            encoder.add_frame(frame, frame_opts)?;
        }
        tracing::debug!(frames = encoder.queued_frames(), "frames submitted to encoder");
        encoder.render()
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Option<(u64, EncodeEvent)> {
        let run = self.active.as_mut()?;
        let ev = match timeout {
            None => run.job.try_next(),
            Some(t) => run.job.next_timeout(t),
        }?;
        Some((run.generation, ev))
    }

    fn apply(&mut self, generation: u64, ev: EncodeEvent) -> Option<ExportUpdate> {
        match ev {
            EncodeEvent::Started(at) => {
                if let Some(run) = self.active.as_mut() {
                    run.started_at = Some(at);
                }
                Some(ExportUpdate::Started { generation })
            }
            EncodeEvent::Progress(p) => {
                let ExportStatus::Running { progress, .. } = &mut self.status else {
                    return None;
                };
                let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
                *progress = progress.max(p);
                Some(ExportUpdate::Progress {
                    generation,
                    fraction: *progress,
                })
            }
            EncodeEvent::Finished(blob) => Some(self.complete(generation, blob)),
            EncodeEvent::Failed(reason) => {
                self.active = None;
                tracing::warn!(generation, %reason, "export failed");
                self.status = ExportStatus::Failed {
                    generation,
                    reason: reason.clone(),
                };
                Some(ExportUpdate::Failed { generation, reason })
            }
        }
    }

    fn complete(&mut self, generation: u64, blob: EncodedBlob) -> ExportUpdate {
        let started = self
            .active
            .take()
            .map(|run| run.started_at.unwrap_or(run.submitted_at));
        let encode_duration = started
            .map(|t| blob.finished_at.saturating_duration_since(t))
            .unwrap_or_default();
        let artifact = EncodedArtifact {
            bytes: blob.bytes,
            mime_type: blob.mime_type,
            encode_duration,
        };
        let byte_size = artifact.byte_size();

        self.release_artifact();
        self.next_artifact_id += 1;
        let handle = ArtifactHandle {
            id: self.next_artifact_id,
            artifact: Arc::new(artifact),
        };
        self.artifact = Some(handle.clone());
        self.status = ExportStatus::Completed {
            generation,
            byte_size,
            encode_duration,
        };
        tracing::info!(generation, byte_size, ms = encode_duration.as_millis() as u64, "export finished");
        ExportUpdate::Completed {
            generation,
            artifact: handle,
        }
    }

    fn release_artifact(&mut self) {
        if let Some(old) = self.artifact.take() {
            self.released += 1;
            tracing::debug!(id = old.id, "released artifact");
        }
    }
}

/// Offscreen surfaces for export, separate from the preview's display surface.
struct FrameRenderer {
    scratch: Surface,
    output: Surface,
    background: [u8; 4],
    frame: FrameBuffer,
}

impl FrameRenderer {
    fn new(size: u32, key: [u8; 3]) -> Self {
        Self {
            scratch: Surface::new(size, size),
            output: Surface::new(size, size),
            background: [key[0], key[1], key[2], 255],
            frame: FrameBuffer::new(size, size),
        }
    }

    /// Compose one pose on a transparent scratch surface, harden it for the palette, and
    /// lay it over the key colour.
    fn render(
        &mut self,
        pose: PoseIndex,
        transform: &TransformState,
        source: &SourceImage,
        sprite: &SpriteSheet,
    ) -> PetResult<&FrameBuffer> {
        self.scratch.clear();
        let bounds = self.output.bounds();
        self.output.fill_rect(bounds, self.background);

        compose_pose(&mut self.scratch, pose, transform, source, sprite);
        let mut data = self.scratch.image_data();
        chroma::optimize(&mut data);
        self.scratch.put_image_data(&data)?;

        self.output.draw_surface(&self.scratch, 0, 0);
        self.frame = self.output.image_data();
        Ok(&self.frame)
    }
}

/// Render a single export frame exactly as it is handed to the encoder.
pub fn render_export_frame(
    pose: PoseIndex,
    transform: &TransformState,
    source: &SourceImage,
    sprite: &SpriteSheet,
    opts: &ExportOptions,
) -> PetResult<FrameBuffer> {
    if sprite.frame_size() != opts.frame_size {
        return Err(PetError::validation("sprite cell size does not match frame size"));
    }
    let mut frames = FrameRenderer::new(opts.frame_size, opts.chroma_key);
    let frame = frames.render(pose, transform, source, sprite)?.clone();
    Ok(frame)
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
