use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crate::foundation::error::{PetError, PetResult};
use crate::render::frame::FrameBuffer;

/// Construction parameters for an encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Number of parallel workers.
    pub worker_count: usize,
    /// Name prefix for worker threads.
    pub worker_label: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Pixels of exactly this RGB colour become transparent in the output.
    pub transparent: Option<[u8; 3]>,
    /// Quantizer speed, 1 (best) to 30 (fastest).
    pub quality: u8,
}

impl EncoderConfig {
    /// Square output of `size` with the default two workers.
    pub fn new(size: u32) -> Self {
        Self {
            worker_count: 2,
            worker_label: "petpet-encode".to_string(),
            width: size,
            height: size,
            transparent: None,
            quality: 10,
        }
    }

    /// Check that an encoder can be built from this configuration.
    pub fn validate(&self) -> PetResult<()> {
        let max = u32::from(u16::MAX);
        if self.width == 0 || self.height == 0 || self.width > max || self.height > max {
            return Err(PetError::validation(
                "encoder width/height must be in 1..=65535",
            ));
        }
        if self.worker_count == 0 {
            return Err(PetError::validation("encoder worker_count must be >= 1"));
        }
        if !(1..=30).contains(&self.quality) {
            return Err(PetError::validation("encoder quality must be in 1..=30"));
        }
        Ok(())
    }
}

/// Per-frame options for [`EncoderAdapter::add_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOptions {
    /// How long the frame is shown, in milliseconds.
    pub delay_ms: u32,
}

/// Encoded bytes produced by a finished encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBlob {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: &'static str,
    /// When the encoder wrote the last byte.
    pub finished_at: Instant,
}

/// Events emitted by a running encode, in order: `Started`, any number of non-decreasing
/// `Progress` values, then exactly one terminal `Finished` or `Failed`.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeEvent {
    /// Encoding has begun, stamped by the encoder when it began.
    Started(Instant),
    /// Fraction of the work done, in `[0, 1]`.
    Progress(f32),
    /// Terminal: the encoded artifact.
    Finished(EncodedBlob),
    /// Terminal: the encode aborted.
    Failed(String),
}

impl EncodeEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Failed(_))
    }
}

/// Receiving end of an in-flight encode.
///
/// Dropping the job abandons the encode; workers notice on their next send and stop.
#[derive(Debug)]
pub struct EncodeJob {
    events: Receiver<EncodeEvent>,
    terminated: bool,
}

impl EncodeJob {
    /// Wrap the receiving half of an encoder's event channel.
    pub fn new(events: Receiver<EncodeEvent>) -> Self {
        Self {
            events,
            terminated: false,
        }
    }

    /// Whether the terminal event has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Next event if one is ready, without blocking.
    pub fn try_next(&mut self) -> Option<EncodeEvent> {
        if self.terminated {
            return None;
        }
        match self.events.try_recv() {
            Ok(ev) => Some(self.observe(ev)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.observe(disconnected())),
        }
    }

    /// Next event, waiting at most `timeout`.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<EncodeEvent> {
        use std::sync::mpsc::RecvTimeoutError;

        if self.terminated {
            return None;
        }
        match self.events.recv_timeout(timeout) {
            Ok(ev) => Some(self.observe(ev)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.observe(disconnected())),
        }
    }

    fn observe(&mut self, ev: EncodeEvent) -> EncodeEvent {
        self.terminated = ev.is_terminal();
        ev
    }
}

fn disconnected() -> EncodeEvent {
    EncodeEvent::Failed("encoder stopped without finishing".to_string())
}

/// An asynchronous encoder that assembles queued frames into one artifact.
pub trait EncoderAdapter: Send {
    /// Queue one frame. The pixels are copied immediately, so the caller may reuse `frame`.
    fn add_frame(&mut self, frame: &FrameBuffer, opts: FrameOptions) -> PetResult<()>;

    /// Number of frames queued so far.
    fn queued_frames(&self) -> usize;

    /// Begin encoding on the adapter's workers and return the event stream.
    fn render(self: Box<Self>) -> PetResult<EncodeJob>;
}

/// Available encoder kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncoderKind {
    /// Animated GIF through the `gif` crate.
    #[default]
    Gif,
}

/// Create an encoder implementation.
pub fn create_encoder(kind: EncoderKind, cfg: EncoderConfig) -> PetResult<Box<dyn EncoderAdapter>> {
    match kind {
        EncoderKind::Gif => Ok(Box::new(crate::encode::gif::GifEncoderAdapter::new(cfg)?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/adapter.rs"]
mod tests;
