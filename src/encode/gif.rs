use std::sync::mpsc::{self, Sender};
use std::time::Instant;

use crate::encode::adapter::{
    EncodeEvent, EncodeJob, EncodedBlob, EncoderAdapter, EncoderConfig, FrameOptions,
};
use crate::foundation::error::{PetError, PetResult};
use crate::render::frame::FrameBuffer;

/// MIME type of the artifacts this adapter produces.
pub const GIF_MIME: &str = "image/gif";

struct QueuedFrame {
    rgba: Vec<u8>,
    delay_cs: u16,
}

/// Animated GIF encoder with a pool of quantizing workers.
///
/// Each worker turns one RGBA frame into a paletted GIF frame; a coordinator thread collects
/// them in submission order, reports progress as frames complete, and writes the file.
pub struct GifEncoderAdapter {
    cfg: EncoderConfig,
    frames: Vec<QueuedFrame>,
}

impl GifEncoderAdapter {
    /// Create an adapter after validating `cfg`.
    pub fn new(cfg: EncoderConfig) -> PetResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            frames: Vec::new(),
        })
    }
}

impl EncoderAdapter for GifEncoderAdapter {
    fn add_frame(&mut self, frame: &FrameBuffer, opts: FrameOptions) -> PetResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(PetError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        let expected = (frame.width as usize) * (frame.height as usize) * 4;
        if frame.data.len() != expected {
            return Err(PetError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }
        self.frames.push(QueuedFrame {
            rgba: frame.data.clone(),
            delay_cs: delay_centiseconds(opts.delay_ms),
        });
        Ok(())
    }

    fn queued_frames(&self) -> usize {
        self.frames.len()
    }

    #[tracing::instrument(skip(self), fields(frames = self.frames.len(), workers = self.cfg.worker_count))]
    fn render(self: Box<Self>) -> PetResult<EncodeJob> {
        let Self { cfg, frames } = *self;
        if frames.is_empty() {
            return Err(PetError::validation("no frames were added to the encoder"));
        }

        let label = cfg.worker_label.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.worker_count)
            .thread_name(move |i| format!("{label}-{i}"))
            .panic_handler(|_| tracing::error!("gif worker panicked"))
            .build()
            .map_err(|e| PetError::encode(format!("failed to build worker pool: {e}")))?;

        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name(format!("{}-coordinator", cfg.worker_label))
            .spawn(move || run_encode(&cfg, frames, &pool, &tx))
            .map_err(|e| PetError::encode(format!("failed to spawn encoder thread: {e}")))?;

        Ok(EncodeJob::new(rx))
    }
}

fn run_encode(
    cfg: &EncoderConfig,
    frames: Vec<QueuedFrame>,
    pool: &rayon::ThreadPool,
    events: &Sender<EncodeEvent>,
) {
    if events.send(EncodeEvent::Started(Instant::now())).is_err() {
        return;
    }
    let terminal = match encode_frames(cfg, frames, pool, events) {
        Ok(bytes) => {
            tracing::debug!(bytes = bytes.len(), "gif encode finished");
            EncodeEvent::Finished(EncodedBlob {
                bytes,
                mime_type: GIF_MIME,
                finished_at: Instant::now(),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "gif encode failed");
            EncodeEvent::Failed(e.to_string())
        }
    };
    // The receiver may already be gone if the export was superseded.
    let _ = events.send(terminal);
}

fn encode_frames(
    cfg: &EncoderConfig,
    frames: Vec<QueuedFrame>,
    pool: &rayon::ThreadPool,
    events: &Sender<EncodeEvent>,
) -> PetResult<Vec<u8>> {
    let width = u16::try_from(cfg.width).map_err(|_| PetError::validation("width exceeds u16"))?;
    let height =
        u16::try_from(cfg.height).map_err(|_| PetError::validation("height exceeds u16"))?;
    let speed = i32::from(cfg.quality);
    let total = frames.len();

    let (done_tx, done_rx) = mpsc::channel::<(usize, gif::Frame<'static>)>();
    for (i, frame) in frames.into_iter().enumerate() {
        let done_tx = done_tx.clone();
        let key = cfg.transparent;
        pool.spawn(move || {
            let quantized = quantize_frame(width, height, frame, key, speed);
            let _ = done_tx.send((i, quantized));
        });
    }
    drop(done_tx);

    let mut slots: Vec<Option<gif::Frame<'static>>> = (0..total).map(|_| None).collect();
    for done in 1..=total {
        let (i, frame) = done_rx
            .recv()
            .map_err(|_| PetError::encode("a worker stopped before finishing its frame"))?;
        slots[i] = Some(frame);
        let progress = EncodeEvent::Progress(done as f32 / total as f32);
        if events.send(progress).is_err() {
            return Err(PetError::encode("encode abandoned"));
        }
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[])
            .map_err(|e| PetError::encode(format!("write gif header: {e}")))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| PetError::encode(format!("write gif loop extension: {e}")))?;
        for frame in slots.iter().flatten() {
            encoder
                .write_frame(frame)
                .map_err(|e| PetError::encode(format!("write gif frame: {e}")))?;
        }
    }
    Ok(bytes)
}

fn quantize_frame(
    width: u16,
    height: u16,
    frame: QueuedFrame,
    key: Option<[u8; 3]>,
    speed: i32,
) -> gif::Frame<'static> {
    let QueuedFrame { mut rgba, delay_cs } = frame;
    if let Some(key) = key {
        key_out_rgba8(&mut rgba, key);
    }
    let mut out = gif::Frame::from_rgba_speed(width, height, &mut rgba, speed);
    out.delay = delay_cs;
    out.dispose = gif::DisposalMethod::Background;
    out
}

/// Make every pixel whose RGB equals `key` fully transparent.
fn key_out_rgba8(rgba: &mut [u8], key: [u8; 3]) {
    for px in rgba.chunks_exact_mut(4) {
        if px[..3] == key {
            px[3] = 0;
        }
    }
}

/// GIF delays are in hundredths of a second.
fn delay_centiseconds(delay_ms: u32) -> u16 {
    let cs = (f64::from(delay_ms) / 10.0).round();
    cs.min(f64::from(u16::MAX)) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
