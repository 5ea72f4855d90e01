use super::*;
use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};

use image::{DynamicImage, RgbaImage};

use crate::foundation::core::CHROMA_KEY;

const SIDE: u32 = 16;

#[derive(Clone, Default)]
struct Harness {
    frames: Arc<Mutex<Vec<(FrameBuffer, FrameOptions)>>>,
    senders: Arc<Mutex<Vec<Sender<EncodeEvent>>>>,
}

impl Harness {
    fn send(&self, run: usize, ev: EncodeEvent) -> bool {
        self.senders.lock().unwrap()[run].send(ev).is_ok()
    }

    fn frames(&self) -> Vec<(FrameBuffer, FrameOptions)> {
        self.frames.lock().unwrap().clone()
    }
}

struct FakeEncoder {
    harness: Harness,
    queued: usize,
}

impl EncoderAdapter for FakeEncoder {
    fn add_frame(&mut self, frame: &FrameBuffer, opts: FrameOptions) -> PetResult<()> {
        self.harness
            .frames
            .lock()
            .unwrap()
            .push((frame.clone(), opts));
        self.queued += 1;
        Ok(())
    }

    fn queued_frames(&self) -> usize {
        self.queued
    }

    fn render(self: Box<Self>) -> PetResult<EncodeJob> {
        let (tx, rx) = mpsc::channel();
        self.harness.senders.lock().unwrap().push(tx);
        Ok(EncodeJob::new(rx))
    }
}

fn opts() -> ExportOptions {
    ExportOptions {
        poses: PoseIndex::all().collect(),
        frame_size: SIDE,
        delay_ms: 63,
        chroma_key: CHROMA_KEY,
        worker_count: 1,
        quality: 10,
    }
}

fn pipeline(harness: &Harness) -> ExportPipeline {
    let harness = harness.clone();
    ExportPipeline::with_encoder_factory(
        opts(),
        Box::new(move |_cfg: EncoderConfig| {
            Ok(Box::new(FakeEncoder {
                harness: harness.clone(),
                queued: 0,
            }) as Box<dyn EncoderAdapter>)
        }),
    )
}

fn source(rgba: [u8; 4]) -> SourceImage {
    let img = RgbaImage::from_pixel(32, 32, image::Rgba(rgba));
    SourceImage::from_image(DynamicImage::ImageRgba8(img), 32).unwrap()
}

fn sprite() -> SpriteSheet {
    let mut sheet = RgbaImage::new(SIDE * 5, SIDE);
    for i in 0..5u32 {
        sheet.put_pixel(i * SIDE + SIDE - 1, SIDE - 1, image::Rgba([0, 0, 50 + i as u8, 255]));
    }
    SpriteSheet::new(sheet, SIDE).unwrap()
}

fn transform() -> TransformState {
    TransformState {
        offset_x: 2.0,
        offset_y: 2.0,
        base_width: f64::from(SIDE),
        base_height: f64::from(SIDE),
        scale: 0.5,
        current_pose: PoseIndex::FIRST,
    }
}

fn blob(bytes: &[u8]) -> EncodedBlob {
    EncodedBlob {
        bytes: bytes.to_vec(),
        mime_type: "image/gif",
        finished_at: Instant::now(),
    }
}

#[test]
fn submits_every_pose_over_the_key_colour() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    let ticket = p
        .export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();
    assert_eq!(ticket.generation, 1);
    assert!(p.is_running());

    let frames = h.frames();
    assert_eq!(frames.len(), 5);
    for (i, (frame, fo)) in frames.iter().enumerate() {
        assert_eq!((frame.width, frame.height), (SIDE, SIDE));
        assert_eq!(fo.delay_ms, 63);
        assert_eq!(frame.pixel(15, 15), Some([0, 0, 50 + i as u8, 255]));
        assert_eq!(frame.pixel(0, 0), Some([0, 255, 0, 255]));
    }
    let (first, _) = &frames[0];
    assert_eq!(first.pixel(2, 2), Some([255, 0, 0, 255]));
    assert_eq!(first.pixel(12, 12), Some([0, 255, 0, 255]));
}

#[test]
fn foreground_green_never_matches_the_key() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([0, 255, 0, 255]), &sprite(), &transform())
        .unwrap();
    let (first, _) = &h.frames()[0];
    assert_eq!(first.pixel(3, 3), Some([0, 250, 0, 255]));
}

#[test]
fn export_frame_helper_matches_submitted_frames() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    let (src, sheet, t) = (source([20, 40, 60, 255]), sprite(), transform());
    p.export(&src, &sheet, &t).unwrap();

    let pose = PoseIndex::new(2).unwrap();
    let single = render_export_frame(pose, &t, &src, &sheet, &opts()).unwrap();
    assert_eq!(single, h.frames()[2].0);
}

#[test]
fn progress_is_clamped_and_never_decreases() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();

    assert!(h.send(0, EncodeEvent::Started(Instant::now())));
    assert!(h.send(0, EncodeEvent::Progress(0.5)));
    assert!(h.send(0, EncodeEvent::Progress(0.2)));
    let updates = p.poll();
    let fractions: Vec<f32> = updates
        .iter()
        .filter_map(|u| match u {
            ExportUpdate::Progress { fraction, .. } => Some(*fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions, vec![0.5, 0.5]);
    assert_eq!(p.status_line(), "50%");

    assert!(h.send(0, EncodeEvent::Progress(1.5)));
    assert!(h.send(0, EncodeEvent::Finished(blob(b"GIF89a"))));
    let updates = p.poll();
    assert!(matches!(
        updates[0],
        ExportUpdate::Progress { fraction, .. } if fraction == 1.0
    ));
    let ExportUpdate::Completed { generation, artifact } = &updates[1] else {
        panic!("expected completion, got {updates:?}");
    };
    assert_eq!(*generation, 1);
    assert_eq!(artifact.bytes(), b"GIF89a");
    assert_eq!(artifact.artifact().byte_size(), 6);

    assert!(!p.is_running());
    assert!(matches!(
        p.status(),
        ExportStatus::Completed { generation: 1, byte_size: 6, .. }
    ));
    let line = p.status_line();
    assert!(line.starts_with("100%, "), "{line}");
    assert!(line.ends_with("kb"), "{line}");
}

#[test]
fn nothing_is_accepted_after_a_terminal_event() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();

    h.send(0, EncodeEvent::Finished(blob(b"one")));
    h.send(0, EncodeEvent::Progress(0.1));
    h.send(0, EncodeEvent::Failed("late".to_string()));
    let updates = p.poll();
    assert_eq!(updates.len(), 1);
    assert!(p.poll().is_empty());
    assert!(matches!(p.status(), ExportStatus::Completed { .. }));
    assert_eq!(p.artifact().map(|a| a.bytes().to_vec()), Some(b"one".to_vec()));
}

#[test]
fn a_new_export_supersedes_the_run_in_flight() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    let (src, sheet, t) = (source([255, 0, 0, 255]), sprite(), transform());

    p.export(&src, &sheet, &t).unwrap();
    let second = p.export(&src, &sheet, &t).unwrap();
    assert_eq!(second.generation, 2);

    // The first run's receiver is gone, so it can never publish.
    assert!(!h.send(0, EncodeEvent::Finished(blob(b"stale"))));
    assert!(p.poll().is_empty());
    assert!(matches!(
        p.status(),
        ExportStatus::Running { generation: 2, .. }
    ));

    h.send(1, EncodeEvent::Finished(blob(b"fresh")));
    let artifact = p.wait(Duration::from_secs(1)).unwrap();
    assert_eq!(artifact.bytes(), b"fresh");
    assert_eq!(p.generation(), 2);
}

#[test]
fn prior_artifact_is_released_exactly_once() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    let (src, sheet, t) = (source([255, 0, 0, 255]), sprite(), transform());

    p.export(&src, &sheet, &t).unwrap();
    h.send(0, EncodeEvent::Finished(blob(b"a")));
    let first = p.wait(Duration::from_secs(1)).unwrap();
    assert_eq!(p.released_artifacts(), 0);

    p.export(&src, &sheet, &t).unwrap();
    assert!(p.artifact().is_none());
    assert_eq!(p.released_artifacts(), 1);

    h.send(1, EncodeEvent::Finished(blob(b"b")));
    let second = p.wait(Duration::from_secs(1)).unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(p.released_artifacts(), 1);
    // Holders keep their bytes after the pipeline lets go.
    assert_eq!(first.bytes(), b"a");
}

#[test]
fn encoder_failure_is_reported_not_raised() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();

    h.send(0, EncodeEvent::Started(Instant::now()));
    h.send(0, EncodeEvent::Failed("boom".to_string()));
    let updates = p.poll();
    assert!(matches!(updates.last(), Some(ExportUpdate::Failed { reason, .. }) if reason == "boom"));
    assert_eq!(
        p.status(),
        &ExportStatus::Failed {
            generation: 1,
            reason: "boom".to_string()
        }
    );
    assert_eq!(p.status_line(), "export failed: boom");
    assert!(p.artifact().is_none());
}

#[test]
fn encoder_that_disappears_counts_as_failed() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();
    h.senders.lock().unwrap().clear();

    let err = p.wait(Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, PetError::Encode(_)));
    assert!(matches!(p.status(), ExportStatus::Failed { .. }));
}

#[test]
fn wait_times_out_while_encoder_is_silent() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();

    let err = p.wait(Duration::from_millis(20)).unwrap_err();
    assert!(err.to_string().contains("timed out"));
    assert!(p.is_running());
}

#[test]
fn mismatched_sprite_fails_the_run() {
    let h = Harness::default();
    let mut p = ExportPipeline::with_encoder_factory(
        ExportOptions {
            frame_size: SIDE * 2,
            ..opts()
        },
        Box::new(move |_cfg: EncoderConfig| {
            Ok(Box::new(FakeEncoder {
                harness: h.clone(),
                queued: 0,
            }) as Box<dyn EncoderAdapter>)
        }),
    );
    let err = p
        .export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap_err();
    assert!(matches!(err, PetError::Validation(_)));
    assert!(matches!(p.status(), ExportStatus::Failed { generation: 1, .. }));
    assert!(!p.is_running());
}

#[test]
fn idle_pipeline_has_no_status_line() {
    let p = ExportPipeline::new(ExportOptions::default());
    assert_eq!(p.status(), &ExportStatus::Idle);
    assert_eq!(p.status_line(), "");
    assert_eq!(p.options().poses.len(), 5);
}

#[test]
fn encode_time_is_measured_by_the_encoder_not_the_poller() {
    let h = Harness::default();
    let mut p = pipeline(&h);
    p.export(&source([255, 0, 0, 255]), &sprite(), &transform())
        .unwrap();

    h.send(0, EncodeEvent::Started(Instant::now()));
    std::thread::sleep(Duration::from_millis(60));
    h.send(0, EncodeEvent::Finished(blob(b"late")));
    std::thread::sleep(Duration::from_millis(300));

    let updates = p.poll();
    assert_eq!(updates.len(), 2);
    let ExportStatus::Completed {
        encode_duration, ..
    } = p.status().clone()
    else {
        panic!("expected completion, got {:?}", p.status());
    };
    assert!(encode_duration >= Duration::from_millis(60), "{encode_duration:?}");
    assert!(encode_duration < Duration::from_millis(300), "{encode_duration:?}");
    assert!(!p.status_line().contains(", 0.00secs"), "{}", p.status_line());
}
