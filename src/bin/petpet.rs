use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "petpet", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single pose as a PNG.
    Frame(FrameArgs),
    /// Export the full animation as a transparent GIF.
    Render(RenderArgs),
    /// Play the preview in real time and write each displayed frame as a PNG.
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Source image to composite.
    #[arg(long)]
    image: PathBuf,

    /// Sprite sheet with five square cells laid out left to right.
    #[arg(long)]
    sprite: PathBuf,

    /// Optional studio config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Horizontal offset of the source image.
    #[arg(long, allow_hyphen_values = true)]
    offset_x: Option<f64>,

    /// Vertical offset of the source image.
    #[arg(long, allow_hyphen_values = true)]
    offset_y: Option<f64>,

    /// Source image scale in percent.
    #[arg(long)]
    scale_percent: Option<u32>,

    /// Frame rate; overrides the configured delay.
    #[arg(long)]
    fps: Option<u32>,

    /// Encoder worker threads.
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Pose index (0-based); out-of-range values fall back to pose 0.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pose: i64,

    /// Render the frame exactly as it is sent to the encoder (key-colour background).
    #[arg(long, default_value_t = false)]
    keyed: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Give up if the encoder has not finished after this many seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Number of timer ticks to play.
    #[arg(long, default_value_t = 5)]
    ticks: usize,

    /// Directory for the numbered PNG frames.
    #[arg(long)]
    out_dir: PathBuf,
}

struct Scene {
    cfg: petpet::StudioConfig,
    source: petpet::SourceImage,
    sprite: petpet::SpriteSheet,
    transform: petpet::TransformState,
}

impl SceneArgs {
    fn load(&self) -> anyhow::Result<Scene> {
        let mut cfg = match &self.config {
            Some(path) => petpet::StudioConfig::from_json_path(path)?,
            None => petpet::StudioConfig::default(),
        };
        if let Some(workers) = self.workers {
            cfg.worker_count = workers;
        }
        if let Some(fps) = self.fps {
            cfg.delay_ms = petpet::delay_ms_for_fps(fps)?;
        }
        cfg.validate()?;

        let source = petpet::SourceImage::open(&self.image, cfg.cache_size)?;
        let sprite = petpet::SpriteSheet::open(&self.sprite, cfg.frame_size)?;

        let mut transform = petpet::TransformState::from_config(&cfg);
        transform.set_aspect_ratio(source.aspect_ratio());
        if let Some(x) = self.offset_x {
            transform.offset_x = x;
        }
        if let Some(y) = self.offset_y {
            transform.offset_y = y;
        }
        if let Some(p) = self.scale_percent {
            transform.set_scale_percent(p);
        }

        Ok(Scene {
            cfg,
            source,
            sprite,
            transform,
        })
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = args.scene.load()?;
    let pose = petpet::PoseIndex::clamp_from(args.pose);

    let frame = if args.keyed {
        let opts = petpet::ExportOptions::from_config(&scene.cfg);
        petpet::render_export_frame(pose, &scene.transform, &scene.source, &scene.sprite, &opts)?
    } else {
        let side = scene.sprite.frame_size();
        let mut surface = petpet::Surface::new(side, side);
        petpet::draw_pose(&mut surface, pose, &scene.transform, &scene.source, &scene.sprite);
        surface.image_data()
    };

    write_png(&args.out, frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = args.scene.load()?;
    let mut pipeline = petpet::ExportPipeline::new(petpet::ExportOptions::from_config(&scene.cfg));
    pipeline.export(&scene.source, &scene.sprite, &scene.transform)?;

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    let mut last_line = String::new();
    while pipeline.is_running() {
        if Instant::now() >= deadline {
            anyhow::bail!("export did not finish within {}s", args.timeout_secs);
        }
        if pipeline.poll().is_empty() {
            std::thread::sleep(Duration::from_millis(10));
        }
        let line = pipeline.status_line();
        if line != last_line {
            eprintln!("{line}");
            last_line = line;
        }
    }

    match pipeline.status() {
        petpet::ExportStatus::Completed { .. } => {
            let artifact = pipeline
                .artifact()
                .context("export completed without an artifact")?;
            artifact.save(&args.out)?;
            eprintln!("wrote {}", args.out.display());
            Ok(())
        }
        petpet::ExportStatus::Failed { reason, .. } => anyhow::bail!("export failed: {reason}"),
        petpet::ExportStatus::Idle | petpet::ExportStatus::Running { .. } => {
            anyhow::bail!("export stopped in an unexpected state")
        }
    }
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    use petpet::PoseTarget as _;

    let Scene {
        cfg,
        source,
        sprite,
        mut transform,
    } = args.scene.load()?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut preview = petpet::PreviewRenderer::new(Arc::new(source), Arc::new(sprite));
    let mut scheduler = petpet::AnimationScheduler::new(cfg.delay_ms);
    preview.render_pose(&transform);

    let start = Instant::now();
    scheduler.play(start.elapsed());
    let mut written = 0usize;
    while written < args.ticks {
        if let Some(due) = scheduler.next_deadline() {
            let now = start.elapsed();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        if scheduler.tick(start.elapsed(), &mut transform, &mut preview) == 0 {
            continue;
        }
        let path = args.out_dir.join(format!("frame_{written:03}.png"));
        write_png(&path, preview.snapshot())?;
        written += 1;
    }
    scheduler.stop(&transform, &mut preview);

    eprintln!(
        "wrote {written} frames to {} ({})",
        args.out_dir.display(),
        scheduler.state().name()
    );
    Ok(())
}

fn write_png(path: &Path, frame: petpet::FrameBuffer) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .into_image()?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
