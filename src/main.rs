// What you SEE:
// • The photo, in a window sized to fit your screen (resize it freely).
// • Hold Left Mouse: draw freehand strokes on top of the photo.
// • 1..9 pick a palette color, [ and ] change the brush, U / Ctrl+Z undo,
//   C clears every stroke. ESC quits.
// • Every finished stroke, undo and clear rewrites the flattened PNG at
//   --output; with no strokes left that file is removed (use the photo as-is).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use sketch_overlay::draw::{draw_crosshair, draw_text_5x7, Drawer, MouseTracker};
use sketch_overlay::mapper;
use sketch_overlay::{AnnotationResult, AnnotationSession, AnnotationSink, BaseImage, Config, FrameBuffer};

/// Draw freehand marks over an image and export the flattened result as PNG.
#[derive(Parser, Debug)]
#[command(name = "sketch-overlay", version)]
struct Args {
    /// Image to annotate (PNG, JPEG, WEBP, ...).
    image: Option<PathBuf>,

    /// Where the flattened PNG is written. Defaults to `<image>.annotated.png`.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file (TOML). Defaults to the per-user config, if present.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Take the base image from this camera instead of a file.
    #[cfg(feature = "camera")]
    #[arg(long, value_name = "INDEX", conflicts_with = "image")]
    camera: Option<u32>,
}

/// Writes each flattened export to disk; removes it when the strokes are gone.
/// Only a file this sink wrote itself is ever removed.
struct PngFileSink {
    path: PathBuf,
    written: bool,
}

impl PngFileSink {
    fn new(path: PathBuf) -> Self {
        Self { path, written: false }
    }
}

impl AnnotationSink for PngFileSink {
    fn on_annotation_change(&mut self, result: AnnotationResult) {
        match result {
            AnnotationResult::Annotated(img) => match std::fs::write(&self.path, img.bytes()) {
                Ok(()) => {
                    self.written = true;
                    log::info!("wrote {} ({} bytes)", self.path.display(), img.bytes().len());
                }
                Err(e) => log::error!("could not write {}: {e}", self.path.display()),
            },
            AnnotationResult::Unannotated if self.written => match std::fs::remove_file(&self.path) {
                Ok(()) => {
                    self.written = false;
                    log::info!("no strokes left, removed {}", self.path.display());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.written = false,
                Err(e) => log::error!("could not remove {}: {e}", self.path.display()),
            },
            AnnotationResult::Unannotated => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("loading config")?;
    let base = load_base(&args)?;
    let output = match (&args.output, &args.image) {
        (Some(out), _) => out.clone(),
        (None, Some(image)) => default_output(image),
        (None, None) => PathBuf::from("snapshot.annotated.png"),
    };
    if let Some(image) = &args.image {
        if same_file(image, &output) {
            bail!("--output {} would overwrite the input image", output.display());
        }
    }
    log::info!("annotating {}x{} {} -> {}", base.dimensions().0, base.dimensions().1, base.mime(), output.display());

    let (w, h) = base.dimensions();
    let (dw, dh) = fit_within(w, h, config.window.max_width, config.window.max_height);
    let mut drawer = Drawer::new("Sketch Overlay", dw, dh)?;
    let mut session = AnnotationSession::with_base(config, base, PngFileSink::new(output));
    let mut tracker = MouseTracker::new();

    // Display copy: composite + crosshair + HUD. Never exported.
    let mut display = FrameBuffer::default();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        // The window may have been resized since the last frame.
        let rect = drawer.surface_rect();

        /* 1) Commands */
        if let Some(index) = drawer.palette_key_pressed() {
            session.select_palette(index);
        }
        let step = drawer.brush_step();
        if step != 0 {
            session.step_brush(step);
        }
        if drawer.undo_pressed() {
            session.undo();
        }
        if drawer.clear_pressed() {
            session.clear();
        }

        /* 2) Pointer */
        let pointer = drawer.pointer_position();
        if let Some(action) = tracker.poll(drawer.left_mouse_down(), pointer) {
            session.handle(action, rect);
        }

        /* 3) Compose what we show */
        display.copy_from(session.composite());
        let scale = hud_scale(session.intrinsic_size(), rect.width, rect.height);
        if let Some(p) = pointer.and_then(|c| mapper::to_raster(c, session.intrinsic_size(), rect)) {
            draw_crosshair(&mut display, p.x as i32, p.y as i32, 8 * scale, scale, 0xFF_FF_CC_33);
        }
        let hud = format!(
            "{} | {}PX | {} STROKES | 1-9 COLOR  [ ] SIZE  U UNDO  C CLEAR",
            session.color_name().unwrap_or("CUSTOM"),
            session.state().brush_width,
            session.history().len(),
        );
        draw_text_5x7(&mut display, 8 * scale, 8 * scale, scale, &hud, 0xFF_FF_FF_FF);

        /* 4) Present */
        drawer.present(&display)?;
    }

    // Window closed mid-stroke: finish it so the last mark is exported.
    session.pointer_up();
    Ok(())
}

fn load_base(args: &Args) -> anyhow::Result<BaseImage> {
    #[cfg(feature = "camera")]
    if let Some(index) = args.camera {
        let mut cam = sketch_overlay::camera::CameraCapture::new(index, 1280, 720)?;
        return Ok(cam.snapshot()?);
    }
    match &args.image {
        Some(path) => BaseImage::open(path).with_context(|| format!("loading {}", path.display())),
        None => bail!("no image given"),
    }
}

/// `photo.jpg` -> `photo.annotated.png`, next to the input.
fn default_output(image: &Path) -> PathBuf {
    let stem = image.file_stem().map_or_else(|| "image".into(), |s| s.to_string_lossy());
    image.with_file_name(format!("{stem}.annotated.png"))
}

/// Same path, or two spellings of one existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Largest size with the image's aspect ratio inside `max_w` x `max_h`; never upscales.
fn fit_within(w: usize, h: usize, max_w: usize, max_h: usize) -> (usize, usize) {
    let scale = (max_w as f64 / w as f64).min(max_h as f64 / h as f64).min(1.0);
    let fit = |v: usize| ((v as f64 * scale).round() as usize).max(1);
    (fit(w), fit(h))
}

/// Raster pixels per display pixel, rounded up, so overlays stay readable.
fn hud_scale(intrinsic: (usize, usize), display_w: f32, display_h: f32) -> i32 {
    if display_w <= 0.0 || display_h <= 0.0 {
        return 1;
    }
    let ratio = (intrinsic.0 as f32 / display_w).max(intrinsic.1 as f32 / display_h);
    ratio.ceil().max(1.0) as i32
}
