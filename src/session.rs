// Input session controller.
//
// Turns pointer actions into stroke lifecycle changes, keeps the composite
// current, and publishes an export to the host after every stroke end, undo
// and clear. The session is the only writer of its `StrokeHistory`.
//
//   Idle --Down--> Drawing --Move--> Drawing
//   Drawing --Up | Leave--> Idle      (publishes)
//   undo / clear: accepted in both states, always end in Idle (publishes)

use crate::base_image::BaseImage;
use crate::compositor::composite_into;
use crate::config::{is_valid_width, Config};
use crate::error::Error;
use crate::export::{export_into, AnnotationResult, AnnotationSink};
use crate::gamma::GammaLut;
use crate::mapper::{map_event, PointerEvent, SurfaceRect};
use crate::strokes::StrokeHistory;
use crate::types::{FrameBuffer, Rgb};

static UNSIZED: FrameBuffer = FrameBuffer { width: 0, height: 0, pixels: Vec::new() };

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum InputState {
    #[default]
    Idle,
    Drawing,
}

/// Per-session drawing state; reset whenever a new base image is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub input: InputState,
    pub color: Rgb,
    pub brush_width: f32,
}

impl SessionState {
    fn from_config(config: &Config) -> Self {
        Self {
            input: InputState::Idle,
            color: config.default_color(),
            brush_width: config.default_brush_width(),
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.input == InputState::Drawing
    }
}

/// What the host reports about the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerAction {
    Down(PointerEvent),
    Move(PointerEvent),
    Up,
    Leave,
}

pub struct AnnotationSession<S> {
    config: Config,
    base: Option<BaseImage>,
    history: StrokeHistory,
    state: SessionState,
    /// Base + strokes at intrinsic size. Stale while `dirty`.
    composite: FrameBuffer,
    dirty: bool,
    lut: GammaLut,
    sink: S,
}

impl<S: AnnotationSink> AnnotationSession<S> {
    /// A session with no base image yet; pointer input is dropped until one is loaded.
    pub fn new(config: Config, sink: S) -> Self {
        let state = SessionState::from_config(&config);
        Self {
            config,
            base: None,
            history: StrokeHistory::new(),
            state,
            composite: FrameBuffer::default(),
            dirty: false,
            lut: GammaLut::new(),
            sink,
        }
    }

    pub fn with_base(config: Config, base: BaseImage, sink: S) -> Self {
        let mut session = Self::new(config, sink);
        session.load_base_image(base);
        session
    }

    /// Start over on a new photo: strokes, open stroke, brush selection and
    /// composite all reset. Nothing is published.
    pub fn load_base_image(&mut self, base: BaseImage) {
        let (w, h) = base.dimensions();
        log::debug!("new base image {w}x{h} ({}), resetting session", base.mime());
        self.history.clear();
        self.state = SessionState::from_config(&self.config);
        self.composite.copy_from(base.raster());
        self.dirty = false;
        self.base = Some(base);
    }

    pub fn base_image(&self) -> Option<&BaseImage> {
        self.base.as_ref()
    }
    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }
    pub fn state(&self) -> &SessionState {
        &self.state
    }
    pub fn is_drawing(&self) -> bool {
        self.state.is_drawing()
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn sink(&self) -> &S {
        &self.sink
    }
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Intrinsic raster size; `(0, 0)` before a base image is loaded.
    pub fn intrinsic_size(&self) -> (usize, usize) {
        self.base.as_ref().map_or((0, 0), BaseImage::dimensions)
    }

    /* ---------- brush selection (affects strokes begun afterwards) ---------- */

    pub fn set_color(&mut self, color: Rgb) {
        self.state.color = color;
    }

    /// Ignores widths that are not finite and positive.
    pub fn set_brush_width(&mut self, width: f32) -> bool {
        if !is_valid_width(width) {
            log::warn!("ignoring brush width {width}");
            return false;
        }
        self.state.brush_width = width;
        true
    }

    pub fn select_palette(&mut self, index: usize) -> bool {
        match self.config.palette.get(index) {
            Some(entry) => {
                log::debug!("color -> {} ({})", entry.name, entry.color);
                self.state.color = entry.color;
                true
            }
            None => false,
        }
    }

    pub fn select_brush(&mut self, index: usize) -> bool {
        match self.config.brush_sizes.get(index).copied() {
            Some(width) => self.set_brush_width(width),
            None => false,
        }
    }

    /// Move through the configured sizes from the one nearest the current width.
    pub fn step_brush(&mut self, delta: isize) {
        let sizes = &self.config.brush_sizes;
        let current = self.state.brush_width;
        let nearest = (0..sizes.len())
            .min_by(|&a, &b| (sizes[a] - current).abs().total_cmp(&(sizes[b] - current).abs()))
            .unwrap_or(0);
        let last = sizes.len().saturating_sub(1) as isize;
        let target = (nearest as isize + delta).clamp(0, last) as usize;
        self.select_brush(target);
    }

    /// Name of the active color when it comes from the palette.
    pub fn color_name(&self) -> Option<&str> {
        self.config
            .palette
            .iter()
            .find(|entry| entry.color == self.state.color)
            .map(|entry| entry.name.as_str())
    }

    /* ---------- pointer input ---------- */

    pub fn handle(&mut self, action: PointerAction, rect: SurfaceRect) {
        match action {
            PointerAction::Down(event) => self.pointer_down(&event, rect),
            PointerAction::Move(event) => self.pointer_move(&event, rect),
            PointerAction::Up => self.pointer_up(),
            PointerAction::Leave => self.pointer_leave(),
        }
    }

    /// Begin a stroke at the mapped position. A stroke still open from a
    /// missed release is finished (and published) first.
    pub fn pointer_down(&mut self, event: &PointerEvent, rect: SurfaceRect) {
        let Some(point) = map_event(event, self.intrinsic_size(), rect) else {
            log::trace!("pointer down dropped: no raster position");
            return;
        };
        if self.state.is_drawing() {
            self.finish_stroke();
        }
        self.history.begin_stroke(point, self.state.color, self.state.brush_width);
        self.state.input = InputState::Drawing;
        self.dirty = true;
        log::debug!("stroke {} begun at ({:.1}, {:.1})", self.history.len(), point.x, point.y);
    }

    /// Extend the open stroke. Ignored while idle.
    pub fn pointer_move(&mut self, event: &PointerEvent, rect: SurfaceRect) {
        if !self.state.is_drawing() {
            return;
        }
        let Some(point) = map_event(event, self.intrinsic_size(), rect) else {
            log::trace!("pointer move dropped: no raster position");
            return;
        };
        if self.history.extend_active(point) {
            self.dirty = true;
        }
    }

    pub fn pointer_up(&mut self) {
        if self.state.is_drawing() {
            self.finish_stroke();
        }
    }

    /// Leaving the surface while drawing ends the stroke exactly like a release.
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    fn finish_stroke(&mut self) {
        self.history.end_active();
        self.state.input = InputState::Idle;
        if let Some(stroke) = self.history.strokes().last() {
            log::debug!("stroke {} ended with {} points", self.history.len(), stroke.points().len());
        }
        self.publish();
    }

    /* ---------- commands ---------- */

    pub fn undo(&mut self) {
        let removed = self.history.undo();
        self.state.input = InputState::Idle;
        log::debug!("undo: removed={}, {} strokes left", removed.is_some(), self.history.len());
        self.publish();
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.state.input = InputState::Idle;
        log::debug!("clear");
        self.publish();
    }

    /* ---------- output ---------- */

    /// Current composite for display, redrawn first if anything changed.
    pub fn composite(&mut self) -> &FrameBuffer {
        if self.dirty {
            let base = self.base.as_ref().map_or(&UNSIZED, BaseImage::raster);
            composite_into(&mut self.composite, base, &self.history, &self.lut);
            self.dirty = false;
        }
        &self.composite
    }

    /// Recomposite synchronously and export, without notifying the sink.
    pub fn export(&mut self) -> Result<AnnotationResult, Error> {
        let base = self.base.as_ref().map_or(&UNSIZED, BaseImage::raster);
        let result = export_into(&mut self.composite, base, &self.history, &self.lut)?;
        self.dirty = false;
        Ok(result)
    }

    fn publish(&mut self) {
        match self.export() {
            Ok(result) => {
                log::debug!("publishing export (annotated={})", result.is_annotated());
                self.sink.on_annotation_change(result);
            }
            Err(e) => log::error!("export failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::composite;
    use crate::mapper::ClientPoint;
    use crate::types::Point;
    use image::{ImageFormat, Rgba, RgbaImage};

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    type Session = AnnotationSession<Vec<AnnotationResult>>;

    fn base(w: u32, h: u32) -> BaseImage {
        BaseImage::from_rgba(&RgbaImage::from_pixel(w, h, Rgba([200, 190, 180, 255]))).expect("base")
    }

    fn session(w: u32, h: u32) -> Session {
        AnnotationSession::with_base(Config::default(), base(w, h), Vec::new())
    }

    fn mouse(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Mouse(ClientPoint::new(x, y))
    }

    /// Surface displayed at intrinsic size.
    fn rect_of(s: &Session) -> SurfaceRect {
        let (w, h) = s.intrinsic_size();
        SurfaceRect::sized(w as f32, h as f32)
    }

    fn draw(s: &mut Session, points: &[(f32, f32)], color: Rgb, width: f32) {
        let rect = rect_of(s);
        s.set_color(color);
        assert!(s.set_brush_width(width));
        let (first, rest) = points.split_first().expect("points");
        s.pointer_down(&mouse(first.0, first.1), rect);
        for &(x, y) in rest {
            s.pointer_move(&mouse(x, y), rect);
        }
        s.pointer_up();
    }

    fn decode(result: &AnnotationResult) -> FrameBuffer {
        let AnnotationResult::Annotated(img) = result else {
            panic!("expected a flattened image, got {result:?}");
        };
        let decoded = image::load_from_memory_with_format(img.bytes(), ImageFormat::Png).expect("png");
        FrameBuffer::from_rgba(&decoded.to_rgba8())
    }

    #[test]
    fn pointer_maps_through_scaled_display() {
        let mut s = session(800, 600);
        s.pointer_down(&mouse(200.0, 150.0), SurfaceRect::sized(400.0, 300.0));
        assert!(s.is_drawing());
        assert_eq!(s.history().strokes()[0].points(), &[Point::new(400.0, 300.0)]);
    }

    #[test]
    fn stroke_lifecycle_publishes_on_release() {
        let mut s = session(100, 100);
        let rect = rect_of(&s);
        s.pointer_down(&mouse(10.0, 10.0), rect);
        s.pointer_move(&mouse(20.0, 20.0), rect);
        assert!(s.sink().is_empty());
        s.pointer_up();

        assert!(!s.is_drawing());
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.sink().len(), 1);
        assert!(s.sink()[0].is_annotated());
    }

    #[test]
    fn move_while_idle_is_ignored() {
        let mut s = session(50, 50);
        let rect = rect_of(&s);
        s.pointer_move(&mouse(5.0, 5.0), rect);
        s.pointer_up();
        s.pointer_leave();
        assert!(s.history().is_empty());
        assert!(s.sink().is_empty());
    }

    #[test]
    fn leave_ends_the_stroke_like_release() {
        let mut s = session(50, 50);
        let rect = rect_of(&s);
        s.pointer_down(&mouse(5.0, 5.0), rect);
        s.handle(PointerAction::Leave, rect);
        assert!(!s.is_drawing());
        assert_eq!(s.sink().len(), 1);

        // Re-entering and moving must not grow the finished stroke.
        s.pointer_move(&mouse(30.0, 30.0), rect);
        assert_eq!(s.history().strokes()[0].points().len(), 1);
    }

    #[test]
    fn unready_surface_drops_input() {
        let mut s: Session = AnnotationSession::new(Config::default(), Vec::new());
        s.pointer_down(&mouse(1.0, 1.0), SurfaceRect::sized(10.0, 10.0));
        assert!(!s.is_drawing());
        assert!(s.history().is_empty());
        assert_eq!(s.export().expect("export"), AnnotationResult::Unannotated);
    }

    #[test]
    fn empty_palette_and_brushes_still_draw() {
        let config = Config { palette: Vec::new(), brush_sizes: Vec::new(), ..Config::default() };
        let mut s: Session = AnnotationSession::with_base(config, base(40, 40), Vec::new());
        assert!(s.state().brush_width > 0.0);
        assert!(!s.select_palette(0));
        assert!(!s.select_brush(0));
        s.step_brush(1);
        assert_eq!(s.color_name(), None);

        let rect = rect_of(&s);
        s.pointer_down(&mouse(10.0, 10.0), rect);
        s.pointer_move(&mouse(30.0, 30.0), rect);
        s.pointer_up();
        assert!(s.sink()[0].is_annotated());
    }

    #[test]
    fn empty_touch_is_dropped() {
        let mut s = session(50, 50);
        let rect = rect_of(&s);
        s.pointer_down(&PointerEvent::Touch(Vec::new()), rect);
        assert!(s.history().is_empty());

        s.handle(PointerAction::Down(PointerEvent::Touch(vec![ClientPoint::new(3.0, 4.0)])), rect);
        s.handle(PointerAction::Move(PointerEvent::Touch(Vec::new())), rect);
        s.handle(PointerAction::Up, rect);
        assert_eq!(s.history().strokes()[0].points(), &[Point::new(3.0, 4.0)]);
    }

    #[test]
    fn undo_back_to_empty_signals_unannotated() {
        let mut s = session(60, 60);
        draw(&mut s, &[(10.0, 10.0), (40.0, 40.0)], RED, 4.0);
        s.undo();
        assert!(s.history().is_empty());
        assert_eq!(s.sink().last(), Some(&AnnotationResult::Unannotated));
    }

    #[test]
    fn undo_export_never_contains_the_undone_stroke() {
        let mut s = session(1000, 600);
        draw(&mut s, &[(10.0, 10.0), (50.0, 50.0)], RED, 4.0);
        draw(&mut s, &[(60.0, 60.0), (90.0, 20.0)], BLUE, 10.0);
        s.undo();

        let mut only_a = StrokeHistory::new();
        only_a.begin_stroke(Point::new(10.0, 10.0), RED, 4.0);
        only_a.extend_active(Point::new(50.0, 50.0));
        only_a.end_active();
        let base_raster = s.base_image().expect("base").raster().clone();
        let expected = composite(&base_raster, &only_a, &GammaLut::new());

        assert_eq!(s.sink().len(), 3);
        let exported = decode(s.sink().last().expect("published"));
        assert_eq!(exported, expected);
        assert_eq!(exported.pixel(75, 40), base_raster.pixel(75, 40));
        assert_eq!(s.composite(), &expected);
    }

    #[test]
    fn each_publish_matches_history_at_that_moment() {
        let mut s = session(80, 80);
        let lut = GammaLut::new();
        let base_raster = s.base_image().expect("base").raster().clone();
        let mut snapshots = Vec::new();

        draw(&mut s, &[(5.0, 5.0), (70.0, 5.0)], RED, 6.0);
        snapshots.push(s.history().clone());
        draw(&mut s, &[(5.0, 40.0)], BLUE, 12.0);
        snapshots.push(s.history().clone());
        s.undo();
        snapshots.push(s.history().clone());
        draw(&mut s, &[(40.0, 70.0), (10.0, 10.0), (70.0, 70.0)], BLUE, 4.0);
        snapshots.push(s.history().clone());
        s.clear();
        snapshots.push(s.history().clone());

        assert_eq!(s.sink().len(), snapshots.len());
        for (result, history) in s.sink().iter().zip(&snapshots) {
            if history.is_empty() {
                assert_eq!(result, &AnnotationResult::Unannotated);
            } else {
                assert_eq!(decode(result), composite(&base_raster, history, &lut));
            }
        }
    }

    #[test]
    fn clear_always_empties_and_publishes() {
        let mut s = session(40, 40);
        s.clear();
        assert!(s.history().is_empty());
        assert_eq!(s.sink().as_slice(), &[AnnotationResult::Unannotated]);

        draw(&mut s, &[(1.0, 1.0), (30.0, 30.0)], RED, 2.0);
        draw(&mut s, &[(30.0, 1.0)], RED, 2.0);
        s.clear();
        assert!(s.history().is_empty());
        assert_eq!(s.sink().last(), Some(&AnnotationResult::Unannotated));
        let base_raster = s.base_image().expect("base").raster().clone();
        assert_eq!(s.composite(), &base_raster);
    }

    #[test]
    fn undo_and_clear_while_drawing_return_to_idle() {
        let mut s = session(40, 40);
        let rect = rect_of(&s);
        draw(&mut s, &[(1.0, 1.0), (10.0, 1.0)], RED, 2.0);

        s.pointer_down(&mouse(20.0, 20.0), rect);
        s.undo();
        assert!(!s.is_drawing());
        assert_eq!(s.history().len(), 1);
        s.pointer_move(&mouse(25.0, 25.0), rect);
        assert_eq!(s.history().strokes()[0].points().len(), 2);

        s.pointer_down(&mouse(20.0, 20.0), rect);
        s.clear();
        assert!(!s.is_drawing());
        s.pointer_up();
        // stroke, undo, clear; the trailing release was a no-op
        assert_eq!(s.sink().len(), 3);
    }

    #[test]
    fn down_while_drawing_finishes_the_open_stroke() {
        let mut s = session(40, 40);
        let rect = rect_of(&s);
        s.pointer_down(&mouse(1.0, 1.0), rect);
        s.pointer_down(&mouse(20.0, 20.0), rect);
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.sink().len(), 1);
        assert!(s.is_drawing());
    }

    #[test]
    fn selection_applies_to_new_strokes_only() {
        let mut s = session(40, 40);
        let rect = rect_of(&s);
        assert_eq!(s.color_name(), Some("Red"));
        s.pointer_down(&mouse(1.0, 1.0), rect);
        assert!(s.select_palette(1));
        assert!(s.select_brush(2));
        s.pointer_up();
        let (color, width) = (s.state().color, s.state().brush_width);
        draw(&mut s, &[(5.0, 5.0)], color, width);

        let strokes = s.history().strokes();
        assert_eq!((strokes[0].color(), strokes[0].width()), (Rgb::new(0xef, 0x44, 0x44), 12.0));
        assert_eq!((strokes[1].color(), strokes[1].width()), (Rgb::new(0x3b, 0x82, 0xf6), 24.0));
        assert_eq!(s.color_name(), Some("Blue"));
    }

    #[test]
    fn invalid_selections_are_ignored() {
        let mut s = session(10, 10);
        let before = s.state().clone();
        assert!(!s.select_palette(99));
        assert!(!s.select_brush(99));
        assert!(!s.set_brush_width(0.0));
        assert!(!s.set_brush_width(f32::INFINITY));
        assert_eq!(s.state(), &before);
    }

    #[test]
    fn step_brush_walks_configured_sizes() {
        let mut s = session(10, 10);
        s.step_brush(1);
        assert_eq!(s.state().brush_width, 24.0);
        s.step_brush(1);
        assert_eq!(s.state().brush_width, 24.0);
        s.step_brush(-5);
        assert_eq!(s.state().brush_width, 4.0);
        s.set_brush_width(10.0);
        s.step_brush(-1);
        assert_eq!(s.state().brush_width, 4.0);
    }

    #[test]
    fn new_base_image_resets_everything() {
        let mut s = session(40, 40);
        let rect = rect_of(&s);
        draw(&mut s, &[(1.0, 1.0), (30.0, 30.0)], BLUE, 2.0);
        s.select_palette(3);
        s.pointer_down(&mouse(5.0, 5.0), rect);

        s.load_base_image(base(20, 10));
        assert!(s.history().is_empty());
        assert!(!s.is_drawing());
        assert_eq!(s.state(), &SessionState::from_config(&Config::default()));
        assert_eq!(s.intrinsic_size(), (20, 10));
        let base_raster = s.base_image().expect("base").raster().clone();
        assert_eq!(s.composite(), &base_raster);
        assert_eq!(s.export().expect("export"), AnnotationResult::Unannotated);
    }

    #[test]
    fn move_bursts_keep_every_point() {
        let mut s = session(300, 300);
        let rect = rect_of(&s);
        s.pointer_down(&mouse(0.0, 0.0), rect);
        for i in 1..=1000 {
            let t = i as f32 * 0.25;
            s.pointer_move(&mouse(t, t), rect);
        }
        s.pointer_up();
        assert_eq!(s.history().strokes()[0].points().len(), 1001);
        assert_eq!(s.sink().len(), 1);
    }

    #[test]
    fn display_composite_tracks_open_stroke() {
        let mut s = session(40, 40);
        let rect = rect_of(&s);
        s.select_brush(1);
        s.pointer_down(&mouse(20.0, 20.0), rect);
        let shown = s.composite().pixel(20, 20);
        assert_eq!(shown, Some(s.state().color.to_argb()));
    }
}
