// Stroke history: the ordered list of freehand marks, oldest first.
//
// Insertion order is paint order. Only the newest stroke can be open
// ("active"); it grows while the pointer is held and is frozen afterwards.

use crate::types::{Point, Rgb};

/// One continuous freehand mark. Never empty: it is born with its first point.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    points: Vec<Point>,
    color: Rgb,
    width: f32,
}

impl Stroke {
    pub fn new(first: Point, color: Rgb, width: f32) -> Self {
        Self { points: vec![first], color, width }
    }

    /// Build a finished stroke from a polyline. `None` when `points` is empty.
    pub fn from_points(points: Vec<Point>, color: Rgb, width: f32) -> Option<Self> {
        (!points.is_empty()).then_some(Self { points, color, width })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
    pub fn color(&self) -> Rgb {
        self.color
    }
    pub fn width(&self) -> f32 {
        self.width
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrokeHistory {
    strokes: Vec<Stroke>,
    /// The last stroke is still receiving points.
    active: bool,
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }
    pub fn len(&self) -> usize {
        self.strokes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
    pub fn has_active(&self) -> bool {
        self.active
    }

    /// Append a new single-point stroke and make it the active one.
    /// An already open stroke is closed first.
    pub fn begin_stroke(&mut self, point: Point, color: Rgb, width: f32) {
        self.strokes.push(Stroke::new(point, color, width));
        self.active = true;
    }

    /// Append a point to the active stroke. Returns false (and does nothing)
    /// when no stroke is open.
    pub fn extend_active(&mut self, point: Point) -> bool {
        if !self.active {
            return false;
        }
        match self.strokes.last_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                true
            }
            None => {
                self.active = false;
                false
            }
        }
    }

    /// Close the active stroke; it stays in the history. Returns false when
    /// nothing was open.
    pub fn end_active(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// Drop the newest stroke (open or not).
    pub fn undo(&mut self) -> Option<Stroke> {
        let removed = self.strokes.pop();
        if removed.is_some() {
            self.active = false;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);

    fn history_of(n: usize) -> StrokeHistory {
        let mut history = StrokeHistory::new();
        for i in 0..n {
            let p = Point::new(i as f32, i as f32);
            history.begin_stroke(p, RED, 4.0);
            history.extend_active(Point::new(p.x + 1.0, p.y));
            history.end_active();
        }
        history
    }

    #[test]
    fn begin_extend_end() {
        let mut history = StrokeHistory::new();
        history.begin_stroke(Point::new(1.0, 2.0), RED, 4.0);
        assert!(history.has_active());
        assert!(history.extend_active(Point::new(3.0, 4.0)));
        assert!(history.end_active());
        assert!(!history.has_active());

        assert_eq!(history.len(), 1);
        let stroke = &history.strokes()[0];
        assert_eq!(stroke.points(), &[Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        assert_eq!(stroke.color(), RED);
        assert_eq!(stroke.width(), 4.0);
    }

    #[test]
    fn extend_and_end_without_active_are_noops() {
        let mut history = history_of(1);
        let before = history.clone();
        assert!(!history.extend_active(Point::new(9.0, 9.0)));
        assert!(!history.end_active());
        assert_eq!(history, before);

        let mut empty = StrokeHistory::new();
        assert!(!empty.extend_active(Point::new(0.0, 0.0)));
        assert!(!empty.end_active());
        assert!(empty.is_empty());
    }

    #[test]
    fn undo_removes_exactly_the_last_stroke() {
        let original = history_of(4);
        let mut history = original.clone();
        let removed = history.undo();
        assert_eq!(removed.as_ref(), original.strokes().last());
        assert_eq!(history.strokes(), &original.strokes()[..3]);

        for _ in 0..3 {
            history.undo();
        }
        assert!(history.is_empty());
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn undo_of_open_stroke_closes_it() {
        let mut history = history_of(1);
        history.begin_stroke(Point::new(0.0, 0.0), RED, 2.0);
        history.undo();
        assert!(!history.has_active());
        // Must not grow the older, finished stroke.
        assert!(!history.extend_active(Point::new(5.0, 5.0)));
        assert_eq!(history.strokes()[0].points().len(), 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut history = history_of(3);
        history.clear();
        assert!(history.is_empty());
        history.clear();
        assert_eq!(history, StrokeHistory::new());
    }

    #[test]
    fn from_points_rejects_empty() {
        assert!(Stroke::from_points(Vec::new(), RED, 1.0).is_none());
        let s = Stroke::from_points(vec![Point::new(0.0, 0.0)], RED, 1.0);
        assert_eq!(s.map(|s| s.points().len()), Some(1));
    }
}
