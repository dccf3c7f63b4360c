//! Folds the extracted nodes' live boxes into one container size.

use crate::geometry::{Margins, Rect, Size};

/// Running min/max fold over non-root boxes, plus every node's top margin.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    min_x: Option<f64>,
    min_y: Option<f64>,
    max_x: Option<f64>,
    max_y: Option<f64>,
    margin_tops: Vec<f64>,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    /// Tight box over the folded nodes, if any were folded
    pub bounds: Option<Rect>,
    /// Content size the container is built around
    pub container: Size,
    /// Downward shift applied to the root to keep negative top margins visible
    pub margin_shift: f64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-root node: its box (grown by its left/top margins) joins the
    /// fold and its top margin is recorded.
    pub fn fold(&mut self, rect: Rect, margins: Margins) {
        let left = rect.left() - margins.left;
        let top = rect.top() - margins.top;
        self.min_x = Some(self.min_x.map_or(left, |v| v.min(left)));
        self.min_y = Some(self.min_y.map_or(top, |v| v.min(top)));
        self.max_x = Some(self.max_x.map_or(rect.right(), |v| v.max(rect.right())));
        self.max_y = Some(self.max_y.map_or(rect.bottom(), |v| v.max(rect.bottom())));
        self.margin_tops.push(margins.top);
    }

    /// Records the root's top margin without folding its box
    pub fn record_root(&mut self, margins: Margins) {
        self.margin_tops.push(margins.top);
    }

    pub fn bounds(&self) -> Option<Rect> {
        let (min_x, min_y, max_x, max_y) = (self.min_x?, self.min_y?, self.max_x?, self.max_y?);
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// `-min + 2 * padding` when the smallest recorded top margin is
    /// negative, otherwise zero.
    pub fn margin_shift(&self, padding: f64) -> f64 {
        let min = self.margin_tops.iter().copied().fold(f64::INFINITY, f64::min);
        if min < 0.0 {
            -min + 2.0 * padding
        } else {
            0.0
        }
    }

    /// Folded size when the fold produced a box with area, otherwise the
    /// selection's own box.
    pub fn container_size(&self, selection: Rect) -> Size {
        match self.bounds() {
            Some(bounds) if bounds.has_area() => bounds.size(),
            _ => selection.size(),
        }
    }

    pub fn finish(&self, selection: Rect, padding: f64) -> Reconciliation {
        Reconciliation {
            bounds: self.bounds(),
            container: self.container_size(selection),
            margin_shift: self.margin_shift(padding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margins(top: f64, left: f64) -> Margins {
        Margins {
            top,
            left,
            ..Margins::default()
        }
    }

    #[test]
    fn test_fold_is_exact_min_max() {
        let mut reconciler = Reconciler::new();
        reconciler.fold(Rect::new(10.0, 40.0, 100.0, 20.0), margins(5.0, 2.0));
        reconciler.fold(Rect::new(30.0, 20.0, 200.0, 10.0), margins(0.0, 0.0));

        let bounds = reconciler.bounds().unwrap();
        assert_eq!(bounds.left(), 8.0);
        assert_eq!(bounds.top(), 20.0);
        assert_eq!(bounds.right(), 230.0);
        assert_eq!(bounds.bottom(), 60.0);
        assert_eq!(
            reconciler.container_size(Rect::default()),
            Size::new(222.0, 40.0)
        );
    }

    #[test]
    fn test_negative_coordinates_fold_normally() {
        let mut reconciler = Reconciler::new();
        reconciler.fold(Rect::new(-50.0, -10.0, 20.0, 20.0), Margins::default());
        reconciler.fold(Rect::new(5.0, 5.0, 10.0, 10.0), Margins::default());

        assert_eq!(reconciler.bounds(), Some(Rect::new(-50.0, -10.0, 65.0, 25.0)));
    }

    #[test]
    fn test_no_nodes_falls_back_to_selection() {
        let reconciler = Reconciler::new();
        let selection = Rect::new(3.0, 4.0, 120.0, 30.0);

        let result = reconciler.finish(selection, 8.0);
        assert_eq!(result.bounds, None);
        assert_eq!(result.container, Size::new(120.0, 30.0));
        assert_eq!(result.margin_shift, 0.0);
    }

    #[test]
    fn test_negative_top_margin_shift() {
        let mut reconciler = Reconciler::new();
        reconciler.record_root(margins(-10.0, 0.0));
        reconciler.fold(Rect::new(0.0, 0.0, 10.0, 10.0), margins(-4.0, 0.0));

        assert_eq!(reconciler.margin_shift(8.0), 26.0);
    }

    #[test]
    fn test_positive_margins_do_not_shift() {
        let mut reconciler = Reconciler::new();
        reconciler.record_root(margins(12.0, 0.0));
        assert_eq!(reconciler.margin_shift(8.0), 0.0);
    }
}
