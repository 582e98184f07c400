//! Frame-to-frame ROI tracking
//!
//! A bounding-box tracker based on zero-mean normalized cross-correlation:
//! the ROI's appearance in the previous frame is used as a template and
//! matched inside an inflated search window on the current frame. Tracker
//! state is per-ROI and strictly sequential across frames; on a lost lock
//! the position is held at its last known value.

use ndarray::{s, Array2, ArrayView2};
use oximap_core::frame::Frame;
use oximap_core::roi::Roi;
use oximap_core::Result;

/// Parameters for the correlation tracker
#[derive(Debug, Clone, Copy)]
pub struct TrackerParams {
    /// Search window inflation around the last position, in pixels
    pub search_margin: usize,
    /// Correlation score below which the lock counts as lost
    pub min_score: f64,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            search_margin: 16,
            min_score: 0.5,
        }
    }
}

/// Result of one tracking step
#[derive(Debug, Clone)]
pub struct TrackUpdate {
    /// Position after the step (held at the last value on failure)
    pub rect: Roi,
    pub success: bool,
    pub score: f64,
}

/// Correlation tracker for one ROI
#[derive(Debug, Clone)]
pub struct RoiTracker {
    rect: Roi,
    template: Array2<f64>,
    params: TrackerParams,
}

impl RoiTracker {
    /// Seed a tracker from the ROI's position on an initial frame.
    ///
    /// The rectangle is a per-run copy; the persisted ROI definition is
    /// never written back.
    pub fn init(frame: &Frame<f64>, roi: &Roi, params: TrackerParams) -> Result<Self> {
        let (rows, cols) = frame.shape();
        roi.validate_bounds(rows, cols)?;

        let template = frame
            .view()
            .slice(s![roi.y..roi.y + roi.h, roi.x..roi.x + roi.w])
            .to_owned();

        Ok(Self {
            rect: roi.clone(),
            template,
            params,
        })
    }

    /// Current position
    pub fn rect(&self) -> &Roi {
        &self.rect
    }

    /// Advance the tracker onto the next frame in sequence.
    ///
    /// On success the position moves to the best correlation peak and the
    /// template is refreshed from the current frame. On failure the
    /// position and template are left untouched.
    pub fn update(&mut self, frame: &Frame<f64>) -> TrackUpdate {
        let (rows, cols) = frame.shape();
        let (th, tw) = (self.rect.h, self.rect.w);
        let margin = self.params.search_margin;

        let y0 = self.rect.y.saturating_sub(margin);
        let x0 = self.rect.x.saturating_sub(margin);
        let y1 = (self.rect.y + th + margin).min(rows);
        let x1 = (self.rect.x + tw + margin).min(cols);

        let mut best_score = f64::NEG_INFINITY;
        let mut best_pos = (self.rect.y, self.rect.x);

        if y1 >= y0 + th && x1 >= x0 + tw {
            let view = frame.view();
            for y in y0..=y1 - th {
                for x in x0..=x1 - tw {
                    let window = view.slice(s![y..y + th, x..x + tw]);
                    let score = zncc(self.template.view(), window);
                    if score > best_score {
                        best_score = score;
                        best_pos = (y, x);
                    }
                }
            }
        }

        if best_score >= self.params.min_score {
            self.rect.y = best_pos.0;
            self.rect.x = best_pos.1;
            self.template = frame
                .view()
                .slice(s![
                    self.rect.y..self.rect.y + th,
                    self.rect.x..self.rect.x + tw
                ])
                .to_owned();

            TrackUpdate {
                rect: self.rect.clone(),
                success: true,
                score: best_score,
            }
        } else {
            TrackUpdate {
                rect: self.rect.clone(),
                success: false,
                score: best_score,
            }
        }
    }
}

/// Zero-mean normalized cross-correlation of two equally sized patches.
///
/// Returns a score in [-1, 1]. Two flat patches with equal means correlate
/// perfectly; a flat patch against a structured one does not correlate.
fn zncc(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (&va, &vb) in a.iter().zip(b.iter()) {
        let da = va - mean_a;
        let db = vb - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    const FLAT: f64 = 1e-12;
    if var_a < FLAT && var_b < FLAT {
        return if (mean_a - mean_b).abs() < 1e-9 { 1.0 } else { 0.0 };
    }
    if var_a < FLAT || var_b < FLAT {
        return 0.0;
    }

    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Zero background with a distinctive 6x6 patch at (y, x)
    fn frame_with_patch(y: usize, x: usize) -> Frame<f64> {
        let mut frame = Frame::new(40, 40);
        for dr in 0..6 {
            for dc in 0..6 {
                frame.set(y + dr, x + dc, (dr * 7 + dc + 1) as f64).unwrap();
            }
        }
        frame
    }

    #[test]
    fn test_static_scene_holds_position() {
        let frame = frame_with_patch(10, 10);
        let roi = Roi::new("patch", 10, 10, 6, 6);

        let mut tracker = RoiTracker::init(&frame, &roi, TrackerParams::default()).unwrap();
        let update = tracker.update(&frame);

        assert!(update.success);
        assert_eq!((update.rect.x, update.rect.y), (10, 10));
        assert!((update.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_follows_shifted_patch() {
        let first = frame_with_patch(10, 10);
        let second = frame_with_patch(13, 12);
        let roi = Roi::new("patch", 10, 10, 6, 6);

        let mut tracker = RoiTracker::init(&first, &roi, TrackerParams::default()).unwrap();
        let update = tracker.update(&second);

        assert!(update.success);
        assert_eq!((update.rect.x, update.rect.y), (12, 13));
    }

    #[test]
    fn test_lost_lock_holds_last_position() {
        let first = frame_with_patch(10, 10);
        let flat = Frame::filled(40, 40, 3.0);
        let roi = Roi::new("patch", 10, 10, 6, 6);

        let mut tracker = RoiTracker::init(&first, &roi, TrackerParams::default()).unwrap();
        let update = tracker.update(&flat);

        assert!(!update.success);
        assert_eq!((update.rect.x, update.rect.y), (10, 10));
        assert_eq!((tracker.rect().x, tracker.rect().y), (10, 10));
    }

    #[test]
    fn test_recovers_in_sequence() {
        // Patch drifts over three frames; the tracker follows each step.
        let frames = [
            frame_with_patch(10, 10),
            frame_with_patch(12, 11),
            frame_with_patch(14, 13),
        ];
        let roi = Roi::new("patch", 10, 10, 6, 6);

        let mut tracker = RoiTracker::init(&frames[0], &roi, TrackerParams::default()).unwrap();
        for (frame, expected) in frames[1..].iter().zip([(11, 12), (13, 14)]) {
            let update = tracker.update(frame);
            assert!(update.success);
            assert_eq!((update.rect.x, update.rect.y), expected);
        }
    }

    #[test]
    fn test_init_rejects_out_of_bounds() {
        let frame = Frame::<f64>::new(20, 20);
        let roi = Roi::new("big", 15, 15, 10, 10);
        assert!(RoiTracker::init(&frame, &roi, TrackerParams::default()).is_err());
    }
}
