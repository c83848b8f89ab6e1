//! Temporal smoothing and debouncing of per-frame board quads.

use crate::params::StabilizerParams;
use boardwatch_core::{Point2, Quad};
use std::collections::VecDeque;

/// What happened to the last candidate fed to [`CornerStabilizer::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StabilizerEvent {
    /// No candidate this frame; the success run was reset.
    Absent,
    /// Candidate moved too far from the estimate and was ignored.
    Jump,
    /// Candidate entered the history.
    Accepted,
}

/// Median-of-history plus exponential blending over accepted quads.
///
/// The estimate is only emitted after `need_good` consecutive accepted
/// updates. An absent candidate resets that run but keeps the history and
/// the running estimate; a jump outlier leaves everything untouched.
#[derive(Clone, Debug)]
pub struct CornerStabilizer {
    params: StabilizerParams,
    history: VecDeque<Quad>,
    ema: Option<Quad>,
    good_run: u32,
    last_event: Option<StabilizerEvent>,
}

impl CornerStabilizer {
    pub fn new(params: StabilizerParams) -> Self {
        let cap = params.history.max(1);
        Self {
            params,
            history: VecDeque::with_capacity(cap),
            ema: None,
            good_run: 0,
            last_event: None,
        }
    }

    pub fn params(&self) -> &StabilizerParams {
        &self.params
    }

    /// Feed one (already validated) candidate or `None`; returns the confident estimate.
    pub fn update(&mut self, candidate: Option<Quad>) -> Option<Quad> {
        let Some(quad) = candidate else {
            self.good_run = 0;
            self.last_event = Some(StabilizerEvent::Absent);
            return self.get();
        };

        if let Some(ema) = &self.ema {
            let d = ema.mean_distance(&quad);
            if d > self.params.max_jump {
                log::debug!(
                    "stabilizer: ignoring jump of {:.1}px (max {:.1})",
                    d,
                    self.params.max_jump
                );
                self.last_event = Some(StabilizerEvent::Jump);
                return self.get();
            }
        }

        if self.history.len() >= self.params.history.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(quad);
        self.good_run = (self.good_run + 1).min(self.params.need_good);

        let med = median_quad(&self.history);
        let alpha = self.params.ema_alpha;
        self.ema = Some(match self.ema {
            None => med,
            Some(prev) => blend(&med, &prev, alpha),
        });
        self.last_event = Some(StabilizerEvent::Accepted);
        self.get()
    }

    /// Current estimate if confident.
    pub fn get(&self) -> Option<Quad> {
        if self.is_confident() {
            self.ema
        } else {
            None
        }
    }

    /// Current running estimate regardless of confidence.
    pub fn estimate(&self) -> Option<Quad> {
        self.ema
    }

    pub fn is_confident(&self) -> bool {
        self.ema.is_some() && self.good_run >= self.params.need_good
    }

    pub fn good_run(&self) -> u32 {
        self.good_run
    }

    pub fn last_event(&self) -> Option<StabilizerEvent> {
        self.last_event
    }

    /// Clear history, estimate and success run.
    pub fn reset(&mut self) {
        self.history.clear();
        self.ema = None;
        self.good_run = 0;
        self.last_event = None;
    }

    /// Start confident at a trusted quad (operator calibration).
    pub fn seed(&mut self, quad: Quad) {
        self.reset();
        self.history.push_back(quad);
        self.ema = Some(quad);
        self.good_run = self.params.need_good;
    }
}

fn blend(a: &Quad, b: &Quad, alpha: f32) -> Quad {
    let mut corners = a.corners;
    for (c, (pa, pb)) in corners.iter_mut().zip(a.corners.iter().zip(b.corners.iter())) {
        *c = Point2::new(
            alpha * pa.x + (1.0 - alpha) * pb.x,
            alpha * pa.y + (1.0 - alpha) * pb.y,
        );
    }
    Quad::new(corners)
}

fn median_quad(history: &VecDeque<Quad>) -> Quad {
    let mut corners = [Point2::new(0.0_f32, 0.0); 4];
    let mut xs = Vec::with_capacity(history.len());
    let mut ys = Vec::with_capacity(history.len());
    for (k, c) in corners.iter_mut().enumerate() {
        xs.clear();
        ys.clear();
        for q in history {
            xs.push(q.corners[k].x);
            ys.push(q.corners[k].y);
        }
        *c = Point2::new(median(&mut xs), median(&mut ys));
    }
    Quad::new(corners)
}

fn median(v: &mut [f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32) -> Quad {
        Quad::new([
            Point2::new(x, y),
            Point2::new(x + 200.0, y),
            Point2::new(x + 200.0, y + 200.0),
            Point2::new(x, y + 200.0),
        ])
    }

    fn stabilizer() -> CornerStabilizer {
        CornerStabilizer::new(StabilizerParams::default())
    }

    #[test]
    fn needs_consecutive_good_frames() {
        let mut s = stabilizer();
        assert!(s.update(Some(square(10.0, 10.0))).is_none());
        assert!(s.update(Some(square(10.0, 10.0))).is_none());
        let q = s.update(Some(square(10.0, 10.0))).expect("confident after 3");
        assert_eq!(q, square(10.0, 10.0));
    }

    #[test]
    fn absent_frame_resets_run_but_keeps_estimate() {
        let mut s = stabilizer();
        for _ in 0..3 {
            s.update(Some(square(0.0, 0.0)));
        }
        assert!(s.is_confident());
        assert!(s.update(None).is_none());
        assert_eq!(s.good_run(), 0);
        assert!(s.estimate().is_some());
        assert_eq!(s.last_event(), Some(StabilizerEvent::Absent));

        assert!(s.update(Some(square(0.0, 0.0))).is_none());
        assert!(s.update(Some(square(0.0, 0.0))).is_none());
        assert!(s.update(Some(square(0.0, 0.0))).is_some());
    }

    #[test]
    fn jump_is_ignored_without_resetting_run() {
        let mut s = stabilizer();
        for _ in 0..3 {
            s.update(Some(square(0.0, 0.0)));
        }
        let out = s.update(Some(square(300.0, 0.0))).expect("still confident");
        assert_eq!(out, square(0.0, 0.0));
        assert_eq!(s.good_run(), 3);
        assert_eq!(s.last_event(), Some(StabilizerEvent::Jump));
    }

    #[test]
    fn median_suppresses_single_spike() {
        let mut s = stabilizer();
        for _ in 0..4 {
            s.update(Some(square(0.0, 0.0)));
        }
        // within max_jump, but a lone outlier in the median window
        let out = s.update(Some(square(30.0, 0.0))).expect("confident");
        assert!((out.corners[0].x - 0.0).abs() < 1e-4);
    }

    #[test]
    fn ema_follows_genuine_drift() {
        let mut s = stabilizer();
        for _ in 0..3 {
            s.update(Some(square(0.0, 0.0)));
        }
        let mut last = 0.0;
        for _ in 0..30 {
            last = s.update(Some(square(20.0, 0.0))).expect("confident").corners[0].x;
        }
        assert!(last > 19.0, "estimate should converge, got {last}");
    }

    #[test]
    fn full_window_evicts_oldest_quads() {
        // alpha 1 exposes the raw window median
        let mut s = CornerStabilizer::new(StabilizerParams {
            ema_alpha: 1.0,
            ..StabilizerParams::default()
        });
        for _ in 0..4 {
            s.update(Some(square(0.0, 0.0)));
        }
        for _ in 0..3 {
            s.update(Some(square(10.0, 0.0)));
        }
        // window of 7: four at 0, three at 10
        assert_eq!(s.estimate(), Some(square(0.0, 0.0)));

        // an eighth push drops one 0; without eviction the even median would be 5
        let out = s.update(Some(square(10.0, 0.0))).expect("confident");
        assert_eq!(out, square(10.0, 0.0));

        for _ in 0..10 {
            s.update(Some(square(10.0, 0.0)));
        }
        assert_eq!(s.estimate(), Some(square(10.0, 0.0)));
    }

    #[test]
    fn seed_is_immediately_confident() {
        let mut s = stabilizer();
        s.seed(square(5.0, 5.0));
        assert_eq!(s.get(), Some(square(5.0, 5.0)));
        assert_eq!(s.update(Some(square(5.0, 5.0))), Some(square(5.0, 5.0)));
    }

    #[test]
    fn median_of_even_history_averages_middle() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut v), 2.5);
    }
}
