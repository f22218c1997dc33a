use std::collections::VecDeque;

use crate::fixture::TeamMatchView;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GoalEntry {
    pub goals_for: f64,
    pub goals_against: f64,
}

impl GoalEntry {
    pub fn total(&self) -> f64 {
        self.goals_for + self.goals_against
    }
}

/// Size-bounded goal history, most-recent-first. Capacity stays small
/// (tens of entries), so truncation on push is cheap; the deque avoids the
/// re-slicing the sweep would otherwise pay per combination, per fixture.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    entries: VecDeque<GoalEntry>,
    capacity: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowAverage {
    pub gf: f64,
    pub ga: f64,
    pub n: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, goals_for: f64, goals_against: f64) {
        self.entries.push_front(GoalEntry {
            goals_for,
            goals_against,
        });
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucketed weighted mean: recent-first chunks of `bucket_size`, each
    /// chunk averaged, chunks combined by `weights` (recency-first). A bucket
    /// past the end of `weights` reuses the last provided weight (1.0 when
    /// none); extra weights are ignored.
    pub fn weighted_average(&self, bucket_size: usize, weights: &[f64]) -> WindowAverage {
        if self.entries.is_empty() {
            return WindowAverage::default();
        }
        let bucket_size = bucket_size.max(1);
        let fallback = weights.last().copied().unwrap_or(1.0);

        let mut gf_acc = 0.0;
        let mut ga_acc = 0.0;
        let mut weight_sum = 0.0;
        let mut n = 0usize;

        let entries: Vec<GoalEntry> = self.entries.iter().copied().collect();
        for (bucket, chunk) in entries.chunks(bucket_size).enumerate() {
            let w = weights.get(bucket).copied().unwrap_or(fallback);
            let len = chunk.len() as f64;
            let gf = chunk.iter().map(|e| e.goals_for).sum::<f64>() / len;
            let ga = chunk.iter().map(|e| e.goals_against).sum::<f64>() / len;
            gf_acc += w * gf;
            ga_acc += w * ga;
            weight_sum += w;
            n += chunk.len();
        }

        if weight_sum <= 0.0 {
            return WindowAverage::default();
        }
        WindowAverage {
            gf: gf_acc / weight_sum,
            ga: ga_acc / weight_sum,
            n,
        }
    }

    /// Same bucket weighting applied to a per-entry indicator. This is the
    /// empirical frequency behind the outcome model's historical estimates.
    pub fn weighted_rate(
        &self,
        bucket_size: usize,
        weights: &[f64],
        pred: impl Fn(&GoalEntry) -> bool,
    ) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let bucket_size = bucket_size.max(1);
        let fallback = weights.last().copied().unwrap_or(1.0);

        let mut acc = 0.0;
        let mut weight_sum = 0.0;

        let entries: Vec<GoalEntry> = self.entries.iter().copied().collect();
        for (bucket, chunk) in entries.chunks(bucket_size).enumerate() {
            let w = weights.get(bucket).copied().unwrap_or(fallback);
            let hits = chunk.iter().filter(|&e| pred(e)).count() as f64;
            acc += w * hits / chunk.len() as f64;
            weight_sum += w;
        }

        if weight_sum <= 0.0 {
            return None;
        }
        Some((acc / weight_sum).clamp(0.0, 1.0))
    }
}

/// Per-team home/away split windows.
#[derive(Debug, Clone)]
pub struct TeamForm {
    pub home: RollingWindow,
    pub away: RollingWindow,
}

impl TeamForm {
    pub fn new(capacity: usize) -> Self {
        Self {
            home: RollingWindow::new(capacity),
            away: RollingWindow::new(capacity),
        }
    }

    pub fn record(&mut self, view: &TeamMatchView) {
        let window = if view.is_home {
            &mut self.home
        } else {
            &mut self.away
        };
        window.push(view.goals_for as f64, view.goals_against as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(pairs: &[(f64, f64)], capacity: usize) -> RollingWindow {
        // Pairs given oldest-first so pushes land most-recent-first.
        let mut w = RollingWindow::new(capacity);
        for (gf, ga) in pairs {
            w.push(*gf, *ga);
        }
        w
    }

    #[test]
    fn empty_window_averages_to_zero() {
        let w = RollingWindow::new(10);
        assert_eq!(
            w.weighted_average(5, &[1.0]),
            WindowAverage {
                gf: 0.0,
                ga: 0.0,
                n: 0
            }
        );
        assert!(w.weighted_rate(5, &[1.0], |_| true).is_none());
    }

    #[test]
    fn capacity_truncates_oldest() {
        let w = window(&[(9.0, 9.0), (1.0, 0.0), (2.0, 0.0)], 2);
        let avg = w.weighted_average(2, &[1.0]);
        assert_eq!(avg.n, 2);
        assert!((avg.gf - 1.5).abs() < 1e-12);
    }

    #[test]
    fn buckets_are_weighted_recent_first() {
        // Recent bucket [3, 3], old bucket [1, 1]; weights 1.0 / 0.5.
        let w = window(&[(1.0, 0.0), (1.0, 0.0), (3.0, 0.0), (3.0, 0.0)], 10);
        let avg = w.weighted_average(2, &[1.0, 0.5]);
        let expected = (1.0 * 3.0 + 0.5 * 1.0) / 1.5;
        assert!((avg.gf - expected).abs() < 1e-12);
        assert_eq!(avg.n, 4);
    }

    #[test]
    fn short_last_bucket_and_missing_weights() {
        // 5 entries in buckets of 2 -> 3 buckets, only 2 weights provided:
        // the third bucket reuses the last weight.
        let w = window(
            &[(5.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 0.0)],
            10,
        );
        let avg = w.weighted_average(2, &[1.0, 0.5]);
        let expected = (1.0 * 2.0 + 0.5 * 1.0 + 0.5 * 5.0) / 2.0;
        assert!((avg.gf - expected).abs() < 1e-12);
        assert_eq!(avg.n, 5);
    }

    #[test]
    fn weighted_rate_counts_indicator_per_bucket() {
        let w = window(&[(0.0, 0.0), (0.0, 0.0), (4.0, 0.0), (4.0, 0.0)], 10);
        // Recent bucket all over 2.5, old bucket none.
        let rate = w.weighted_rate(2, &[1.0, 1.0], |e| e.total() > 2.5).unwrap();
        assert!((rate - 0.5).abs() < 1e-12);
        let rate = w.weighted_rate(2, &[1.0, 0.0001], |e| e.total() > 2.5).unwrap();
        assert!(rate > 0.99);
    }
}
