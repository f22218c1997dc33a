use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::backtest::{self, BacktestSummary};
use crate::fixture::Match;
use crate::settings::{AlgoSettings, LineSet, WeightProfile};

const WINDOW_SIZES: &[usize] = &[10, 15, 20, 25, 30];
const BUCKET_SIZES: &[usize] = &[3, 5];
const THRESHOLDS: &[f64] = &[0.55, 0.60, 0.65, 0.70, 0.75];
const MIN_MATCHES: &[usize] = &[3, 5, 8];
const MIN_LEAGUE_MATCHES: &[usize] = &[10, 30];
const PROFILES: &[WeightProfile] = &[
    WeightProfile::Soft,
    WeightProfile::Medium,
    WeightProfile::Hard,
];

/// Configurations evaluated per cancellation/progress checkpoint.
const CHUNK: usize = 64;

const QUICK_MIN: usize = 20;
const QUICK_MAX: usize = 50;

/// Only configurations in this hit-rate band are worth ranking.
const HIT_RATE_BAND: (f64, f64) = (0.8, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    Quick,
    Full,
}

pub struct SweepOptions<'a> {
    pub mode: SweepMode,
    pub seed: u64,
    pub line_sets: &'a [LineSet],
    pub result_limit: usize,
    /// Checked between chunks; when set, the sweep stops and ranks what it
    /// has so far.
    pub cancel: Option<&'a AtomicBool>,
    /// Called after each chunk with (evaluated, total).
    pub progress: Option<&'a (dyn Fn(usize, usize) + Sync)>,
}

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub settings: AlgoSettings,
    pub profile: WeightProfile,
    pub line_set: &'static str,
    pub summary: BacktestSummary,
}

#[derive(Debug, Clone)]
struct GridCell {
    settings: AlgoSettings,
    profile: WeightProfile,
    line_set: &'static str,
}

/// The full Cartesian grid, already normalized into runnable settings.
pub fn sweep_grid(line_sets: &[LineSet]) -> Vec<(AlgoSettings, WeightProfile, &'static str)> {
    build_grid(line_sets)
        .into_iter()
        .map(|c| (c.settings, c.profile, c.line_set))
        .collect()
}

fn build_grid(line_sets: &[LineSet]) -> Vec<GridCell> {
    let mut out = Vec::new();
    for &window_size in WINDOW_SIZES {
        for &bucket_size in BUCKET_SIZES {
            for &threshold in THRESHOLDS {
                for &min_matches in MIN_MATCHES {
                    for &min_league_matches in MIN_LEAGUE_MATCHES {
                        for &profile in PROFILES {
                            for set in line_sets {
                                let buckets = window_size.div_ceil(bucket_size);
                                let settings = AlgoSettings {
                                    window_size,
                                    bucket_size,
                                    threshold,
                                    min_matches,
                                    min_league_matches,
                                    weights: profile.weights(buckets),
                                    lines: set.lines.clone(),
                                }
                                .normalized();
                                out.push(GridCell {
                                    settings,
                                    profile,
                                    line_set: set.name,
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

/// Evaluate the configuration grid against one team's history and rank the
/// survivors. Quick mode samples a small seeded subset; full mode walks the
/// whole grid in parallel chunks with progress and cancellation checkpoints
/// between them.
pub fn run_sweep(fixtures: &[Match], team_id: u32, opts: &SweepOptions) -> Vec<SweepOutcome> {
    let grid = build_grid(opts.line_sets);
    let selected: Vec<(usize, &GridCell)> = match opts.mode {
        SweepMode::Full => grid.iter().enumerate().collect(),
        SweepMode::Quick => {
            let mut rng = StdRng::seed_from_u64(opts.seed);
            let take = rng.gen_range(QUICK_MIN..=QUICK_MAX).min(grid.len());
            let mut indices: Vec<usize> = (0..grid.len()).collect();
            indices.shuffle(&mut rng);
            indices.truncate(take);
            indices.sort_unstable();
            indices.into_iter().map(|i| (i, &grid[i])).collect()
        }
    };

    let total = selected.len();
    let mut evaluated: Vec<(usize, SweepOutcome)> = Vec::with_capacity(total);

    for chunk in selected.chunks(CHUNK) {
        if let Some(cancel) = opts.cancel {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
        }
        let mut batch: Vec<(usize, SweepOutcome)> = chunk
            .par_iter()
            .map(|(idx, cell)| {
                let run = backtest::run_backtest(fixtures, team_id, &cell.settings);
                let summary = backtest::summarize(&run, cell.settings.threshold);
                (
                    *idx,
                    SweepOutcome {
                        settings: cell.settings.clone(),
                        profile: cell.profile,
                        line_set: cell.line_set,
                        summary,
                    },
                )
            })
            .collect();
        evaluated.append(&mut batch);
        if let Some(progress) = opts.progress {
            progress(evaluated.len(), total);
        }
    }

    rank(evaluated, opts.result_limit)
}

fn rank(mut evaluated: Vec<(usize, SweepOutcome)>, limit: usize) -> Vec<SweepOutcome> {
    evaluated.retain(|(_, o)| {
        o.summary.picks > 0
            && o.summary.hit_rate >= HIT_RATE_BAND.0
            && o.summary.hit_rate <= HIT_RATE_BAND.1
    });
    // Grid index as the final key makes the order total, so a larger result
    // limit only ever extends the list.
    evaluated.sort_by(|(ia, a), (ib, b)| {
        b.summary
            .picks
            .cmp(&a.summary.picks)
            .then(
                b.summary
                    .hit_rate
                    .partial_cmp(&a.summary.hit_rate)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.summary
                    .coverage
                    .partial_cmp(&a.summary.coverage)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(ia.cmp(ib))
    });
    evaluated.truncate(limit);
    evaluated.into_iter().map(|(_, o)| o).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{LineSet, MarketLine};
    use crate::synthetic;

    fn over_heavy_fixtures() -> Vec<Match> {
        // Totals of 4 every week: over 2.5 always lands.
        synthetic::two_team_series(1, 2, 40, &[(3, 1), (2, 2)])
    }

    fn single_line_set() -> Vec<LineSet> {
        vec![LineSet {
            name: "totals-core",
            lines: vec![MarketLine::Total(2.5)],
        }]
    }

    #[test]
    fn grid_covers_the_cartesian_product() {
        let sets = single_line_set();
        let grid = sweep_grid(&sets);
        assert_eq!(grid.len(), 5 * 2 * 5 * 3 * 2 * 3);
    }

    #[test]
    fn quick_sweep_is_reproducible_by_seed() {
        let fixtures = over_heavy_fixtures();
        let sets = single_line_set();
        let opts = SweepOptions {
            mode: SweepMode::Quick,
            seed: 7,
            line_sets: &sets,
            result_limit: 10,
            cancel: None,
            progress: None,
        };
        let a = run_sweep(&fixtures, 1, &opts);
        let b = run_sweep(&fixtures, 1, &opts);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.settings, y.settings);
            assert_eq!(x.summary, y.summary);
        }
    }

    #[test]
    fn larger_limit_extends_not_reorders() {
        let fixtures = over_heavy_fixtures();
        let sets = single_line_set();
        let base = SweepOptions {
            mode: SweepMode::Full,
            seed: 0,
            line_sets: &sets,
            result_limit: 5,
            cancel: None,
            progress: None,
        };
        let small = run_sweep(&fixtures, 1, &base);
        let large = run_sweep(
            &fixtures,
            1,
            &SweepOptions {
                result_limit: 25,
                ..base
            },
        );
        assert!(small.len() <= large.len());
        for (s, l) in small.iter().zip(&large) {
            assert_eq!(s.settings, l.settings);
            assert_eq!(s.summary, l.summary);
        }
        assert!(!large.is_empty(), "over-heavy series should rank entries");
        for o in &large {
            assert!(o.summary.hit_rate >= 0.8 && o.summary.hit_rate <= 1.0);
        }
    }

    #[test]
    fn cancelled_sweep_returns_partial_ranking() {
        let fixtures = over_heavy_fixtures();
        let sets = single_line_set();
        let cancel = AtomicBool::new(true);
        let opts = SweepOptions {
            mode: SweepMode::Full,
            seed: 0,
            line_sets: &sets,
            result_limit: 10,
            cancel: Some(&cancel),
            progress: None,
        };
        assert!(run_sweep(&fixtures, 1, &opts).is_empty());
    }

    #[test]
    fn progress_reaches_total() {
        use std::sync::Mutex;
        let fixtures = over_heavy_fixtures();
        let sets = single_line_set();
        let seen = Mutex::new((0usize, 0usize));
        let progress = |done: usize, total: usize| {
            *seen.lock().unwrap() = (done, total);
        };
        let opts = SweepOptions {
            mode: SweepMode::Quick,
            seed: 1,
            line_sets: &sets,
            result_limit: 10,
            cancel: None,
            progress: Some(&progress),
        };
        run_sweep(&fixtures, 1, &opts);
        let (done, total) = *seen.lock().unwrap();
        assert!(total >= QUICK_MIN && total <= QUICK_MAX);
        assert_eq!(done, total);
    }
}
