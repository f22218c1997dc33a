use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::fixture::Match;
use crate::model::{self, LeagueTally, Market, MatchInputs};
use crate::rolling::{RollingWindow, TeamForm};
use crate::settings::AlgoSettings;

/// One evaluated historical decision. Picks are recorded regardless of the
/// threshold so a single run supports multiple threshold analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestPick {
    pub fixture_id: u64,
    pub date_utc: DateTime<Utc>,
    pub pick: String,
    pub probability: f64,
    pub hit: bool,
    pub score: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestRun {
    pub picks: Vec<BacktestPick>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BacktestSummary {
    pub picks: usize,
    pub hits: usize,
    pub hit_rate: f64,
    pub coverage: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct NextMatch {
    pub home_id: u32,
    pub away_id: u32,
    pub date_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BestPick {
    Pick { market: Market, probability: f64 },
    NoBet { market: Market, probability: f64 },
    NoData { reason: &'static str },
}

/// Rolling per-team and league-wide state built strictly from already-played
/// fixtures.
struct ReplayState {
    forms: HashMap<u32, TeamForm>,
    league: LeagueTally,
    capacity: usize,
    empty: RollingWindow,
}

impl ReplayState {
    fn new(capacity: usize) -> Self {
        Self {
            forms: HashMap::new(),
            league: LeagueTally::default(),
            capacity,
            empty: RollingWindow::new(capacity),
        }
    }

    fn absorb(&mut self, m: &Match) {
        for team_id in [m.home_id, m.away_id] {
            if let Some(view) = m.view_for(team_id) {
                self.forms
                    .entry(team_id)
                    .or_insert_with(|| TeamForm::new(self.capacity))
                    .record(&view);
            }
        }
        self.league.absorb(m);
    }

    fn inputs(&self, home_id: u32, away_id: u32) -> MatchInputs<'_> {
        let home_form = self
            .forms
            .get(&home_id)
            .map(|f| &f.home)
            .unwrap_or(&self.empty);
        let away_form = self
            .forms
            .get(&away_id)
            .map(|f| &f.away)
            .unwrap_or(&self.empty);
        MatchInputs {
            home_form,
            away_form,
            league: self.league.averages(),
        }
    }
}

/// Replay the fixture list in date order and evaluate every fixture involving
/// `team_id` against data that was available strictly before its kickoff date.
/// Same-date fixtures are held back until the date advances, so nothing from
/// fixture k's own matchday can leak into its pick.
pub fn run_backtest(fixtures: &[Match], team_id: u32, settings: &AlgoSettings) -> BacktestRun {
    let settings = settings.normalized();

    let mut ordered: Vec<&Match> = fixtures.iter().collect();
    ordered.sort_by_key(|m| (m.date_value(), m.id));

    let mut state = ReplayState::new(settings.window_size);
    let mut pending: Vec<&Match> = Vec::new();
    let mut pending_date = i64::MIN;
    let mut picks = Vec::new();

    for m in ordered {
        if m.date_value() > pending_date {
            for prior in pending.drain(..) {
                state.absorb(prior);
            }
            pending_date = m.date_value();
        }

        if m.home_id == team_id || m.away_id == team_id {
            let inputs = state.inputs(m.home_id, m.away_id);
            if let Ok((market, probability)) = model::best_candidate(&inputs, &settings) {
                picks.push(BacktestPick {
                    fixture_id: m.id,
                    date_utc: m.date_utc,
                    pick: market.label(),
                    probability,
                    hit: market.hit(m.goals_home, m.goals_away),
                    score: format!("{}-{}", m.goals_home, m.goals_away),
                });
            }
        }

        pending.push(m);
    }

    BacktestRun { picks }
}

/// Threshold-filtered aggregation. The threshold is inclusive: a pick at
/// exactly the threshold counts as selected. Empty denominators yield 0.
pub fn summarize(run: &BacktestRun, threshold: f64) -> BacktestSummary {
    let selected: Vec<&BacktestPick> = run
        .picks
        .iter()
        .filter(|p| p.probability >= threshold)
        .collect();
    let hits = selected.iter().filter(|p| p.hit).count();

    let hit_rate = if selected.is_empty() {
        0.0
    } else {
        hits as f64 / selected.len() as f64
    };
    let coverage = if run.picks.is_empty() {
        0.0
    } else {
        selected.len() as f64 / run.picks.len() as f64
    };

    BacktestSummary {
        picks: selected.len(),
        hits,
        hit_rate,
        coverage,
    }
}

/// Score one upcoming matchup using only fixtures strictly before its date.
pub fn compute_best_pick(
    fixtures: &[Match],
    next: &NextMatch,
    settings: &AlgoSettings,
) -> BestPick {
    let settings = settings.normalized();
    let cutoff = next.date_utc.timestamp_millis();

    let mut prior: Vec<&Match> = fixtures
        .iter()
        .filter(|m| m.date_value() < cutoff)
        .collect();
    prior.sort_by_key(|m| (m.date_value(), m.id));

    let mut state = ReplayState::new(settings.window_size);
    for m in prior {
        state.absorb(m);
    }

    let inputs = state.inputs(next.home_id, next.away_id);
    match model::best_candidate(&inputs, &settings) {
        Ok((market, probability)) if probability >= settings.threshold => BestPick::Pick {
            market,
            probability,
        },
        Ok((market, probability)) => BestPick::NoBet {
            market,
            probability,
        },
        Err(reason) => BestPick::NoData { reason },
    }
}
