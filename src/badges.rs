use chrono::{DateTime, Duration, Utc};

use crate::fixture::TeamMatchView;

pub const BADGE_COUNT: usize = 7;

/// Minimum history on both sides before any evaluation is attempted.
const MIN_HISTORY: usize = 20;

/// Total-goals line the percentage bands are measured against.
const UNDER_LINE: f64 = 3.5;

/// Wider pre-filter band checked before the per-badge pass.
const PREFILTER_BAND: (f64, f64) = (68.0, 99.0);

/// Band the percentage badges must land in.
const BADGE_BAND: (f64, f64) = (70.0, 99.0);

/// Trigger -> next-match-below rate needed for the trend badges.
const TREND_MIN_RATE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeReport {
    pub badges: [bool; BADGE_COUNT],
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeOutcome {
    /// One side lacks the minimum history; no badge statement can be made.
    NotEvaluable,
    Evaluated(BadgeReport),
}

pub struct BadgeInput<'a> {
    pub team: &'a [TeamMatchView],
    pub opponent: &'a [TeamMatchView],
    /// Whether the team under evaluation hosts the upcoming match.
    pub team_is_home: bool,
    pub as_of: DateTime<Utc>,
}

/// Evaluate the seven historical-pattern indicators for a team against its
/// next opponent. Only matches strictly before `as_of - 1 day` count.
pub fn evaluate_badges(input: &BadgeInput) -> BadgeOutcome {
    let cutoff = (input.as_of - Duration::days(1)).timestamp_millis();
    let team = history_before(input.team, cutoff);
    let opponent = history_before(input.opponent, cutoff);

    if team.len() < MIN_HISTORY || opponent.len() < MIN_HISTORY {
        return BadgeOutcome::NotEvaluable;
    }

    let team_under = under_percentage(&team);
    let opp_under = under_percentage(&opponent);

    // Cheap pre-filter: unless at least one side sits in the wider band, the
    // per-badge pass is skipped and the report stays empty.
    if !in_band(team_under, PREFILTER_BAND) && !in_band(opp_under, PREFILTER_BAND) {
        return BadgeOutcome::Evaluated(BadgeReport {
            badges: [false; BADGE_COUNT],
            count: 0,
        });
    }

    let last_team = team.last();
    let last_opp = opponent.last();

    let mut badges = [false; BADGE_COUNT];
    badges[0] = last_team.map(|v| v.goals_for as f64 > 2.5).unwrap_or(false);
    badges[1] = trend_trigger_fires(&team, |v| v.goals_for as f64, 1.5);
    badges[2] = trend_trigger_fires(&team, |v| v.total_goals() as f64, 3.5);
    badges[3] = last_team
        .map(|v| v.total_goals() as f64 > 3.5)
        .unwrap_or(false);
    badges[4] = last_opp
        .map(|v| v.total_goals() as f64 > 3.5)
        .unwrap_or(false);
    badges[5] = in_band(team_under, BADGE_BAND) && in_band(opp_under, BADGE_BAND);
    badges[6] = split_bands_hold(&team, &opponent, input.team_is_home);

    let count = badges.iter().filter(|b| **b).count();
    BadgeOutcome::Evaluated(BadgeReport { badges, count })
}

/// Chronological (oldest-first) view of everything before the cutoff.
fn history_before(views: &[TeamMatchView], cutoff_ms: i64) -> Vec<TeamMatchView> {
    let mut out: Vec<TeamMatchView> = views
        .iter()
        .copied()
        .filter(|v| v.date_value < cutoff_ms)
        .collect();
    out.sort_by_key(|v| v.date_value);
    out
}

fn under_percentage(history: &[TeamMatchView]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let under = history
        .iter()
        .filter(|v| v.total_goals() as f64 <= UNDER_LINE)
        .count();
    Some(under as f64 / history.len() as f64 * 100.0)
}

fn in_band(pct: Option<f64>, band: (f64, f64)) -> bool {
    pct.map(|p| p >= band.0 && p <= band.1).unwrap_or(false)
}

/// "Next-match-below" pattern: among chronological pairs where a match's
/// metric exceeded the trigger, how often did the very next match come in
/// below it? The badge fires when the most recent match is itself a live
/// trigger and the historical follow-through rate is high enough.
fn trend_trigger_fires(
    history: &[TeamMatchView],
    metric: impl Fn(&TeamMatchView) -> f64,
    line: f64,
) -> bool {
    let Some(last) = history.last() else {
        return false;
    };
    if metric(last) <= line {
        return false;
    }

    let mut triggers = 0usize;
    let mut below_next = 0usize;
    for pair in history.windows(2) {
        if metric(&pair[0]) > line {
            triggers += 1;
            if metric(&pair[1]) < line {
                below_next += 1;
            }
        }
    }

    triggers > 0 && (below_next as f64 / triggers as f64) >= TREND_MIN_RATE
}

/// Badge 7: the hosting side's home games and the visiting side's away games
/// must both sit in the band.
fn split_bands_hold(team: &[TeamMatchView], opponent: &[TeamMatchView], team_is_home: bool) -> bool {
    let (host, visitor) = if team_is_home {
        (team, opponent)
    } else {
        (opponent, team)
    };
    let host_home: Vec<TeamMatchView> = host.iter().copied().filter(|v| v.is_home).collect();
    let visitor_away: Vec<TeamMatchView> = visitor.iter().copied().filter(|v| !v.is_home).collect();

    in_band(under_percentage(&host_home), BADGE_BAND)
        && in_band(under_percentage(&visitor_away), BADGE_BAND)
}
