use crate::fixture::Match;
use crate::rolling::{RollingWindow, WindowAverage};
use crate::settings::{AlgoSettings, DoubleChance, MarketLine};

/// League-average fallbacks used until a league has enough of its own sample.
pub const BASELINE_HOME_GOALS: f64 = 1.35;
pub const BASELINE_AWAY_GOALS: f64 = 1.15;

/// Fixed blend between the Poisson estimate and the empirical frequency.
const POISSON_WEIGHT: f64 = 0.6;
const EMPIRICAL_WEIGHT: f64 = 0.4;

/// Expected-goal clamp keeping the Poisson parameters away from degenerate
/// territory.
const XG_MIN: f64 = 0.1;
const XG_MAX: f64 = 6.0;

/// Incremental league-wide goal sums over chronologically prior matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeagueTally {
    home_goals: f64,
    away_goals: f64,
    sample: usize,
}

impl LeagueTally {
    pub fn absorb(&mut self, m: &Match) {
        self.home_goals += m.goals_home as f64;
        self.away_goals += m.goals_away as f64;
        self.sample += 1;
    }

    pub fn averages(&self) -> LeagueAverages {
        if self.sample == 0 {
            return LeagueAverages {
                home_goals: 0.0,
                away_goals: 0.0,
                sample: 0,
            };
        }
        let n = self.sample as f64;
        LeagueAverages {
            home_goals: self.home_goals / n,
            away_goals: self.away_goals / n,
            sample: self.sample,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LeagueAverages {
    pub home_goals: f64,
    pub away_goals: f64,
    pub sample: usize,
}

impl LeagueAverages {
    /// Average goals for the home and away side, substituting the documented
    /// baselines when the league sample is still below the minimum. Clamped
    /// away from zero so the rating ratios stay finite.
    pub fn effective(&self, min_league_matches: usize) -> (f64, f64) {
        if self.sample < min_league_matches {
            (BASELINE_HOME_GOALS, BASELINE_AWAY_GOALS)
        } else {
            (self.home_goals.max(0.1), self.away_goals.max(0.1))
        }
    }
}

/// Shrinkage-adjusted attack/defense ratings relative to league averages.
#[derive(Debug, Clone, Copy)]
pub struct TeamStrength {
    pub attack: f64,
    pub defense: f64,
    pub sample: usize,
}

impl TeamStrength {
    /// `league_for` is the league average for the side this team plays
    /// (home or away), `league_against` the opposing side's average. The
    /// window capacity doubles as the shrinkage prior strength.
    pub fn from_average(
        avg: WindowAverage,
        league_for: f64,
        league_against: f64,
        prior_weight: usize,
    ) -> TeamStrength {
        let n = avg.n as f64;
        let prior = prior_weight.max(1) as f64;
        let adj_gf = (avg.gf * n + league_for * prior) / (n + prior);
        let adj_ga = (avg.ga * n + league_against * prior) / (n + prior);
        TeamStrength {
            attack: adj_gf / league_for,
            defense: adj_ga / league_against,
            sample: avg.n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchProjection {
    pub xg_home: f64,
    pub xg_away: f64,
}

impl MatchProjection {
    pub fn lambda_total(&self) -> f64 {
        self.xg_home + self.xg_away
    }
}

pub fn project_match(
    home: TeamStrength,
    away: TeamStrength,
    league_home: f64,
    league_away: f64,
) -> MatchProjection {
    MatchProjection {
        xg_home: (home.attack * away.defense * league_home).clamp(XG_MIN, XG_MAX),
        xg_away: (away.attack * home.defense * league_away).clamp(XG_MIN, XG_MAX),
    }
}

/// Iterative Poisson CDF; each term is derived from the previous one so there
/// is no factorial to overflow.
pub fn poisson_cdf(lambda: f64, k: u32) -> f64 {
    let lambda = lambda.max(1e-9);
    let mut term = (-lambda).exp();
    let mut sum = term;
    for i in 1..=k {
        term *= lambda / i as f64;
        sum += term;
    }
    sum.min(1.0)
}

pub fn prob_total_over(lambda: f64, line: f64) -> f64 {
    let k = line.max(0.0).floor() as u32;
    (1.0 - poisson_cdf(lambda, k)).clamp(0.0, 1.0)
}

/// A fully-resolved candidate market. Each numeric line contributes an Over
/// and an Under candidate, each double-chance code contributes one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Market {
    Over(f64),
    Under(f64),
    DoubleChance(DoubleChance),
}

impl Market {
    pub fn label(&self) -> String {
        match self {
            Market::Over(l) => format!("Over {l}"),
            Market::Under(l) => format!("Under {l}"),
            Market::DoubleChance(dc) => dc.code().to_string(),
        }
    }

    pub fn hit(&self, goals_home: u32, goals_away: u32) -> bool {
        let total = (goals_home + goals_away) as f64;
        match self {
            Market::Over(l) => total > *l,
            Market::Under(l) => total < *l,
            Market::DoubleChance(DoubleChance::HomeOrDraw) => goals_home >= goals_away,
            Market::DoubleChance(DoubleChance::DrawOrAway) => goals_away >= goals_home,
            Market::DoubleChance(DoubleChance::HomeOrAway) => goals_home != goals_away,
        }
    }
}

/// Everything the model needs for one matchup: the home team's home window,
/// the away team's away window, and the league backdrop.
pub struct MatchInputs<'a> {
    pub home_form: &'a RollingWindow,
    pub away_form: &'a RollingWindow,
    pub league: LeagueAverages,
}

/// Highest-probability candidate over the configured lines, or the reason no
/// rating was computable. The threshold is deliberately not applied here.
pub fn best_candidate(
    inputs: &MatchInputs,
    settings: &AlgoSettings,
) -> Result<(Market, f64), &'static str> {
    let (league_home, league_away) = inputs.league.effective(settings.min_league_matches);

    let home_avg = inputs
        .home_form
        .weighted_average(settings.bucket_size, &settings.weights);
    if home_avg.n < settings.min_matches {
        return Err("home sample below minimum");
    }
    let away_avg = inputs
        .away_form
        .weighted_average(settings.bucket_size, &settings.weights);
    if away_avg.n < settings.min_matches {
        return Err("away sample below minimum");
    }

    let home = TeamStrength::from_average(home_avg, league_home, league_away, settings.window_size);
    let away = TeamStrength::from_average(away_avg, league_away, league_home, settings.window_size);
    let projection = project_match(home, away, league_home, league_away);

    let mut best: Option<(Market, f64)> = None;
    for market in candidate_markets(&settings.lines) {
        let Some(p) = market_probability(market, &projection, inputs, settings) else {
            continue;
        };
        // Strict comparison keeps the first-seen candidate on exact ties.
        match best {
            Some((_, bp)) if p <= bp => {}
            _ => best = Some((market, p)),
        }
    }

    best.ok_or("no candidate markets")
}

fn candidate_markets(lines: &[MarketLine]) -> Vec<Market> {
    let mut out = Vec::with_capacity(lines.len() * 2);
    for line in lines {
        match line {
            MarketLine::Total(l) => {
                out.push(Market::Over(*l));
                out.push(Market::Under(*l));
            }
            MarketLine::DoubleChance(dc) => out.push(Market::DoubleChance(*dc)),
        }
    }
    out
}

fn market_probability(
    market: Market,
    projection: &MatchProjection,
    inputs: &MatchInputs,
    settings: &AlgoSettings,
) -> Option<f64> {
    match market {
        Market::Over(line) => Some(blend(
            prob_total_over(projection.lambda_total(), line),
            empirical_total_over(inputs, settings, line),
        )),
        Market::Under(line) => Some(
            1.0 - blend(
                prob_total_over(projection.lambda_total(), line),
                empirical_total_over(inputs, settings, line),
            ),
        ),
        // No closed-form decomposition without a joint home/away goal model,
        // so double chance is empirical-only.
        Market::DoubleChance(dc) => empirical_double_chance(inputs, settings, dc),
    }
}

fn blend(poisson: f64, empirical: Option<f64>) -> f64 {
    match empirical {
        Some(e) => POISSON_WEIGHT * poisson + EMPIRICAL_WEIGHT * e,
        None => poisson,
    }
}

fn empirical_total_over(
    inputs: &MatchInputs,
    settings: &AlgoSettings,
    line: f64,
) -> Option<f64> {
    let home = inputs
        .home_form
        .weighted_rate(settings.bucket_size, &settings.weights, |e| {
            e.total() > line
        });
    let away = inputs
        .away_form
        .weighted_rate(settings.bucket_size, &settings.weights, |e| {
            e.total() > line
        });
    mean_of(home, away)
}

fn empirical_double_chance(
    inputs: &MatchInputs,
    settings: &AlgoSettings,
    dc: DoubleChance,
) -> Option<f64> {
    // Entries in the home window are from the home team's perspective and
    // entries in the away window from the away team's, so the fixture-level
    // outcome flips between the two.
    let (home, away) = match dc {
        DoubleChance::HomeOrDraw => (
            inputs
                .home_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_for >= e.goals_against
                }),
            inputs
                .away_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_against >= e.goals_for
                }),
        ),
        DoubleChance::DrawOrAway => (
            inputs
                .home_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_against >= e.goals_for
                }),
            inputs
                .away_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_for >= e.goals_against
                }),
        ),
        DoubleChance::HomeOrAway => (
            inputs
                .home_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_for != e.goals_against
                }),
            inputs
                .away_form
                .weighted_rate(settings.bucket_size, &settings.weights, |e| {
                    e.goals_for != e.goals_against
                }),
        ),
    };
    mean_of(home, away)
}

fn mean_of(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rolling::RollingWindow;

    fn filled_window(pairs: &[(f64, f64)]) -> RollingWindow {
        let mut w = RollingWindow::new(30);
        for (gf, ga) in pairs {
            w.push(*gf, *ga);
        }
        w
    }

    #[test]
    fn poisson_cdf_is_monotone_and_converges() {
        let mut prev = 0.0;
        for k in 0..=50 {
            let p = poisson_cdf(2.0, k);
            assert!(p >= prev);
            prev = p;
        }
        assert!(poisson_cdf(2.0, 50) > 0.999999);
        // Degenerate lambda is clamped, not thrown.
        assert!(poisson_cdf(-3.0, 0) > 0.999);
    }

    #[test]
    fn shrinkage_pulls_small_samples_toward_league() {
        let avg = WindowAverage {
            gf: 4.0,
            ga: 0.5,
            n: 2,
        };
        let s = TeamStrength::from_average(avg, 1.35, 1.15, 20);
        // Two matches against a prior of 20: ratings stay close to neutral.
        assert!(s.attack > 1.0 && s.attack < 1.3);
        assert!(s.defense < 1.0 && s.defense > 0.8);

        let big = WindowAverage {
            gf: 4.0,
            ga: 0.5,
            n: 200,
        };
        let s_big = TeamStrength::from_average(big, 1.35, 1.15, 20);
        assert!(s_big.attack > s.attack);
    }

    #[test]
    fn projection_is_clamped() {
        let monster = TeamStrength {
            attack: 50.0,
            defense: 50.0,
            sample: 30,
        };
        let p = project_match(monster, monster, 1.35, 1.15);
        assert!((p.xg_home - 6.0).abs() < 1e-12);
        assert!((p.xg_away - 6.0).abs() < 1e-12);
    }

    #[test]
    fn min_matches_is_a_hard_gate() {
        let home = filled_window(&[(2.0, 1.0), (1.0, 1.0)]);
        let away = filled_window(&[(0.0, 2.0), (1.0, 3.0)]);
        let inputs = MatchInputs {
            home_form: &home,
            away_form: &away,
            league: LeagueAverages {
                home_goals: 1.4,
                away_goals: 1.1,
                sample: 100,
            },
        };
        let settings = AlgoSettings {
            min_matches: 5,
            ..AlgoSettings::default()
        }
        .normalized();
        assert_eq!(
            best_candidate(&inputs, &settings),
            Err("home sample below minimum")
        );
    }

    #[test]
    fn high_scoring_sides_prefer_overs() {
        let home = filled_window(&[(3.0, 2.0); 10]);
        let away = filled_window(&[(2.0, 3.0); 10]);
        let inputs = MatchInputs {
            home_form: &home,
            away_form: &away,
            league: LeagueAverages {
                home_goals: 1.4,
                away_goals: 1.1,
                sample: 100,
            },
        };
        let settings = AlgoSettings {
            lines: vec![MarketLine::Total(2.5)],
            ..AlgoSettings::default()
        }
        .normalized();
        let (market, p) = best_candidate(&inputs, &settings).unwrap();
        assert_eq!(market, Market::Over(2.5));
        assert!(p > 0.5 && p < 1.0);
    }

    #[test]
    fn double_chance_reads_both_perspectives() {
        // Home side never loses at home; away side never wins away.
        let home = filled_window(&[(2.0, 0.0); 10]);
        let away = filled_window(&[(0.0, 2.0); 10]);
        let inputs = MatchInputs {
            home_form: &home,
            away_form: &away,
            league: LeagueAverages {
                home_goals: 1.4,
                away_goals: 1.1,
                sample: 100,
            },
        };
        let settings = AlgoSettings {
            lines: vec![MarketLine::DoubleChance(DoubleChance::HomeOrDraw)],
            ..AlgoSettings::default()
        }
        .normalized();
        let (market, p) = best_candidate(&inputs, &settings).unwrap();
        assert_eq!(market, Market::DoubleChance(DoubleChance::HomeOrDraw));
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn market_hit_rules() {
        assert!(Market::Over(2.5).hit(2, 1));
        assert!(!Market::Over(2.5).hit(1, 1));
        assert!(Market::Under(2.5).hit(1, 1));
        assert!(Market::DoubleChance(DoubleChance::HomeOrDraw).hit(1, 1));
        assert!(!Market::DoubleChance(DoubleChance::HomeOrAway).hit(1, 1));
        assert!(Market::DoubleChance(DoubleChance::DrawOrAway).hit(0, 2));
    }
}
