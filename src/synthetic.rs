use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fixture::Match;

const SEASON_START_YEAR: i32 = 2024;
const HOME_LAMBDA: f64 = 1.45;
const AWAY_LAMBDA: f64 = 1.15;

/// A deterministic head-to-head series: `count` weekly matches between two
/// teams, venue alternating, scores cycling through `scores` as
/// (home goals, away goals). Handy for constructing exact model inputs in
/// tests.
pub fn two_team_series(
    team_a: u32,
    team_b: u32,
    count: usize,
    scores: &[(u32, u32)],
) -> Vec<Match> {
    let base = Utc
        .with_ymd_and_hms(SEASON_START_YEAR, 8, 1, 15, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    (0..count)
        .map(|i| {
            let (home_id, away_id) = if i % 2 == 0 {
                (team_a, team_b)
            } else {
                (team_b, team_a)
            };
            let (goals_home, goals_away) = scores
                .get(i % scores.len().max(1))
                .copied()
                .unwrap_or((1, 1));
            Match {
                id: (i + 1) as u64,
                date_utc: base + Duration::weeks(i as i64),
                season: SEASON_START_YEAR,
                competition_id: 1,
                home_id,
                away_id,
                goals_home,
                goals_away,
            }
        })
        .collect()
}

/// A seeded synthetic league season: every pairing plays once per round with
/// the venue flipping between rounds, scores drawn from independent Poissons.
/// Same seed, same season.
pub fn league_season(seed: u64, team_count: u32, rounds: usize) -> Vec<Match> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = Utc
        .with_ymd_and_hms(SEASON_START_YEAR, 8, 1, 15, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let mut out = Vec::new();
    let mut id = 0u64;
    for round in 0..rounds {
        for a in 1..=team_count {
            for b in (a + 1)..=team_count {
                let (home_id, away_id) = if round % 2 == 0 { (a, b) } else { (b, a) };
                id += 1;
                out.push(Match {
                    id,
                    date_utc: base + Duration::weeks(round as i64),
                    season: SEASON_START_YEAR,
                    competition_id: 1,
                    home_id,
                    away_id,
                    goals_home: sample_poisson(&mut rng, HOME_LAMBDA),
                    goals_away: sample_poisson(&mut rng, AWAY_LAMBDA),
                });
            }
        }
    }
    out
}

fn sample_poisson(rng: &mut StdRng, lambda: f64) -> u32 {
    // Knuth's method; fine for the small lambdas used here.
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        p *= rng.r#gen::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
    }
}
