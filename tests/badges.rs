use chrono::{Duration, TimeZone, Utc};

use goalform::badges::{BADGE_COUNT, BadgeInput, BadgeOutcome, evaluate_badges};
use goalform::fixture::team_history;
use goalform::synthetic;

#[test]
fn badge_count_is_always_in_range_over_random_seasons() {
    for seed in 0..20 {
        let fixtures = synthetic::league_season(seed, 10, 20);
        let as_of = fixtures
            .last()
            .map(|m| m.date_utc + Duration::weeks(1))
            .unwrap_or_else(Utc::now);

        for team_id in 1..=10u32 {
            let opponent_id = team_id % 10 + 1;
            let team = team_history(&fixtures, team_id);
            let opponent = team_history(&fixtures, opponent_id);
            match evaluate_badges(&BadgeInput {
                team: &team,
                opponent: &opponent,
                team_is_home: team_id % 2 == 0,
                as_of,
            }) {
                BadgeOutcome::NotEvaluable => {}
                BadgeOutcome::Evaluated(report) => {
                    assert!(report.count <= BADGE_COUNT);
                    assert_eq!(
                        report.count,
                        report.badges.iter().filter(|b| **b).count()
                    );
                }
            }
        }
    }
}

#[test]
fn early_season_is_not_evaluable() {
    let fixtures = synthetic::league_season(3, 10, 2);
    let as_of = Utc
        .with_ymd_and_hms(2024, 9, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let team = team_history(&fixtures, 1);
    let opponent = team_history(&fixtures, 2);
    // Two rounds give each side at most two matches.
    assert_eq!(
        evaluate_badges(&BadgeInput {
            team: &team,
            opponent: &opponent,
            team_is_home: true,
            as_of,
        }),
        BadgeOutcome::NotEvaluable
    );
}

#[test]
fn evaluation_is_deterministic() {
    let fixtures = synthetic::league_season(9, 8, 24);
    let as_of = fixtures
        .last()
        .map(|m| m.date_utc + Duration::weeks(1))
        .unwrap_or_else(Utc::now);
    let team = team_history(&fixtures, 3);
    let opponent = team_history(&fixtures, 4);
    let input = BadgeInput {
        team: &team,
        opponent: &opponent,
        team_is_home: false,
        as_of,
    };
    assert_eq!(evaluate_badges(&input), evaluate_badges(&input));
}
