use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// A played match, already validated. "Not yet played" is modeled by absence:
/// a record without both final scores never becomes a `Match`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub id: u64,
    pub date_utc: DateTime<Utc>,
    pub season: i32,
    pub competition_id: u32,
    pub home_id: u32,
    pub away_id: u32,
    pub goals_home: u32,
    pub goals_away: u32,
}

impl Match {
    pub fn total_goals(&self) -> u32 {
        self.goals_home + self.goals_away
    }

    pub fn date_value(&self) -> i64 {
        self.date_utc.timestamp_millis()
    }

    pub fn view_for(&self, team_id: u32) -> Option<TeamMatchView> {
        if team_id == self.home_id {
            Some(TeamMatchView {
                opponent_id: self.away_id,
                is_home: true,
                goals_for: self.goals_home,
                goals_against: self.goals_away,
                date_value: self.date_value(),
            })
        } else if team_id == self.away_id {
            Some(TeamMatchView {
                opponent_id: self.home_id,
                is_home: false,
                goals_for: self.goals_away,
                goals_against: self.goals_home,
                date_value: self.date_value(),
            })
        } else {
            None
        }
    }
}

/// A match projected from one team's perspective. The home and away views of
/// the same match are swapped mirrors of each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamMatchView {
    pub opponent_id: u32,
    pub is_home: bool,
    pub goals_for: u32,
    pub goals_against: u32,
    pub date_value: i64,
}

impl TeamMatchView {
    pub fn total_goals(&self) -> u32 {
        self.goals_for + self.goals_against
    }
}

/// Why a raw record was not admitted. Rejection is silent by design: an
/// unplayed or malformed fixture is not an error, only a non-fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingId,
    UnparseableDate,
    MissingGoals,
    MissingTeams,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::MissingId => "missing fixture id",
            Rejection::UnparseableDate => "unparseable date",
            Rejection::MissingGoals => "missing or non-numeric goals",
            Rejection::MissingTeams => "missing team ids",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub fetched: usize,
    pub admitted: usize,
}

/// Parse one raw provider record into a canonical `Match`. Raw shapes vary
/// between endpoints, so each field accepts the aliases observed upstream
/// (flat keys, snake_case variants, nested `home.score`, epoch-ms dates).
pub fn normalize_fixture(v: &Value) -> Result<Match, Rejection> {
    let id = num_u64(v, &["id", "matchId", "fixture_id", "fixtureId"]).ok_or(Rejection::MissingId)?;

    let date_utc = field_str(v, &["dateUtc", "utcTime", "date", "kickoff"])
        .and_then(parse_date)
        .or_else(|| num_i64(v, &["dateUtc", "kickoffMs"]).and_then(epoch_ms))
        .ok_or(Rejection::UnparseableDate)?;

    let home_id = num_u64(v, &["homeTeamId", "home_team_id"])
        .or_else(|| nested_u64(v, "home", "id"))
        .ok_or(Rejection::MissingTeams)? as u32;
    let away_id = num_u64(v, &["awayTeamId", "away_team_id"])
        .or_else(|| nested_u64(v, "away", "id"))
        .ok_or(Rejection::MissingTeams)? as u32;

    let goals_home = num_u64(v, &["goalsHome", "homeGoals", "home_goals"])
        .or_else(|| nested_u64(v, "home", "score"))
        .ok_or(Rejection::MissingGoals)? as u32;
    let goals_away = num_u64(v, &["goalsAway", "awayGoals", "away_goals"])
        .or_else(|| nested_u64(v, "away", "score"))
        .ok_or(Rejection::MissingGoals)? as u32;

    let season = num_i64(v, &["season"])
        .map(|s| s as i32)
        .or_else(|| field_str(v, &["season"]).and_then(parse_leading_year))
        .unwrap_or_else(|| date_utc.format("%Y").to_string().parse().unwrap_or(0));

    let competition_id = num_u64(v, &["competitionId", "leagueId", "league_id"])
        .or_else(|| nested_u64(v, "tournament", "leagueId"))
        .unwrap_or(0) as u32;

    Ok(Match {
        id,
        date_utc,
        season,
        competition_id,
        home_id,
        away_id,
        goals_home,
        goals_away,
    })
}

/// Normalize a whole raw list, dropping rejects and counting what survived so
/// callers can surface a "fetched vs usable" diagnostic.
pub fn normalize_all(raw: &[Value]) -> (Vec<Match>, NormalizeReport) {
    let mut out = Vec::with_capacity(raw.len());
    for v in raw {
        if let Ok(m) = normalize_fixture(v) {
            out.push(m);
        }
    }
    let report = NormalizeReport {
        fetched: raw.len(),
        admitted: out.len(),
    };
    (out, report)
}

/// All of one team's played matches, from its own perspective, oldest first.
pub fn team_history(fixtures: &[Match], team_id: u32) -> Vec<TeamMatchView> {
    let mut out: Vec<TeamMatchView> = fixtures
        .iter()
        .filter_map(|m| m.view_for(team_id))
        .collect();
    out.sort_by_key(|v| v.date_value);
    out
}

fn field<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| v.get(k)).filter(|x| !x.is_null())
}

fn field_str<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a str> {
    field(v, keys).and_then(|x| x.as_str())
}

fn num_u64(v: &Value, keys: &[&str]) -> Option<u64> {
    let x = field(v, keys)?;
    x.as_u64()
        .or_else(|| x.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
}

fn num_i64(v: &Value, keys: &[&str]) -> Option<i64> {
    field(v, keys)?.as_i64()
}

fn nested_u64(v: &Value, outer: &str, inner: &str) -> Option<u64> {
    v.get(outer)?.get(inner)?.as_u64()
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

fn epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

fn parse_leading_year(raw: &str) -> Option<i32> {
    let mut buf = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            buf.push(ch);
            if buf.len() == 4 {
                return buf.parse::<i32>().ok();
            }
        } else if !buf.is_empty() {
            break;
        }
    }
    None
}
