use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use goalform::backtest::{run_backtest, summarize};
use goalform::fixture::{self, Match};
use goalform::settings::{AlgoSettings, MarketLine};
use goalform::synthetic;

const REPORT_THRESHOLDS: &[f64] = &[0.55, 0.60, 0.65, 0.70, 0.75];

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let fixtures = load_fixtures()?;
    if fixtures.is_empty() {
        return Err(anyhow!("no usable fixtures"));
    }

    let team_id = parse_u32_arg("--team")
        .or_else(|| env_u32("TEAM_ID"))
        .ok_or_else(|| anyhow!("pass --team <id> (or set TEAM_ID)"))?;

    let settings = settings_from_args();
    let run = run_backtest(&fixtures, team_id, &settings);

    println!("Backtest for team {team_id}");
    println!(
        "Fixtures: {} | evaluated picks: {}",
        fixtures.len(),
        run.picks.len()
    );
    println!();

    if has_flag("--verbose") {
        for p in &run.picks {
            println!(
                "{} #{:<8} {:>10} p={:.3} {} ({})",
                p.date_utc.format("%Y-%m-%d"),
                p.fixture_id,
                p.pick,
                p.probability,
                if p.hit { "HIT " } else { "miss" },
                p.score
            );
        }
        println!();
    }

    println!("threshold  picks  hits  hit_rate  coverage");
    for &threshold in REPORT_THRESHOLDS {
        let s = summarize(&run, threshold);
        println!(
            "{threshold:>9.2}  {:>5}  {:>4}  {:>8.3}  {:>8.3}",
            s.picks, s.hits, s.hit_rate, s.coverage
        );
    }

    Ok(())
}

fn load_fixtures() -> Result<Vec<Match>> {
    if has_flag("--synthetic") {
        let seed = parse_u64_arg("--seed").unwrap_or(42);
        let fixtures = synthetic::league_season(seed, 12, 22);
        println!("Synthetic season: {} fixtures (seed {seed})", fixtures.len());
        return Ok(fixtures);
    }

    let path = parse_path_arg("--fixtures")
        .or_else(|| std::env::var("FIXTURES_PATH").ok().map(PathBuf::from))
        .ok_or_else(|| anyhow!("pass --fixtures <path> or --synthetic"))?;

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read fixtures from {}", path.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("fixtures file must be a JSON array")?;
    let (fixtures, report) = fixture::normalize_all(&values);
    println!(
        "Loaded {}: {} fetched, {} usable",
        path.display(),
        report.fetched,
        report.admitted
    );
    Ok(fixtures)
}

fn settings_from_args() -> AlgoSettings {
    let mut settings = AlgoSettings::default();
    if let Some(v) = parse_usize_arg("--window") {
        settings.window_size = v;
    }
    if let Some(v) = parse_usize_arg("--bucket") {
        settings.bucket_size = v;
    }
    if let Some(v) = parse_f64_arg("--threshold") {
        settings.threshold = v;
    }
    if let Some(v) = parse_usize_arg("--min-matches") {
        settings.min_matches = v;
    }
    if let Some(v) = parse_usize_arg("--min-league-matches") {
        settings.min_league_matches = v;
    }
    if let Some(raw) = parse_string_arg("--lines") {
        let lines: Vec<MarketLine> = raw
            .split(',')
            .filter_map(MarketLine::parse)
            .collect();
        if !lines.is_empty() {
            settings.lines = lines;
        }
    }
    settings.normalized()
}

fn args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = args();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    parse_string_arg(name).and_then(|raw| raw.parse::<f64>().ok())
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_string_arg(name).and_then(|raw| raw.parse::<usize>().ok())
}

fn parse_u32_arg(name: &str) -> Option<u32> {
    parse_string_arg(name).and_then(|raw| raw.parse::<u32>().ok())
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_string_arg(name).and_then(|raw| raw.parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse::<u32>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
