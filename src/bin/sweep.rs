use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use goalform::fixture::{self, Match};
use goalform::settings::{LINE_SET_PRESETS, LineSet, line_set_preset};
use goalform::sweep::{SweepMode, SweepOptions, run_sweep};
use goalform::synthetic;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let fixtures = load_fixtures()?;
    if fixtures.is_empty() {
        return Err(anyhow!("no usable fixtures"));
    }

    let team_id = parse_u32_arg("--team")
        .or_else(|| env_u32("TEAM_ID"))
        .ok_or_else(|| anyhow!("pass --team <id> (or set TEAM_ID)"))?;

    let mode = match parse_string_arg("--mode").as_deref() {
        Some("full") => SweepMode::Full,
        Some("quick") | None => SweepMode::Quick,
        Some(other) => return Err(anyhow!("unknown mode {other:?} (quick|full)")),
    };
    let seed = parse_u64_arg("--seed").unwrap_or(0);
    let limit = parse_usize_arg("--limit").unwrap_or(20);

    let line_sets: Vec<LineSet> = match parse_string_arg("--line-set") {
        Some(name) => vec![
            line_set_preset(&name)
                .ok_or_else(|| {
                    let known: Vec<&str> = LINE_SET_PRESETS.iter().map(|s| s.name).collect();
                    anyhow!("unknown line set {name:?}; known: {known:?}")
                })?
                .clone(),
        ],
        None => LINE_SET_PRESETS.clone(),
    };

    let progress = |done: usize, total: usize| {
        eprintln!("evaluated {done}/{total}");
    };

    let results = run_sweep(
        &fixtures,
        team_id,
        &SweepOptions {
            mode,
            seed,
            line_sets: &line_sets,
            result_limit: limit,
            cancel: None,
            progress: Some(&progress),
        },
    );

    if results.is_empty() {
        println!("No configuration landed in the 0.80-1.00 hit-rate band.");
        return Ok(());
    }

    println!("rank  picks  hit_rate  coverage  window  bucket  thr   min  minlg  profile  lines");
    for (rank, o) in results.iter().enumerate() {
        println!(
            "{:>4}  {:>5}  {:>8.3}  {:>8.3}  {:>6}  {:>6}  {:>4.2}  {:>3}  {:>5}  {:>7}  {}",
            rank + 1,
            o.summary.picks,
            o.summary.hit_rate,
            o.summary.coverage,
            o.settings.window_size,
            o.settings.bucket_size,
            o.settings.threshold,
            o.settings.min_matches,
            o.settings.min_league_matches,
            o.profile.name(),
            o.line_set
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
