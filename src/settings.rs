use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One candidate market: a numeric total-goals line ("Over/Under 2.5") or a
/// double-chance code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarketLine {
    Total(f64),
    DoubleChance(DoubleChance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoubleChance {
    #[serde(rename = "1X")]
    HomeOrDraw,
    #[serde(rename = "X2")]
    DrawOrAway,
    #[serde(rename = "12")]
    HomeOrAway,
}

impl DoubleChance {
    pub fn code(&self) -> &'static str {
        match self {
            DoubleChance::HomeOrDraw => "1X",
            DoubleChance::DrawOrAway => "X2",
            DoubleChance::HomeOrAway => "12",
        }
    }
}

impl MarketLine {
    pub fn parse(raw: &str) -> Option<MarketLine> {
        match raw.trim() {
            "1X" | "1x" => Some(MarketLine::DoubleChance(DoubleChance::HomeOrDraw)),
            "X2" | "x2" => Some(MarketLine::DoubleChance(DoubleChance::DrawOrAway)),
            "12" => Some(MarketLine::DoubleChance(DoubleChance::HomeOrAway)),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|l| l.is_finite() && *l >= 0.0)
                .map(MarketLine::Total),
        }
    }
}

/// Named recency curves for the bucket weights: linear decay from 1.0 down to
/// a profile-specific floor across the bucket count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightProfile {
    Soft,
    Medium,
    Hard,
}

impl WeightProfile {
    pub fn name(&self) -> &'static str {
        match self {
            WeightProfile::Soft => "soft",
            WeightProfile::Medium => "medium",
            WeightProfile::Hard => "hard",
        }
    }

    fn floor(&self) -> f64 {
        match self {
            WeightProfile::Soft => 0.8,
            WeightProfile::Medium => 0.6,
            WeightProfile::Hard => 0.4,
        }
    }

    pub fn weights(&self, buckets: usize) -> Vec<f64> {
        let buckets = buckets.max(1);
        if buckets == 1 {
            return vec![1.0];
        }
        let floor = self.floor();
        (0..buckets)
            .map(|i| 1.0 - (1.0 - floor) * (i as f64) / ((buckets - 1) as f64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgoSettings {
    pub window_size: usize,
    pub bucket_size: usize,
    pub threshold: f64,
    pub min_matches: usize,
    pub min_league_matches: usize,
    pub weights: Vec<f64>,
    pub lines: Vec<MarketLine>,
}

impl Default for AlgoSettings {
    fn default() -> Self {
        let window_size = 20;
        let bucket_size = 5;
        Self {
            window_size,
            bucket_size,
            threshold: 0.60,
            min_matches: 5,
            min_league_matches: 30,
            weights: WeightProfile::Medium.weights(window_size.div_ceil(bucket_size)),
            lines: vec![
                MarketLine::Total(1.5),
                MarketLine::Total(2.5),
                MarketLine::Total(3.5),
                MarketLine::DoubleChance(DoubleChance::HomeOrDraw),
                MarketLine::DoubleChance(DoubleChance::DrawOrAway),
            ],
        }
    }
}

impl AlgoSettings {
    pub fn bucket_count(&self) -> usize {
        self.window_size.max(1).div_ceil(self.bucket_size.max(1))
    }

    /// Reject-and-correct boundary for configuration: every field is clamped
    /// or substituted here so nothing deeper ever sees an invalid value.
    /// Deterministic: the same input always normalizes the same way.
    pub fn normalized(&self) -> AlgoSettings {
        let window_size = self.window_size.max(1);
        let bucket_size = self.bucket_size.max(1);
        let buckets = window_size.div_ceil(bucket_size);

        let threshold = if self.threshold.is_finite() {
            self.threshold.clamp(0.01, 0.99)
        } else {
            0.60
        };

        let mut weights: Vec<f64> = self
            .weights
            .iter()
            .copied()
            .filter(|w| w.is_finite() && *w > 0.0)
            .collect();
        if weights.is_empty() {
            weights.push(1.0);
        }
        // Reconcile length with the implied bucket count: pad by repeating the
        // last weight, truncate any excess.
        let last = *weights.last().unwrap_or(&1.0);
        weights.resize(buckets, last);

        let lines: Vec<MarketLine> = self
            .lines
            .iter()
            .copied()
            .filter(|l| match l {
                MarketLine::Total(v) => v.is_finite() && *v >= 0.0,
                MarketLine::DoubleChance(_) => true,
            })
            .collect();

        AlgoSettings {
            window_size,
            bucket_size,
            threshold,
            min_matches: self.min_matches,
            min_league_matches: self.min_league_matches,
            weights,
            lines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineSet {
    pub name: &'static str,
    pub lines: Vec<MarketLine>,
}

pub static LINE_SET_PRESETS: Lazy<Vec<LineSet>> = Lazy::new(|| {
    vec![
        LineSet {
            name: "totals-core",
            lines: vec![
                MarketLine::Total(1.5),
                MarketLine::Total(2.5),
                MarketLine::Total(3.5),
            ],
        },
        LineSet {
            name: "totals-wide",
            lines: vec![
                MarketLine::Total(1.5),
                MarketLine::Total(2.5),
                MarketLine::Total(3.5),
                MarketLine::Total(4.5),
            ],
        },
        LineSet {
            name: "double-chance",
            lines: vec![
                MarketLine::DoubleChance(DoubleChance::HomeOrDraw),
                MarketLine::DoubleChance(DoubleChance::DrawOrAway),
                MarketLine::DoubleChance(DoubleChance::HomeOrAway),
            ],
        },
        LineSet {
            name: "mixed",
            lines: vec![
                MarketLine::Total(2.5),
                MarketLine::Total(3.5),
                MarketLine::DoubleChance(DoubleChance::HomeOrDraw),
                MarketLine::DoubleChance(DoubleChance::DrawOrAway),
            ],
        },
    ]
});

pub fn line_set_preset(name: &str) -> Option<&'static LineSet> {
    LINE_SET_PRESETS.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_numeric_and_codes() {
        assert_eq!(MarketLine::parse("2.5"), Some(MarketLine::Total(2.5)));
        assert_eq!(
            MarketLine::parse("1X"),
            Some(MarketLine::DoubleChance(DoubleChance::HomeOrDraw))
        );
        assert_eq!(MarketLine::parse("nope"), None);
        assert_eq!(MarketLine::parse("-1.5"), None);
    }

    #[test]
    fn lines_round_trip_through_json() {
        let lines = vec![
            MarketLine::Total(2.5),
            MarketLine::DoubleChance(DoubleChance::DrawOrAway),
        ];
        let raw = serde_json::to_string(&lines).unwrap();
        assert_eq!(raw, "[2.5,\"X2\"]");
        let back: Vec<MarketLine> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, lines);
    }

    #[test]
    fn profiles_decay_linearly_to_floor() {
        let w = WeightProfile::Hard.weights(4);
        assert_eq!(w.len(), 4);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!((w[3] - 0.4).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[0] > p[1]));
        assert_eq!(WeightProfile::Soft.weights(1), vec![1.0]);
    }

    #[test]
    fn normalized_reconciles_weights_and_clamps() {
        let s = AlgoSettings {
            window_size: 0,
            bucket_size: 0,
            threshold: 1.7,
            weights: vec![],
            ..AlgoSettings::default()
        };
        let n = s.normalized();
        assert_eq!(n.window_size, 1);
        assert_eq!(n.bucket_size, 1);
        assert!((n.threshold - 0.99).abs() < 1e-12);
        assert_eq!(n.weights, vec![1.0]);

        // 10/3 implies 4 buckets: two weights pad by repeating the last.
        let s = AlgoSettings {
            window_size: 10,
            bucket_size: 3,
            weights: vec![1.0, 0.5],
            ..AlgoSettings::default()
        };
        assert_eq!(s.normalized().weights, vec![1.0, 0.5, 0.5, 0.5]);

        // Excess weights are truncated.
        let s = AlgoSettings {
            window_size: 4,
            bucket_size: 2,
            weights: vec![1.0, 0.8, 0.6, 0.4],
            ..AlgoSettings::default()
        };
        assert_eq!(s.normalized().weights, vec![1.0, 0.8]);
    }

    #[test]
    fn presets_are_named() {
        assert!(line_set_preset("mixed").is_some());
        assert!(line_set_preset("unknown").is_none());
    }
}
