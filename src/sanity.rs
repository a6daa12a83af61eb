//! Data sanity diagnostics that sit next to the uncertainty report: outlier
//! scoring rates, a margin test, and a goals reconciliation between the two
//! input tables.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::season_csv::TableMissingness;
use crate::season_data::{GameRecord, PlayerRecord};

pub const OUTLIER_SD_MULTIPLIER: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateOutlier {
    pub name: String,
    pub goals_per_game: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierCheck {
    pub mean: f64,
    pub sd: f64,
    pub threshold: f64,
    pub outliers: Vec<RateOutlier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginTest {
    pub games: usize,
    pub mean_margin: f64,
    pub sd_margin: f64,
    pub t_statistic: f64,
    /// Two-sided, normal approximation to the t distribution.
    pub p_value: f64,
    pub cohens_d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalsConsistency {
    pub team_goals: u64,
    pub player_goals: u64,
    pub difference: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityReport {
    pub missingness: Vec<TableMissingness>,
    pub outliers: Option<OutlierCheck>,
    pub margin_test: Option<MarginTest>,
    pub consistency: GoalsConsistency,
}

pub fn run_sanity_checks(
    games: &[GameRecord],
    players: &[PlayerRecord],
    missingness: Vec<TableMissingness>,
) -> SanityReport {
    SanityReport {
        missingness,
        outliers: goals_per_game_outliers(players, OUTLIER_SD_MULTIPLIER),
        margin_test: margin_test(games),
        consistency: goals_consistency(games, players),
    }
}

/// Players whose goals per game exceed `mean + k * sd` (sample sd) across
/// players with at least one game. `None` with fewer than two rates.
pub fn goals_per_game_outliers(players: &[PlayerRecord], k: f64) -> Option<OutlierCheck> {
    let rates: Vec<(&str, f64)> = players
        .iter()
        .filter_map(|p| p.goals_per_game().map(|r| (p.name.as_str(), r)))
        .collect();
    let values: Vec<f64> = rates.iter().map(|(_, r)| *r).collect();
    let (mean, sd) = mean_and_sample_sd(&values)?;
    let threshold = mean + k * sd;
    let outliers = rates
        .iter()
        .filter(|(_, r)| *r > threshold)
        .map(|(name, r)| RateOutlier {
            name: name.to_string(),
            goals_per_game: *r,
        })
        .collect();
    Some(OutlierCheck {
        mean,
        sd,
        threshold,
        outliers,
    })
}

/// One-sample test of mean goal margin against zero. `None` when the margin
/// has no spread or fewer than two games exist.
pub fn margin_test(games: &[GameRecord]) -> Option<MarginTest> {
    let margins: Vec<f64> = games.iter().map(|g| g.margin() as f64).collect();
    let (mean, sd) = mean_and_sample_sd(&margins)?;
    if sd <= 0.0 {
        return None;
    }
    let n = margins.len() as f64;
    let t = mean / (sd / n.sqrt());
    let std_normal = Normal::new(0.0, 1.0).ok()?;
    let p_value = (2.0 * (1.0 - std_normal.cdf(t.abs()))).clamp(0.0, 1.0);
    Some(MarginTest {
        games: margins.len(),
        mean_margin: mean,
        sd_margin: sd,
        t_statistic: t,
        p_value,
        cohens_d: mean / sd,
    })
}

pub fn goals_consistency(games: &[GameRecord], players: &[PlayerRecord]) -> GoalsConsistency {
    let team_goals: u64 = games.iter().map(|g| u64::from(g.goals_for)).sum();
    let player_goals: u64 = players.iter().map(|p| u64::from(p.goals)).sum();
    GoalsConsistency {
        team_goals,
        player_goals,
        difference: team_goals as i64 - player_goals as i64,
    }
}

fn mean_and_sample_sd(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}
