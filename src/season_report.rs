use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::Result;
use crate::intervals::{self, BootstrapSummary, IntervalEstimate};
use crate::rate_uncertainty::compute_player_rate_summaries;
use crate::robustness::{RobustnessResult, run_robustness_suite};
use crate::sanity::{SanityReport, run_sanity_checks};
use crate::season_csv::TableMissingness;
use crate::season_data::{self, GameRecord, PlayerRecord};

pub const RATE_METHOD: &str = "poisson-approx";

/// Where games and players come from.
pub trait SeasonSource {
    /// Games in season order.
    fn load_games(&self) -> Result<Vec<GameRecord>>;
    /// Players already aggregated by name.
    fn load_players(&self) -> Result<Vec<PlayerRecord>>;
}

/// Where a finished report goes.
pub trait ReportSink {
    fn emit(&mut self, report: &SeasonReport) -> Result<()>;
}

/// Fixed data set, mostly for tests and the benches.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeason {
    pub games: Vec<GameRecord>,
    pub players: Vec<PlayerRecord>,
}

impl SeasonSource for InMemorySeason {
    fn load_games(&self) -> Result<Vec<GameRecord>> {
        Ok(self.games.clone())
    }

    fn load_players(&self) -> Result<Vec<PlayerRecord>> {
        Ok(self.players.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRateUncertainty {
    pub wilson: IntervalEstimate,
    /// Bootstrap of the mean of the per-game win indicator.
    pub bootstrap: IntervalEstimate,
    pub bootstrap_distribution_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub wins: usize,
    pub losses: usize,
    pub games: usize,
    pub win_rate: f64,
    pub win_rate_wilson: IntervalEstimate,
    pub results: Vec<bool>,
    pub goals_for_against: Vec<(u32, u32)>,
    pub cumulative_margin: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopScorerRow {
    pub name: String,
    pub goals: u32,
    pub assists: u32,
    pub points: u64,
    pub shots: u32,
    pub games_played: u32,
    pub points_per_game: Option<f64>,
    pub shooting_pct: Option<f64>,
}

/// One point of the shots-vs-goals series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotsGoalsRow {
    pub name: String,
    pub shots: u32,
    pub goals: u32,
    pub shooting_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRateRow {
    pub name: String,
    pub games: u32,
    pub rate: IntervalEstimate,
    /// Mean of the simulated per-game rates.
    pub bootstrap_mean: f64,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonReport {
    pub generated_at_utc: String,
    pub seed: u64,
    pub iterations: usize,
    pub summary: SeasonSummary,
    pub win_rate_uncertainty: WinRateUncertainty,
    pub top_scorers: Vec<TopScorerRow>,
    /// Every player, input order.
    pub shots_goals: Vec<ShotsGoalsRow>,
    /// Sorted by observed points per game, highest first.
    pub player_rates: Vec<PlayerRateRow>,
    pub robustness: Vec<RobustnessResult>,
    pub sanity: SanityReport,
}

/// Wilson interval on wins/games plus a bootstrap of the 0/1 win indicator.
/// An empty season is rejected by the bootstrap.
pub fn compute_win_rate_uncertainty<R: Rng + ?Sized>(
    games: &[GameRecord],
    iterations: usize,
    alpha: f64,
    z: f64,
    rng: &mut R,
) -> Result<WinRateUncertainty> {
    let wins = season_data::win_count(games) as u64;
    let wilson = intervals::wilson_interval(wins, games.len() as u64, z)?;
    let indicators: Vec<f64> = games
        .iter()
        .map(|g| if g.won() { 1.0 } else { 0.0 })
        .collect();
    let boot = intervals::bootstrap_mean_summary(&indicators, iterations, alpha, rng)?;
    if !boot.estimate.is_ordered() {
        warn!(
            point = boot.estimate.point_estimate,
            lower = boot.estimate.lower,
            upper = boot.estimate.upper,
            "bootstrap win-rate interval does not bracket the point estimate"
        );
    }
    Ok(WinRateUncertainty {
        wilson,
        bootstrap: boot.estimate,
        bootstrap_distribution_mean: boot.bootstrap_mean,
    })
}

pub fn season_summary(games: &[GameRecord], z: f64) -> Result<SeasonSummary> {
    let wins = season_data::win_count(games);
    Ok(SeasonSummary {
        wins,
        losses: games.len() - wins,
        games: games.len(),
        win_rate: season_data::win_rate(games),
        win_rate_wilson: intervals::wilson_interval(wins as u64, games.len() as u64, z)?,
        results: games.iter().map(GameRecord::won).collect(),
        goals_for_against: games.iter().map(|g| (g.goals_for, g.goals_against)).collect(),
        cumulative_margin: season_data::cumulative_margins(games),
    })
}

/// Top `limit` players by goals; equal goals keep input order.
pub fn top_scorers(players: &[PlayerRecord], limit: usize) -> Vec<TopScorerRow> {
    let mut sorted: Vec<&PlayerRecord> = players.iter().collect();
    sorted.sort_by(|a, b| b.goals.cmp(&a.goals));
    sorted
        .into_iter()
        .take(limit)
        .map(|p| TopScorerRow {
            name: p.name.clone(),
            goals: p.goals,
            assists: p.assists,
            points: p.points(),
            shots: p.shots,
            games_played: p.games_played,
            points_per_game: p.points_per_game(),
            shooting_pct: p.shooting_pct(),
        })
        .collect()
}

pub fn shots_vs_goals(players: &[PlayerRecord]) -> Vec<ShotsGoalsRow> {
    players
        .iter()
        .map(|p| ShotsGoalsRow {
            name: p.name.clone(),
            shots: p.shots,
            goals: p.goals,
            shooting_pct: p.shooting_pct(),
        })
        .collect()
}

pub fn player_rate_rows(
    players: &[PlayerRecord],
    rates: &BTreeMap<String, BootstrapSummary>,
) -> Vec<PlayerRateRow> {
    let mut rows: Vec<PlayerRateRow> = players
        .iter()
        .filter_map(|p| {
            rates.get(&p.name).map(|summary| PlayerRateRow {
                name: p.name.clone(),
                games: p.games_played,
                rate: summary.estimate,
                bootstrap_mean: summary.bootstrap_mean,
                method: RATE_METHOD.to_string(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.rate.point_estimate.total_cmp(&a.rate.point_estimate));
    rows
}

/// Runs every estimator with one generator seeded from `cfg.seed`. The win
/// rate bootstrap draws first, then players in input order.
pub fn build_season_report(
    games: &[GameRecord],
    players: &[PlayerRecord],
    cfg: &RunConfig,
    missingness: Vec<TableMissingness>,
) -> Result<SeasonReport> {
    cfg.validate()?;
    let mut rng = cfg.rng();

    let summary = season_summary(games, cfg.z)?;
    let win_rate_uncertainty =
        compute_win_rate_uncertainty(games, cfg.iterations, cfg.alpha, cfg.z, &mut rng)?;
    let rates = compute_player_rate_summaries(players, cfg.iterations, cfg.alpha, &mut rng)?;
    let robustness = run_robustness_suite(games, players, cfg.robustness());
    let sanity = run_sanity_checks(games, players, missingness);

    info!(
        games = games.len(),
        players = players.len(),
        rated_players = rates.len(),
        seed = cfg.seed,
        "season report built"
    );

    Ok(SeasonReport {
        generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        seed: cfg.seed,
        iterations: cfg.iterations,
        summary,
        win_rate_uncertainty,
        top_scorers: top_scorers(players, cfg.top_scorers),
        shots_goals: shots_vs_goals(players),
        player_rates: player_rate_rows(players, &rates),
        robustness,
        sanity,
    })
}

pub fn build_from_source(
    source: &impl SeasonSource,
    cfg: &RunConfig,
    missingness: Vec<TableMissingness>,
) -> Result<SeasonReport> {
    let games = source.load_games()?;
    let players = source.load_players()?;
    build_season_report(&games, &players, cfg, missingness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn season_13_of_20() -> Vec<GameRecord> {
        (0..20)
            .map(|i| {
                if i < 13 {
                    GameRecord::new(12, 8)
                } else {
                    GameRecord::new(7, 10)
                }
            })
            .collect()
    }

    #[test]
    fn win_rate_uncertainty_13_of_20() {
        let games = season_13_of_20();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let u = compute_win_rate_uncertainty(&games, 2000, 0.05, 1.96, &mut rng).unwrap();
        assert_eq!(u.wilson.point_estimate, 0.65);
        assert!((u.wilson.lower - 0.4329).abs() < 5e-4);
        assert!((u.wilson.upper - 0.8188).abs() < 5e-4);
        assert!((u.bootstrap.point_estimate - 0.65).abs() < 1e-12);
        assert!(u.bootstrap.lower < 0.65 && u.bootstrap.upper > 0.65);
    }

    #[test]
    fn empty_season_fails_bootstrap() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = compute_win_rate_uncertainty(&[], 100, 0.05, 1.96, &mut rng).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn summary_counts_and_series() {
        let games = vec![GameRecord::new(10, 4), GameRecord::new(6, 9), GameRecord::new(8, 8)];
        let s = season_summary(&games, 1.96).unwrap();
        assert_eq!((s.wins, s.losses, s.games), (1, 2, 3));
        assert_eq!(s.results, vec![true, false, false]);
        assert_eq!(s.cumulative_margin, vec![6, 3, 3]);
    }

    #[test]
    fn top_scorers_are_stable_on_ties() {
        let players = vec![
            PlayerRecord {
                name: "A".into(),
                goals: 5,
                assists: 1,
                shots: 10,
                games_played: 3,
            },
            PlayerRecord {
                name: "B".into(),
                goals: 9,
                assists: 0,
                shots: 0,
                games_played: 0,
            },
            PlayerRecord {
                name: "C".into(),
                goals: 5,
                assists: 2,
                shots: 8,
                games_played: 4,
            },
        ];
        let rows = top_scorers(&players, 2);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(rows[0].points_per_game, None);
        assert_eq!(rows[1].shooting_pct, Some(0.5));
    }

    #[test]
    fn shots_vs_goals_covers_every_player() {
        let players = vec![
            PlayerRecord {
                name: "A".into(),
                goals: 4,
                assists: 0,
                shots: 10,
                games_played: 3,
            },
            PlayerRecord {
                name: "B".into(),
                goals: 0,
                assists: 2,
                shots: 0,
                games_played: 0,
            },
        ];
        let rows = shots_vs_goals(&players);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].shooting_pct, Some(0.4));
        assert_eq!((rows[1].shots, rows[1].goals, rows[1].shooting_pct), (0, 0, None));
    }
}
