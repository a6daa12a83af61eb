use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::season_data::{GameRecord, PlayerRecord, win_rate};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_GAMES: u32 = 5;
pub const DEFAULT_DECILE_FRACTION: f64 = 0.10;

/// Fewer comparable entities than this and a rank correlation is undefined.
pub const MIN_RANKED_ENTITIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub name: String,
    pub value: f64,
}

impl RankedValue {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Experiment {
    LeaveTopIndividualOut { removed: Option<String> },
    LeaveTopDecileGamesOut {
        removed_games: usize,
        remaining_games: usize,
    },
    NormalizationSensitivity,
    RankStability { min_games: u32, compared: usize },
}

impl Experiment {
    pub fn label(&self) -> &'static str {
        match self {
            Experiment::LeaveTopIndividualOut { .. } => "leave_top_individual_out",
            Experiment::LeaveTopDecileGamesOut { .. } => "leave_top_decile_games_out",
            Experiment::NormalizationSensitivity => "normalization_sensitivity",
            Experiment::RankStability { .. } => "rank_stability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessResult {
    pub experiment: Experiment,
    pub baseline_ranking: Vec<RankedValue>,
    pub perturbed_ranking: Vec<RankedValue>,
    /// Spearman rho in [-1, 1]; NaN when not computable or not applicable.
    pub stability_statistic: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    pub top_k: usize,
    pub min_games: u32,
    pub decile_fraction: f64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_games: DEFAULT_MIN_GAMES,
            decile_fraction: DEFAULT_DECILE_FRACTION,
        }
    }
}

/// All four experiments, in a fixed order. Inputs are never modified.
pub fn run_robustness_suite(
    games: &[GameRecord],
    players: &[PlayerRecord],
    cfg: RobustnessConfig,
) -> Vec<RobustnessResult> {
    let out = vec![
        leave_top_individual_out(players, cfg.top_k),
        leave_top_decile_games_out(games, cfg.decile_fraction),
        normalization_sensitivity(players, cfg.top_k),
        rank_stability(players, cfg.min_games),
    ];
    for r in &out {
        debug!(
            experiment = r.experiment.label(),
            rho = r.stability_statistic,
            "robustness experiment done"
        );
    }
    out
}

/// Drops the top goal scorer (first one in input order on ties) and re-ranks
/// the rest by goals.
pub fn leave_top_individual_out(players: &[PlayerRecord], top_k: usize) -> RobustnessResult {
    let top_idx = index_of_max(players, |p| p.goals as f64);
    let baseline = rank_desc(players.iter().map(|p| RankedValue::new(&p.name, p.goals as f64)));
    let perturbed = rank_desc(
        players
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != top_idx)
            .map(|(_, p)| RankedValue::new(&p.name, p.goals as f64)),
    );
    let rho = spearman_correlation(&baseline, &perturbed);

    RobustnessResult {
        experiment: Experiment::LeaveTopIndividualOut {
            removed: top_idx.map(|idx| players[idx].name.clone()),
        },
        baseline_ranking: take_top(baseline, top_k),
        perturbed_ranking: take_top(perturbed, top_k),
        stability_statistic: rho,
    }
}

/// How many games the decile experiment removes: `max(1, floor(fraction * n))`,
/// never more than `n`.
pub fn decile_removal_count(game_count: usize, fraction: f64) -> usize {
    if game_count == 0 {
        return 0;
    }
    let raw = (fraction.max(0.0) * game_count as f64).floor() as usize;
    raw.max(1).min(game_count)
}

/// Removes the games with the largest margins and recomputes the win rate on
/// what is left. Equal margins keep season order.
pub fn leave_top_decile_games_out(games: &[GameRecord], fraction: f64) -> RobustnessResult {
    let removed = decile_removal_count(games.len(), fraction);
    let mut by_margin: Vec<GameRecord> = games.to_vec();
    by_margin.sort_by(|a, b| b.margin().cmp(&a.margin()));
    let remaining = &by_margin[removed..];

    RobustnessResult {
        experiment: Experiment::LeaveTopDecileGamesOut {
            removed_games: removed,
            remaining_games: remaining.len(),
        },
        baseline_ranking: vec![RankedValue::new("win_rate", win_rate(games))],
        perturbed_ranking: vec![RankedValue::new("win_rate", win_rate(remaining))],
        stability_statistic: f64::NAN,
    }
}

/// Top-K by season points next to top-K by points per game. Listed only;
/// the numeric comparison lives in [`rank_stability`].
pub fn normalization_sensitivity(players: &[PlayerRecord], top_k: usize) -> RobustnessResult {
    let totals = rank_desc(
        players
            .iter()
            .map(|p| RankedValue::new(&p.name, p.points() as f64)),
    );
    let rates = rank_desc(players.iter().filter_map(|p| {
        p.points_per_game()
            .map(|ppg| RankedValue::new(&p.name, ppg))
    }));

    RobustnessResult {
        experiment: Experiment::NormalizationSensitivity,
        baseline_ranking: take_top(totals, top_k),
        perturbed_ranking: take_top(rates, top_k),
        stability_statistic: f64::NAN,
    }
}

/// Spearman correlation between the points ranking and the points-per-game
/// ranking among players with at least `min_games` games.
pub fn rank_stability(players: &[PlayerRecord], min_games: u32) -> RobustnessResult {
    let eligible: Vec<&PlayerRecord> = players
        .iter()
        .filter(|p| p.games_played > 0 && p.games_played >= min_games)
        .collect();
    let totals = rank_desc(
        eligible
            .iter()
            .map(|p| RankedValue::new(&p.name, p.points() as f64)),
    );
    let rates = rank_desc(eligible.iter().filter_map(|p| {
        p.points_per_game()
            .map(|ppg| RankedValue::new(&p.name, ppg))
    }));
    let rho = spearman_correlation(&totals, &rates);

    RobustnessResult {
        experiment: Experiment::RankStability {
            min_games,
            compared: eligible.len(),
        },
        baseline_ranking: totals,
        perturbed_ranking: rates,
        stability_statistic: rho,
    }
}

/// Spearman rank correlation over the names present in both rankings. Values,
/// not list positions, are ranked, with ties sharing their average rank.
pub fn spearman_correlation(a: &[RankedValue], b: &[RankedValue]) -> f64 {
    let mut xs = Vec::with_capacity(a.len());
    let mut ys = Vec::with_capacity(a.len());
    for entry in a {
        if let Some(other) = b.iter().find(|o| o.name == entry.name) {
            xs.push(entry.value);
            ys.push(other.value);
        }
    }
    spearman_rho(&xs, &ys)
}

pub fn spearman_rho(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < MIN_RANKED_ENTITIES {
        return f64::NAN;
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

/// 1-based ascending ranks; tied values share the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0_f64; values.len()];
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) share rank mean(start+1 ..= end).
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0_f64;
    let mut sxx = 0.0_f64;
    let mut syy = 0.0_f64;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    // A single sqrt of the product keeps identical/reversed inputs at exactly +-1.
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Stable descending sort: equal values keep input order.
fn rank_desc(items: impl Iterator<Item = RankedValue>) -> Vec<RankedValue> {
    let mut out: Vec<RankedValue> = items.collect();
    out.sort_by(|a, b| b.value.total_cmp(&a.value));
    out
}

fn take_top(mut ranking: Vec<RankedValue>, k: usize) -> Vec<RankedValue> {
    ranking.truncate(k);
    ranking
}

fn index_of_max<T>(items: &[T], metric: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, item) in items.iter().enumerate() {
        let v = metric(item);
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}
