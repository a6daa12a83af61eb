//! Per-game rate intervals via a Poisson parametric bootstrap.
//!
//! Game-by-game splits are usually not available for a player, only season
//! totals. Each player's per-game count is modeled as Poisson with the observed
//! rate, and the sampling distribution of the per-game mean is simulated from
//! that. This approximates, rather than bootstraps, the real data.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::intervals::{self, BootstrapSummary, IntervalEstimate};
use crate::season_data::PlayerRecord;

/// `game_count` must be positive: zero-game entities are filtered by the
/// caller, never defaulted here.
pub fn poisson_rate_interval<R: Rng + ?Sized>(
    total_count: u64,
    game_count: u64,
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<IntervalEstimate> {
    poisson_rate_summary(total_count, game_count, iterations, alpha, rng).map(|s| s.estimate)
}

/// Interval plus the mean of the simulated per-game rates.
pub fn poisson_rate_summary<R: Rng + ?Sized>(
    total_count: u64,
    game_count: u64,
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<BootstrapSummary> {
    if game_count == 0 {
        return Err(StatsError::invalid(
            "poisson rate interval: game_count must be positive",
        ));
    }
    intervals::validate_iterations(iterations)?;
    intervals::validate_alpha(alpha)?;

    let lambda = total_count as f64 / game_count as f64;
    let confidence_level = 1.0 - alpha;
    // Poisson(0) is the point mass at zero.
    if total_count == 0 {
        return Ok(BootstrapSummary {
            estimate: IntervalEstimate::degenerate(0.0, confidence_level),
            bootstrap_mean: 0.0,
            iterations,
        });
    }

    let dist = Poisson::new(lambda).map_err(|err| {
        StatsError::invalid(format!("poisson rate interval: rate {lambda}: {err}"))
    })?;

    let games = game_count as usize;
    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut sum = 0.0_f64;
        for _ in 0..games {
            let draw: f64 = dist.sample(rng);
            sum += draw;
        }
        means.push(sum / game_count as f64);
    }
    means.sort_by(|a, b| a.total_cmp(b));

    let (lower, upper) = intervals::percentile_bounds(&means, alpha);
    Ok(BootstrapSummary {
        estimate: IntervalEstimate {
            point_estimate: lambda,
            lower,
            upper,
            confidence_level,
        },
        bootstrap_mean: intervals::mean(&means),
        iterations,
    })
}

/// Points-per-game interval for every player with at least one game.
pub fn compute_player_rate_uncertainties<R: Rng + ?Sized>(
    players: &[PlayerRecord],
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<BTreeMap<String, IntervalEstimate>> {
    let summaries = compute_player_rate_summaries(players, iterations, alpha, rng)?;
    Ok(summaries
        .into_iter()
        .map(|(name, s)| (name, s.estimate))
        .collect())
}

/// Same draws as [`compute_player_rate_uncertainties`], keeping each
/// player's simulated mean. Players are visited in input order so a seeded
/// generator yields the same map on every run.
pub fn compute_player_rate_summaries<R: Rng + ?Sized>(
    players: &[PlayerRecord],
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> Result<BTreeMap<String, BootstrapSummary>> {
    let mut out = BTreeMap::new();
    let mut skipped = 0usize;
    for player in players {
        if player.games_played == 0 {
            skipped += 1;
            continue;
        }
        let summary = poisson_rate_summary(
            player.points(),
            u64::from(player.games_played),
            iterations,
            alpha,
            rng,
        )?;
        out.insert(player.name.clone(), summary);
    }
    debug!(
        players = out.len(),
        skipped_zero_games = skipped,
        "computed per-game rate intervals"
    );
    Ok(out)
}
