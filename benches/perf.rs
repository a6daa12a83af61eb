use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

use season_uncertainty::intervals::{bootstrap_mean_interval, wilson_interval};
use season_uncertainty::rate_uncertainty::compute_player_rate_uncertainties;
use season_uncertainty::robustness::{RobustnessConfig, run_robustness_suite};
use season_uncertainty::season_csv::{read_games, read_players};
use season_uncertainty::season_data::{GameRecord, PlayerRecord};

fn fixture_games() -> Vec<GameRecord> {
    read_games(GAMES_CSV.as_bytes()).unwrap()
}

fn fixture_players() -> Vec<PlayerRecord> {
    read_players(PLAYERS_CSV.as_bytes()).unwrap()
}

fn bench_wilson(c: &mut Criterion) {
    c.bench_function("wilson_interval", |b| {
        b.iter(|| {
            let est = wilson_interval(black_box(13), black_box(20), 1.96).unwrap();
            black_box(est.upper);
        })
    });
}

fn bench_bootstrap_win_rate(c: &mut Criterion) {
    let indicators: Vec<f64> = fixture_games()
        .iter()
        .map(|g| if g.won() { 1.0 } else { 0.0 })
        .collect();
    c.bench_function("bootstrap_mean_2000", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let est = bootstrap_mean_interval(black_box(&indicators), 2000, 0.05, &mut rng).unwrap();
            black_box(est.lower);
        })
    });
}

fn bench_player_rates(c: &mut Criterion) {
    let players = fixture_players();
    c.bench_function("player_rate_uncertainties_2000", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            let rates =
                compute_player_rate_uncertainties(black_box(&players), 2000, 0.05, &mut rng)
                    .unwrap();
            black_box(rates.len());
        })
    });
}

fn bench_robustness_suite(c: &mut Criterion) {
    let games = fixture_games();
    let players = fixture_players();
    c.bench_function("robustness_suite", |b| {
        b.iter(|| {
            let results = run_robustness_suite(
                black_box(&games),
                black_box(&players),
                RobustnessConfig::default(),
            );
            black_box(results.len());
        })
    });
}

fn bench_csv_parse(c: &mut Criterion) {
    c.bench_function("season_csv_parse", |b| {
        b.iter(|| {
            let games = read_games(black_box(GAMES_CSV.as_bytes())).unwrap();
            let players = read_players(black_box(PLAYERS_CSV.as_bytes())).unwrap();
            black_box((games.len(), players.len()));
        })
    });
}

criterion_group!(
    perf,
    bench_wilson,
    bench_bootstrap_win_rate,
    bench_player_rates,
    bench_robustness_suite,
    bench_csv_parse
);
criterion_main!(perf);

static GAMES_CSV: &str = include_str!("../tests/fixtures/season_games.csv");
static PLAYERS_CSV: &str = include_str!("../tests/fixtures/season_player_stats.csv");
