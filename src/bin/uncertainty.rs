use anyhow::{Context, Result};

use season_uncertainty::config::{RunConfig, has_flag};
use season_uncertainty::logging::init_cli_logger;
use season_uncertainty::rate_uncertainty::compute_player_rate_summaries;
use season_uncertainty::season_csv::CsvSeasonSource;
use season_uncertainty::season_report::{
    SeasonSource, compute_win_rate_uncertainty, player_rate_rows,
};

fn main() -> Result<()> {
    let cfg = RunConfig::load().context("invalid configuration")?;
    init_cli_logger(cfg.verbose);
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let source = CsvSeasonSource::new(&cfg.games_path, &cfg.players_path);
    let games = source.load_games().context("load games")?;
    let players = source.load_players().context("load players")?;

    let mut rng = cfg.rng();
    let win = compute_win_rate_uncertainty(&games, cfg.iterations, cfg.alpha, cfg.z, &mut rng)
        .context("win-rate uncertainty")?;
    let rates = compute_player_rate_summaries(&players, cfg.iterations, cfg.alpha, &mut rng)
        .context("player rate uncertainty")?;
    let rows = player_rate_rows(&players, &rates);

    if has_flag(&args, "--json") {
        let out = serde_json::json!({
            "seed": cfg.seed,
            "iterations": cfg.iterations,
            "win_rate": win,
            "player_rates": rows,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Games: {}  seed: {}  B: {}", games.len(), cfg.seed, cfg.iterations);
    println!(
        "Win rate {:.3}: Wilson [{:.3}, {:.3}] ({:.0}%)",
        win.wilson.point_estimate,
        win.wilson.lower,
        win.wilson.upper,
        win.wilson.confidence_level * 100.0
    );
    println!(
        "Bootstrap [{:.3}, {:.3}], replicate mean {:.3}",
        win.bootstrap.lower, win.bootstrap.upper, win.bootstrap_distribution_mean
    );
    println!();
    println!(
        "{:<24} {:>6} {:>8} {:>8} {:>8} {:>4}",
        "Player", "PPG", "sim", "lo", "hi", "GP"
    );
    for row in rows.iter().take(cfg.top_k) {
        println!(
            "{:<24} {:>6.2} {:>8.2} {:>8.2} {:>8.2} {:>4}",
            row.name,
            row.rate.point_estimate,
            row.bootstrap_mean,
            row.rate.lower,
            row.rate.upper,
            row.games
        );
    }
    Ok(())
}
