use anyhow::{Context, Result};

use season_uncertainty::config::{RunConfig, has_flag};
use season_uncertainty::logging::init_cli_logger;
use season_uncertainty::robustness::{RankedValue, run_robustness_suite};
use season_uncertainty::season_csv::CsvSeasonSource;
use season_uncertainty::season_report::SeasonSource;

fn main() -> Result<()> {
    let cfg = RunConfig::load().context("invalid configuration")?;
    init_cli_logger(cfg.verbose);
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let source = CsvSeasonSource::new(&cfg.games_path, &cfg.players_path);
    let games = source.load_games().context("load games")?;
    let players = source.load_players().context("load players")?;

    let results = run_robustness_suite(&games, &players, cfg.robustness());

    if has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for r in &results {
        println!("== {} (rho = {:.3})", r.experiment.label(), r.stability_statistic);
        print_ranking("baseline", &r.baseline_ranking);
        print_ranking("perturbed", &r.perturbed_ranking);
        println!();
    }
    Ok(())
}

fn print_ranking(side: &str, ranking: &[RankedValue]) {
    println!("  {side}:");
    if ranking.is_empty() {
        println!("    (none)");
    }
    for (idx, entry) in ranking.iter().enumerate() {
        println!("    {:>2}. {:<24} {:.3}", idx + 1, entry.name, entry.value);
    }
}
