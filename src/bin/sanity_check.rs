use anyhow::{Context, Result};

use season_uncertainty::config::{RunConfig, has_flag};
use season_uncertainty::logging::init_cli_logger;
use season_uncertainty::sanity::run_sanity_checks;
use season_uncertainty::season_csv::CsvSeasonSource;
use season_uncertainty::season_report::SeasonSource;

fn main() -> Result<()> {
    let cfg = RunConfig::load().context("invalid configuration")?;
    init_cli_logger(cfg.verbose);
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let source = CsvSeasonSource::new(&cfg.games_path, &cfg.players_path);
    let missingness = source.missingness().context("scan input files")?;
    let games = source.load_games().context("load games")?;
    let players = source.load_players().context("load players")?;
    let report = run_sanity_checks(&games, &players, missingness);

    if has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Missing cells:");
    for table in &report.missingness {
        println!("  {} ({} rows): {} missing", table.table, table.rows, table.total_missing());
        for col in table.columns.iter().filter(|c| c.missing > 0) {
            println!("    {:<20} {}", col.column, col.missing);
        }
    }

    match &report.outliers {
        Some(check) => {
            println!(
                "Goals/game: mean {:.3}, sd {:.3}, outlier threshold {:.3}",
                check.mean, check.sd, check.threshold
            );
            for o in &check.outliers {
                println!("  outlier: {} ({:.3})", o.name, o.goals_per_game);
            }
        }
        None => println!("Goals/game: fewer than two players with games"),
    }

    match &report.margin_test {
        Some(t) => println!(
            "Margin vs 0: mean {:.2}, sd {:.2}, t {:.3}, p {:.4}, d {:.3} (n={})",
            t.mean_margin, t.sd_margin, t.t_statistic, t.p_value, t.cohens_d, t.games
        ),
        None => println!("Margin vs 0: not enough spread to test"),
    }

    let c = &report.consistency;
    println!(
        "Goals: team {} vs players {} (difference {})",
        c.team_goals, c.player_goals, c.difference
    );
    Ok(())
}
