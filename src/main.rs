use anyhow::{Context, Result};

use season_uncertainty::config::RunConfig;
use season_uncertainty::logging::init_cli_logger;
use season_uncertainty::report_export::DirectoryReportSink;
use season_uncertainty::season_csv::CsvSeasonSource;
use season_uncertainty::season_report::{ReportSink, SeasonReport, build_from_source};

fn main() -> Result<()> {
    let cfg = RunConfig::load().context("invalid configuration")?;
    init_cli_logger(cfg.verbose);

    let source = CsvSeasonSource::new(&cfg.games_path, &cfg.players_path);
    let missingness = source.missingness().context("scan input files")?;
    let report = build_from_source(&source, &cfg, missingness).context("build season report")?;

    let mut sink = DirectoryReportSink::new(&cfg.out_dir);
    sink.emit(&report)
        .with_context(|| format!("write report to {}", cfg.out_dir.display()))?;

    print_report(&report);
    println!();
    for path in sink.written() {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_report(report: &SeasonReport) {
    let s = &report.summary;
    let u = &report.win_rate_uncertainty;
    println!("Season: {}-{} over {} games", s.wins, s.losses, s.games);
    println!(
        "Win rate: {:.3}  Wilson 95% [{:.3}, {:.3}]  bootstrap 95% [{:.3}, {:.3}]",
        s.win_rate, u.wilson.lower, u.wilson.upper, u.bootstrap.lower, u.bootstrap.upper
    );
    println!("Seed: {}  iterations: {}", report.seed, report.iterations);

    println!();
    println!("Points per game (poisson-approx 95%):");
    for row in report.player_rates.iter().take(10) {
        println!(
            "  {:<24} {:>5.2}  [{:.2}, {:.2}]  GP {}",
            row.name, row.rate.point_estimate, row.rate.lower, row.rate.upper, row.games
        );
    }

    println!();
    println!("Robustness:");
    for r in &report.robustness {
        let top: Vec<&str> = r
            .perturbed_ranking
            .iter()
            .take(3)
            .map(|v| v.name.as_str())
            .collect();
        println!(
            "  {:<28} rho={:>7.3}  perturbed top: {}",
            r.experiment.label(),
            r.stability_statistic,
            top.join(", ")
        );
    }
}
