use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::intervals::IntervalEstimate;
use crate::robustness::{Experiment, RobustnessResult};
use crate::season_report::{ReportSink, SeasonReport};

pub const SUMMARY_FILE: &str = "summary_games.json";
pub const TOP_SCORERS_FILE: &str = "top_scorers.csv";
pub const PPG_INTERVALS_FILE: &str = "ppg_ci_bootstrap.csv";
pub const RANK_STABILITY_FILE: &str = "rank_stability.csv";
pub const SHOTS_GOALS_FILE: &str = "shots_goals.csv";
pub const ROBUSTNESS_FILE: &str = "robustness.json";
pub const SANITY_FILE: &str = "sanity.json";
pub const WORKBOOK_FILE: &str = "season_report.xlsx";

/// Writes every report artifact into one directory.
#[derive(Debug, Clone)]
pub struct DirectoryReportSink {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectoryReportSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for DirectoryReportSink {
    fn emit(&mut self, report: &SeasonReport) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let dir = self.out_dir.clone();

        self.push(write_json_atomic(&dir.join(SUMMARY_FILE), &summary_json(report))?);
        self.push(write_csv(&dir.join(TOP_SCORERS_FILE), &top_scorer_rows(report))?);
        self.push(write_csv(&dir.join(PPG_INTERVALS_FILE), &ppg_rows(report))?);
        self.push(write_csv(&dir.join(RANK_STABILITY_FILE), &rank_stability_rows(&report.robustness))?);
        self.push(write_csv(&dir.join(SHOTS_GOALS_FILE), &shots_goals_rows(report))?);
        self.push(write_json_atomic(&dir.join(ROBUSTNESS_FILE), &report.robustness)?);
        self.push(write_json_atomic(&dir.join(SANITY_FILE), &report.sanity)?);
        self.push(write_workbook(&dir.join(WORKBOOK_FILE), report)?);

        info!(dir = %dir.display(), files = self.written.len(), "report written");
        Ok(())
    }
}

impl DirectoryReportSink {
    fn push(&mut self, path: PathBuf) {
        self.written.push(path);
    }
}

#[derive(Debug, Serialize)]
struct SummaryJson {
    wins: usize,
    losses: usize,
    games: usize,
    win_rate: f64,
    win_rate_wilson95: (f64, f64),
    win_rate_bootstrap95: (f64, f64),
    bootstrap_distribution_mean: f64,
    results: Vec<bool>,
    goals_for_against: Vec<(u32, u32)>,
    cumulative_margin: Vec<i64>,
    generated_at_utc: String,
    seed: u64,
    iterations: usize,
}

fn summary_json(report: &SeasonReport) -> SummaryJson {
    let s = &report.summary;
    let u = &report.win_rate_uncertainty;
    SummaryJson {
        wins: s.wins,
        losses: s.losses,
        games: s.games,
        win_rate: round3(s.win_rate),
        win_rate_wilson95: (round3(u.wilson.lower), round3(u.wilson.upper)),
        win_rate_bootstrap95: (round3(u.bootstrap.lower), round3(u.bootstrap.upper)),
        bootstrap_distribution_mean: round3(u.bootstrap_distribution_mean),
        results: s.results.clone(),
        goals_for_against: s.goals_for_against.clone(),
        cumulative_margin: s.cumulative_margin.clone(),
        generated_at_utc: report.generated_at_utc.clone(),
        seed: report.seed,
        iterations: report.iterations,
    }
}

fn top_scorer_rows(report: &SeasonReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "Goals".to_string(),
        "Assists".to_string(),
        "Points".to_string(),
        "Shots".to_string(),
        "Games".to_string(),
        "PPG".to_string(),
        "Shooting %".to_string(),
    ]];
    for r in &report.top_scorers {
        rows.push(vec![
            r.name.clone(),
            r.goals.to_string(),
            r.assists.to_string(),
            r.points.to_string(),
            r.shots.to_string(),
            r.games_played.to_string(),
            opt_num(r.points_per_game),
            opt_num(r.shooting_pct),
        ]);
    }
    rows
}

fn ppg_rows(report: &SeasonReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "PPG_mean".to_string(),
        "CI95_lo".to_string(),
        "CI95_hi".to_string(),
        "Games".to_string(),
        "Method".to_string(),
        "Bootstrap_Mean".to_string(),
    ]];
    for r in &report.player_rates {
        rows.push(vec![
            r.name.clone(),
            num(r.rate.point_estimate),
            num(r.rate.lower),
            num(r.rate.upper),
            r.games.to_string(),
            r.method.clone(),
            num(r.bootstrap_mean),
        ]);
    }
    rows
}

/// One row per game in season order, for the trend and GF-vs-GA charts.
fn games_rows(report: &SeasonReport) -> Vec<Vec<String>> {
    let s = &report.summary;
    let mut rows = vec![vec![
        "Game".to_string(),
        "GF".to_string(),
        "GA".to_string(),
        "Won".to_string(),
        "Cumulative margin".to_string(),
    ]];
    for (idx, ((gf, ga), (won, margin))) in s
        .goals_for_against
        .iter()
        .zip(s.results.iter().zip(&s.cumulative_margin))
        .enumerate()
    {
        rows.push(vec![
            (idx + 1).to_string(),
            gf.to_string(),
            ga.to_string(),
            won.to_string(),
            margin.to_string(),
        ]);
    }
    rows
}

fn shots_goals_rows(report: &SeasonReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "Shots".to_string(),
        "Goals".to_string(),
        "Shooting %".to_string(),
    ]];
    for r in &report.shots_goals {
        rows.push(vec![
            r.name.clone(),
            r.shots.to_string(),
            r.goals.to_string(),
            opt_num(r.shooting_pct),
        ]);
    }
    rows
}

fn rank_stability_rows(results: &[RobustnessResult]) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["metric".to_string(), "value".to_string()]];
    for r in results {
        match &r.experiment {
            Experiment::LeaveTopIndividualOut { .. } => rows.push(vec![
                "spearman_rho_after_remove_top1".to_string(),
                num(r.stability_statistic),
            ]),
            Experiment::RankStability { .. } => rows.push(vec![
                "spearman_rho_totals_vs_ppg".to_string(),
                num(r.stability_statistic),
            ]),
            Experiment::LeaveTopDecileGamesOut { .. } => {
                if let (Some(base), Some(pert)) =
                    (r.baseline_ranking.first(), r.perturbed_ranking.first())
                {
                    rows.push(vec!["win_rate_full".to_string(), num(base.value)]);
                    rows.push(vec!["win_rate_without_top_decile".to_string(), num(pert.value)]);
                }
            }
            Experiment::NormalizationSensitivity => {}
        }
    }
    rows
}

fn write_workbook(path: &Path, report: &SeasonReport) -> Result<PathBuf> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_sheet_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Games")?;
        write_rows(sheet, &games_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TopScorers")?;
        write_rows(sheet, &top_scorer_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("ShotsGoals")?;
        write_rows(sheet, &shots_goals_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("PpgIntervals")?;
        write_rows(sheet, &ppg_rows(report))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Robustness")?;
        write_rows(sheet, &robustness_sheet_rows(&report.robustness))?;
    }
    workbook.save(path)?;
    Ok(path.to_path_buf())
}

fn summary_sheet_rows(report: &SeasonReport) -> Vec<Vec<String>> {
    let s = &report.summary;
    let u = &report.win_rate_uncertainty;
    let mut rows = vec![
        vec!["Metric".to_string(), "Value".to_string()],
        vec!["Games".to_string(), s.games.to_string()],
        vec!["Wins".to_string(), s.wins.to_string()],
        vec!["Losses".to_string(), s.losses.to_string()],
        vec!["Win rate".to_string(), num(s.win_rate)],
    ];
    rows.push(interval_row("Wilson 95%", &u.wilson));
    rows.push(interval_row("Bootstrap 95%", &u.bootstrap));
    rows.push(vec!["Seed".to_string(), report.seed.to_string()]);
    rows.push(vec!["Iterations".to_string(), report.iterations.to_string()]);
    rows.push(vec!["Generated (UTC)".to_string(), report.generated_at_utc.clone()]);
    rows
}

fn robustness_sheet_rows(results: &[RobustnessResult]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Experiment".to_string(),
        "Side".to_string(),
        "Rank".to_string(),
        "Name".to_string(),
        "Value".to_string(),
        "Spearman".to_string(),
    ]];
    for r in results {
        let label = r.experiment.label();
        for (side, ranking) in [("baseline", &r.baseline_ranking), ("perturbed", &r.perturbed_ranking)] {
            for (idx, entry) in ranking.iter().enumerate() {
                rows.push(vec![
                    label.to_string(),
                    side.to_string(),
                    (idx + 1).to_string(),
                    entry.name.clone(),
                    num(entry.value),
                    num(r.stability_statistic),
                ]);
            }
        }
    }
    rows
}

fn interval_row(label: &str, est: &IntervalEstimate) -> Vec<String> {
    vec![
        label.to_string(),
        format!("[{}, {}]", num(est.lower), num(est.upper)),
    ]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet.write_string(row_idx as u32, col_idx as u16, value)?;
        }
    }
    Ok(())
}

fn write_csv(path: &Path, rows: &[Vec<String>]) -> Result<PathBuf> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(path.to_path_buf())
}

/// Written to a sibling tmp file, then renamed over `path`.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(path.to_path_buf())
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn num(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.6}")
    }
}

fn opt_num(v: Option<f64>) -> String {
    v.map(num).unwrap_or_default()
}
