use std::fs;
use std::path::PathBuf;

use season_uncertainty::config::RunConfig;
use season_uncertainty::report_export::{
    DirectoryReportSink, PPG_INTERVALS_FILE, RANK_STABILITY_FILE, SHOTS_GOALS_FILE, SUMMARY_FILE,
    WORKBOOK_FILE,
};
use season_uncertainty::season_csv::CsvSeasonSource;
use season_uncertainty::season_report::{ReportSink, build_from_source};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn emit_into(dir: &std::path::Path) -> DirectoryReportSink {
    let cfg = RunConfig {
        iterations: 300,
        games_path: fixture_path("season_games.csv"),
        players_path: fixture_path("season_player_stats.csv"),
        out_dir: dir.to_path_buf(),
        ..RunConfig::default()
    };
    let source = CsvSeasonSource::new(&cfg.games_path, &cfg.players_path);
    let missingness = source.missingness().expect("fixture should scan");
    let report = build_from_source(&source, &cfg, missingness).expect("report should build");
    let mut sink = DirectoryReportSink::new(&cfg.out_dir);
    sink.emit(&report).expect("report should be written");
    sink
}

#[test]
fn writes_every_artifact() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("results");
    let sink = emit_into(&out);

    assert_eq!(sink.written().len(), 8);
    for path in sink.written() {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(out.join(WORKBOOK_FILE).metadata().expect("workbook").len() > 0);
    let leftovers: Vec<_> = fs::read_dir(&out)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn summary_json_has_rounded_win_rate_and_seed() {
    let tmp = tempfile::tempdir().expect("tempdir");
    emit_into(tmp.path());

    let raw = fs::read_to_string(tmp.path().join(SUMMARY_FILE)).expect("summary");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["wins"], 13);
    assert_eq!(json["losses"], 7);
    assert_eq!(json["games"], 20);
    assert_eq!(json["win_rate"], 0.65);
    assert_eq!(json["seed"], 42);
    assert_eq!(json["win_rate_wilson95"][0], 0.433);
    assert_eq!(json["win_rate_wilson95"][1], 0.819);
    let results = json["results"].as_array().expect("results");
    assert_eq!(results.len(), 20);
    assert_eq!(results.iter().filter(|r| r.as_bool() == Some(true)).count(), 13);
    assert_eq!(json["goals_for_against"][0][0], 14);
    assert_eq!(json["goals_for_against"][0][1], 9);
    assert_eq!(json["goals_for_against"].as_array().expect("pairs").len(), 20);
    assert!(json["generated_at_utc"].as_str().expect("timestamp").ends_with('Z'));
}

#[test]
fn interval_csv_has_one_row_per_rated_player() {
    let tmp = tempfile::tempdir().expect("tempdir");
    emit_into(tmp.path());

    let mut rdr = csv::Reader::from_path(tmp.path().join(PPG_INTERVALS_FILE)).expect("csv");
    let headers = rdr.headers().expect("headers").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "Player",
            "PPG_mean",
            "CI95_lo",
            "CI95_hi",
            "Games",
            "Method",
            "Bootstrap_Mean"
        ]
    );
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 9);
    assert!(rows.iter().all(|r| &r[5] == "poisson-approx"));
    for r in &rows {
        let lo: f64 = r[2].parse().expect("lo");
        let hi: f64 = r[3].parse().expect("hi");
        let sim: f64 = r[6].parse().expect("simulated mean");
        assert!(lo <= hi);
        assert!(sim > 0.0);
    }
}

#[test]
fn rank_stability_csv_names_metrics() {
    let tmp = tempfile::tempdir().expect("tempdir");
    emit_into(tmp.path());

    let mut rdr = csv::Reader::from_path(tmp.path().join(RANK_STABILITY_FILE)).expect("csv");
    let metrics: Vec<String> = rdr
        .records()
        .map(|r| r.expect("row")[0].to_string())
        .collect();
    assert!(metrics.contains(&"spearman_rho_after_remove_top1".to_string()));
    assert!(metrics.contains(&"spearman_rho_totals_vs_ppg".to_string()));
    assert!(metrics.contains(&"win_rate_without_top_decile".to_string()));
}

#[test]
fn shots_goals_csv_lists_every_player() {
    let tmp = tempfile::tempdir().expect("tempdir");
    emit_into(tmp.path());

    let mut rdr = csv::Reader::from_path(tmp.path().join(SHOTS_GOALS_FILE)).expect("csv");
    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 10);
    assert_eq!(&rows[0][0], "Kelly Ann");
    assert_eq!(&rows[0][1], "88");
    assert_eq!(&rows[0][2], "41");
    let bench = rows.iter().find(|r| &r[0] == "Bea Long").expect("bench player");
    assert_eq!(&bench[3], "");
}
