use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StatsError};
use crate::season_data::{
    GameRecord, PlayerRecord, RawGameRow, RawPlayerRow, aggregate_players, normalize_games,
};
use crate::season_report::SeasonSource;

const GOALS_FOR_COLUMNS: &[&str] = &["gf", "goals_for", "su_goals", "su_score", "syracuse_score"];
const GOALS_AGAINST_COLUMNS: &[&str] = &["ga", "goals_against", "opp_goals", "opponent_score"];
const PLAYER_COLUMNS: &[&str] = &["player", "name"];
const GOALS_COLUMNS: &[&str] = &["goals", "g"];
const ASSISTS_COLUMNS: &[&str] = &["assists", "a"];
const SHOTS_COLUMNS: &[&str] = &["shots", "sh"];
const GAMES_PLAYED_COLUMNS: &[&str] = &["games_played", "gp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

/// Empty-cell counts per column of one input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMissingness {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<ColumnMissing>,
}

impl TableMissingness {
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }
}

#[derive(Debug, Clone)]
pub struct CsvSeasonSource {
    games_path: PathBuf,
    players_path: PathBuf,
}

impl CsvSeasonSource {
    pub fn new(games_path: impl Into<PathBuf>, players_path: impl Into<PathBuf>) -> Self {
        Self {
            games_path: games_path.into(),
            players_path: players_path.into(),
        }
    }

    pub fn missingness(&self) -> Result<Vec<TableMissingness>> {
        Ok(vec![
            read_missingness(open(&self.games_path)?, "games")?,
            read_missingness(open(&self.players_path)?, "players")?,
        ])
    }
}

impl SeasonSource for CsvSeasonSource {
    fn load_games(&self) -> Result<Vec<GameRecord>> {
        let games = read_games(open(&self.games_path)?)?;
        info!(path = %self.games_path.display(), games = games.len(), "loaded games");
        Ok(games)
    }

    fn load_players(&self) -> Result<Vec<PlayerRecord>> {
        let players = read_players(open(&self.players_path)?)?;
        info!(path = %self.players_path.display(), players = players.len(), "loaded players");
        Ok(players)
    }
}

/// Game rows in file order. Requires goals-for and goals-against columns.
pub fn read_games<R: Read>(reader: R) -> Result<Vec<GameRecord>> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers()?.clone();
    let gf = require_column(&headers, GOALS_FOR_COLUMNS, "goals for")?;
    let ga = require_column(&headers, GOALS_AGAINST_COLUMNS, "goals against")?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        rows.push(RawGameRow {
            goals_for: int_cell(&record, gf, "goals for", line)?,
            goals_against: int_cell(&record, ga, "goals against", line)?,
        });
    }
    normalize_games(&rows)
}

/// Player rows summed by name. Player, goals and games-played columns are
/// required; a file without assists or shots columns counts those as zero.
pub fn read_players<R: Read>(reader: R) -> Result<Vec<PlayerRecord>> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers()?.clone();
    let player = require_column(&headers, PLAYER_COLUMNS, "player")?;
    let goals = require_column(&headers, GOALS_COLUMNS, "goals")?;
    let games = require_column(&headers, GAMES_PLAYED_COLUMNS, "games played")?;
    let assists = find_column(&headers, ASSISTS_COLUMNS);
    let shots = find_column(&headers, SHOTS_COLUMNS);
    if assists.is_none() {
        warn!("player file has no assists column; assists count as 0");
    }
    if shots.is_none() {
        warn!("player file has no shots column; shots count as 0");
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let name = record
            .get(player)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StatsError::invalid(format!("line {line}: missing player name")))?;
        rows.push(RawPlayerRow {
            name: name.to_string(),
            goals: int_cell(&record, goals, "goals", line)?,
            assists: match assists {
                Some(col) => int_cell(&record, col, "assists", line)?,
                None => 0,
            },
            shots: match shots {
                Some(col) => int_cell(&record, col, "shots", line)?,
                None => 0,
            },
            games_played: int_cell(&record, games, "games played", line)?,
        });
    }
    aggregate_players(&rows)
}

pub fn read_missingness<R: Read>(reader: R, table: &str) -> Result<TableMissingness> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut missing = vec![0usize; headers.len()];
    let mut rows = 0usize;
    for record in rdr.records() {
        let record = record?;
        rows += 1;
        for (col, count) in missing.iter_mut().enumerate() {
            if record.get(col).is_none_or(|v| v.trim().is_empty()) {
                *count += 1;
            }
        }
    }
    Ok(TableMissingness {
        table: table.to_string(),
        rows,
        columns: headers
            .iter()
            .zip(missing)
            .map(|(name, missing)| ColumnMissing {
                column: name.to_string(),
                missing,
            })
            .collect(),
    })
}

/// Case- and whitespace-insensitive header lookup; the first candidate that
/// matches wins.
pub fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    candidates
        .iter()
        .find_map(|cand| normalized.iter().position(|h| h == cand))
}

fn require_column(headers: &StringRecord, candidates: &[&str], what: &str) -> Result<usize> {
    find_column(headers, candidates).ok_or_else(|| {
        StatsError::invalid(format!(
            "no {what} column found (tried {})",
            candidates.join(", ")
        ))
    })
}

/// Integer cell; "12.0" is accepted, "12.5" and blanks are not.
fn int_cell(record: &StringRecord, col: usize, what: &str, line: usize) -> Result<i64> {
    let raw = record.get(col).map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(StatsError::invalid(format!("line {line}: missing {what}")));
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(StatsError::invalid(format!(
            "line {line}: {what} is not an integer: '{raw}'"
        ))),
    }
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| {
        StatsError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    })
}
