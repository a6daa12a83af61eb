use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// One game row as it arrives from a data source, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGameRow {
    pub goals_for: i64,
    pub goals_against: i64,
}

/// One player row as it arrives from a data source. A player may appear on
/// several rows (e.g. split by competition); rows are summed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPlayerRow {
    pub name: String,
    pub goals: i64,
    pub assists: i64,
    pub shots: i64,
    pub games_played: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub goals_for: u32,
    pub goals_against: u32,
}

impl GameRecord {
    pub fn new(goals_for: u32, goals_against: u32) -> Self {
        Self {
            goals_for,
            goals_against,
        }
    }

    pub fn won(&self) -> bool {
        self.goals_for > self.goals_against
    }

    pub fn margin(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub goals: u32,
    pub assists: u32,
    pub shots: u32,
    pub games_played: u32,
}

impl PlayerRecord {
    /// Widened so two full `u32` counts cannot overflow.
    pub fn points(&self) -> u64 {
        u64::from(self.goals) + u64::from(self.assists)
    }

    /// `None` for players without a game played; they must stay out of every
    /// rate computation rather than count as zero.
    pub fn points_per_game(&self) -> Option<f64> {
        per_game(self.points(), self.games_played)
    }

    pub fn goals_per_game(&self) -> Option<f64> {
        per_game(u64::from(self.goals), self.games_played)
    }

    pub fn shooting_pct(&self) -> Option<f64> {
        if self.shots == 0 {
            None
        } else {
            Some(self.goals as f64 / self.shots as f64)
        }
    }
}

fn per_game(count: u64, games: u32) -> Option<f64> {
    if games == 0 {
        None
    } else {
        Some(count as f64 / games as f64)
    }
}

pub fn normalize_games(rows: &[RawGameRow]) -> Result<Vec<GameRecord>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            Ok(GameRecord {
                goals_for: count_field(row.goals_for, "goals_for", idx)?,
                goals_against: count_field(row.goals_against, "goals_against", idx)?,
            })
        })
        .collect()
}

/// Validates raw player rows and sums them by player name. Output order is
/// the order in which each name first appears.
pub fn aggregate_players(rows: &[RawPlayerRow]) -> Result<Vec<PlayerRecord>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<PlayerRecord> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let name = row.name.trim();
        if name.is_empty() {
            return Err(StatsError::invalid(format!("player row {idx}: empty name")));
        }
        let goals = count_field(row.goals, "goals", idx)?;
        let assists = count_field(row.assists, "assists", idx)?;
        let shots = count_field(row.shots, "shots", idx)?;
        let games_played = count_field(row.games_played, "games_played", idx)?;

        let slot = match index.get(name) {
            Some(slot) => *slot,
            None => {
                index.insert(name.to_string(), out.len());
                out.push(PlayerRecord {
                    name: name.to_string(),
                    goals: 0,
                    assists: 0,
                    shots: 0,
                    games_played: 0,
                });
                out.len() - 1
            }
        };
        let player = &mut out[slot];
        player.goals = checked_sum(player.goals, goals, name)?;
        player.assists = checked_sum(player.assists, assists, name)?;
        player.shots = checked_sum(player.shots, shots, name)?;
        player.games_played = checked_sum(player.games_played, games_played, name)?;
    }

    Ok(out)
}

pub fn win_count(games: &[GameRecord]) -> usize {
    games.iter().filter(|g| g.won()).count()
}

pub fn win_rate(games: &[GameRecord]) -> f64 {
    if games.is_empty() {
        return 0.0;
    }
    win_count(games) as f64 / games.len() as f64
}

/// Running sum of goal margin in season order.
pub fn cumulative_margins(games: &[GameRecord]) -> Vec<i64> {
    games
        .iter()
        .scan(0_i64, |acc, g| {
            *acc += g.margin();
            Some(*acc)
        })
        .collect()
}

fn count_field(value: i64, field: &str, row: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        StatsError::invalid(format!(
            "row {row}: {field} must be a non-negative count, got {value}"
        ))
    })
}

fn checked_sum(acc: u32, add: u32, name: &str) -> Result<u32> {
    acc.checked_add(add)
        .ok_or_else(|| StatsError::invalid(format!("counts for {name} overflow")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_player(name: &str, goals: i64, assists: i64, games: i64) -> RawPlayerRow {
        RawPlayerRow {
            name: name.to_string(),
            goals,
            assists,
            shots: goals * 2,
            games_played: games,
        }
    }

    #[test]
    fn game_derivations() {
        let win = GameRecord::new(12, 9);
        let loss = GameRecord::new(7, 15);
        let tie = GameRecord::new(10, 10);
        assert!(win.won());
        assert!(!loss.won());
        assert!(!tie.won());
        assert_eq!(win.margin(), 3);
        assert_eq!(loss.margin(), -8);
        assert_eq!(cumulative_margins(&[win, loss, tie]), vec![3, -5, -5]);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let err = normalize_games(&[RawGameRow {
            goals_for: 3,
            goals_against: -1,
        }])
        .unwrap_err();
        assert!(err.is_invalid_input());

        let err = aggregate_players(&[raw_player("A", 1, -2, 3)]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn players_are_summed_by_name_in_first_seen_order() {
        let rows = vec![
            raw_player("Kelly", 4, 1, 3),
            raw_player("Ryan", 2, 2, 2),
            raw_player(" Kelly ", 6, 0, 4),
        ];
        let players = aggregate_players(&rows).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Kelly");
        assert_eq!(players[0].goals, 10);
        assert_eq!(players[0].games_played, 7);
        assert_eq!(players[0].shots, 20);
        assert_eq!(players[1].name, "Ryan");
    }

    #[test]
    fn zero_games_has_no_rate() {
        let p = PlayerRecord {
            name: "Bench".to_string(),
            goals: 0,
            assists: 0,
            shots: 0,
            games_played: 0,
        };
        assert_eq!(p.points_per_game(), None);
        assert_eq!(p.shooting_pct(), None);
    }

    #[test]
    fn points_do_not_overflow_for_large_counts() {
        let p = PlayerRecord {
            name: "Big".to_string(),
            goals: 3_000_000_000,
            assists: 3_000_000_000,
            shots: 0,
            games_played: 10,
        };
        assert_eq!(p.points(), 6_000_000_000);
        assert_eq!(p.points_per_game(), Some(600_000_000.0));
    }

    #[test]
    fn empty_season_win_rate_is_zero() {
        assert_eq!(win_rate(&[]), 0.0);
    }
}
