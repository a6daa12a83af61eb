use std::path::PathBuf;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, StatsError};
use crate::intervals::{DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_Z};
use crate::robustness::{
    DEFAULT_DECILE_FRACTION, DEFAULT_MIN_GAMES, DEFAULT_TOP_K, RobustnessConfig,
};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TOP_SCORERS: usize = 10;
pub const DEFAULT_GAMES_CSV: &str = "data/season_games.csv";
pub const DEFAULT_PLAYERS_CSV: &str = "data/season_player_stats.csv";
pub const DEFAULT_OUT_DIR: &str = "results";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: u64,
    pub iterations: usize,
    pub alpha: f64,
    pub z: f64,
    pub top_k: usize,
    pub top_scorers: usize,
    pub min_games: u32,
    pub decile_fraction: f64,
    pub games_path: PathBuf,
    pub players_path: PathBuf,
    pub out_dir: PathBuf,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            iterations: DEFAULT_ITERATIONS,
            alpha: DEFAULT_ALPHA,
            z: DEFAULT_Z,
            top_k: DEFAULT_TOP_K,
            top_scorers: DEFAULT_TOP_SCORERS,
            min_games: DEFAULT_MIN_GAMES,
            decile_fraction: DEFAULT_DECILE_FRACTION,
            games_path: PathBuf::from(DEFAULT_GAMES_CSV),
            players_path: PathBuf::from(DEFAULT_PLAYERS_CSV),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Defaults, then `.env.local` / `.env`, then process env, then CLI args.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(|key| std::env::var(key).ok(), &args)
    }

    pub fn from_sources(env: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env_value(&env, "SEASON_GAMES_CSV") {
            cfg.games_path = PathBuf::from(v);
        }
        if let Some(v) = env_value(&env, "SEASON_PLAYERS_CSV") {
            cfg.players_path = PathBuf::from(v);
        }
        if let Some(v) = env_value(&env, "SEASON_OUT_DIR") {
            cfg.out_dir = PathBuf::from(v);
        }
        if let Some(v) = env_value(&env, "SEASON_SEED") {
            cfg.seed = parse_value("SEASON_SEED", &v)?;
        }
        if let Some(v) = env_value(&env, "SEASON_BOOTSTRAP_ITERATIONS") {
            cfg.iterations = parse_value("SEASON_BOOTSTRAP_ITERATIONS", &v)?;
        }
        if let Some(v) = env_value(&env, "SEASON_TOP_K") {
            cfg.top_k = parse_value("SEASON_TOP_K", &v)?;
        }
        if let Some(v) = env_value(&env, "SEASON_MIN_GAMES") {
            cfg.min_games = parse_value("SEASON_MIN_GAMES", &v)?;
        }

        if let Some(v) = arg_value(args, "--games") {
            cfg.games_path = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--players") {
            cfg.players_path = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--out") {
            cfg.out_dir = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--seed") {
            cfg.seed = parse_value("--seed", &v)?;
        }
        if let Some(v) = arg_value(args, "--iterations") {
            cfg.iterations = parse_value("--iterations", &v)?;
        }
        if let Some(v) = arg_value(args, "--alpha") {
            cfg.alpha = parse_value("--alpha", &v)?;
        }
        if let Some(v) = arg_value(args, "--z") {
            cfg.z = parse_value("--z", &v)?;
        }
        if let Some(v) = arg_value(args, "--top-k") {
            cfg.top_k = parse_value("--top-k", &v)?;
        }
        if let Some(v) = arg_value(args, "--min-games") {
            cfg.min_games = parse_value("--min-games", &v)?;
        }
        if let Some(v) = arg_value(args, "--decile") {
            cfg.decile_fraction = parse_value("--decile", &v)?;
        }
        cfg.verbose = has_flag(args, "--verbose") || has_flag(args, "-v");

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(StatsError::invalid("iterations must be at least 1"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(StatsError::invalid(format!(
                "alpha must lie strictly between 0 and 1, got {}",
                self.alpha
            )));
        }
        if !self.z.is_finite() || self.z <= 0.0 {
            return Err(StatsError::invalid(format!("z must be positive, got {}", self.z)));
        }
        if self.top_k == 0 {
            return Err(StatsError::invalid("top-k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.decile_fraction) {
            return Err(StatsError::invalid(format!(
                "decile fraction must lie in [0, 1], got {}",
                self.decile_fraction
            )));
        }
        Ok(())
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            top_k: self.top_k,
            min_games: self.min_games,
            decile_fraction: self.decile_fraction,
        }
    }

    /// The single generator for a run. Every estimator draws from it in a
    /// fixed order, so one seed reproduces the whole report.
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

fn env_value(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| StatsError::invalid(format!("{name}: cannot parse '{raw}'")))
}

/// `--name=value` or `--name value`.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_sources() {
        let cfg = RunConfig::from_sources(|_| None, &[]).unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.iterations, 2000);
        assert_eq!(cfg.alpha, 0.05);
        assert_eq!(cfg.top_k, 5);
        assert_eq!(cfg.min_games, 5);
        assert!(!cfg.verbose);
    }

    #[test]
    fn args_override_env() {
        let env: HashMap<&str, &str> =
            HashMap::from([("SEASON_SEED", "7"), ("SEASON_OUT_DIR", "/tmp/env-out")]);
        let cfg = RunConfig::from_sources(
            |k| env.get(k).map(|v| v.to_string()),
            &args(&["--seed=11", "--iterations", "500", "-v"]),
        )
        .unwrap();
        assert_eq!(cfg.seed, 11);
        assert_eq!(cfg.iterations, 500);
        assert_eq!(cfg.out_dir, PathBuf::from("/tmp/env-out"));
        assert!(cfg.verbose);
    }

    #[test]
    fn bad_values_are_invalid_input() {
        let err = RunConfig::from_sources(|_| None, &args(&["--alpha=2"])).unwrap_err();
        assert!(err.is_invalid_input());
        let err = RunConfig::from_sources(|_| None, &args(&["--seed", "abc"])).unwrap_err();
        assert!(err.is_invalid_input());
        let err = RunConfig::from_sources(|_| None, &args(&["--iterations=0"])).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn same_seed_same_stream() {
        use rand::Rng;
        let cfg = RunConfig::default();
        let a: Vec<u32> = (0..4).map(|_| cfg.rng().gen_range(0..1000)).collect();
        let mut r1 = cfg.rng();
        let mut r2 = cfg.rng();
        assert_eq!(r1.gen_range(0..u64::MAX), r2.gen_range(0..u64::MAX));
        assert!(a.iter().all(|v| *v == a[0]));
    }
}
