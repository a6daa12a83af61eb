pub mod config;
pub mod error;
pub mod intervals;
pub mod logging;
pub mod rate_uncertainty;
pub mod report_export;
pub mod robustness;
pub mod sanity;
pub mod season_csv;
pub mod season_data;
pub mod season_report;

pub use error::{Result, StatsError};
pub use intervals::IntervalEstimate;
pub use rate_uncertainty::compute_player_rate_uncertainties;
pub use robustness::{RobustnessResult, run_robustness_suite};
pub use season_report::compute_win_rate_uncertainty;
