//! Feature extraction
//!
//! Point-in-time team strength: Elo ratings, rolling form and the matchup
//! deltas the classifiers consume.

pub mod assembler;
pub mod elo;
pub mod rolling;
pub mod table;

pub use assembler::{build_feature_table, matchup_deltas, FeatureConfig};
pub use elo::{pre_game_ratings, ratings_after, EloConfig, EloRatings, PreGameRatings};
pub use rolling::{
    pending_form, rolling_form, team_game_rows, PendingForm, RollingConfig, TeamForm, TeamGameRow,
};
pub use table::{FeatureRow, FeatureTable, MatchupDeltas, FEATURE_COLUMNS};
