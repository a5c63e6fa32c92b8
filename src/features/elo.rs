//! Elo rating system for team strength estimation
//!
//! Ratings are recomputed from scratch over the supplied game history on
//! every call. Nothing is cached between runs, so training and serving always
//! derive ratings the same way.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{GameRecord, TeamId};

/// Elo rating configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EloConfig {
    /// Starting rating for unseen teams
    pub base: f64,
    /// K-factor: how much ratings change per game
    pub k_factor: f64,
    /// Home advantage in rating points (expectation only, never stored)
    pub home_advantage: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            base: 1500.0,
            k_factor: 20.0,
            home_advantage: 50.0,
        }
    }
}

/// Expected score for the home side
///
/// `E_home = 1 / (1 + 10^((R_away - (R_home + H)) / 400))`
pub fn expected_home(home_rating: f64, away_rating: f64, home_advantage: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((away_rating - (home_rating + home_advantage)) / 400.0))
}

/// Actual result for the home side: 1 = win, 0.5 = tie, 0 = loss
pub fn actual_home(home_score: u32, away_score: u32) -> f64 {
    match home_score.cmp(&away_score) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.5,
        std::cmp::Ordering::Less => 0.0,
    }
}

/// Elo rating state for one pass over an ordered game sequence
#[derive(Debug, Clone)]
pub struct EloRatings {
    ratings: HashMap<TeamId, f64>,
    config: EloConfig,
}

impl Default for EloRatings {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl EloRatings {
    pub fn new(config: EloConfig) -> Self {
        EloRatings {
            ratings: HashMap::new(),
            config,
        }
    }

    /// Current rating for a team (base if never seen)
    pub fn rating(&self, team: &TeamId) -> f64 {
        self.ratings.get(team).copied().unwrap_or(self.config.base)
    }

    /// Expected score (0-1) for the home team
    pub fn expected_home(&self, home: &TeamId, away: &TeamId) -> f64 {
        expected_home(
            self.rating(home),
            self.rating(away),
            self.config.home_advantage,
        )
    }

    /// Apply a game's result (call AFTER reading pre-game ratings)
    pub fn update(&mut self, game: &GameRecord) {
        let home_rating = self.rating(&game.home_team);
        let away_rating = self.rating(&game.away_team);
        let home_expected = self.expected_home(&game.home_team, &game.away_team);
        let home_actual = actual_home(game.home_score, game.away_score);

        let k = self.config.k_factor;
        let home_new = home_rating + k * (home_actual - home_expected);
        let away_new = away_rating + k * ((1.0 - home_actual) - (1.0 - home_expected));

        self.ratings.insert(game.home_team.clone(), home_new);
        self.ratings.insert(game.away_team.clone(), away_new);
    }
}

/// Ratings of both participants before a game's result is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreGameRatings {
    pub home: f64,
    pub away: f64,
}

impl PreGameRatings {
    pub fn delta(&self) -> f64 {
        self.home - self.away
    }
}

/// Chronological processing order: date, then home team, then away team
///
/// The tie-break makes the pass independent of input row order.
pub(crate) fn chronological_order(games: &[GameRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..games.len()).collect();
    order.sort_by(|&a, &b| {
        let (ga, gb) = (&games[a], &games[b]);
        (ga.date, &ga.home_team, &ga.away_team).cmp(&(gb.date, &gb.home_team, &gb.away_team))
    });
    order
}

/// Pre-game ratings for every game, aligned with the input slice
///
/// Games are processed in chronological order; each entry holds the ratings
/// recorded before that game's result was applied.
pub fn pre_game_ratings(games: &[GameRecord], config: EloConfig) -> Vec<PreGameRatings> {
    let mut elo = EloRatings::new(config);
    let mut out = vec![
        PreGameRatings {
            home: config.base,
            away: config.base,
        };
        games.len()
    ];

    for idx in chronological_order(games) {
        let game = &games[idx];
        out[idx] = PreGameRatings {
            home: elo.rating(&game.home_team),
            away: elo.rating(&game.away_team),
        };
        elo.update(game);
    }

    out
}

/// Ratings after every supplied game ("rating as of now")
pub fn ratings_after(games: &[GameRecord], config: EloConfig) -> EloRatings {
    let mut elo = EloRatings::new(config);
    for idx in chronological_order(games) {
        elo.update(&games[idx]);
    }
    elo
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    use super::*;

    fn make_game(day: u32, home: &str, away: &str, home_score: u32, away_score: u32) -> GameRecord {
        GameRecord::new(
            NaiveDate::from_ymd_opt(2024, 10, day).unwrap(),
            home,
            away,
            home_score,
            away_score,
        )
    }

    #[test]
    fn test_initial_ratings() {
        let elo = EloRatings::default();
        assert_eq!(elo.rating(&TeamId("NYK".into())), 1500.0);
        assert_eq!(elo.rating(&TeamId("XXX".into())), 1500.0);
    }

    #[test]
    fn test_expected_score_with_home_advantage() {
        let elo = EloRatings::default();
        let expected = elo.expected_home(&TeamId("NYK".into()), &TeamId("BOS".into()));
        // Equal teams, 50 points of home advantage gives ~57%
        assert!(expected > 0.5 && expected < 0.6);
        assert_relative_eq!(expected, 1.0 / (1.0 + 10f64.powf(-50.0 / 400.0)));
    }

    #[test]
    fn test_expectations_sum_to_one() {
        for (rh, ra) in [(1500.0, 1500.0), (1720.5, 1380.0), (1300.0, 1650.0)] {
            let e_home = expected_home(rh, ra, 50.0);
            // away expectation: away side gets no advantage, home side does
            let e_away = 1.0 / (1.0 + 10f64.powf(((rh + 50.0) - ra) / 400.0));
            assert_relative_eq!(e_home + e_away, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_actual_scores_complementary() {
        for (h, a) in [(110, 100), (95, 104)] {
            let s_home = actual_home(h, a);
            let s_away = actual_home(a, h);
            assert_eq!(s_home + s_away, 1.0);
        }
        assert_eq!(actual_home(100, 100), 0.5);
    }

    #[test]
    fn test_update_is_zero_sum() {
        let mut elo = EloRatings::default();
        elo.update(&make_game(1, "NYK", "BOS", 110, 100));

        let nyk = elo.rating(&TeamId("NYK".into()));
        let bos = elo.rating(&TeamId("BOS".into()));
        assert!(nyk > 1500.0);
        assert!(bos < 1500.0);
        assert_relative_eq!(nyk + bos, 3000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tie_handled() {
        let mut elo = EloRatings::default();
        elo.update(&make_game(1, "NYK", "BOS", 100, 100));
        // A tie at home is below expectation for the home side
        assert!(elo.rating(&TeamId("NYK".into())) < 1500.0);
    }

    #[test]
    fn test_first_meeting_equal_regardless_of_home_advantage() {
        let games = vec![make_game(1, "NYK", "BOS", 100, 90)];
        for home_advantage in [0.0, 50.0, 250.0] {
            let config = EloConfig {
                home_advantage,
                ..EloConfig::default()
            };
            let pre = pre_game_ratings(&games, config);
            assert_eq!(pre[0].home, config.base);
            assert_eq!(pre[0].away, config.base);
        }
    }

    #[test]
    fn test_new_teams_on_same_date_get_base() {
        let games = vec![
            make_game(1, "NYK", "BOS", 100, 90),
            make_game(5, "LAL", "GSW", 120, 119),
            make_game(5, "NYK", "MIA", 99, 101),
        ];
        let pre = pre_game_ratings(&games, EloConfig::default());
        assert_eq!(pre[1].home, 1500.0);
        assert_eq!(pre[1].away, 1500.0);
        // MIA is new, NYK is not
        assert_eq!(pre[2].away, 1500.0);
        assert!(pre[2].home > 1500.0);
    }

    #[test]
    fn test_pre_game_ratings_no_leakage() {
        let mut games = vec![
            make_game(1, "NYK", "BOS", 100, 90),
            make_game(5, "BOS", "NYK", 95, 98),
        ];
        let before = pre_game_ratings(&games, EloConfig::default());

        // Changing the second game's result must not touch its own pre-game ratings
        games[1].home_score = 140;
        let after = pre_game_ratings(&games, EloConfig::default());
        assert_eq!(before, after);
    }

    #[test]
    fn test_output_aligned_with_unsorted_input() {
        let games = vec![
            make_game(5, "BOS", "NYK", 95, 98),
            make_game(1, "NYK", "BOS", 100, 90),
        ];
        let pre = pre_game_ratings(&games, EloConfig::default());
        // Row 1 is the earliest game
        assert_eq!(pre[1].home, 1500.0);
        assert!(pre[0].away > 1500.0); // NYK after its win
    }

    #[test]
    fn test_ratings_after_matches_sequential_updates() {
        let games = vec![
            make_game(1, "NYK", "BOS", 100, 90),
            make_game(3, "BOS", "NYK", 101, 98),
        ];
        let now = ratings_after(&games, EloConfig::default());
        let mut manual = EloRatings::default();
        manual.update(&games[0]);
        manual.update(&games[1]);
        assert_eq!(now.rating(&TeamId("NYK".into())), manual.rating(&TeamId("NYK".into())));
        assert_eq!(now.rating(&TeamId("BOS".into())), manual.rating(&TeamId("BOS".into())));
    }
}
