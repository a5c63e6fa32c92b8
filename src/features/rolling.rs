//! Rolling team form
//!
//! Expands games into per-team rows and attaches trailing offense/defense
//! means and rest days computed from strictly earlier rows only.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{GameRecord, TeamId};

/// Rolling window configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Number of trailing games averaged
    pub window: usize,
    /// Minimum prior games before a value is emitted
    pub min_periods: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        RollingConfig {
            window: 10,
            min_periods: 3,
        }
    }
}

/// One team's view of one game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGameRow {
    pub date: NaiveDate,
    pub team: TeamId,
    pub points_for: u32,
    pub points_against: u32,
}

/// Point-in-time form attached to a team-game row
#[derive(Debug, Clone, PartialEq)]
pub struct TeamForm {
    pub date: NaiveDate,
    pub team: TeamId,
    /// Days since the team's previous game (None for its first game)
    pub rest_days: Option<i64>,
    /// Mean points scored over the trailing window
    pub off_rolling: Option<f64>,
    /// Mean points allowed over the trailing window
    pub def_rolling: Option<f64>,
}

/// Expand games into two team-game rows each (home view, away view)
pub fn team_game_rows(games: &[GameRecord]) -> Vec<TeamGameRow> {
    games
        .iter()
        .flat_map(|g| {
            [
                TeamGameRow {
                    date: g.date,
                    team: g.home_team.clone(),
                    points_for: g.home_score,
                    points_against: g.away_score,
                },
                TeamGameRow {
                    date: g.date,
                    team: g.away_team.clone(),
                    points_for: g.away_score,
                    points_against: g.home_score,
                },
            ]
        })
        .collect()
}

/// Group rows by team, each group sorted by date
fn partition_by_team(rows: &[TeamGameRow]) -> BTreeMap<&TeamId, Vec<&TeamGameRow>> {
    let mut by_team: BTreeMap<&TeamId, Vec<&TeamGameRow>> = BTreeMap::new();
    for row in rows {
        by_team.entry(&row.team).or_default().push(row);
    }
    for team_rows in by_team.values_mut() {
        team_rows.sort_by_key(|r| r.date);
    }
    by_team
}

/// Mean of the trailing window ending just before `end` (exclusive)
fn trailing_mean(values: &[f64], end: usize, config: &RollingConfig) -> Option<f64> {
    let start = end.saturating_sub(config.window);
    let window = &values[start..end];
    if window.len() < config.min_periods || window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Attach rolling form and rest days to every team-game row
///
/// Output is ordered by team, then date. Row `i` of a team averages rows
/// `[max(0, i - W), i - 1]`; its own points never enter its own value.
pub fn rolling_form(rows: &[TeamGameRow], config: &RollingConfig) -> Vec<TeamForm> {
    let mut out = Vec::with_capacity(rows.len());

    for (team, team_rows) in partition_by_team(rows) {
        let points_for: Vec<f64> = team_rows.iter().map(|r| r.points_for as f64).collect();
        let points_against: Vec<f64> =
            team_rows.iter().map(|r| r.points_against as f64).collect();

        for (i, row) in team_rows.iter().enumerate() {
            let rest_days = i
                .checked_sub(1)
                .map(|prev| (row.date - team_rows[prev].date).num_days());

            out.push(TeamForm {
                date: row.date,
                team: team.clone(),
                rest_days,
                off_rolling: trailing_mean(&points_for, i, config),
                def_rolling: trailing_mean(&points_against, i, config),
            });
        }
    }

    out
}

/// Form for a pending game on `on`, from a team's history
///
/// Uses every row strictly before `on`, exactly as [`rolling_form`] would
/// treat a row dated `on` appended to the history. `on = None` evaluates
/// after the whole history and leaves rest days undefined.
pub fn pending_form(
    rows: &[TeamGameRow],
    team: &TeamId,
    on: Option<NaiveDate>,
    config: &RollingConfig,
) -> PendingForm {
    let mut prior: Vec<&TeamGameRow> = rows
        .iter()
        .filter(|r| &r.team == team && on.map_or(true, |d| r.date < d))
        .collect();
    prior.sort_by_key(|r| r.date);

    let points_for: Vec<f64> = prior.iter().map(|r| r.points_for as f64).collect();
    let points_against: Vec<f64> = prior.iter().map(|r| r.points_against as f64).collect();
    let end = prior.len();

    let rest_days = match (on, prior.last()) {
        (Some(date), Some(last)) => Some((date - last.date).num_days()),
        _ => None,
    };

    PendingForm {
        prior_games: end,
        rest_days,
        off_rolling: trailing_mean(&points_for, end, config),
        def_rolling: trailing_mean(&points_against, end, config),
    }
}

/// Form of a team ahead of a game that has not been played yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingForm {
    pub prior_games: usize,
    pub rest_days: Option<i64>,
    pub off_rolling: Option<f64>,
    pub def_rolling: Option<f64>,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn row(day: u32, team: &str, points_for: u32, points_against: u32) -> TeamGameRow {
        TeamGameRow {
            date: date(day),
            team: TeamId(team.to_string()),
            points_for,
            points_against,
        }
    }

    fn form_for<'a>(forms: &'a [TeamForm], team: &str) -> Vec<&'a TeamForm> {
        forms.iter().filter(|f| f.team.as_str() == team).collect()
    }

    #[test]
    fn test_team_game_rows_two_per_game() {
        let games = vec![GameRecord::new(date(1), "NYK", "BOS", 110, 101)];
        let rows = team_game_rows(&games);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], row(1, "NYK", 110, 101));
        assert_eq!(rows[1], row(1, "BOS", 101, 110));
    }

    #[test]
    fn test_rolling_excludes_current_row() {
        let rows: Vec<_> = (1..=5).map(|d| row(d, "NYK", 100 + d, 90)).collect();
        let forms = rolling_form(&rows, &RollingConfig::default());

        // Row 3 (index 3) averages rows 0..=2: 101, 102, 103
        assert_relative_eq!(forms[3].off_rolling.unwrap(), 102.0);

        // Mutating row 3's own points leaves its value unchanged, only later rows move
        let mut mutated = rows.clone();
        mutated[3].points_for = 0;
        let mutated_forms = rolling_form(&mutated, &RollingConfig::default());
        assert_eq!(mutated_forms[3].off_rolling, forms[3].off_rolling);
        assert_ne!(mutated_forms[4].off_rolling, forms[4].off_rolling);
    }

    #[test]
    fn test_min_periods_boundary() {
        let config = RollingConfig {
            window: 10,
            min_periods: 3,
        };
        let rows: Vec<_> = (1..=4).map(|d| row(d, "BOS", 100, 100)).collect();
        let forms = rolling_form(&rows, &config);

        // M - 1 prior games: undefined; exactly M prior games: defined
        assert!(forms[2].off_rolling.is_none());
        assert!(forms[2].def_rolling.is_none());
        assert!(forms[3].off_rolling.is_some());
        assert!(forms[3].def_rolling.is_some());
    }

    #[test]
    fn test_window_trails() {
        let config = RollingConfig {
            window: 2,
            min_periods: 1,
        };
        let rows = vec![
            row(1, "NYK", 90, 80),
            row(2, "NYK", 100, 85),
            row(3, "NYK", 110, 95),
            row(4, "NYK", 0, 0),
        ];
        let forms = rolling_form(&rows, &config);
        assert_relative_eq!(forms[3].off_rolling.unwrap(), 105.0);
        assert_relative_eq!(forms[3].def_rolling.unwrap(), 90.0);
    }

    #[test]
    fn test_rest_days_from_previous_row() {
        let rows = vec![
            row(8, "NYK", 100, 100),
            row(1, "NYK", 100, 100),
            row(3, "NYK", 100, 100),
            row(2, "BOS", 100, 100),
        ];
        let forms = rolling_form(&rows, &RollingConfig::default());
        let nyk = form_for(&forms, "NYK");
        assert_eq!(nyk[0].rest_days, None);
        assert_eq!(nyk[1].rest_days, Some(2));
        assert_eq!(nyk[2].rest_days, Some(5));
        assert_eq!(form_for(&forms, "BOS")[0].rest_days, None);
    }

    #[test]
    fn test_partitions_do_not_mix() {
        let rows = vec![
            row(1, "NYK", 120, 100),
            row(2, "NYK", 120, 100),
            row(3, "NYK", 120, 100),
            row(1, "BOS", 80, 100),
            row(2, "BOS", 80, 100),
            row(3, "BOS", 80, 100),
            row(4, "NYK", 0, 0),
            row(4, "BOS", 0, 0),
        ];
        let forms = rolling_form(&rows, &RollingConfig::default());
        assert_relative_eq!(form_for(&forms, "NYK")[3].off_rolling.unwrap(), 120.0);
        assert_relative_eq!(form_for(&forms, "BOS")[3].off_rolling.unwrap(), 80.0);
    }

    #[test]
    fn test_pending_form_matches_appended_row() {
        let config = RollingConfig::default();
        let mut rows: Vec<_> = (1..=6).map(|d| row(d * 2, "NYK", 95 + d, 90 + d)).collect();
        let pending = pending_form(&rows, &TeamId("NYK".into()), Some(date(20)), &config);

        rows.push(row(20, "NYK", 0, 0));
        let forms = rolling_form(&rows, &config);
        let last = forms.last().unwrap();

        assert_eq!(pending.prior_games, 6);
        assert_eq!(pending.off_rolling, last.off_rolling);
        assert_eq!(pending.def_rolling, last.def_rolling);
        assert_eq!(pending.rest_days, last.rest_days);
    }

    #[test]
    fn test_pending_form_ignores_games_on_or_after_cutoff() {
        let rows = vec![
            row(1, "NYK", 100, 90),
            row(2, "NYK", 100, 90),
            row(3, "NYK", 100, 90),
            row(5, "NYK", 200, 10),
        ];
        let pending = pending_form(&rows, &TeamId("NYK".into()), Some(date(5)), &RollingConfig::default());
        assert_eq!(pending.prior_games, 3);
        assert_relative_eq!(pending.off_rolling.unwrap(), 100.0);
        assert_eq!(pending.rest_days, Some(2));

        let no_date = pending_form(&rows, &TeamId("NYK".into()), None, &RollingConfig::default());
        assert_eq!(no_date.prior_games, 4);
        assert_eq!(no_date.rest_days, None);
    }
}
