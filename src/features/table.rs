//! Matchup feature rows and the feature table artifact

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{PredictorError, Result, TeamId};

/// Model input columns, in preferred order
pub const FEATURE_COLUMNS: [&str; 4] = ["delta_off", "delta_def", "delta_rest", "delta_elo"];

/// One assembled row per qualifying historical game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "GAME_DATE")]
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// Home rolling offense minus away rolling offense
    pub delta_off: f64,
    /// Home defense strength minus away defense strength (positive = home defends better)
    pub delta_def: f64,
    /// Home rest days minus away rest days
    pub delta_rest: f64,
    /// Home pre-game Elo minus away pre-game Elo
    pub delta_elo: f64,
    pub home_win: u8,
}

impl FeatureRow {
    /// Value of a named feature column
    pub fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "delta_off" => Some(self.delta_off),
            "delta_def" => Some(self.delta_def),
            "delta_rest" => Some(self.delta_rest),
            "delta_elo" => Some(self.delta_elo),
            _ => None,
        }
    }

    pub fn deltas(&self) -> MatchupDeltas {
        MatchupDeltas {
            delta_off: self.delta_off,
            delta_def: self.delta_def,
            delta_rest: Some(self.delta_rest),
            delta_elo: Some(self.delta_elo),
        }
    }
}

/// Deltas for a single (possibly pending) matchup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupDeltas {
    pub delta_off: f64,
    pub delta_def: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_rest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_elo: Option<f64>,
}

impl MatchupDeltas {
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "delta_off" => Some(self.delta_off),
            "delta_def" => Some(self.delta_def),
            "delta_rest" => self.delta_rest,
            "delta_elo" => self.delta_elo,
            _ => None,
        }
    }

    /// Keep only the named optional columns (the required pair always stays)
    pub fn restricted_to(&self, columns: &[String]) -> MatchupDeltas {
        let keep = |name: &str| columns.iter().any(|c| c == name);
        MatchupDeltas {
            delta_off: self.delta_off,
            delta_def: self.delta_def,
            delta_rest: self.delta_rest.filter(|_| keep("delta_rest")),
            delta_elo: self.delta_elo.filter(|_| keep("delta_elo")),
        }
    }
}

/// Immutable feature table, sorted ascending by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Build a table; rows are sorted by (date, home team, away team)
    pub fn from_rows(mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by(|a, b| {
            (a.date, &a.home_team, &a.away_team).cmp(&(b.date, &b.home_team, &b.away_team))
        });
        FeatureTable { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows strictly before `date`
    pub fn before(&self, date: NaiveDate) -> FeatureTable {
        FeatureTable {
            rows: self.rows.iter().filter(|r| r.date < date).cloned().collect(),
        }
    }

    /// Write as CSV with a `GAME_DATE, home_team, ...` header
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a feature CSV written by [`FeatureTable::write_csv`]
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PredictorError::Validation(format!(
                "cannot open features file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<FeatureRow>, _>>()?;
        Ok(Self::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn make_row(day: u32, home: &str, away: &str) -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            home_team: TeamId(home.to_string()),
            away_team: TeamId(away.to_string()),
            delta_off: 1.5,
            delta_def: -2.0,
            delta_rest: 1.0,
            delta_elo: 12.25,
            home_win: 1,
        }
    }

    #[test]
    fn test_table_sorted_by_date() {
        let table = FeatureTable::from_rows(vec![
            make_row(3, "NYK", "BOS"),
            make_row(1, "MIA", "ORL"),
            make_row(1, "LAL", "GSW"),
        ]);
        let dates: Vec<_> = table.rows().iter().map(|r| r.date.day0()).collect();
        assert_eq!(dates, vec![0, 0, 2]);
        assert_eq!(table.rows()[0].home_team.as_str(), "LAL");
    }

    #[test]
    fn test_csv_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        let table = FeatureTable::from_rows(vec![make_row(1, "NYK", "BOS"), make_row(2, "BOS", "NYK")]);
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "GAME_DATE,home_team,away_team,delta_off,delta_def,delta_rest,delta_elo,home_win"
        ));
        assert!(text.contains("2024-11-01,NYK,BOS"));

        let reloaded = FeatureTable::read_csv(&path).unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_restricted_deltas_keep_required_pair() {
        let deltas = make_row(1, "NYK", "BOS").deltas();
        let restricted = deltas.restricted_to(&["delta_off".into(), "delta_elo".into()]);
        assert_eq!(restricted.delta_def, -2.0);
        assert_eq!(restricted.delta_rest, None);
        assert_eq!(restricted.delta_elo, Some(12.25));

        let json = serde_json::to_value(restricted).unwrap();
        assert!(json.get("delta_rest").is_none());
    }
}
