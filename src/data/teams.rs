//! Team label normalization
//!
//! Maps codes, Basketball-Reference full names and common aliases onto the
//! canonical three-letter code. Unknown labels are an error, never a guess.

use std::sync::LazyLock;

use regex::Regex;

use crate::{PredictorError, Result, TeamId};

/// Canonical code and Basketball-Reference display name (current franchises)
pub const TEAMS: [(&str, &str); 30] = [
    ("ATL", "ATLANTA HAWKS"),
    ("BOS", "BOSTON CELTICS"),
    ("BRK", "BROOKLYN NETS"),
    ("CHO", "CHARLOTTE HORNETS"),
    ("CHI", "CHICAGO BULLS"),
    ("CLE", "CLEVELAND CAVALIERS"),
    ("DAL", "DALLAS MAVERICKS"),
    ("DEN", "DENVER NUGGETS"),
    ("DET", "DETROIT PISTONS"),
    ("GSW", "GOLDEN STATE WARRIORS"),
    ("HOU", "HOUSTON ROCKETS"),
    ("IND", "INDIANA PACERS"),
    ("LAC", "LOS ANGELES CLIPPERS"),
    ("LAL", "LOS ANGELES LAKERS"),
    ("MEM", "MEMPHIS GRIZZLIES"),
    ("MIA", "MIAMI HEAT"),
    ("MIL", "MILWAUKEE BUCKS"),
    ("MIN", "MINNESOTA TIMBERWOLVES"),
    ("NOP", "NEW ORLEANS PELICANS"),
    ("NYK", "NEW YORK KNICKS"),
    ("OKC", "OKLAHOMA CITY THUNDER"),
    ("ORL", "ORLANDO MAGIC"),
    ("PHI", "PHILADELPHIA 76ERS"),
    ("PHO", "PHOENIX SUNS"),
    ("POR", "PORTLAND TRAIL BLAZERS"),
    ("SAC", "SACRAMENTO KINGS"),
    ("SAS", "SAN ANTONIO SPURS"),
    ("TOR", "TORONTO RAPTORS"),
    ("UTA", "UTAH JAZZ"),
    ("WAS", "WASHINGTON WIZARDS"),
];

/// Legacy codes, cities, nicknames -> canonical code (cleaned form)
pub const ALIASES: &[(&str, &str)] = &[
    // Alternate and legacy codes
    ("PHX", "PHO"),
    ("BKN", "BRK"),
    ("CHA", "CHO"),
    ("WSH", "WAS"),
    ("NJN", "BRK"),
    ("NOH", "NOP"),
    ("NOK", "NOP"),
    // Unambiguous cities
    ("ATLANTA", "ATL"),
    ("BOSTON", "BOS"),
    ("BROOKLYN", "BRK"),
    ("CHARLOTTE", "CHO"),
    ("CHICAGO", "CHI"),
    ("CLEVELAND", "CLE"),
    ("DALLAS", "DAL"),
    ("DENVER", "DEN"),
    ("DETROIT", "DET"),
    ("GOLDEN STATE", "GSW"),
    ("HOUSTON", "HOU"),
    ("INDIANA", "IND"),
    ("MEMPHIS", "MEM"),
    ("MIAMI", "MIA"),
    ("MILWAUKEE", "MIL"),
    ("MINNESOTA", "MIN"),
    ("NEW ORLEANS", "NOP"),
    ("NEW YORK", "NYK"),
    ("OKLAHOMA CITY", "OKC"),
    ("ORLANDO", "ORL"),
    ("PHILADELPHIA", "PHI"),
    ("PHOENIX", "PHO"),
    ("PORTLAND", "POR"),
    ("SACRAMENTO", "SAC"),
    ("SAN ANTONIO", "SAS"),
    ("TORONTO", "TOR"),
    ("UTAH", "UTA"),
    ("WASHINGTON", "WAS"),
    // Los Angeles
    ("LA CLIPPERS", "LAC"),
    ("L A CLIPPERS", "LAC"),
    ("LA LAKERS", "LAL"),
    ("L A LAKERS", "LAL"),
    // Nicknames
    ("HAWKS", "ATL"),
    ("CELTICS", "BOS"),
    ("NETS", "BRK"),
    ("HORNETS", "CHO"),
    ("BULLS", "CHI"),
    ("CAVALIERS", "CLE"),
    ("MAVERICKS", "DAL"),
    ("NUGGETS", "DEN"),
    ("PISTONS", "DET"),
    ("WARRIORS", "GSW"),
    ("ROCKETS", "HOU"),
    ("PACERS", "IND"),
    ("CLIPPERS", "LAC"),
    ("LAKERS", "LAL"),
    ("GRIZZLIES", "MEM"),
    ("HEAT", "MIA"),
    ("BUCKS", "MIL"),
    ("TIMBERWOLVES", "MIN"),
    ("PELICANS", "NOP"),
    ("KNICKS", "NYK"),
    ("THUNDER", "OKC"),
    ("MAGIC", "ORL"),
    ("76ERS", "PHI"),
    ("SUNS", "PHO"),
    ("TRAIL BLAZERS", "POR"),
    ("BLAZERS", "POR"),
    ("KINGS", "SAC"),
    ("SPURS", "SAS"),
    ("RAPTORS", "TOR"),
    ("JAZZ", "UTA"),
    ("WIZARDS", "WAS"),
    // Fan and press nicknames
    ("MAVS", "DAL"),
    ("CAVS", "CLE"),
    ("DUBS", "GSW"),
    ("CLIPS", "LAC"),
    ("GRIZZ", "MEM"),
    ("WOLVES", "MIN"),
    ("TWOLVES", "MIN"),
    ("T WOLVES", "MIN"),
    ("PELIS", "NOP"),
    ("NOLA", "NOP"),
    ("NOLA PELICANS", "NOP"),
    ("N O PELICANS", "NOP"),
    ("SIXERS", "PHI"),
    ("PHILA", "PHI"),
    ("PHILA 76ERS", "PHI"),
    ("RAPS", "TOR"),
    ("WIZ", "WAS"),
    ("NUGS", "DEN"),
    ("CELTS", "BOS"),
    ("ROX", "HOU"),
];

// Anything that is not an uppercase letter, digit or whitespace
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z0-9\s]+").expect("static pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Uppercase, turn punctuation into spaces, collapse whitespace
fn clean(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let spaced = PUNCTUATION.replace_all(&upper, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

/// Normalize a raw team label to its canonical code
pub fn normalize_team(raw: &str) -> Result<TeamId> {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return Err(PredictorError::UnknownTeam(format!("{:?} (empty label)", raw)));
    }

    let code = TEAMS
        .iter()
        .find(|(code, full)| *code == cleaned || *full == cleaned)
        .map(|(code, _)| *code)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == cleaned)
                .map(|(_, code)| *code)
        });

    match code {
        Some(code) => Ok(TeamId(code.to_string())),
        None => Err(PredictorError::UnknownTeam(format!(
            "{:?}; try a code like NYK or a full team name",
            raw
        ))),
    }
}

/// Basketball-Reference display name for a canonical code
pub fn canonical_name(code: &TeamId) -> Result<&'static str> {
    TEAMS
        .iter()
        .find(|(c, _)| *c == code.as_str())
        .map(|(_, full)| *full)
        .ok_or_else(|| PredictorError::UnknownTeam(format!("unknown team code {:?}", code.0)))
}
