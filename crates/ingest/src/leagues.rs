//! League allow-list
//!
//! Names are matched exactly and case-sensitively against the `League` column.
//! Cells are trimmed when the table is loaded (`table::RawTable::into_dataset`),
//! so leading or trailing whitespace in the file never decides a match.

use std::collections::HashSet;
use std::path::Path;

use engine::MatchDataset;
use serde::Serialize;
use tracing::{info, warn};

use crate::{read_to_string, IngestResult};

/// Leagues with enough liquidity for the screened markets
const STANDARD_LEAGUES: &[&str] = &[
    "ARGENTINA 1",
    "ARGENTINA 2",
    "AUSTRALIA 1",
    "AUSTRIA 1",
    "AUSTRIA 2",
    "BELGIUM 1",
    "BELGIUM 2",
    "BOLIVIA 1",
    "BRAZIL 1",
    "BRAZIL 2",
    "BULGARIA 1",
    "CHILE 1",
    "CHINA 1",
    "COLOMBIA 1",
    "CROATIA 1",
    "CZECH 1",
    "DENMARK 1",
    "DENMARK 2",
    "ECUADOR 1",
    "EGYPT 1",
    "ENGLAND 1",
    "ENGLAND 2",
    "ENGLAND 3",
    "ENGLAND 4",
    "ENGLAND 5",
    "EUROPA CHAMPIONS LEAGUE",
    "EUROPA CONFERENCE LEAGUE",
    "EUROPA LEAGUE",
    "FINLAND 1",
    "FRANCE 1",
    "FRANCE 2",
    "FRANCE 3",
    "GERMANY 1",
    "GERMANY 2",
    "GERMANY 3",
    "GREECE 1",
    "HUNGARY 1",
    "ICELAND 1",
    "IRELAND 1",
    "ISRAEL 1",
    "ITALY 1",
    "ITALY 2",
    "JAPAN 1",
    "JAPAN 2",
    "MEXICO 1",
    "MEXICO 2",
    "MOROCCO 1",
    "NETHERLANDS 1",
    "NETHERLANDS 2",
    "NORWAY 1",
    "NORWAY 2",
    "PARAGUAY 1",
    "PERU 1",
    "POLAND 1",
    "POLAND 2",
    "PORTUGAL 1",
    "PORTUGAL 2",
    "ROMANIA 1",
    "RUSSIA 1",
    "SAUDI ARABIA 1",
    "SCOTLAND 1",
    "SCOTLAND 2",
    "SERBIA 1",
    "SLOVAKIA 1",
    "SLOVENIA 1",
    "SOUTH AFRICA 1",
    "SOUTH KOREA 1",
    "SPAIN 1",
    "SPAIN 2",
    "SWEDEN 1",
    "SWEDEN 2",
    "SWITZERLAND 1",
    "SWITZERLAND 2",
    "TURKEY 1",
    "TURKEY 2",
    "UKRAINE 1",
    "URUGUAY 1",
    "USA 1",
    "USA 2",
    "VENEZUELA 1",
    "WALES 1",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueAllowList {
    names: HashSet<String>,
}

/// What `LeagueAllowList::filter` did to a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeagueFilterOutcome {
    Filtered { kept: usize, removed: usize },
    /// Dataset has no `League` column; nothing was filtered
    NoLeagueColumn,
}

impl LeagueAllowList {
    pub fn standard() -> Self {
        Self::from_names(STANDARD_LEAGUES.iter().copied())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// One league per line. Blank lines and `#` comments are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();
        let text = read_to_string(path)?;
        let list = Self::from_names(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        );
        info!(path = %path.display(), leagues = list.len(), "Loaded league allow-list");
        Ok(list)
    }

    pub fn contains(&self, league: &str) -> bool {
        self.names.contains(league)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drop rows whose league is not allowed, keeping the rest in order.
    /// Rows with a blank league cell are dropped as well.
    pub fn filter(&self, dataset: &mut MatchDataset) -> LeagueFilterOutcome {
        if !dataset.schema.has_league {
            warn!("Dataset has no League column; league filter not applied");
            return LeagueFilterOutcome::NoLeagueColumn;
        }

        let before = dataset.records.len();
        dataset
            .records
            .retain(|r| r.league.as_deref().is_some_and(|l| self.contains(l)));
        let kept = dataset.records.len();
        let removed = before - kept;

        if kept == 0 && before > 0 {
            warn!(removed, "No rows survived the league filter");
        } else {
            info!(kept, removed, "League filter applied");
        }
        LeagueFilterOutcome::Filtered { kept, removed }
    }
}

impl Default for LeagueAllowList {
    fn default() -> Self {
        Self::standard()
    }
}
