//! Types for match datasets

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The ten market odds columns every dataset is read against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsColumn {
    HomeBack,
    DrawBack,
    AwayBack,
    Over25Back,
    Under25Back,
    BttsYesBack,
    BttsNoBack,
    Cs0x0Lay,
    Cs1x0Lay,
    Cs0x1Lay,
}

impl OddsColumn {
    pub const ALL: [OddsColumn; 10] = [
        Self::HomeBack,
        Self::DrawBack,
        Self::AwayBack,
        Self::Over25Back,
        Self::Under25Back,
        Self::BttsYesBack,
        Self::BttsNoBack,
        Self::Cs0x0Lay,
        Self::Cs1x0Lay,
        Self::Cs0x1Lay,
    ];

    /// Column header as it appears in input files (exact, case-sensitive)
    pub fn header(&self) -> &'static str {
        match self {
            Self::HomeBack => "Odd_H_Back",
            Self::DrawBack => "Odd_D_Back",
            Self::AwayBack => "Odd_A_Back",
            Self::Over25Back => "Odd_Over25_FT_Back",
            Self::Under25Back => "Odd_Under25_FT_Back",
            Self::BttsYesBack => "Odd_BTTS_Yes_Back",
            Self::BttsNoBack => "Odd_BTTS_No_Back",
            Self::Cs0x0Lay => "Odd_CS_0x0_Lay",
            Self::Cs1x0Lay => "Odd_CS_1x0_Lay",
            Self::Cs0x1Lay => "Odd_CS_0x1_Lay",
        }
    }

    /// Short token used when naming derived features
    pub fn token(&self) -> &'static str {
        match self {
            Self::HomeBack => "h",
            Self::DrawBack => "d",
            Self::AwayBack => "a",
            Self::Over25Back => "over25",
            Self::Under25Back => "under25",
            Self::BttsYesBack => "btts_yes",
            Self::BttsNoBack => "btts_no",
            Self::Cs0x0Lay => "cs00",
            Self::Cs1x0Lay => "cs10",
            Self::Cs0x1Lay => "cs01",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Decimal odds for one fixture. `None` means the column is absent or the cell was unreadable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    values: [Option<Decimal>; 10],
}

impl Odds {
    pub fn new(values: [Option<Decimal>; 10]) -> Self {
        Self { values }
    }

    /// All ten odds present, in `OddsColumn::ALL` order
    pub fn complete(values: [Decimal; 10]) -> Self {
        Self {
            values: values.map(Some),
        }
    }

    pub fn get(&self, column: OddsColumn) -> Option<Decimal> {
        self.values[column.index()]
    }

    pub fn set(&mut self, column: OddsColumn, value: Option<Decimal>) {
        self.values[column.index()] = value;
    }

    pub fn away(&self) -> Option<Decimal> {
        self.get(OddsColumn::AwayBack)
    }
}

/// One fixture row, historical or upcoming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Kickoff as written in the source file
    pub time: String,
    pub kickoff: Option<NaiveDateTime>,
    pub league: Option<String>,
    pub home: String,
    pub away: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub odds: Odds,
}

impl MatchRecord {
    pub fn new(time: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        let time = time.into();
        Self {
            kickoff: parse_kickoff(&time),
            time,
            league: None,
            home: home.into(),
            away: away.into(),
            home_goals: None,
            away_goals: None,
            odds: Odds::default(),
        }
    }

    pub fn with_league(mut self, league: impl Into<String>) -> Self {
        self.league = Some(league.into());
        self
    }

    pub fn with_score(mut self, home_goals: u32, away_goals: u32) -> Self {
        self.home_goals = Some(home_goals);
        self.away_goals = Some(away_goals);
        self
    }

    pub fn with_odds(mut self, odds: Odds) -> Self {
        self.odds = odds;
        self
    }

    /// `Some(true)` when the away side won; `None` if the score is unknown
    pub fn away_win(&self) -> Option<bool> {
        match (self.home_goals, self.away_goals) {
            (Some(h), Some(a)) => Some(h < a),
            _ => None,
        }
    }

    pub fn fixture(&self) -> Fixture {
        Fixture {
            time: self.time.clone(),
            league: self.league.clone(),
            home: self.home.clone(),
            away: self.away.clone(),
        }
    }
}

/// Identity of a fixture for display and de-duplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fixture {
    pub time: String,
    pub league: Option<String>,
    pub home: String,
    pub away: String,
}

/// Columns a dataset actually carries, negotiated once when the file is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub odds: Vec<OddsColumn>,
    pub has_league: bool,
    pub has_results: bool,
}

impl Schema {
    /// Every odds column plus league and results
    pub fn full() -> Self {
        Self {
            odds: OddsColumn::ALL.to_vec(),
            has_league: true,
            has_results: true,
        }
    }

    pub fn has_odds(&self, column: OddsColumn) -> bool {
        self.odds.contains(&column)
    }

    pub fn missing_odds(&self) -> Vec<OddsColumn> {
        OddsColumn::ALL
            .into_iter()
            .filter(|c| !self.has_odds(*c))
            .collect()
    }
}

/// A batch of fixtures in input order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchDataset {
    pub schema: Schema,
    pub records: Vec<MatchRecord>,
}

impl MatchDataset {
    pub fn new(schema: Schema, records: Vec<MatchRecord>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when every kickoff parsed and they never go backwards
    pub fn is_chronological(&self) -> bool {
        let mut prev: Option<NaiveDateTime> = None;
        for record in &self.records {
            let Some(kickoff) = record.kickoff else {
                return false;
            };
            if prev.is_some_and(|p| kickoff < p) {
                return false;
            }
            prev = Some(kickoff);
        }
        true
    }

    /// Stable sort by kickoff; rows without a parsed kickoff go last in their original order
    pub fn sort_chronologically(&mut self) {
        self.records.sort_by(|a, b| match (a.kickoff, b.kickoff) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Parse a kickoff string in one of the layouts seen in odds exports
pub fn parse_kickoff(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
