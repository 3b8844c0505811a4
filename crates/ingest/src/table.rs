//! Header/cell table shared by the CSV and workbook readers, and its conversion
//! into a typed dataset

use std::collections::HashMap;
use std::str::FromStr;

use engine::{parse_kickoff, MatchDataset, MatchRecord, Odds, OddsColumn, Schema};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{IngestError, IngestResult};

pub const COL_TIME: &str = "Time";
pub const COL_LEAGUE: &str = "League";
pub const COL_HOME: &str = "Home";
pub const COL_AWAY: &str = "Away";
pub const COL_GOALS_H: &str = "Goals_H";
pub const COL_GOALS_A: &str = "Goals_A";

/// Untyped table straight from a file
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Numeric cells use ',' as the decimal separator
    pub decimal_comma: bool,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Self {
            headers,
            rows,
            decimal_comma: false,
        }
    }

    pub fn with_decimal_comma(mut self) -> Self {
        self.decimal_comma = true;
        self
    }

    /// Negotiate the schema from the headers, then type every non-blank row
    pub fn into_dataset(self) -> IngestResult<MatchDataset> {
        let index: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        let missing: Vec<String> = [COL_TIME, COL_HOME, COL_AWAY]
            .into_iter()
            .filter(|c| !index.contains_key(c))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        let odds_columns: Vec<(OddsColumn, usize)> = OddsColumn::ALL
            .into_iter()
            .filter_map(|c| index.get(c.header()).map(|&i| (c, i)))
            .collect();
        let league_col = index.get(COL_LEAGUE).copied();
        let goals_cols = match (index.get(COL_GOALS_H), index.get(COL_GOALS_A)) {
            (Some(&h), Some(&a)) => Some((h, a)),
            _ => None,
        };

        let schema = Schema {
            odds: odds_columns.iter().map(|(c, _)| *c).collect(),
            has_league: league_col.is_some(),
            has_results: goals_cols.is_some(),
        };

        let cell = |row: &[String], i: usize| -> String {
            row.get(i).map(|s| s.trim().to_string()).unwrap_or_default()
        };

        let mut records = Vec::with_capacity(self.rows.len());
        let mut unreadable_cells = 0usize;

        for row in &self.rows {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }

            let time = cell(row, index[COL_TIME]);
            let mut record = MatchRecord::new(
                time,
                cell(row, index[COL_HOME]),
                cell(row, index[COL_AWAY]),
            );

            if let Some(i) = league_col {
                let league = cell(row, i);
                record.league = (!league.is_empty()).then_some(league);
            }

            if let Some((h, a)) = goals_cols {
                record.home_goals = parse_goals(&cell(row, h), self.decimal_comma);
                record.away_goals = parse_goals(&cell(row, a), self.decimal_comma);
            }

            let mut odds = Odds::default();
            for &(column, i) in &odds_columns {
                let raw = cell(row, i);
                let value = parse_decimal(&raw, self.decimal_comma);
                if value.is_none() && !raw.is_empty() {
                    unreadable_cells += 1;
                }
                odds.set(column, value);
            }
            record.odds = odds;

            records.push(record);
        }

        if unreadable_cells > 0 {
            warn!(cells = unreadable_cells, "Unreadable odds cells treated as missing");
        }
        let unparsed_times = records.iter().filter(|r| r.kickoff.is_none()).count();
        if unparsed_times > 0 {
            debug!(rows = unparsed_times, "Kickoff times in an unrecognised format");
        }

        Ok(MatchDataset::new(schema, records))
    }
}

/// Decimal cell, optionally written with a decimal comma
pub fn parse_decimal(raw: &str, decimal_comma: bool) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalized = if decimal_comma {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Goal count; accepts whole-number decimals such as `2.0`
pub fn parse_goals(raw: &str, decimal_comma: bool) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>().ok().or_else(|| {
        parse_decimal(raw, decimal_comma)
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_u32())
    })
}
