//! Daily Screener: apply promoted rules to the day's fixtures

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EngineResult;
use crate::features::{ColumnPolicy, FeatureEngine};
use crate::rules::RuleBank;
use crate::types::{Fixture, MatchDataset};

/// Fixtures selected for the day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenReport {
    /// Fixtures per promoted rule; a fixture may appear under several rules
    pub per_rule: BTreeMap<String, Vec<Fixture>>,
    /// Union over all promoted rules, de-duplicated, in dataset order
    pub shortlist: Vec<Fixture>,
    /// Skipped rules and other informational messages
    pub notes: Vec<String>,
}

pub struct DailyScreener<'a> {
    engine: &'a FeatureEngine,
    min_away_odds: Option<Decimal>,
}

impl<'a> DailyScreener<'a> {
    pub fn new(engine: &'a FeatureEngine, min_away_odds: Option<Decimal>) -> Self {
        Self {
            engine,
            min_away_odds,
        }
    }

    pub fn screen(
        &self,
        today: &MatchDataset,
        bank: &RuleBank,
        promoted: &[String],
    ) -> EngineResult<ScreenReport> {
        let mut report = ScreenReport::default();

        if promoted.is_empty() {
            report
                .notes
                .push("No rules promoted; nothing to screen".to_string());
            return Ok(report);
        }

        let features = self.engine.compute(today, ColumnPolicy::SkipMissing)?;

        let priced: Vec<bool> = today
            .records
            .iter()
            .map(|r| match self.min_away_odds {
                Some(min) => r.odds.away().is_some_and(|o| o >= min),
                None => true,
            })
            .collect();

        let mut selected = vec![false; today.len()];

        for name in promoted {
            if report.per_rule.contains_key(name) {
                continue;
            }
            let Some(rule) = bank.get(name) else {
                warn!(rule = %name, "Promoted rule not in rule bank, skipped");
                report
                    .notes
                    .push(format!("Rule '{name}' is not in the rule bank; skipped"));
                continue;
            };

            let unavailable = rule.unavailable_features(&features);
            if !unavailable.is_empty() {
                warn!(rule = %name, features = ?unavailable, "Rule cannot be evaluated on today's data");
                report.notes.push(format!(
                    "Rule '{name}' needs {} which today's data cannot provide; no matches",
                    unavailable.join(", ")
                ));
                report.per_rule.insert(name.clone(), Vec::new());
                continue;
            }

            let mask = rule.mask(&features)?;
            let mut fixtures = Vec::new();
            for (i, record) in today.records.iter().enumerate() {
                if mask[i] && priced[i] {
                    selected[i] = true;
                    fixtures.push(record.fixture());
                }
            }
            debug!(rule = %name, matches = fixtures.len(), "Rule screened");
            report.per_rule.insert(name.clone(), fixtures);
        }

        let mut seen = HashSet::new();
        report.shortlist = today
            .records
            .iter()
            .zip(&selected)
            .filter(|(_, &s)| s)
            .map(|(r, _)| r.fixture())
            .filter(|f| seen.insert(f.clone()))
            .collect();

        if report.shortlist.is_empty() {
            report
                .notes
                .push("No fixtures today matched a promoted rule".to_string());
        }

        info!(
            fixtures = today.len(),
            rules = report.per_rule.len(),
            shortlist = report.shortlist.len(),
            "Daily screening complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureCatalog;
    use crate::rules::{Condition, Rule};
    use crate::testutil::{odds, record};
    use crate::types::{MatchRecord, OddsColumn, Schema};
    use rust_decimal_macros::dec;

    fn today_schema() -> Schema {
        Schema {
            has_results: false,
            ..Schema::full()
        }
    }

    fn fixture(home: &str, away: &str, a_odds: Decimal) -> MatchRecord {
        let mut r = record(odds(dec!(2.0), dec!(3.4), a_odds), None).with_league("ENGLAND 1");
        r.home = home.to_string();
        r.away = away.to_string();
        r
    }

    fn bank() -> RuleBank {
        RuleBank::new(
            vec![
                // away price 4.0 vs home 2.0 -> ratio_a_h 0.5
                Rule::new("away_dog", vec![Condition::new("ratio_a_h", 0.4, 0.6)]),
                Rule::new("away_any", vec![Condition::new("ratio_a_h", 0.0, 10.0)]),
                Rule::new(
                    "needs_cs",
                    vec![
                        Condition::new("ratio_a_h", 0.0, 10.0),
                        Condition::new("cv_cs", 0.0, 10.0),
                    ],
                ),
            ],
            &FeatureCatalog::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_shortlist_is_deduplicated_but_per_rule_is_not() {
        let today = MatchDataset::new(
            today_schema(),
            vec![fixture("A", "B", dec!(4.0)), fixture("C", "D", dec!(1.5))],
        );
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(
                &today,
                &bank(),
                &["away_dog".to_string(), "away_any".to_string()],
            )
            .unwrap();

        assert_eq!(report.per_rule["away_dog"].len(), 1);
        assert_eq!(report.per_rule["away_any"].len(), 2);
        assert_eq!(report.shortlist.len(), 2);
        assert_eq!(report.shortlist[0].home, "A");
        assert_eq!(report.shortlist[1].home, "C");
    }

    #[test]
    fn test_duplicate_rows_collapse_in_shortlist() {
        let today = MatchDataset::new(
            today_schema(),
            vec![fixture("A", "B", dec!(4.0)), fixture("A", "B", dec!(4.0))],
        );
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(&today, &bank(), &["away_dog".to_string()])
            .unwrap();
        assert_eq!(report.per_rule["away_dog"].len(), 2);
        assert_eq!(report.shortlist.len(), 1);
    }

    #[test]
    fn test_missing_feature_yields_empty_with_note() {
        let mut schema = today_schema();
        schema.odds.retain(|c| *c != OddsColumn::Cs1x0Lay);
        let today = MatchDataset::new(schema, vec![fixture("A", "B", dec!(4.0))]);
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(&today, &bank(), &["needs_cs".to_string(), "away_dog".to_string()])
            .unwrap();
        assert!(report.per_rule["needs_cs"].is_empty());
        assert_eq!(report.per_rule["away_dog"].len(), 1);
        assert!(report.notes.iter().any(|n| n.contains("needs_cs")));
    }

    #[test]
    fn test_unknown_promoted_rule_is_skipped() {
        let today = MatchDataset::new(today_schema(), vec![fixture("A", "B", dec!(4.0))]);
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(&today, &bank(), &["renamed".to_string()])
            .unwrap();
        assert!(report.per_rule.is_empty());
        assert!(report.shortlist.is_empty());
        assert!(report.notes.iter().any(|n| n.contains("renamed")));
    }

    #[test]
    fn test_no_promoted_rules() {
        let today = MatchDataset::new(today_schema(), vec![fixture("A", "B", dec!(4.0))]);
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(&today, &bank(), &[])
            .unwrap();
        assert!(report.shortlist.is_empty());
        assert_eq!(report.notes.len(), 1);
    }

    #[test]
    fn test_malformed_odds_row_never_shortlisted() {
        let mut bad = fixture("C", "D", dec!(4.0));
        bad.odds.set(OddsColumn::BttsNoBack, Some(dec!(0.9)));
        let today = MatchDataset::new(today_schema(), vec![fixture("A", "B", dec!(4.0)), bad]);
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, None)
            .screen(&today, &bank(), &["away_any".to_string()])
            .unwrap();
        assert_eq!(report.per_rule["away_any"].len(), 1);
        assert_eq!(report.shortlist.len(), 1);
        assert_eq!(report.shortlist[0].home, "A");
    }

    #[test]
    fn test_optional_min_away_odds() {
        let today = MatchDataset::new(
            today_schema(),
            vec![fixture("A", "B", dec!(4.0)), fixture("C", "D", dec!(1.2))],
        );
        let engine = FeatureEngine::default();
        let report = DailyScreener::new(&engine, Some(dec!(1.30)))
            .screen(&today, &bank(), &["away_any".to_string()])
            .unwrap();
        assert_eq!(report.shortlist.len(), 1);
        assert_eq!(report.shortlist[0].home, "A");
    }
}
