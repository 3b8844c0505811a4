//! Backtest Evaluator: flat one-unit away-win staking on the rows a rule selects

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::features::FeatureTable;
use crate::rules::Rule;
use crate::types::{Fixture, MatchDataset, MatchRecord};

/// Default away-win odds floor for backtesting
pub const DEFAULT_MIN_AWAY_ODDS: Decimal = dec!(1.30);

/// One matched historical row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    /// Index into the historical dataset
    pub row: usize,
    pub fixture: Fixture,
    pub away_odds: Decimal,
    pub win: bool,
    pub profit: Decimal,
}

/// Aggregate statistics of one rule over a historical dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub rule_name: String,
    pub matched: usize,
    pub wins: usize,
    pub hit_rate: Decimal,
    pub total_profit: Decimal,
}

/// Backtest outcome: summary numbers plus matched rows in dataset order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub rule_name: String,
    pub matched: usize,
    pub wins: usize,
    pub hit_rate: Decimal,
    pub total_profit: Decimal,
    pub bets: Vec<BetRecord>,
}

impl BacktestResult {
    pub fn from_bets(rule_name: impl Into<String>, bets: Vec<BetRecord>) -> Self {
        let matched = bets.len();
        let wins = bets.iter().filter(|b| b.win).count();
        let total_profit: Decimal = bets.iter().map(|b| b.profit).sum();
        Self {
            rule_name: rule_name.into(),
            matched,
            wins,
            hit_rate: hit_rate(wins, matched),
            total_profit,
            bets,
        }
    }

    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            rule_name: self.rule_name.clone(),
            matched: self.matched,
            wins: self.wins,
            hit_rate: self.hit_rate,
            total_profit: self.total_profit,
        }
    }
}

/// `odds - 1` on a win, `-1` otherwise
pub fn bet_profit(away_odds: Decimal, win: bool) -> Decimal {
    if win {
        away_odds - Decimal::ONE
    } else {
        -Decimal::ONE
    }
}

/// `wins / count`, zero for an empty set
pub fn hit_rate(wins: usize, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(wins) / Decimal::from(count)
    }
}

/// Indices of rows whose away-win odds are at least `min_away_odds`
pub fn rows_with_min_away_odds(records: &[MatchRecord], min_away_odds: Decimal) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.odds.away().is_some_and(|o| o >= min_away_odds))
        .map(|(i, _)| i)
        .collect()
}

/// Evaluates rules against one historical batch. The eligible row set is fixed at construction.
pub struct Backtester<'a> {
    dataset: &'a MatchDataset,
    features: &'a FeatureTable,
    eligible: Vec<usize>,
}

impl<'a> Backtester<'a> {
    pub fn new(
        dataset: &'a MatchDataset,
        features: &'a FeatureTable,
        min_away_odds: Decimal,
    ) -> EngineResult<Self> {
        if !dataset.schema.has_results {
            return Err(EngineError::MissingColumns(vec![
                "Goals_H".to_string(),
                "Goals_A".to_string(),
            ]));
        }
        if features.rows() != dataset.len() {
            return Err(EngineError::RowMismatch {
                features: features.rows(),
                dataset: dataset.len(),
            });
        }

        let priced = rows_with_min_away_odds(&dataset.records, min_away_odds);
        let priced_count = priced.len();
        let settled: Vec<usize> = priced
            .into_iter()
            .filter(|&i| dataset.records[i].away_win().is_some())
            .collect();

        let unsettled = priced_count - settled.len();
        if unsettled > 0 {
            warn!(rows = unsettled, "Rows without a final score excluded from backtest");
        }

        let settled_count = settled.len();
        let eligible: Vec<usize> = settled
            .into_iter()
            .filter(|&i| !features.is_degenerate(i))
            .collect();
        let malformed = settled_count - eligible.len();
        if malformed > 0 {
            warn!(rows = malformed, "Rows with malformed odds excluded from backtest");
        }

        info!(
            rows = dataset.len(),
            eligible = eligible.len(),
            min_away_odds = %min_away_odds,
            "Backtest precondition applied"
        );

        Ok(Self {
            dataset,
            features,
            eligible,
        })
    }

    /// Rows that passed the odds floor and have a known result, in dataset order
    pub fn eligible(&self) -> &[usize] {
        &self.eligible
    }

    pub fn evaluate(&self, rule: &Rule) -> EngineResult<BacktestResult> {
        let mask = rule.mask(self.features)?;

        let bets: Vec<BetRecord> = self
            .eligible
            .iter()
            .filter(|&&i| mask[i])
            .filter_map(|&i| {
                let record = &self.dataset.records[i];
                let away_odds = record.odds.away()?;
                let win = record.away_win()?;
                Some(BetRecord {
                    row: i,
                    fixture: record.fixture(),
                    away_odds,
                    win,
                    profit: bet_profit(away_odds, win),
                })
            })
            .collect();

        let result = BacktestResult::from_bets(&rule.name, bets);

        debug!(
            rule = %rule.name,
            matched = result.matched,
            wins = result.wins,
            profit = %result.total_profit,
            "Rule backtested"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ColumnPolicy, FeatureEngine};
    use crate::rules::Condition;
    use crate::testutil::{history, odds, record};
    use crate::types::Schema;

    fn always() -> Rule {
        Rule::new("always", vec![Condition::new("ratio_a_h", f64::MIN, f64::MAX)])
    }

    fn never() -> Rule {
        Rule::new("never", vec![Condition::new("ratio_a_h", 100.0, 200.0)])
    }

    #[test]
    fn test_profit_law() {
        for o in [dec!(1.01), dec!(1.30), dec!(2.0), dec!(7.5), dec!(41)] {
            assert_eq!(bet_profit(o, true), o - dec!(1));
            assert_eq!(bet_profit(o, false), dec!(-1));
        }
    }

    #[test]
    fn test_fifty_row_scenario() {
        let ds = history(50, 30, dec!(2.0));
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        let result = bt.evaluate(&always()).unwrap();

        assert_eq!(result.matched, 50);
        assert_eq!(result.wins, 30);
        assert_eq!(result.hit_rate, dec!(0.6));
        assert_eq!(result.total_profit, dec!(10.0));
        let rows: Vec<usize> = result.bets.iter().map(|b| b.row).collect();
        assert_eq!(rows, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_match_reports_zeroes() {
        let ds = history(10, 5, dec!(2.0));
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        let result = bt.evaluate(&never()).unwrap();
        assert_eq!(result.matched, 0);
        assert_eq!(result.wins, 0);
        assert_eq!(result.hit_rate, Decimal::ZERO);
        assert_eq!(result.total_profit, Decimal::ZERO);
        assert!(result.bets.is_empty());
    }

    #[test]
    fn test_min_away_odds_precondition() {
        let mut ds = history(4, 4, dec!(2.0));
        ds.records[0].odds = odds(dec!(1.2), dec!(6.0), dec!(1.29));
        ds.records[1].odds = odds(dec!(1.2), dec!(6.0), dec!(1.30));
        ds.records[2].odds.set(crate::types::OddsColumn::AwayBack, None);
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        assert_eq!(bt.eligible(), &[1, 3]);
        let result = bt.evaluate(&always()).unwrap();
        assert_eq!(result.matched, 2);
        assert_eq!(result.total_profit, dec!(0.30) + dec!(1.0));
    }

    #[test]
    fn test_precondition_filter_is_idempotent() {
        let mut ds = history(6, 3, dec!(2.0));
        ds.records[1].odds = odds(dec!(1.1), dec!(8.0), dec!(1.25));
        ds.records[4].odds = odds(dec!(1.1), dec!(8.0), dec!(1.05));

        let once = rows_with_min_away_odds(&ds.records, DEFAULT_MIN_AWAY_ODDS);
        let subset: Vec<MatchRecord> = once.iter().map(|&i| ds.records[i].clone()).collect();
        let twice = rows_with_min_away_odds(&subset, DEFAULT_MIN_AWAY_ODDS);

        assert_eq!(once, vec![0, 2, 3, 5]);
        assert_eq!(twice, (0..subset.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_rows_without_score_are_excluded() {
        let mut ds = history(3, 3, dec!(2.0));
        ds.records[1].home_goals = None;
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        assert_eq!(bt.eligible(), &[0, 2]);
    }

    #[test]
    fn test_malformed_odds_row_is_never_bet() {
        let mut ds = history(3, 3, dec!(2.0));
        ds.records[1]
            .odds
            .set(crate::types::OddsColumn::HomeBack, Some(dec!(0)));
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        assert_eq!(features.degenerate_rows(), 1);

        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        assert_eq!(bt.eligible(), &[0, 2]);

        let rule = Rule::new("ou", vec![Condition::new("cv_ou", 0.0, 10.0)]);
        let result = bt.evaluate(&rule).unwrap();
        let rows: Vec<usize> = result.bets.iter().map(|b| b.row).collect();
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(result.matched, 2);
        assert_eq!(result.total_profit, dec!(2.0));
    }

    #[test]
    fn test_requires_result_columns() {
        let mut schema = Schema::full();
        schema.has_results = false;
        let ds = MatchDataset::new(schema, vec![record(odds(dec!(2), dec!(3), dec!(4)), None)]);
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        assert!(matches!(
            Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS),
            Err(EngineError::MissingColumns(_))
        ));
    }

    #[test]
    fn test_evaluate_does_not_touch_dataset() {
        let ds = history(5, 2, dec!(3.0));
        let before = serde_json::to_string(&ds).unwrap();
        let features = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let bt = Backtester::new(&ds, &features, DEFAULT_MIN_AWAY_ODDS).unwrap();
        bt.evaluate(&always()).unwrap();
        assert_eq!(serde_json::to_string(&ds).unwrap(), before);
    }
}
