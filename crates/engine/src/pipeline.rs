//! Evaluation pipeline: backtest every rule, promote, then screen today's fixtures
//!
//! The historical and daily batches fail independently: an error in one is
//! recorded in the report and the other still runs.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::backtest::{BacktestSummary, Backtester};
use crate::config::ScreenerConfig;
use crate::error::EngineResult;
use crate::features::{ColumnPolicy, FeatureEngine};
use crate::promotion::{evaluate_promotion, PromotionConfig, PromotionDecision};
use crate::rules::RuleBank;
use crate::screener::{DailyScreener, ScreenReport};
use crate::types::MatchDataset;

/// Backtest and promotion outcome of one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub summary: BacktestSummary,
    pub promotion: PromotionDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rule_bank_fingerprint: String,
    pub rows: usize,
    pub eligible_rows: usize,
    pub degenerate_rows: usize,
    /// In rule bank order
    pub rules: Vec<RuleEvaluation>,
    pub promoted: Vec<String>,
}

impl EvaluationReport {
    pub fn get(&self, rule_name: &str) -> Option<&RuleEvaluation> {
        self.rules.iter().find(|r| r.summary.rule_name == rule_name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub evaluation: Option<EvaluationReport>,
    pub screen: Option<ScreenReport>,
    pub messages: Vec<String>,
}

/// Backtest and promote every rule in the bank
pub fn evaluate_bank(
    backtester: &Backtester<'_>,
    bank: &RuleBank,
    config: &PromotionConfig,
) -> EngineResult<Vec<RuleEvaluation>> {
    bank.iter()
        .map(|rule| {
            let result = backtester.evaluate(rule)?;
            let promotion = evaluate_promotion(&result, config);
            Ok(RuleEvaluation {
                summary: result.summary(),
                promotion,
            })
        })
        .collect()
}

/// Feature table, backtest and promotion for one historical batch
pub fn evaluate_history(
    engine: &FeatureEngine,
    history: &MatchDataset,
    bank: &RuleBank,
    config: &ScreenerConfig,
) -> EngineResult<EvaluationReport> {
    if !history.is_chronological() {
        warn!("Kickoff times are unparseable or out of order; trailing windows follow file order");
    }

    let features = engine.compute(history, ColumnPolicy::RequireAll)?;
    let backtester = Backtester::new(history, &features, config.min_away_odds)?;
    let rules = evaluate_bank(&backtester, bank, &config.promotion)?;

    let promoted: Vec<String> = rules
        .iter()
        .filter(|r| r.promotion.promoted)
        .map(|r| r.summary.rule_name.clone())
        .collect();

    info!(
        rules = rules.len(),
        promoted = promoted.len(),
        eligible = backtester.eligible().len(),
        "Rule bank evaluated"
    );

    Ok(EvaluationReport {
        rule_bank_fingerprint: bank.fingerprint(),
        rows: history.len(),
        eligible_rows: backtester.eligible().len(),
        degenerate_rows: features.degenerate_rows(),
        rules,
        promoted,
    })
}

/// Run both batches. Either may be absent (not loaded) and neither failure stops the other.
pub fn run_pipeline(
    engine: &FeatureEngine,
    history: Option<&MatchDataset>,
    today: Option<&MatchDataset>,
    bank: &RuleBank,
    config: &ScreenerConfig,
) -> PipelineReport {
    let mut report = PipelineReport::default();

    match history {
        None => report
            .messages
            .push("No historical data; no rules evaluated".to_string()),
        Some(history) => match evaluate_history(engine, history, bank, config) {
            Ok(evaluation) => {
                if evaluation.eligible_rows == 0 {
                    report
                        .messages
                        .push("No historical rows passed the away-odds precondition".to_string());
                }
                if evaluation.promoted.is_empty() {
                    report.messages.push("No rules promoted".to_string());
                }
                report.evaluation = Some(evaluation);
            }
            Err(e) => {
                error!(error = %e, "Historical batch failed");
                report.messages.push(format!("Historical batch failed: {e}"));
            }
        },
    }

    let Some(today) = today else {
        report.messages.push("No data for today".to_string());
        return report;
    };

    let promoted: Vec<String> = report
        .evaluation
        .as_ref()
        .map(|e| e.promoted.clone())
        .unwrap_or_default();

    match DailyScreener::new(engine, config.screen_min_away_odds).screen(today, bank, &promoted) {
        Ok(screen) => report.screen = Some(screen),
        Err(e) => {
            error!(error = %e, "Daily batch failed");
            report.messages.push(format!("Daily batch failed: {e}"));
        }
    }

    report
}
