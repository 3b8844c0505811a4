//! Odds Screener Engine: feature derivation, rule backtesting, promotion and daily screening
//!
//! Provides:
//! - 78 probability-ratio features derived from ten market odds
//! - Data-driven rule bank (1-2 inclusive range conditions per rule)
//! - Away-win backtester with flat one-unit staking
//! - Trailing-window promotion filter
//! - Daily screener applying promoted rules to today's fixtures

pub mod backtest;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod promotion;
pub mod rules;
pub mod screener;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-exports for convenience
pub use backtest::{
    bet_profit, BacktestResult, BacktestSummary, Backtester, BetRecord, DEFAULT_MIN_AWAY_ODDS,
};
pub use config::ScreenerConfig;
pub use error::{EngineError, EngineResult};
pub use features::{ColumnPolicy, FeatureCatalog, FeatureDef, FeatureEngine, FeatureTable, Formula};
pub use pipeline::{
    evaluate_bank, evaluate_history, run_pipeline, EvaluationReport, PipelineReport,
    RuleEvaluation,
};
pub use promotion::{evaluate_promotion, PromotionConfig, PromotionDecision, WindowStats};
pub use rules::{Condition, Rule, RuleBank};
pub use screener::{DailyScreener, ScreenReport};
pub use types::*;
