//! Promotion Filter: trailing-window thresholds deciding which rules go live
//!
//! A rule is promoted only if its most recent matched bets clear both windows:
//! - short window: `profit >= min_profit_short` and `hit_rate >= min_hit_rate_short`
//! - long window: `profit > min_profit_long` and `hit_rate > min_hit_rate_long` (strict)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::backtest::{hit_rate, BacktestResult, BetRecord};

/// Window sizes and thresholds for promotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub min_profit_short: Decimal,
    pub min_profit_long: Decimal,
    pub min_hit_rate_short: Decimal,
    pub min_hit_rate_long: Decimal,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            short_window: 8,
            long_window: 40,
            min_profit_short: dec!(0.1),
            min_profit_long: dec!(0.1),
            min_hit_rate_short: dec!(0.5),
            min_hit_rate_long: dec!(0.5),
        }
    }
}

/// Performance over the trailing slice of matched bets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Bets actually in the window (less than the window size for short histories)
    pub size: usize,
    pub wins: usize,
    pub hit_rate: Decimal,
    pub profit: Decimal,
}

impl WindowStats {
    /// Stats over the last `window` bets
    pub fn trailing(bets: &[BetRecord], window: usize) -> Self {
        let tail = &bets[bets.len().saturating_sub(window)..];
        let wins = tail.iter().filter(|b| b.win).count();
        Self {
            size: tail.len(),
            wins,
            hit_rate: hit_rate(wins, tail.len()),
            profit: tail.iter().map(|b| b.profit).sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub rule_name: String,
    pub short: WindowStats,
    pub long: WindowStats,
    pub promoted: bool,
}

/// Apply the window thresholds to the chronologically ordered bets of one rule
pub fn evaluate_promotion(result: &BacktestResult, config: &PromotionConfig) -> PromotionDecision {
    if result.bets.is_empty() {
        return PromotionDecision {
            rule_name: result.rule_name.clone(),
            short: WindowStats::default(),
            long: WindowStats::default(),
            promoted: false,
        };
    }

    let short = WindowStats::trailing(&result.bets, config.short_window);
    let long = WindowStats::trailing(&result.bets, config.long_window);

    let promoted = short.profit >= config.min_profit_short
        && long.profit > config.min_profit_long
        && short.hit_rate >= config.min_hit_rate_short
        && long.hit_rate > config.min_hit_rate_long;

    PromotionDecision {
        rule_name: result.rule_name.clone(),
        short,
        long,
        promoted,
    }
}
