//! Run configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtest::DEFAULT_MIN_AWAY_ODDS;
use crate::promotion::PromotionConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Away-win odds floor applied before any rule in backtesting
    pub min_away_odds: Decimal,
    pub promotion: PromotionConfig,
    /// Optional away-win odds floor for today's fixtures
    pub screen_min_away_odds: Option<Decimal>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_away_odds: DEFAULT_MIN_AWAY_ODDS,
            promotion: PromotionConfig::default(),
            screen_min_away_odds: None,
        }
    }
}
