//! Shared fixtures for unit tests

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{MatchDataset, MatchRecord, Odds, Schema};

/// Odds with the given 1X2 prices and fixed prices on the other markets
pub fn odds(home: Decimal, draw: Decimal, away: Decimal) -> Odds {
    Odds::complete([
        home,
        draw,
        away,
        dec!(1.90),
        dec!(1.95),
        dec!(1.80),
        dec!(2.05),
        dec!(12),
        dec!(9.5),
        dec!(13),
    ])
}

pub fn record(odds: Odds, score: Option<(u32, u32)>) -> MatchRecord {
    let r = MatchRecord::new("2024-01-01 15:00", "Home FC", "Away FC").with_odds(odds);
    match score {
        Some((h, a)) => r.with_score(h, a),
        None => r,
    }
}

/// `n` historical rows priced `away` on the away side, the first `wins` of them away wins
pub fn history(n: usize, wins: usize, away: Decimal) -> MatchDataset {
    let outcomes: Vec<bool> = (0..n).map(|i| i < wins).collect();
    history_from(&outcomes, away)
}

/// One historical row per outcome, in order; `true` is an away win
pub fn history_from(outcomes: &[bool], away: Decimal) -> MatchDataset {
    let records = outcomes
        .iter()
        .enumerate()
        .map(|(i, &away_win)| {
            let (h, a) = if away_win { (0, 1) } else { (1, 0) };
            MatchRecord::new(
                format!("2024-01-01 {:02}:{:02}", i / 60, i % 60),
                format!("Home {i}"),
                format!("Away {i}"),
            )
            .with_odds(odds(dec!(2.5), dec!(3.3), away))
            .with_score(h, a)
        })
        .collect();
    MatchDataset::new(Schema::full(), records)
}
