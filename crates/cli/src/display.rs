//! Terminal tables

use engine::{EvaluationReport, FeatureCatalog, RuleBank, RuleEvaluation, ScreenReport};
use rust_decimal::Decimal;

/// Best rules first: promoted, then total profit, then hit rate. Ties keep bank order.
pub fn ranked(rules: &[RuleEvaluation]) -> Vec<&RuleEvaluation> {
    let mut ranked: Vec<&RuleEvaluation> = rules.iter().collect();
    ranked.sort_by(|a, b| {
        b.promotion
            .promoted
            .cmp(&a.promotion.promoted)
            .then(b.summary.total_profit.cmp(&a.summary.total_profit))
            .then(b.summary.hit_rate.cmp(&a.summary.hit_rate))
    });
    ranked
}

fn pct(rate: Decimal) -> Decimal {
    rate * Decimal::ONE_HUNDRED
}

fn clip(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut s: String = name.chars().take(width - 1).collect();
        s.push('~');
        s
    }
}

pub fn print_evaluation(report: &EvaluationReport, show: usize) {
    println!(
        "\nHistory: {} rows, {} eligible for betting, {} with malformed odds",
        report.rows, report.eligible_rows, report.degenerate_rows
    );

    let ranked = ranked(&report.rules);
    let shown = ranked.len().min(show);

    println!("\nBacktest Summary (top {} of {} rules):", shown, ranked.len());
    println!(
        "  {:>3}  {:<44} {:>6} {:>6} {:>7} {:>9}",
        "#", "Rule", "Bets", "Wins", "HR%", "Profit"
    );
    println!("  {}", "-".repeat(80));
    for (i, r) in ranked.iter().take(show).enumerate() {
        println!(
            "  {:>3}  {:<44} {:>6} {:>6} {:>6.1}% {:>+9.2}",
            i + 1,
            clip(&r.summary.rule_name, 44),
            r.summary.matched,
            r.summary.wins,
            pct(r.summary.hit_rate),
            r.summary.total_profit,
        );
    }

    println!("\nWindowed Performance:");
    println!(
        "  {:<44} {:>6} {:>8} {:>6} {:>8}  {}",
        "Rule", "HR(s)", "P(s)", "HR(l)", "P(l)", "Promoted"
    );
    println!("  {}", "-".repeat(90));
    for r in ranked.iter().take(show) {
        let p = &r.promotion;
        println!(
            "  {:<44} {:>5.1}% {:>+8.2} {:>5.1}% {:>+8.2}  {}",
            clip(&r.summary.rule_name, 44),
            pct(p.short.hit_rate),
            p.short.profit,
            pct(p.long.hit_rate),
            p.long.profit,
            if p.promoted { "YES" } else { "-" },
        );
    }

    if report.promoted.is_empty() {
        println!("\nNo rules promoted.");
    } else {
        println!("\nPromoted ({}): {}", report.promoted.len(), report.promoted.join(", "));
    }
}

pub fn print_screen(screen: &ScreenReport, has_league: bool) {
    if !screen.per_rule.is_empty() {
        println!("\nMatches per promoted rule:");
        for (rule, fixtures) in &screen.per_rule {
            println!("  {:<44} {:>4}", clip(rule, 44), fixtures.len());
        }
    }

    println!("\nToday's Shortlist ({} fixtures):", screen.shortlist.len());
    if has_league {
        println!("  {:<20} {:<24} {:<24} {:<24}", "Time", "League", "Home", "Away");
        println!("  {}", "-".repeat(95));
    } else {
        println!("  {:<20} {:<24} {:<24}", "Time", "Home", "Away");
        println!("  {}", "-".repeat(70));
    }
    for f in &screen.shortlist {
        if has_league {
            println!(
                "  {:<20} {:<24} {:<24} {:<24}",
                f.time,
                f.league.as_deref().unwrap_or(""),
                f.home,
                f.away
            );
        } else {
            println!("  {:<20} {:<24} {:<24}", f.time, f.home, f.away);
        }
    }

    print_messages(&screen.notes);
}

pub fn print_messages(messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    println!();
    for m in messages {
        println!("  * {m}");
    }
}

pub fn print_rules(bank: &RuleBank) {
    println!("Rule bank: {} rules (fingerprint {})", bank.len(), bank.fingerprint());
    for rule in bank.iter() {
        let conditions: Vec<String> = rule
            .conditions
            .iter()
            .map(|c| format!("{} <= {} <= {}", c.lower, c.feature, c.upper))
            .collect();
        println!("  {:<44} {}", clip(&rule.name, 44), conditions.join(" AND "));
    }
}

pub fn print_features(catalog: &FeatureCatalog) {
    println!("{} features:", catalog.len());
    for def in catalog.iter() {
        let inputs: Vec<&str> = def.formula.inputs().iter().map(|c| c.header()).collect();
        println!("  {:<32} {}", def.name, inputs.join(", "));
    }
}
