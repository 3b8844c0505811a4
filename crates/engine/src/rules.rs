//! Rule Bank: named conjunctions of inclusive feature ranges
//!
//! Rules are configuration data. A bank is either loaded from JSON or generated
//! from the built-in band grid, and is validated against the feature catalogue
//! before any evaluation runs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::features::{FeatureCatalog, FeatureTable};

/// Maximum number of conditions in one rule
pub const MAX_CONDITIONS: usize = 2;

/// `lower <= feature <= upper`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: String,
    pub lower: f64,
    pub upper: f64,
}

impl Condition {
    pub fn new(feature: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            feature: feature.into(),
            lower,
            upper,
        }
    }

    /// NaN never holds
    pub fn holds(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn new(name: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            name: name.into(),
            conditions,
        }
    }

    pub fn validate(&self, catalog: &FeatureCatalog) -> EngineResult<()> {
        let invalid = |reason: String| EngineError::InvalidRule {
            rule: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("empty rule name".to_string()));
        }
        if self.conditions.is_empty() || self.conditions.len() > MAX_CONDITIONS {
            return Err(invalid(format!(
                "expected 1 to {MAX_CONDITIONS} conditions, got {}",
                self.conditions.len()
            )));
        }
        for cond in &self.conditions {
            if !cond.lower.is_finite() || !cond.upper.is_finite() {
                return Err(invalid(format!("non-finite bound on '{}'", cond.feature)));
            }
            if cond.lower > cond.upper {
                return Err(invalid(format!(
                    "lower bound {} above upper bound {} on '{}'",
                    cond.lower, cond.upper, cond.feature
                )));
            }
            if !catalog.contains(&cond.feature) {
                return Err(EngineError::UnknownFeature {
                    rule: self.name.clone(),
                    feature: cond.feature.clone(),
                });
            }
        }
        Ok(())
    }

    /// Features this rule needs that the table does not carry
    pub fn unavailable_features<'a>(&'a self, table: &FeatureTable) -> Vec<&'a str> {
        self.conditions
            .iter()
            .filter(|c| table.column(&c.feature).is_none())
            .map(|c| c.feature.as_str())
            .collect()
    }

    /// Row-aligned match flags over the whole table
    pub fn mask(&self, table: &FeatureTable) -> EngineResult<Vec<bool>> {
        let mut mask = vec![true; table.rows()];
        for cond in &self.conditions {
            let column =
                table
                    .column(&cond.feature)
                    .ok_or_else(|| EngineError::FeatureUnavailable {
                        rule: self.name.clone(),
                        feature: cond.feature.clone(),
                    })?;
            for (m, v) in mask.iter_mut().zip(column) {
                *m = *m && cond.holds(*v);
            }
        }
        for (row, m) in mask.iter_mut().enumerate() {
            *m = *m && !table.is_degenerate(row);
        }
        Ok(mask)
    }
}

#[derive(Serialize, Deserialize)]
struct RuleBankFile {
    rules: Vec<Rule>,
}

/// Validated, ordered collection of rules with lookup by name
#[derive(Debug, Clone)]
pub struct RuleBank {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleBank {
    /// Validate every rule against the catalogue; names must be unique
    pub fn new(rules: Vec<Rule>, catalog: &FeatureCatalog) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate(catalog)?;
            if !seen.insert(rule.name.as_str()) {
                return Err(EngineError::InvalidRule {
                    rule: rule.name.clone(),
                    reason: "duplicate rule name".to_string(),
                });
            }
        }
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Ok(Self { rules, index })
    }

    pub fn from_json(json: &str, catalog: &FeatureCatalog) -> EngineResult<Self> {
        let file: RuleBankFile = serde_json::from_str(json)?;
        Self::new(file.rules, catalog)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        let file = RuleBankFile {
            rules: self.rules.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// SHA-256 of the canonical JSON, identifies a rule-set version
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.rules).unwrap_or_default();
        let hash = Sha256::digest(json.as_bytes());
        format!("{:x}", hash)
    }

    /// Built-in bank generated from the band grid
    pub fn standard() -> Self {
        let rules = generate_band_grid();
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self { rules, index }
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ============================================================================
// Band Grid
// ============================================================================

/// Band edges for the features the built-in bank slices on
const BANDS: &[(&str, &[f64])] = &[
    ("ratio_a_h", &[0.2, 0.4, 0.6, 0.8, 1.0, 1.25, 1.6, 2.2]),
    ("ratio_a_d", &[0.4, 0.6, 0.8, 1.0, 1.2, 1.5, 2.0]),
    ("diff_abs_h_a", &[0.0, 0.05, 0.1, 0.2, 0.3, 0.45, 0.7]),
    ("angle_h_a", &[-20.0, -10.0, -5.0, -2.0, 0.0, 2.0, 5.0, 10.0, 20.0]),
    ("cv_1x2", &[0.0, 0.1, 0.2, 0.3, 0.45, 0.6, 0.8]),
    ("cv_ou", &[0.0, 0.05, 0.1, 0.2, 0.3, 0.5]),
    ("cv_cs", &[0.0, 0.1, 0.2, 0.3, 0.5]),
    ("ratio_over25_under25", &[0.5, 0.8, 1.0, 1.25, 1.6, 2.0]),
    ("ratio_btts_yes_btts_no", &[0.6, 0.8, 1.0, 1.2, 1.5]),
    ("diff_rel_cs00_cs01", &[0.0, 0.1, 0.25, 0.5, 1.0]),
];

/// The primary feature crossed with every band of the secondary features
const PRIMARY: &str = "ratio_a_h";
const SECONDARY: &[&str] = &[
    "cv_1x2",
    "ratio_over25_under25",
    "cv_cs",
    "ratio_btts_yes_btts_no",
];

fn bands(feature: &str) -> Vec<Condition> {
    BANDS
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(name, edges)| {
            edges
                .windows(2)
                .map(|w| Condition::new(*name, w[0], w[1]))
                .collect()
        })
        .unwrap_or_default()
}

fn label(cond: &Condition) -> String {
    format!("{}[{}..{}]", cond.feature, cond.lower, cond.upper)
}

/// Single-band rules for every banded feature, then primary x secondary band pairs
pub fn generate_band_grid() -> Vec<Rule> {
    let mut grid = Vec::with_capacity(200);

    // --- Singles: one rule per band ---
    for (feature, _) in BANDS {
        for cond in bands(feature) {
            grid.push(Rule::new(label(&cond), vec![cond]));
        }
    }

    // --- Pairs: primary band x secondary band ---
    for primary in bands(PRIMARY) {
        for secondary_feature in SECONDARY {
            for secondary in bands(secondary_feature) {
                let name = format!("{} & {}", label(&primary), label(&secondary));
                grid.push(Rule::new(name, vec![primary.clone(), secondary]));
            }
        }
    }

    grid
}
