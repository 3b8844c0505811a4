//! Feature Engine: normalized probability features derived from market odds
//!
//! Every feature is a closed-form function of the ten implied probabilities
//! (`p = 1 / odds`). Features are computed once per batch into a column-oriented
//! table that all rules read from.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::types::{MatchDataset, Odds, OddsColumn};

use OddsColumn::*;

// ============================================================================
// Catalogue
// ============================================================================

/// Probability pairs that each produce five features
pub const PROBABILITY_PAIRS: [(OddsColumn, OddsColumn); 15] = [
    (HomeBack, DrawBack),
    (HomeBack, AwayBack),
    (DrawBack, AwayBack),
    (Over25Back, Under25Back),
    (BttsYesBack, BttsNoBack),
    (HomeBack, Over25Back),
    (AwayBack, Over25Back),
    (HomeBack, BttsYesBack),
    (AwayBack, BttsYesBack),
    (Over25Back, BttsYesBack),
    (Under25Back, BttsNoBack),
    (DrawBack, Cs0x0Lay),
    (Cs0x0Lay, Cs1x0Lay),
    (Cs0x0Lay, Cs0x1Lay),
    (Cs1x0Lay, Cs0x1Lay),
];

/// Probability groups measured by coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersionGroup {
    MatchOdds,
    OverUnder,
    CorrectScore,
}

impl DispersionGroup {
    pub const ALL: [DispersionGroup; 3] = [Self::MatchOdds, Self::OverUnder, Self::CorrectScore];

    pub fn columns(&self) -> &'static [OddsColumn] {
        match self {
            Self::MatchOdds => &[HomeBack, DrawBack, AwayBack],
            Self::OverUnder => &[Over25Back, Under25Back],
            Self::CorrectScore => &[Cs0x0Lay, Cs1x0Lay, Cs0x1Lay],
        }
    }

    pub fn feature_name(&self) -> &'static str {
        match self {
            Self::MatchOdds => "cv_1x2",
            Self::OverUnder => "cv_ou",
            Self::CorrectScore => "cv_cs",
        }
    }
}

/// How a feature is derived from the implied probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// `p_i / p_j`
    Ratio { num: OddsColumn, den: OddsColumn },
    /// `|p_i - p_j|`
    AbsDiff { a: OddsColumn, b: OddsColumn },
    /// `|p_i - p_j| / p_j`
    RelDiff { a: OddsColumn, b: OddsColumn },
    /// `atan((p_j - p_i) / 2)` in degrees
    Angle { a: OddsColumn, b: OddsColumn },
    /// sample stdev / mean over the group
    Dispersion { group: DispersionGroup },
}

impl Formula {
    pub fn inputs(&self) -> Vec<OddsColumn> {
        match *self {
            Formula::Ratio { num, den } => vec![num, den],
            Formula::AbsDiff { a, b } | Formula::RelDiff { a, b } | Formula::Angle { a, b } => {
                vec![a, b]
            }
            Formula::Dispersion { group } => group.columns().to_vec(),
        }
    }

    fn eval(&self, p: &Probabilities) -> f64 {
        match *self {
            Formula::Ratio { num, den } => p.get(num) / p.get(den),
            Formula::AbsDiff { a, b } => (p.get(a) - p.get(b)).abs(),
            Formula::RelDiff { a, b } => (p.get(a) - p.get(b)).abs() / p.get(b),
            Formula::Angle { a, b } => ((p.get(b) - p.get(a)) / 2.0).atan().to_degrees(),
            Formula::Dispersion { group } => {
                let values: Vec<f64> = group.columns().iter().map(|c| p.get(*c)).collect();
                coefficient_of_variation(&values)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub name: String,
    pub formula: Formula,
}

/// Ordered set of feature definitions
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    defs: Vec<FeatureDef>,
    index: HashMap<String, usize>,
}

impl FeatureCatalog {
    pub fn new(defs: Vec<FeatureDef>) -> Self {
        let index = defs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { defs, index }
    }

    /// The 78-feature catalogue: five features per probability pair plus three dispersions
    pub fn standard() -> Self {
        let mut defs = Vec::with_capacity(PROBABILITY_PAIRS.len() * 5 + 3);
        for (a, b) in PROBABILITY_PAIRS {
            let (ta, tb) = (a.token(), b.token());
            defs.push(FeatureDef {
                name: format!("ratio_{ta}_{tb}"),
                formula: Formula::Ratio { num: a, den: b },
            });
            defs.push(FeatureDef {
                name: format!("ratio_{tb}_{ta}"),
                formula: Formula::Ratio { num: b, den: a },
            });
            defs.push(FeatureDef {
                name: format!("diff_abs_{ta}_{tb}"),
                formula: Formula::AbsDiff { a, b },
            });
            defs.push(FeatureDef {
                name: format!("diff_rel_{ta}_{tb}"),
                formula: Formula::RelDiff { a, b },
            });
            defs.push(FeatureDef {
                name: format!("angle_{ta}_{tb}"),
                formula: Formula::Angle { a, b },
            });
        }
        for group in DispersionGroup::ALL {
            defs.push(FeatureDef {
                name: group.feature_name().to_string(),
                formula: Formula::Dispersion { group },
            });
        }
        Self::new(defs)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureDef> {
        self.index.get(name).map(|&i| &self.defs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDef> {
        self.defs.iter()
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Computation
// ============================================================================

/// Implied probabilities of one row, NaN where the odds are absent or malformed
struct Probabilities([f64; 10]);

impl Probabilities {
    fn from_odds(odds: &Odds) -> Self {
        Self(OddsColumn::ALL.map(|c| implied_probability(odds.get(c))))
    }

    fn get(&self, column: OddsColumn) -> f64 {
        self.0[column as usize]
    }
}

/// `1 / odds`; NaN for missing odds or odds below 1.0
pub fn implied_probability(odds: Option<Decimal>) -> f64 {
    match odds.and_then(|o| o.to_f64()) {
        Some(o) if o >= 1.0 => 1.0 / o,
        _ => f64::NAN,
    }
}

/// Sample standard deviation (n - 1) divided by the mean
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt() / mean
}

/// What to do when a dataset lacks some odds columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Fail the whole batch
    RequireAll,
    /// Leave out features whose inputs are absent
    SkipMissing,
}

/// Column-oriented feature values, row-aligned to the dataset they came from
#[derive(Debug, Clone)]
pub struct FeatureTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Vec<f64>>,
    rows: usize,
    degenerate: Vec<bool>,
    degenerate_rows: usize,
    missing_features: Vec<String>,
}

impl FeatureTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.get(row).copied())
    }

    /// All feature values of one row in catalogue order
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Rows with a malformed odds value or a non-finite feature; they match no rule
    pub fn degenerate_rows(&self) -> usize {
        self.degenerate_rows
    }

    pub fn is_degenerate(&self, row: usize) -> bool {
        self.degenerate.get(row).copied().unwrap_or(true)
    }

    /// Catalogue features that could not be computed for this dataset's shape
    pub fn missing_features(&self) -> &[String] {
        &self.missing_features
    }
}

/// Computes the feature table for a batch
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    catalog: FeatureCatalog,
}

impl FeatureEngine {
    pub fn new(catalog: FeatureCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// Derive every feature for every row in one pass
    pub fn compute(
        &self,
        dataset: &MatchDataset,
        policy: ColumnPolicy,
    ) -> EngineResult<FeatureTable> {
        let schema = &dataset.schema;
        let missing_columns = schema.missing_odds();

        if policy == ColumnPolicy::RequireAll && !missing_columns.is_empty() {
            return Err(EngineError::MissingColumns(
                missing_columns
                    .iter()
                    .map(|c| c.header().to_string())
                    .collect(),
            ));
        }

        let (active, skipped): (Vec<&FeatureDef>, Vec<&FeatureDef>) = self
            .catalog
            .iter()
            .partition(|d| d.formula.inputs().iter().all(|c| schema.has_odds(*c)));

        let missing_features: Vec<String> = skipped.iter().map(|d| d.name.clone()).collect();
        if !missing_features.is_empty() {
            warn!(
                missing_columns = ?missing_columns.iter().map(|c| c.header()).collect::<Vec<_>>(),
                skipped_features = missing_features.len(),
                "Dataset lacks odds columns, dependent features left out"
            );
        }

        let mut columns: Vec<Vec<f64>> = active
            .iter()
            .map(|_| Vec::with_capacity(dataset.len()))
            .collect();
        let mut degenerate = Vec::with_capacity(dataset.len());

        for record in &dataset.records {
            let probs = Probabilities::from_odds(&record.odds);
            // absent columns are handled by the policy; only present ones make a row malformed
            let mut bad = schema.odds.iter().any(|c| !probs.get(*c).is_finite());
            for (def, column) in active.iter().zip(columns.iter_mut()) {
                let value = def.formula.eval(&probs);
                bad |= !value.is_finite();
                column.push(value);
            }
            degenerate.push(bad);
        }
        let degenerate_rows = degenerate.iter().filter(|&&d| d).count();

        if degenerate_rows > 0 {
            warn!(
                rows = degenerate_rows,
                total = dataset.len(),
                "Rows with missing or malformed odds will not match any rule"
            );
        }

        let names: Vec<String> = active.iter().map(|d| d.name.clone()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        info!(
            rows = dataset.len(),
            features = names.len(),
            degenerate = degenerate_rows,
            "Computed feature table"
        );
        debug!(skipped = ?missing_features, "Features not available");

        Ok(FeatureTable {
            names,
            index,
            columns,
            rows: dataset.len(),
            degenerate,
            degenerate_rows,
            missing_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{odds, record};
    use crate::types::{MatchRecord, Schema};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal_macros::dec;

    fn dataset(records: Vec<MatchRecord>) -> MatchDataset {
        MatchDataset::new(Schema::full(), records)
    }

    #[test]
    fn test_standard_catalog_size_and_unique_names() {
        let catalog = FeatureCatalog::standard();
        assert_eq!(catalog.len(), 78);
        let mut names: Vec<_> = catalog.iter().map(|d| d.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 78);
        assert!(catalog.contains("ratio_h_d"));
        assert!(catalog.contains("angle_cs10_cs01"));
        assert!(catalog.contains("cv_cs"));
    }

    #[test]
    fn test_ratio_feature_exact() {
        let ds = dataset(vec![record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), Some((0, 1)))]);
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        let ratio = table.value("ratio_h_d", 0).unwrap();
        assert!((ratio - 1.5).abs() < 1e-9);
        let inverse = table.value("ratio_d_h", 0).unwrap();
        assert!((inverse - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_difference_and_angle_features() {
        let ds = dataset(vec![record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), None)]);
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        assert!((table.value("diff_abs_h_a", 0).unwrap() - 0.25).abs() < 1e-12);
        assert!((table.value("diff_rel_h_a", 0).unwrap() - 1.0).abs() < 1e-12);
        let expected_angle = ((0.25f64 - 0.5) / 2.0).atan() * 180.0 / std::f64::consts::PI;
        assert!((table.value("angle_h_a", 0).unwrap() - expected_angle).abs() < 1e-9);
        assert!(table.value("angle_h_a", 0).unwrap() < 0.0);
    }

    #[test]
    fn test_coefficient_of_variation_uses_sample_stdev() {
        assert!((coefficient_of_variation(&[1.0, 2.0, 3.0]) - 0.5).abs() < 1e-12);
        assert!(coefficient_of_variation(&[1.0]).is_nan());
        assert!(coefficient_of_variation(&[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_malformed_odds_produce_nan_and_are_counted() {
        let mut bad = odds(dec!(2.0), dec!(3.0), dec!(4.0));
        bad.set(OddsColumn::HomeBack, Some(dec!(0)));
        let mut missing = odds(dec!(2.0), dec!(3.0), dec!(4.0));
        missing.set(OddsColumn::Cs0x0Lay, None);
        let ds = dataset(vec![
            record(bad, None),
            record(missing, None),
            record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), None),
        ]);
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap();
        assert!(table.value("ratio_h_d", 0).unwrap().is_nan());
        // features not built on the bad column stay finite, the row is still flagged
        assert!(table.value("ratio_d_a", 0).unwrap().is_finite());
        assert!(table.value("cv_cs", 1).unwrap().is_nan());
        assert_eq!(table.degenerate_rows(), 2);
        assert!(table.is_degenerate(0));
        assert!(table.is_degenerate(1));
        assert!(!table.is_degenerate(2));
        assert!(implied_probability(Some(dec!(0.8))).is_nan());
        assert_eq!(implied_probability(Some(dec!(1.0))), 1.0);
    }

    #[test]
    fn test_require_all_fails_on_missing_column() {
        let mut ds = dataset(vec![record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), None)]);
        ds.schema.odds.retain(|c| *c != OddsColumn::BttsNoBack);
        let err = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::RequireAll)
            .unwrap_err();
        match err {
            EngineError::MissingColumns(cols) => assert_eq!(cols, vec!["Odd_BTTS_No_Back"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_skip_missing_leaves_out_dependent_features() {
        let mut ds = dataset(vec![record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), None)]);
        ds.schema.odds.retain(|c| *c != OddsColumn::Cs0x1Lay);
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::SkipMissing)
            .unwrap();
        assert!(table.column("ratio_cs00_cs01").is_none());
        assert!(table.column("cv_cs").is_none());
        assert!(table.column("ratio_cs00_cs10").is_some());
        // 2 pairs x 5 features + cv_cs
        assert_eq!(table.missing_features().len(), 11);
        assert_eq!(table.names().len(), 78 - 11);
    }

    #[test]
    fn test_absent_column_does_not_flag_rows() {
        let mut ds = dataset(vec![record(odds(dec!(2.0), dec!(3.0), dec!(4.0)), None)]);
        ds.schema.odds.retain(|c| *c != OddsColumn::Cs0x1Lay);
        ds.records[0].odds.set(OddsColumn::Cs0x1Lay, None);
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::SkipMissing)
            .unwrap();
        assert_eq!(table.degenerate_rows(), 0);
        assert!(!table.is_degenerate(0));

        ds.records[0].odds.set(OddsColumn::DrawBack, Some(dec!(0.5)));
        let table = FeatureEngine::default()
            .compute(&ds, ColumnPolicy::SkipMissing)
            .unwrap();
        assert!(table.is_degenerate(0));
    }

    #[test]
    fn test_features_are_bit_reproducible() {
        let mut rng = StdRng::seed_from_u64(7);
        let records: Vec<MatchRecord> = (0..50)
            .map(|_| {
                let values = [0; 10].map(|_| {
                    Decimal::from_f64(rng.gen_range(1.01..30.0))
                        .unwrap()
                        .round_dp(2)
                });
                record(Odds::complete(values), None)
            })
            .collect();
        let ds = dataset(records);
        let engine = FeatureEngine::default();
        let first = engine.compute(&ds, ColumnPolicy::RequireAll).unwrap();
        let second = engine.compute(&ds, ColumnPolicy::RequireAll).unwrap();
        for row in 0..ds.len() {
            let a: Vec<u64> = first.row(row).iter().map(|v| v.to_bits()).collect();
            let b: Vec<u64> = second.row(row).iter().map(|v| v.to_bits()).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_daily_and_historical_feature_parity() {
        let o = odds(dec!(1.8), dec!(3.6), dec!(4.5));
        let history = dataset(vec![record(o.clone(), Some((2, 0)))]);
        let mut today_schema = Schema::full();
        today_schema.has_results = false;
        let today = MatchDataset::new(today_schema, vec![record(o, None)]);

        let engine = FeatureEngine::default();
        let h = engine.compute(&history, ColumnPolicy::RequireAll).unwrap();
        let t = engine.compute(&today, ColumnPolicy::SkipMissing).unwrap();
        assert_eq!(h.names(), t.names());
        let hb: Vec<u64> = h.row(0).iter().map(|v| v.to_bits()).collect();
        let tb: Vec<u64> = t.row(0).iter().map(|v| v.to_bits()).collect();
        assert_eq!(hb, tb);
    }
}
