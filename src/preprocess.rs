use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::EngineeredPass;
use crate::model::ModelError;

pub const NUMERICAL_FEATURES: [&str; 7] = [
    "start_x", "start_y", "end_x", "end_y", "distance", "angle", "abs_angle",
];
pub const CATEGORICAL_FEATURES: [&str; 2] = ["length_bucket", "minute_bucket"];
pub const BINARY_FEATURES: [&str; 4] = [
    "is_forward",
    "progressive",
    "start_in_final_third",
    "end_in_penalty_area",
];

fn numerical(row: &EngineeredPass) -> [f64; 7] {
    [
        row.base.start_x,
        row.base.start_y,
        row.base.end_x,
        row.base.end_y,
        row.base.distance,
        row.base.angle,
        row.abs_angle,
    ]
}

fn categorical(row: &EngineeredPass) -> [Option<&'static str>; 2] {
    [
        row.length_bucket.map(|b| b.label()),
        row.minute_bucket.map(|b| b.label()),
    ]
}

fn binary(row: &EngineeredPass) -> [bool; 4] {
    [
        row.is_forward,
        row.progressive,
        row.start_in_final_third,
        row.end_in_penalty_area,
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalColumn {
    fill: Option<String>,
    /// Sorted categories seen during fit, first one dropped.
    kept: Vec<String>,
}

impl CategoricalColumn {
    fn fit(values: &[Option<&'static str>]) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(*v).or_default() += 1;
        }
        // BTreeMap iterates in sorted order, so ties resolve to the smallest label.
        let mut fill: Option<(&str, usize)> = None;
        for (label, count) in &counts {
            if fill.is_none_or(|(_, best)| *count > best) {
                fill = Some((*label, *count));
            }
        }
        Self {
            fill: fill.map(|(label, _)| label.to_string()),
            kept: counts.keys().skip(1).map(|s| s.to_string()).collect(),
        }
    }

    fn encode(&self, value: Option<&str>, out: &mut Vec<f64>) {
        let value = value.or(self.fill.as_deref());
        for category in &self.kept {
            out.push(if value == Some(category.as_str()) { 1.0 } else { 0.0 });
        }
    }
}

/// Column transformer fitted on the training split: mean-impute + standardise the numerics,
/// most-frequent-impute + one-hot (drop first) the buckets, pass the flags through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    means: Vec<f64>,
    scales: Vec<f64>,
    categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    pub fn fit(rows: &[EngineeredPass]) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyData);
        }

        let mut means = Vec::with_capacity(NUMERICAL_FEATURES.len());
        let mut scales = Vec::with_capacity(NUMERICAL_FEATURES.len());
        for col in 0..NUMERICAL_FEATURES.len() {
            let values: Vec<f64> = rows
                .iter()
                .map(|r| numerical(r)[col])
                .filter(|v| v.is_finite())
                .collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            // Imputed cells sit at the mean, so they add nothing to the variance sum.
            let var = rows
                .iter()
                .map(|r| numerical(r)[col])
                .map(|v| if v.is_finite() { (v - mean).powi(2) } else { 0.0 })
                .sum::<f64>()
                / rows.len() as f64;
            let std = var.sqrt();
            means.push(mean);
            scales.push(if std > 1e-12 { std } else { 1.0 });
        }

        let categorical = (0..CATEGORICAL_FEATURES.len())
            .map(|col| {
                let values: Vec<Option<&'static str>> =
                    rows.iter().map(|r| categorical(r)[col]).collect();
                CategoricalColumn::fit(&values)
            })
            .collect();

        Ok(Self {
            means,
            scales,
            categorical,
        })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
            + self.categorical.iter().map(|c| c.kept.len()).sum::<usize>()
            + BINARY_FEATURES.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        for (name, col) in CATEGORICAL_FEATURES.iter().zip(&self.categorical) {
            for category in &col.kept {
                names.push(format!("{name}_{category}"));
            }
        }
        names.extend(BINARY_FEATURES.iter().map(|s| s.to_string()));
        names
    }

    pub fn transform_row(&self, row: &EngineeredPass) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_features());
        for (i, v) in numerical(row).into_iter().enumerate() {
            let v = if v.is_finite() { v } else { self.means[i] };
            out.push((v - self.means[i]) / self.scales[i]);
        }
        for (col, value) in self.categorical.iter().zip(categorical(row)) {
            col.encode(value, &mut out);
        }
        out.extend(binary(row).into_iter().map(|b| if b { 1.0 } else { 0.0 }));
        out
    }

    pub fn transform(&self, rows: &[EngineeredPass]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Preprocessor;
    use crate::features::{PassRecord, add_engineered_features};

    fn pass(start_x: f64, end_x: f64, minute: u32) -> PassRecord {
        PassRecord {
            start_x,
            start_y: 40.0,
            end_x,
            end_y: 40.0,
            distance: (end_x - start_x).abs(),
            angle: 0.0,
            completed: true,
            minute,
        }
    }

    #[test]
    fn scaled_columns_are_centred_and_dummies_drop_first() {
        let rows = vec![
            add_engineered_features(&pass(10.0, 15.0, 10)),
            add_engineered_features(&pass(20.0, 50.0, 50)),
            add_engineered_features(&pass(30.0, 35.0, 0)),
        ];
        let pre = Preprocessor::fit(&rows).expect("fit");
        let x = pre.transform(&rows);
        let mean_start: f64 = x.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        assert!(mean_start.abs() < 1e-9);

        // length buckets seen: medium, very_short -> only "very_short" kept.
        // minute buckets seen: 0-15, 46-60 (+ one missing) -> only "46-60" kept.
        let names = pre.feature_names();
        assert!(names.contains(&"length_bucket_very_short".to_string()));
        assert!(names.contains(&"minute_bucket_46-60".to_string()));
        assert_eq!(names.len(), pre.n_features());
        assert_eq!(x[0].len(), pre.n_features());
    }

    fn column(pre: &Preprocessor, name: &str) -> usize {
        pre.feature_names()
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("no column {name}"))
    }

    #[test]
    fn unseen_category_encodes_as_zeros() {
        let rows = vec![
            add_engineered_features(&pass(10.0, 15.0, 10)),
            add_engineered_features(&pass(10.0, 25.0, 10)),
            add_engineered_features(&pass(10.0, 40.0, 10)),
        ];
        let pre = Preprocessor::fit(&rows).expect("fit");
        let short = column(&pre, "length_bucket_short");
        let very_short = column(&pre, "length_bucket_very_short");

        let seen = pre.transform_row(&rows[1]);
        assert_eq!((seen[short], seen[very_short]), (1.0, 0.0));

        let long = pre.transform_row(&add_engineered_features(&pass(10.0, 60.0, 10)));
        assert_eq!((long[short], long[very_short]), (0.0, 0.0));
    }

    #[test]
    fn missing_bucket_takes_most_frequent_category() {
        let rows = vec![
            add_engineered_features(&pass(10.0, 15.0, 50)),
            add_engineered_features(&pass(10.0, 15.0, 50)),
            add_engineered_features(&pass(10.0, 15.0, 10)),
            add_engineered_features(&pass(10.0, 15.0, 0)),
        ];
        assert!(rows[3].minute_bucket.is_none());
        let pre = Preprocessor::fit(&rows).expect("fit");
        let second_half = column(&pre, "minute_bucket_46-60");

        assert_eq!(pre.transform_row(&rows[3])[second_half], 1.0);
        assert_eq!(pre.transform_row(&rows[2])[second_half], 0.0);
    }
}

