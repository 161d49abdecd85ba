use serde::{Deserialize, Serialize};

use crate::model::ModelError;

const TOLERANCE: f64 = 1e-6;

/// L2-regularised logistic regression (`C` scales the data term, intercept unpenalised),
/// fitted with Newton iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    #[serde(default)]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            weights: Vec::new(),
            intercept: 0.0,
            n_iter: 0,
        }
    }
}

impl LogisticRegression {
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        let n_features = check_shape(x, y)?;
        let dim = n_features + 1;
        // Parameter layout: [w_0 .. w_{d-1}, intercept].
        let mut theta = vec![0.0_f64; dim];

        self.n_iter = 0;
        for _ in 0..self.max_iter.max(1) {
            self.n_iter += 1;
            let mut grad = vec![0.0_f64; dim];
            let mut hess = vec![vec![0.0_f64; dim]; dim];
            for i in 0..n_features {
                grad[i] = theta[i];
                hess[i][i] = 1.0;
            }

            for (row, &label) in x.iter().zip(y) {
                let p = sigmoid(dot(&theta[..n_features], row) + theta[n_features]);
                let r = self.c * (p - f64::from(label));
                let w = self.c * (p * (1.0 - p)).max(1e-12);
                for a in 0..dim {
                    let xa = feature(row, a, n_features);
                    grad[a] += r * xa;
                    for b in a..dim {
                        hess[a][b] += w * xa * feature(row, b, n_features);
                    }
                }
            }
            for a in 0..dim {
                for b in 0..a {
                    hess[a][b] = hess[b][a];
                }
            }

            let step = solve(hess, grad).ok_or(ModelError::Singular)?;
            let mut step_norm = 0.0_f64;
            for (t, s) in theta.iter_mut().zip(&step) {
                *t -= s;
                step_norm = step_norm.max(s.abs());
            }
            if step_norm < TOLERANCE {
                break;
            }
        }

        self.weights = theta[..n_features].to_vec();
        self.intercept = theta[n_features];
        Ok(())
    }

    pub fn decision(&self, row: &[f64]) -> f64 {
        dot(&self.weights, row) + self.intercept
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision(row))
    }
}

pub(crate) fn check_shape(x: &[Vec<f64>], y: &[u8]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::EmptyData);
    }
    if x.len() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    let n_features = x[0].len();
    if x.iter().any(|row| row.len() != n_features) {
        return Err(ModelError::RaggedRows);
    }
    Ok(n_features)
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn feature(row: &[f64], idx: usize, n_features: usize) -> f64 {
    if idx == n_features { 1.0 } else { row[idx] }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-14 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * out[k]).sum();
        out[row] = (b[row] - tail) / a[row][row];
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::{LogisticRegression, sigmoid, solve};

    #[test]
    fn solves_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).expect("solvable");
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn separates_one_dimensional_classes() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 / 10.0 - 2.0]).collect();
        let y: Vec<u8> = (0..40).map(|i| u8::from(i >= 20)).collect();
        let mut model = LogisticRegression::default();
        model.fit(&x, &y).expect("fit");
        assert!(model.weights[0] > 0.0);
        assert!(model.predict_proba_row(&[1.5]) > 0.9);
        assert!(model.predict_proba_row(&[-1.5]) < 0.1);
        assert!(model.n_iter < 100);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }
}
