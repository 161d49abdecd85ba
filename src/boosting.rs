use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logistic::{check_shape, sigmoid};
use crate::model::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if v < *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Second-order gradient boosting of regression trees on the logistic loss
/// (exact greedy splits, L2 leaf penalty, per-tree row and column subsampling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub params: BoostParams,
    #[serde(default)]
    pub base_margin: f64,
    #[serde(default)]
    pub trees: Vec<Tree>,
}

impl GradientBoosting {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            base_margin: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        let n_features = check_shape(x, y)?;
        let n = x.len();
        let params = self.params;
        let mut rng = StdRng::seed_from_u64(params.seed);

        self.trees.clear();
        self.base_margin = 0.0;
        let mut margins = vec![self.base_margin; n];
        let mut grad = vec![0.0_f64; n];
        let mut hess = vec![0.0_f64; n];

        let n_rows = ((n as f64) * params.subsample.clamp(0.0, 1.0)).round().max(1.0) as usize;
        let n_cols = ((n_features as f64) * params.colsample_bytree.clamp(0.0, 1.0))
            .round()
            .max(1.0) as usize;
        let mut all_rows: Vec<usize> = (0..n).collect();
        let mut all_cols: Vec<usize> = (0..n_features).collect();

        for _ in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let rows = if n_rows < n {
                all_rows.shuffle(&mut rng);
                let mut picked = all_rows[..n_rows].to_vec();
                picked.sort_unstable();
                picked
            } else {
                all_rows.clone()
            };
            let cols = if n_cols < n_features {
                all_cols.shuffle(&mut rng);
                let mut picked = all_cols[..n_cols].to_vec();
                picked.sort_unstable();
                picked
            } else {
                all_cols.clone()
            };

            let mut tree = Tree::default();
            let builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                cols: &cols,
                params: &params,
            };
            builder.build(&mut tree, rows, 0);

            for (margin, row) in margins.iter_mut().zip(x) {
                *margin += tree.predict(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    cols: &'a [usize],
    params: &'a BoostParams,
}

impl TreeBuilder<'_> {
    fn build(&self, tree: &mut Tree, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let leaf_value = -g / (h + self.params.reg_lambda) * self.params.learning_rate;

        let idx = tree.nodes.len();
        tree.nodes.push(Node::Leaf { value: leaf_value });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| self.x[i][best.feature] < best.threshold);
        if left_rows.is_empty() || right_rows.is_empty() {
            return idx;
        }

        let left = self.build(tree, left_rows, depth + 1);
        let right = self.build(tree, right_rows, depth + 1);
        tree.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda;
        let min_child = self.params.min_child_weight;
        let parent_score = g * g / (h + lambda);

        self.cols
            .par_iter()
            .filter_map(|&feature| {
                let mut order: Vec<usize> = rows.to_vec();
                order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

                let mut best: Option<SplitCandidate> = None;
                let mut gl = 0.0_f64;
                let mut hl = 0.0_f64;
                for pos in 0..order.len() - 1 {
                    let i = order[pos];
                    gl += self.grad[i];
                    hl += self.hess[i];
                    let here = self.x[i][feature];
                    let next = self.x[order[pos + 1]][feature];
                    if next <= here {
                        continue;
                    }
                    let gr = g - gl;
                    let hr = h - hl;
                    if hl < min_child || hr < min_child {
                        continue;
                    }
                    let gain = 0.5
                        * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score);
                    if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                        best = Some(SplitCandidate {
                            feature,
                            threshold: (here + next) / 2.0,
                            gain,
                        });
                    }
                }
                best
            })
            .reduce_with(|a, b| {
                if b.gain > a.gain || (b.gain == a.gain && b.feature < a.feature) {
                    b
                } else {
                    a
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{BoostParams, GradientBoosting};

    #[test]
    fn learns_a_threshold_rule() {
        let x: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 10) as f64, (i / 10) as f64])
            .collect();
        let y: Vec<u8> = x.iter().map(|r| u8::from(r[0] >= 5.0)).collect();
        let mut model = GradientBoosting::new(BoostParams {
            n_estimators: 30,
            max_depth: 2,
            min_child_weight: 0.1,
            ..BoostParams::default()
        });
        model.fit(&x, &y).expect("fit");
        assert_eq!(model.trees.len(), 30);
        assert!(model.trees.iter().all(|t| t.depth() <= 2));
        assert!(model.predict_proba_row(&[8.0, 1.0]) > 0.8);
        assert!(model.predict_proba_row(&[1.0, 1.0]) < 0.2);
    }
}
