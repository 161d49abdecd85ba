use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// `[[tn, fp], [fn, tp]]`, rows are the actual class.
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub log_loss: f64,
    pub brier: f64,
}

impl Metrics {
    pub fn as_pairs(&self) -> [(&'static str, f64); 7] {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
            ("roc_auc", self.roc_auc),
            ("log_loss", self.log_loss),
            ("brier", self.brier),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

pub fn confusion_matrix(actual: &[u8], predicted: &[u8]) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::default();
    for (&a, &p) in actual.iter().zip(predicted) {
        match (a != 0, p != 0) {
            (false, false) => cm.true_negative += 1,
            (false, true) => cm.false_positive += 1,
            (true, false) => cm.false_negative += 1,
            (true, true) => cm.true_positive += 1,
        }
    }
    cm
}

pub fn accuracy(actual: &[u8], predicted: &[u8]) -> f64 {
    let cm = confusion_matrix(actual, predicted);
    ratio(cm.true_positive + cm.true_negative, cm.total())
}

pub fn precision(actual: &[u8], predicted: &[u8]) -> f64 {
    let cm = confusion_matrix(actual, predicted);
    ratio(cm.true_positive, cm.true_positive + cm.false_positive)
}

pub fn recall(actual: &[u8], predicted: &[u8]) -> f64 {
    let cm = confusion_matrix(actual, predicted);
    ratio(cm.true_positive, cm.true_positive + cm.false_negative)
}

pub fn f1(actual: &[u8], predicted: &[u8]) -> f64 {
    let p = precision(actual, predicted);
    let r = recall(actual, predicted);
    if p + r <= 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

/// Mann-Whitney form of the ROC AUC with tied scores sharing their average rank.
pub fn roc_auc(actual: &[u8], scores: &[f64]) -> f64 {
    let n = actual.len().min(scores.len());
    let positives = actual[..n].iter().filter(|&&y| y != 0).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0_f64;
    let mut start = 0usize;
    while start < n {
        let mut end = start + 1;
        while end < n && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end share their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            if actual[i] != 0 {
                rank_sum_pos += avg_rank;
            }
        }
        start = end;
    }

    let p = positives as f64;
    (rank_sum_pos - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

pub fn log_loss(actual: &[u8], probs: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != probs.len() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(probs)
        .map(|(&y, &p)| {
            let p = p.clamp(1e-15, 1.0 - 1e-15);
            if y != 0 { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    sum / actual.len() as f64
}

pub fn brier(actual: &[u8], probs: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != probs.len() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(probs)
        .map(|(&y, &p)| (p - f64::from(y)).powi(2))
        .sum();
    sum / actual.len() as f64
}

pub fn evaluate(actual: &[u8], probs: &[f64], threshold: f64) -> Metrics {
    if actual.is_empty() || actual.len() != probs.len() {
        return Metrics::default();
    }
    let predicted: Vec<u8> = probs.iter().map(|&p| u8::from(p >= threshold)).collect();
    Metrics {
        samples: actual.len(),
        accuracy: accuracy(actual, &predicted),
        precision: precision(actual, &predicted),
        recall: recall(actual, &predicted),
        f1: f1(actual, &predicted),
        roc_auc: roc_auc(actual, probs),
        log_loss: log_loss(actual, probs),
        brier: brier(actual, probs),
    }
}

pub fn calibration_bins(actual: &[u8], probs: &[f64], bins: usize) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (&y, &p) in actual.iter().zip(probs) {
        let p = p.clamp(0.0, 1.0);
        let idx = ((p * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += p;
        actual_sum[idx] += f64::from(y);
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

/// Per-class precision / recall / F1 / support table followed by overall accuracy.
pub fn classification_report(actual: &[u8], predicted: &[u8]) -> String {
    let flip = |v: &[u8]| v.iter().map(|&y| u8::from(y == 0)).collect::<Vec<_>>();
    let actual_neg = flip(actual);
    let predicted_neg = flip(predicted);

    let mut lines = vec![format!(
        "{:<14}{:>10}{:>10}{:>10}{:>10}",
        "", "precision", "recall", "f1-score", "support"
    )];
    for (label, a, p) in [
        ("0 (failed)", actual_neg.as_slice(), predicted_neg.as_slice()),
        ("1 (complete)", actual, predicted),
    ] {
        let support = a.iter().filter(|&&y| y != 0).count();
        lines.push(format!(
            "{:<14}{:>10.2}{:>10.2}{:>10.2}{:>10}",
            label,
            precision(a, p),
            recall(a, p),
            f1(a, p),
            support
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "{:<14}{:>30.2}{:>10}",
        "accuracy",
        accuracy(actual, predicted),
        actual.len()
    ));
    lines.join("\n")
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::{calibration_bins, confusion_matrix, evaluate, roc_auc};

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let y = [0, 0, 1, 1];
        let s = [0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y, &s) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tied_scores_share_rank() {
        let y = [0, 1, 0, 1];
        let s = [0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y, &s) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_degenerate() {
        assert_eq!(roc_auc(&[1, 1], &[0.3, 0.7]), 0.0);
        let m = evaluate(&[], &[], 0.5);
        assert_eq!(m.samples, 0);
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn confusion_counts_and_scores() {
        let y = [1, 1, 0, 0, 1];
        let p = [0.9, 0.4, 0.6, 0.1, 0.7];
        let m = evaluate(&y, &p, 0.5);
        let cm = confusion_matrix(&y, &[1, 0, 1, 0, 1]);
        assert_eq!(cm.as_rows(), [[1, 1], [1, 2]]);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn calibration_bins_cover_unit_interval() {
        let bins = calibration_bins(&[1, 0, 1], &[1.0, 0.05, 0.55], 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[5].count, 1);
        assert!((bins[5].actual_rate - 1.0).abs() < 1e-12);
    }
}
