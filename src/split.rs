use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Stratified hold-out split: each class contributes `round(test_size * n_class)` rows to the
/// test set. Rows keep their original relative order inside each part.
pub fn stratified_split<T: Clone>(
    rows: &[T],
    label: impl Fn(&T) -> u8,
    test_size: f64,
    seed: u64,
) -> Split<T> {
    let test_size = test_size.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut in_test = vec![false; rows.len()];

    let mut classes: Vec<u8> = rows.iter().map(&label).collect();
    classes.sort_unstable();
    classes.dedup();

    for class in classes {
        let mut idx: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| label(row) == class)
            .map(|(i, _)| i)
            .collect();
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64) * test_size).round() as usize;
        for i in idx.into_iter().take(n_test) {
            in_test[i] = true;
        }
    }

    let mut train = Vec::with_capacity(rows.len());
    let mut test = Vec::new();
    for (row, is_test) in rows.iter().zip(in_test) {
        if is_test {
            test.push(row.clone());
        } else {
            train.push(row.clone());
        }
    }
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::stratified_split;

    #[test]
    fn keeps_class_ratio_and_is_deterministic() {
        let rows: Vec<u8> = (0..100).map(|i| u8::from(i % 4 != 0)).collect();
        let a = stratified_split(&rows, |r| *r, 0.2, 42);
        let b = stratified_split(&rows, |r| *r, 0.2, 42);
        assert_eq!(a.test.len(), 20);
        assert_eq!(a.train.len(), 80);
        assert_eq!(a.test.iter().filter(|r| **r == 0).count(), 5);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn parts_keep_original_row_order() {
        let rows: Vec<(usize, u8)> = (0..40).map(|i| (i, u8::from(i % 3 == 0))).collect();
        let split = stratified_split(&rows, |r| r.1, 0.3, 7);
        assert_eq!(split.train.len() + split.test.len(), rows.len());
        for part in [&split.train, &split.test] {
            assert!(part.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }
}

