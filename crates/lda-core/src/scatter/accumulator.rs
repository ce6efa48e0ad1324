//! Two-pass accumulation of class means and scatter matrices
//!
//! Pass 1 ([`ClassMeansAccumulator`]) sums feature vectors per class and
//! globally. Pass 2 ([`ScatterAccumulator`]) needs the finalized means and
//! sums outer products of class-centred observations. Both accumulators can be
//! merged, so partitions of the input may be processed independently and
//! combined by addition.

use std::collections::HashMap;

use faer::Mat;

use crate::errors::{LdaError, LdaResult};

/// Running sum and count of one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatistics {
    pub sum: Vec<f64>,
    pub count: usize,
}

impl ClassStatistics {
    fn new(n_features: usize) -> Self {
        Self {
            sum: vec![0.0; n_features],
            count: 0,
        }
    }
}

/// Pass 1: per-class and global sums
///
/// Classes get a dense index in first-seen order.
#[derive(Debug, Clone)]
pub struct ClassMeansAccumulator {
    n_features: usize,
    index: HashMap<String, usize>,
    labels: Vec<String>,
    stats: Vec<ClassStatistics>,
    global_sum: Vec<f64>,
    total: usize,
}

impl ClassMeansAccumulator {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            index: HashMap::new(),
            labels: Vec::new(),
            stats: Vec::new(),
            global_sum: vec![0.0; n_features],
            total: 0,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.stats.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn class_slot(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.stats.len();
        self.index.insert(label.to_string(), idx);
        self.labels.push(label.to_string());
        self.stats.push(ClassStatistics::new(self.n_features));
        idx
    }

    /// Add one observation of class `label`
    pub fn observe(&mut self, label: &str, x: &[f64]) -> LdaResult<()> {
        if x.len() != self.n_features {
            return Err(LdaError::DimensionMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        let idx = self.class_slot(label);
        let stats = &mut self.stats[idx];
        for ((s, g), &v) in stats.sum.iter_mut().zip(self.global_sum.iter_mut()).zip(x) {
            *s += v;
            *g += v;
        }
        stats.count += 1;
        self.total += 1;
        Ok(())
    }

    /// Fold another partition's sums into this one
    ///
    /// Classes unknown to `self` are appended in `other`'s first-seen order.
    pub fn merge(&mut self, other: &ClassMeansAccumulator) -> LdaResult<()> {
        if other.n_features != self.n_features {
            return Err(LdaError::DimensionMismatch {
                expected: self.n_features,
                actual: other.n_features,
            });
        }
        for (label, stats) in other.labels.iter().zip(&other.stats) {
            let idx = self.class_slot(label);
            let target = &mut self.stats[idx];
            for (t, s) in target.sum.iter_mut().zip(&stats.sum) {
                *t += s;
            }
            target.count += stats.count;
        }
        for (g, s) in self.global_sum.iter_mut().zip(&other.global_sum) {
            *g += s;
        }
        self.total += other.total;
        Ok(())
    }

    /// Turn sums into means
    ///
    /// Fails with `NoClasses` when nothing was observed.
    pub fn finalize(self, class_column: &str) -> LdaResult<ClassMeans> {
        if self.stats.is_empty() {
            return Err(LdaError::NoClasses {
                column: class_column.to_string(),
            });
        }
        let total = self.total as f64;
        let global_mean = self.global_sum.iter().map(|s| s / total).collect();
        let counts = self.stats.iter().map(|s| s.count).collect();
        let means = self
            .stats
            .into_iter()
            .map(|s| {
                let n = s.count as f64;
                s.sum.into_iter().map(|v| v / n).collect()
            })
            .collect();

        Ok(ClassMeans {
            n_features: self.n_features,
            index: self.index,
            labels: self.labels,
            counts,
            means,
            global_mean,
            total: self.total,
        })
    }
}

/// Finalized pass-1 statistics, shared read-only by pass 2
#[derive(Debug, Clone)]
pub struct ClassMeans {
    n_features: usize,
    index: HashMap<String, usize>,
    labels: Vec<String>,
    counts: Vec<usize>,
    means: Vec<Vec<f64>>,
    global_mean: Vec<f64>,
    total: usize,
}

impl ClassMeans {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn global_mean(&self) -> &[f64] {
        &self.global_mean
    }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Mean vector of a class
    pub fn mean_of(&self, label: &str) -> Option<&[f64]> {
        self.class_index(label).map(|i| self.means[i].as_slice())
    }
}

/// Within-class and between-class scatter
#[derive(Debug, Clone)]
pub struct ScatterMatrices {
    /// Within-class scatter Sw
    pub within: Mat<f64>,
    /// Between-class scatter Sb
    pub between: Mat<f64>,
}

impl ScatterMatrices {
    pub fn n_features(&self) -> usize {
        self.within.nrows()
    }
}

/// Pass 2: within-class outer products around the finalized class means
pub struct ScatterAccumulator<'m> {
    means: &'m ClassMeans,
    within: Mat<f64>,
    centred: Vec<f64>,
}

impl<'m> ScatterAccumulator<'m> {
    pub fn new(means: &'m ClassMeans) -> Self {
        let d = means.n_features();
        Self {
            means,
            within: Mat::zeros(d, d),
            centred: vec![0.0; d],
        }
    }

    /// Add the outer product of `x - mean(label)`
    pub fn observe(&mut self, label: &str, x: &[f64]) -> LdaResult<()> {
        let d = self.means.n_features();
        if x.len() != d {
            return Err(LdaError::DimensionMismatch {
                expected: d,
                actual: x.len(),
            });
        }
        let mean = self.means.mean_of(label).ok_or_else(|| {
            LdaError::InvalidInput(format!("class '{}' was not seen in the first pass", label))
        })?;
        for ((c, &v), &m) in self.centred.iter_mut().zip(x).zip(mean) {
            *c = v - m;
        }
        // upper triangle only, mirrored in finish()
        for i in 0..d {
            let ci = self.centred[i];
            for j in i..d {
                self.within[(i, j)] += ci * self.centred[j];
            }
        }
        Ok(())
    }

    /// Fold another partition's within-class contributions into this one
    pub fn merge(&mut self, other: &ScatterAccumulator<'_>) -> LdaResult<()> {
        let d = self.means.n_features();
        if other.within.nrows() != d {
            return Err(LdaError::DimensionMismatch {
                expected: d,
                actual: other.within.nrows(),
            });
        }
        for i in 0..d {
            for j in i..d {
                self.within[(i, j)] += other.within[(i, j)];
            }
        }
        Ok(())
    }

    /// Complete Sw and compute Sb from the class means
    pub fn finish(self) -> ScatterMatrices {
        let d = self.means.n_features();
        let mut within = self.within;
        for i in 0..d {
            for j in (i + 1)..d {
                within[(j, i)] = within[(i, j)];
            }
        }

        let mut between = Mat::zeros(d, d);
        let global = self.means.global_mean();
        let mut m = vec![0.0; d];
        for (mean, &count) in self.means.means().iter().zip(self.means.counts()) {
            for ((mi, &cm), &gm) in m.iter_mut().zip(mean).zip(global) {
                *mi = cm - gm;
            }
            let n = count as f64;
            for i in 0..d {
                for j in 0..d {
                    between[(i, j)] += n * m[i] * m[j];
                }
            }
        }

        ScatterMatrices { within, between }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(&'static str, [f64; 2])> {
        vec![
            ("a", [1.0, 2.0]),
            ("a", [3.0, 2.0]),
            ("b", [10.0, 0.0]),
            ("b", [12.0, 4.0]),
            ("b", [14.0, 2.0]),
        ]
    }

    fn accumulate(rows: &[(&str, [f64; 2])]) -> (ClassMeans, ScatterMatrices) {
        let mut pass1 = ClassMeansAccumulator::new(2);
        for (label, x) in rows {
            pass1.observe(label, x).unwrap();
        }
        let means = pass1.finalize("class").unwrap();
        let mut pass2 = ScatterAccumulator::new(&means);
        for (label, x) in rows {
            pass2.observe(label, x).unwrap();
        }
        let scatter = pass2.finish();
        (means, scatter)
    }

    #[test]
    fn test_class_means() {
        let (means, _) = accumulate(&rows());
        assert_eq!(means.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(means.counts(), &[2, 3]);
        assert_eq!(means.mean_of("a").unwrap(), &[2.0, 2.0]);
        assert_eq!(means.mean_of("b").unwrap(), &[12.0, 2.0]);
        assert!((means.global_mean()[0] - 8.0).abs() < 1e-12);
        assert!((means.global_mean()[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_within_scatter() {
        let (_, scatter) = accumulate(&rows());
        // a: (-1,0),(1,0)  b: (-2,-2),(0,2),(2,0)
        assert!((scatter.within[(0, 0)] - 10.0).abs() < 1e-12);
        assert!((scatter.within[(0, 1)] - 4.0).abs() < 1e-12);
        assert!((scatter.within[(1, 0)] - 4.0).abs() < 1e-12);
        assert!((scatter.within[(1, 1)] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_between_scatter() {
        let (_, scatter) = accumulate(&rows());
        // a: 2 * (-6,0)(-6,0)^T  b: 3 * (4,0)(4,0)^T
        assert!((scatter.between[(0, 0)] - 120.0).abs() < 1e-12);
        assert!(scatter.between[(0, 1)].abs() < 1e-12);
        assert!(scatter.between[(1, 1)].abs() < 1e-12);
    }

    #[test]
    fn test_single_class_has_zero_between_scatter() {
        let rows = vec![("a", [1.0, 2.0]), ("a", [3.0, 5.0]), ("a", [0.0, 1.0])];
        let (means, scatter) = accumulate(&rows);
        assert_eq!(means.n_classes(), 1);
        for i in 0..2 {
            for j in 0..2 {
                assert!(scatter.between[(i, j)].abs() < 1e-12);
            }
        }
        assert!(scatter.within[(0, 0)] > 0.0);
    }

    #[test]
    fn test_permutation_invariance() {
        let original = rows();
        let mut permuted = original.clone();
        permuted.reverse();
        permuted.swap(0, 2);

        let (_, a) = accumulate(&original);
        let (_, b) = accumulate(&permuted);
        for i in 0..2 {
            for j in 0..2 {
                assert!((a.within[(i, j)] - b.within[(i, j)]).abs() < 1e-9);
                assert!((a.between[(i, j)] - b.between[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_merge_matches_sequential() {
        let all = rows();
        let (left, right) = all.split_at(3);

        let mut p1_left = ClassMeansAccumulator::new(2);
        for (label, x) in left {
            p1_left.observe(label, x).unwrap();
        }
        let mut p1_right = ClassMeansAccumulator::new(2);
        for (label, x) in right {
            p1_right.observe(label, x).unwrap();
        }
        p1_left.merge(&p1_right).unwrap();
        let means = p1_left.finalize("class").unwrap();

        let mut p2_left = ScatterAccumulator::new(&means);
        for (label, x) in left {
            p2_left.observe(label, x).unwrap();
        }
        let mut p2_right = ScatterAccumulator::new(&means);
        for (label, x) in right {
            p2_right.observe(label, x).unwrap();
        }
        p2_left.merge(&p2_right).unwrap();
        let merged = p2_left.finish();

        let (seq_means, sequential) = accumulate(&all);
        assert_eq!(means.counts(), seq_means.counts());
        for i in 0..2 {
            for j in 0..2 {
                assert!((merged.within[(i, j)] - sequential.within[(i, j)]).abs() < 1e-9);
                assert!((merged.between[(i, j)] - sequential.between[(i, j)]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_merge_appends_new_classes_in_order() {
        let mut left = ClassMeansAccumulator::new(1);
        left.observe("b", &[1.0]).unwrap();
        let mut right = ClassMeansAccumulator::new(1);
        right.observe("c", &[2.0]).unwrap();
        right.observe("b", &[3.0]).unwrap();
        right.observe("a", &[4.0]).unwrap();
        left.merge(&right).unwrap();

        let means = left.finalize("class").unwrap();
        assert_eq!(
            means.labels(),
            &["b".to_string(), "c".to_string(), "a".to_string()]
        );
        assert_eq!(means.counts(), &[2, 1, 1]);
    }

    #[test]
    fn test_finalize_without_classes() {
        let acc = ClassMeansAccumulator::new(3);
        assert!(matches!(
            acc.finalize("class"),
            Err(LdaError::NoClasses { .. })
        ));
    }

    #[test]
    fn test_observe_wrong_length() {
        let mut acc = ClassMeansAccumulator::new(3);
        assert!(matches!(
            acc.observe("a", &[1.0]),
            Err(LdaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_class_in_second_pass() {
        let mut acc = ClassMeansAccumulator::new(1);
        acc.observe("a", &[1.0]).unwrap();
        let means = acc.finalize("class").unwrap();
        let mut pass2 = ScatterAccumulator::new(&means);
        assert!(matches!(
            pass2.observe("z", &[1.0]),
            Err(LdaError::InvalidInput(_))
        ));
    }
}
