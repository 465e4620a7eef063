//! Pairwise correlation and the derived clustering distance.

use crate::returns::{mean, variance};

/// Variance at or below this is treated as zero for correlation purposes.
const VARIANCE_EPS: f64 = 1e-16;

/// Symmetric correlation matrix with unit diagonal, entries clamped to
/// [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    n: usize,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Pearson correlation over aligned return rows.
    ///
    /// Rows must be non-degenerate; filter with [`degenerate_rows`] first.
    pub fn from_returns(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let rho = pearson(&rows[i], &rows[j]);
                values[i * n + j] = rho;
                values[j * n + i] = rho;
            }
        }
        Self { n, values }
    }

    /// Build from a row-major value buffer. The caller is responsible for
    /// symmetry and unit diagonal; intended for synthetic matrices in tests
    /// and precomputed inputs.
    pub fn from_raw(n: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), n * n);
        Self { n, values }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }
}

/// Distance matrix `d = sqrt(0.5 * (1 - rho))`: symmetric, zero diagonal,
/// entries in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_correlation(corr: &CorrelationMatrix) -> Self {
        let n = corr.size();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    values[i * n + j] = (0.5 * (1.0 - corr.get(i, j))).max(0.0).sqrt();
                }
            }
        }
        Self { n, values }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }
}

/// Pearson correlation of two aligned samples, clamped to [-1, 1].
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mean_a = mean(a);
    let mean_b = mean(b);

    let cov: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>()
        / a.len() as f64;

    let var_a = variance(a);
    let var_b = variance(b);
    if var_a <= VARIANCE_EPS || var_b <= VARIANCE_EPS {
        return 0.0;
    }

    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Indices of return rows with (numerically) zero variance.
///
/// Such rows have undefined correlation with every other row and are excluded
/// before clustering.
pub fn degenerate_rows(rows: &[Vec<f64>]) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| variance(row) <= VARIANCE_EPS)
        .map(|(i, _)| i)
        .collect()
}
