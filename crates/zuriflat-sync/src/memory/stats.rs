//! Small dense numerics for the in-memory backend: z-scores, ridge regression, PCA.

/// Column-wise z-scores. A constant column standardises to all zeros.
pub fn standardize(column: &[f64]) -> Vec<f64> {
    let n = column.len() as f64;
    if column.is_empty() {
        return Vec::new();
    }
    let mean = column.iter().sum::<f64>() / n;
    let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std == 0.0 || !std.is_finite() {
        return vec![0.0; column.len()];
    }
    column.iter().map(|v| (v - mean) / std).collect()
}

/// Fitted linear model `y = intercept + coef . x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ridge {
    pub intercept: f64,
    pub coef: Vec<f64>,
}

impl Ridge {
    /// Closed-form ridge regression with an unpenalised intercept.
    ///
    /// Returns `None` for fewer than two samples.
    pub fn fit(rows: &[&[f64]], y: &[f64], alpha: f64) -> Option<Self> {
        if rows.len() < 2 || rows.len() != y.len() {
            return None;
        }
        let d = rows[0].len();
        let n = rows.len() as f64;
        let x_mean: Vec<f64> = (0..d)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;

        let mut a = vec![vec![0.0; d]; d];
        let mut b = vec![0.0; d];
        for (row, target) in rows.iter().zip(y) {
            for i in 0..d {
                let xi = row[i] - x_mean[i];
                b[i] += xi * (target - y_mean);
                for j in 0..d {
                    a[i][j] += xi * (row[j] - x_mean[j]);
                }
            }
        }
        for (i, row) in a.iter_mut().enumerate() {
            row[i] += alpha;
        }
        let coef = solve(a, b)?;
        let intercept = y_mean - dot(&x_mean, &coef);
        Some(Self { intercept, coef })
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.intercept + dot(&self.coef, x)
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// First two principal components of already-centred rows.
#[derive(Debug, Clone)]
pub struct Pca {
    pub components: [Vec<f64>; 2],
    pub explained_variance_ratio: [f64; 2],
}

impl Pca {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let d = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(2) as f64 - 1.0;
        let mut cov = vec![vec![0.0; d]; d];
        for row in rows {
            for i in 0..d {
                for j in 0..d {
                    cov[i][j] += row[i] * row[j] / n;
                }
            }
        }
        let trace: f64 = (0..d).map(|i| cov[i][i]).sum();

        let (v1, l1) = power_iteration(&cov);
        for i in 0..d {
            for j in 0..d {
                cov[i][j] -= l1 * v1[i] * v1[j];
            }
        }
        let (v2, l2) = power_iteration(&cov);
        let ratio = |l: f64| if trace > 0.0 { (l / trace).max(0.0) } else { 0.0 };
        Self {
            explained_variance_ratio: [ratio(l1), ratio(l2)],
            components: [v1, v2],
        }
    }

    pub fn transform(&self, row: &[f64]) -> (f64, f64) {
        (dot(&self.components[0], row), dot(&self.components[1], row))
    }
}

fn power_iteration(m: &[Vec<f64>]) -> (Vec<f64>, f64) {
    let d = m.len();
    let mut v: Vec<f64> = (0..d).map(|i| 1.0 / (i as f64 + 1.0)).collect();
    let mut lambda = 0.0;
    for _ in 0..200 {
        let next: Vec<f64> = m.iter().map(|row| dot(row, &v)).collect();
        let norm = dot(&next, &next).sqrt();
        if norm < 1e-12 {
            return (vec![0.0; d], 0.0);
        }
        lambda = norm;
        v = next.into_iter().map(|x| x / norm).collect();
    }
    (v, lambda)
}
