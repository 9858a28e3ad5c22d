//! Agreement metrics between two identity profiles of the same reference

use crate::error::BenchError;
use crate::identity::IdentityProfile;

/// Two bases agree when their identities differ by less than this many points
pub const AGREEMENT_TOLERANCE: f64 = 1.0;

/// Comparison of profile A against profile B
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSet {
    /// Reference length both profiles span
    pub length: usize,
    /// Bases covered by both profiles
    pub joint_bases: usize,
    pub coverage_a: f64,
    pub coverage_b: f64,
    pub overlap_coverage: f64,
    /// Percent of jointly covered bases whose identities agree
    pub agreement_pct: f64,
    pub mean_absolute_difference: f64,
    pub pearson_correlation: f64,
}

/// Compare two profiles, using hit counts to decide coverage
pub fn compare(a: &IdentityProfile, b: &IdentityProfile) -> Result<MetricSet, BenchError> {
    check_shape(a.len(), b.len())?;
    Ok(compare_masked(a.iter(), b.iter(), a.len()))
}

/// Compare two bare identity vectors, treating any value above 0 as covered
pub fn compare_dense(a: &[f64], b: &[f64]) -> Result<MetricSet, BenchError> {
    check_shape(a.len(), b.len())?;
    let masked = |v: &[f64]| v.iter().map(|&x| (x, x > 0.0)).collect::<Vec<_>>();
    Ok(compare_masked(masked(a), masked(b), a.len()))
}

fn check_shape(left: usize, right: usize) -> Result<(), BenchError> {
    if left != right {
        return Err(BenchError::ShapeMismatch { left, right });
    }
    Ok(())
}

fn compare_masked<A, B>(a: A, b: B, length: usize) -> MetricSet
where
    A: IntoIterator<Item = (f64, bool)>,
    B: IntoIterator<Item = (f64, bool)>,
{
    let mut covered_a = 0usize;
    let mut covered_b = 0usize;
    let mut joint_a = Vec::new();
    let mut joint_b = Vec::new();

    for ((va, ca), (vb, cb)) in a.into_iter().zip(b) {
        covered_a += ca as usize;
        covered_b += cb as usize;
        if ca && cb {
            joint_a.push(va);
            joint_b.push(vb);
        }
    }

    let mut metrics = MetricSet {
        length,
        joint_bases: joint_a.len(),
        coverage_a: percent(covered_a, length),
        coverage_b: percent(covered_b, length),
        overlap_coverage: percent(joint_a.len(), length),
        ..Default::default()
    };

    if joint_a.is_empty() {
        return metrics;
    }

    let mut agreeing = 0usize;
    let mut abs_diff_sum = 0.0;
    for (&x, &y) in joint_a.iter().zip(&joint_b) {
        let diff = (x - y).abs();
        if diff < AGREEMENT_TOLERANCE {
            agreeing += 1;
        }
        abs_diff_sum += diff;
    }

    metrics.agreement_pct = percent(agreeing, joint_a.len());
    metrics.mean_absolute_difference = abs_diff_sum / joint_a.len() as f64;
    metrics.pearson_correlation = pearson(&joint_a, &joint_b);
    metrics
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Pearson correlation, 0 when either side is constant or empty
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 || is_constant(&x[..n]) || is_constant(&y[..n]) {
        return 0.0;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}
