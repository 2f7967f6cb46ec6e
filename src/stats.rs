//! Observation/prediction comparison statistics.

use serde::Serialize;

use crate::error::{ColdpixError, Result};

/// Summary of a paired comparison between observed and predicted series.
///
/// Means and standard deviations are rounded to two decimals. With no valid
/// pairs every optional field is `None` and `n` is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub mean_obs: Option<f64>,
    pub mean_pred: Option<f64>,
    pub sd_obs: Option<f64>,
    pub sd_pred: Option<f64>,
    /// `predicted - observed` for every valid pair, full precision
    pub diff: Vec<f64>,
    pub rmse: Option<f64>,
    pub n: usize,
}

impl Comparison {
    fn empty() -> Self {
        Self {
            mean_obs: None,
            mean_pred: None,
            sd_obs: None,
            sd_pred: None,
            diff: Vec::new(),
            rmse: None,
            n: 0,
        }
    }

    /// Percentile summary of `diff`
    pub fn summary(&self) -> Option<DiffSummary> {
        DiffSummary::from_diffs(&self.diff)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Compare two equal-length series, dropping any index where either is NaN.
pub fn compare(observed: &[f64], predicted: &[f64]) -> Result<Comparison> {
    if observed.len() != predicted.len() {
        return Err(ColdpixError::InvalidParameter {
            param: "predicted".to_string(),
            message: format!(
                "Series lengths differ: {} observed, {} predicted",
                observed.len(),
                predicted.len()
            ),
        });
    }

    let (obs, pred): (Vec<f64>, Vec<f64>) = observed
        .iter()
        .zip(predicted)
        .filter(|(o, p)| !o.is_nan() && !p.is_nan())
        .map(|(&o, &p)| (o, p))
        .unzip();

    if obs.is_empty() {
        return Ok(Comparison::empty());
    }

    let diff: Vec<f64> = pred.iter().zip(&obs).map(|(p, o)| p - o).collect();
    let rmse = (diff.iter().map(|d| d * d).sum::<f64>() / diff.len() as f64).sqrt();

    Ok(Comparison {
        mean_obs: Some(round2(mean(&obs))),
        mean_pred: Some(round2(mean(&pred))),
        sd_obs: Some(round2(std_dev(&obs))),
        sd_pred: Some(round2(std_dev(&pred))),
        n: diff.len(),
        diff,
        rmse: Some(rmse),
    })
}

/// Linear-interpolation percentile of sorted values, `q` in `[0, 1]`
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Distribution of signed and absolute differences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffSummary {
    pub mean: f64,
    pub sd: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub abs_mean: f64,
    pub abs_sd: f64,
    pub abs_q1: f64,
    pub abs_median: f64,
    pub abs_q3: f64,
}

impl DiffSummary {
    /// Summarize differences, ignoring NaN. `None` when nothing is left.
    pub fn from_diffs(diff: &[f64]) -> Option<Self> {
        let mut signed: Vec<f64> = diff.iter().copied().filter(|d| !d.is_nan()).collect();
        if signed.is_empty() {
            return None;
        }
        let mut abs: Vec<f64> = signed.iter().map(|d| d.abs()).collect();
        signed.sort_by(f64::total_cmp);
        abs.sort_by(f64::total_cmp);

        Some(Self {
            mean: mean(&signed),
            sd: std_dev(&signed),
            min: signed[0],
            q1: percentile(&signed, 0.25),
            median: percentile(&signed, 0.5),
            q3: percentile(&signed, 0.75),
            max: signed[signed.len() - 1],
            abs_mean: mean(&abs),
            abs_sd: std_dev(&abs),
            abs_q1: percentile(&abs, 0.25),
            abs_median: percentile(&abs, 0.5),
            abs_q3: percentile(&abs, 0.75),
        })
    }
}
