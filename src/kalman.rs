//! Scalar recursive (Kalman-style) filter for denoising a single channel.
//!
//! The channel is modeled as a random walk: transition and observation both
//! reduce to scalar identity, so smoothing is one forward pass with no
//! external prediction model and no backward pass.

/// Noise assumptions and initial state for [`smooth`].
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    /// Q: assumed variance of the true signal's drift between steps.
    pub process_noise: f64,

    /// R: assumed variance of the sensor's observation error.
    pub measurement_noise: f64,

    /// P0: covariance assigned to the initial estimate.
    pub initial_covariance: f64,

    /// x0: initial estimate. When `None` the first sample seeds it.
    pub initial_estimate: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-5,
            measurement_noise: 0.1,
            initial_covariance: 1.0,
            initial_estimate: None,
        }
    }
}

/// Smooths `series` in a single forward pass, returning a sequence of the
/// same length.
///
/// Inputs must be pre-cleaned: the filter has no missing-value handling, and
/// a non-finite sample would propagate through the estimate and covariance
/// for every subsequent step. Use [`fill_gaps`] on series with holes first.
pub fn smooth(series: &[f64], config: &FilterConfig) -> Vec<f64> {
    let Some(&first) = series.first() else {
        return Vec::new();
    };

    let q = config.process_noise;
    let r = config.measurement_noise;

    let mut estimate = config.initial_estimate.unwrap_or(first);
    let mut covariance = config.initial_covariance;

    let mut smoothed = Vec::with_capacity(series.len());

    for &observation in series {
        // Predict: identity transition, covariance grows by Q.
        let prior_covariance = covariance + q;

        // Gain: K -> 1 as R -> 0 (trust the sensor), K -> 0 as Q -> 0.
        let gain = prior_covariance / (prior_covariance + r);

        // Update.
        estimate += gain * (observation - estimate);
        covariance = (1.0 - gain) * prior_covariance;

        smoothed.push(estimate);
    }

    smoothed
}

/// Forward-fills then backward-fills gaps, yielding a series [`smooth`] will
/// accept. Returns an empty vector when every sample is absent.
pub fn fill_gaps(series: &[Option<f64>]) -> Vec<f64> {
    if !series.iter().any(Option::is_some) {
        return Vec::new();
    }

    let mut filled = Vec::with_capacity(series.len());
    let mut last = None;
    for &sample in series {
        if sample.is_some() {
            last = sample;
        }
        filled.push(last);
    }

    // Leading gap: backfill from the first observed sample.
    let first = filled
        .iter()
        .find_map(|&v| v)
        .unwrap_or_default();

    filled
        .into_iter()
        .map(|v| v.unwrap_or(first))
        .collect()
}
