//! Exponential Moving Average.
//!
//! alpha = 2/(span+1). Every output is the weighted mean of all observations
//! so far with weights (1-alpha)^k, updated as a running mean:
//! w[i] = (1-alpha)*w[i-1], EMA[i] = EMA[i-1] + (x[i] - EMA[i-1]) / (w[i] + 1), w[i] += 1.
//! A constant input therefore stays exactly constant.
//! Warmup: output is undefined until `span` defined inputs have been consumed.

pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

pub fn calculate_ema(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    if span == 0 {
        return vec![None; values.len()];
    }

    let decay = 1.0 - smoothing_factor(span);
    let mut mean = 0.0_f64;
    let mut weight = 0.0_f64;
    let mut seen = 0usize;

    values
        .iter()
        .map(|value| match value {
            Some(x) if x.is_finite() => {
                weight *= decay;
                mean += (x - mean) / (weight + 1.0);
                weight += 1.0;
                seen += 1;
                (seen >= span).then_some(mean)
            }
            _ => None,
        })
        .collect()
}
